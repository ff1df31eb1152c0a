//! Minimal Telegram Bot API client: long polling in, messages out.
//!
//! Only the slice of the API the intake flow needs is modelled. The client
//! doubles as the core's chat gateway and, pointed at the staff chat, as
//! the application notifier.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use hiring_intake::dialog::{
    ApplicationNotifier, ChatGateway, ChatRef, Command, InboundEvent, InboundPayload,
    KeyboardButton, NotifyError, OutboundError, OutboundMessage, ReplyMarkup, UserId,
};
use hiring_intake::geo::Coordinate;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api rejected the call: {0}")]
    Api(String),
}

pub(crate) struct TelegramClient {
    client: reqwest::Client,
    base: String,
    staff_chat: Option<ChatRef>,
}

impl TelegramClient {
    pub(crate) fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{TELEGRAM_API_BASE}/bot{token}"),
            staff_chat: None,
        }
    }

    pub(crate) fn with_staff_chat(mut self, chat: Option<ChatRef>) -> Self {
        self.staff_chat = chat;
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> Result<T, TransportError> {
        let envelope: TgEnvelope<T> = self
            .client
            .post(format!("{}/{method}", self.base))
            .json(payload)
            .send()
            .await?
            .json()
            .await?;

        if !envelope.ok {
            return Err(TransportError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Api(format!("{method} returned no result")))
    }

    pub(crate) async fn get_me(&self) -> Result<TgUser, TransportError> {
        self.call("getMe", &json!({})).await
    }

    /// Long poll for updates starting at `offset`.
    pub(crate) async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<TgUpdate>, TransportError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn send_text(
        &self,
        chat: ChatRef,
        text: &str,
        markup: &ReplyMarkup,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "Markdown",
            "reply_markup": markup_json(markup),
        });
        let _: TgMessage = self.call("sendMessage", &payload).await?;
        Ok(())
    }
}

fn markup_json(markup: &ReplyMarkup) -> Value {
    match markup {
        ReplyMarkup::RemoveKeyboard => json!({ "remove_keyboard": true }),
        ReplyMarkup::Keyboard(rows) => {
            let keyboard: Vec<Vec<Value>> =
                rows.iter().map(|row| row.iter().map(button_json).collect()).collect();
            json!({ "keyboard": keyboard, "resize_keyboard": true })
        }
    }
}

fn button_json(button: &KeyboardButton) -> Value {
    let mut value = json!({ "text": button.text });
    if button.request_contact {
        value["request_contact"] = json!(true);
    }
    if button.request_location {
        value["request_location"] = json!(true);
    }
    value
}

#[async_trait]
impl ChatGateway for TelegramClient {
    async fn send(&self, chat: ChatRef, message: OutboundMessage) -> Result<(), OutboundError> {
        self.send_text(chat, &message.text, &message.markup)
            .await
            .map_err(|err| OutboundError::Transport(err.to_string()))
    }
}

#[async_trait]
impl ApplicationNotifier for TelegramClient {
    async fn deliver(&self, notice: &str) -> Result<(), NotifyError> {
        let Some(chat) = self.staff_chat else {
            return Err(NotifyError::ChannelUnconfigured);
        };
        self.send_text(chat, notice, &ReplyMarkup::RemoveKeyboard)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TgEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub(crate) update_id: i64,
    pub(crate) message: Option<TgMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TgMessage {
    pub(crate) from: Option<TgUser>,
    pub(crate) chat: Option<TgChat>,
    pub(crate) text: Option<String>,
    pub(crate) contact: Option<TgContact>,
    pub(crate) location: Option<TgLocation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub(crate) id: i64,
    pub(crate) username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub(crate) id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgContact {
    pub(crate) phone_number: String,
    pub(crate) user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgLocation {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

/// Maps a raw update onto a core event. Updates without a sender, service
/// messages, and unknown commands map to `None` and are skipped.
pub(crate) fn event_from_update(update: &TgUpdate) -> Option<InboundEvent> {
    let message = update.message.as_ref()?;
    let user = UserId(message.from.as_ref()?.id);
    let chat = ChatRef(message.chat.as_ref()?.id);

    let payload = if let Some(contact) = &message.contact {
        InboundPayload::Contact {
            phone: contact.phone_number.clone(),
            owner: contact.user_id.map(UserId),
        }
    } else if let Some(location) = &message.location {
        InboundPayload::Location(Coordinate::new(location.latitude, location.longitude)?)
    } else if let Some(text) = &message.text {
        if let Some(command) = text.strip_prefix('/') {
            // "/start@some_bot arg" -> "start"
            let name = command
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .split('@')
                .next()
                .unwrap_or_default();
            let command = match name {
                "start" => Command::Start,
                "cancel" => Command::Cancel,
                "help" => Command::Help,
                _ => return None,
            };
            InboundPayload::Command(command)
        } else {
            InboundPayload::Text(text.clone())
        }
    } else {
        return None;
    };

    Some(InboundEvent {
        user,
        chat,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(message: TgMessage) -> TgUpdate {
        TgUpdate {
            update_id: 7,
            message: Some(message),
        }
    }

    fn base_message() -> TgMessage {
        TgMessage {
            from: Some(TgUser {
                id: 42,
                username: None,
            }),
            chat: Some(TgChat { id: 4242 }),
            ..TgMessage::default()
        }
    }

    #[test]
    fn start_command_maps_even_with_bot_suffix() {
        let mut message = base_message();
        message.text = Some("/start@vacancy_bot".to_string());
        let event = event_from_update(&update(message)).expect("event mapped");
        assert_eq!(event.payload, InboundPayload::Command(Command::Start));
        assert_eq!(event.user, UserId(42));
        assert_eq!(event.chat, ChatRef(4242));
    }

    #[test]
    fn unknown_commands_are_skipped() {
        let mut message = base_message();
        message.text = Some("/settings".to_string());
        assert!(event_from_update(&update(message)).is_none());
    }

    #[test]
    fn contact_carries_owner_identity() {
        let mut message = base_message();
        message.contact = Some(TgContact {
            phone_number: "+79001234567".to_string(),
            user_id: Some(42),
        });
        let event = event_from_update(&update(message)).expect("event mapped");
        assert_eq!(
            event.payload,
            InboundPayload::Contact {
                phone: "+79001234567".to_string(),
                owner: Some(UserId(42)),
            }
        );
    }

    #[test]
    fn location_maps_to_coordinate() {
        let mut message = base_message();
        message.location = Some(TgLocation {
            latitude: 55.7558,
            longitude: 37.6176,
        });
        let event = event_from_update(&update(message)).expect("event mapped");
        assert!(matches!(event.payload, InboundPayload::Location(_)));
    }

    #[test]
    fn keyboard_markup_serializes_share_affordances() {
        let markup = ReplyMarkup::Keyboard(vec![vec![
            KeyboardButton::share_location("📍 Отправить местоположение"),
        ]]);
        let value = markup_json(&markup);
        assert_eq!(value["keyboard"][0][0]["request_location"], json!(true));
        assert_eq!(value["resize_keyboard"], json!(true));

        let removed = markup_json(&ReplyMarkup::RemoveKeyboard);
        assert_eq!(removed["remove_keyboard"], json!(true));
    }
}
