use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, Locatable, Ranked};

/// Identity of the person talking to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Chat the conversation happens in; kept for expiry notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRef(pub i64);

/// Conversation steps from greeting to confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    Start,
    ChoosingVacancy,
    RequestingLocation,
    ShowingShops,
    ShowingVacancyDetails,
    RequestingFio,
    RequestingPhone,
    RequestingAge,
    Confirmation,
}

impl DialogState {
    pub const fn label(self) -> &'static str {
        match self {
            DialogState::Start => "start",
            DialogState::ChoosingVacancy => "choosing_vacancy",
            DialogState::RequestingLocation => "requesting_location",
            DialogState::ShowingShops => "showing_shops",
            DialogState::ShowingVacancyDetails => "showing_vacancy_details",
            DialogState::RequestingFio => "requesting_fio",
            DialogState::RequestingPhone => "requesting_phone",
            DialogState::RequestingAge => "requesting_age",
            DialogState::Confirmation => "confirmation",
        }
    }
}

/// How the applicant supplied their position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Address,
    Coordinates,
}

/// One employer location offering a vacancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub city: String,
    pub street: String,
    pub full_address: Option<String>,
    pub vacancy: String,
    pub rate: Option<String>,
    pub schedule: Option<String>,
    pub age_requirement: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl SiteRecord {
    /// "Город, адрес", the short label used on keyboards.
    pub fn short_address(&self) -> String {
        format!("{}, {}", self.city, self.street)
    }
}

impl Locatable for SiteRecord {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

pub type RankedSite = Ranked<SiteRecord>;

/// Everything collected from the applicant so far. Which fields are set is
/// determined by the session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    pub available_vacancies: Vec<String>,
    pub selected_vacancy: Option<String>,
    pub user_address: Option<String>,
    pub user_location: Option<Coordinate>,
    pub location_kind: Option<LocationKind>,
    pub available_shops: Vec<RankedSite>,
    pub selected_shop: Option<RankedSite>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
}

/// Per-user conversation state; lives only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogState,
    pub form: FormData,
    pub last_activity: DateTime<Utc>,
    pub chat: ChatRef,
}

impl Session {
    pub fn new(chat: ChatRef, now: DateTime<Utc>) -> Self {
        Self {
            state: DialogState::Start,
            form: FormData::default(),
            last_activity: now,
            chat,
        }
    }
}

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
}

/// What the user sent.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Command(Command),
    Text(String),
    Contact {
        phone: String,
        owner: Option<UserId>,
    },
    Location(Coordinate),
}

/// One inbound transport event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatRef,
    pub payload: InboundPayload,
}

/// A selectable reply option; may carry a share affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    pub request_contact: bool,
    pub request_location: bool,
}

impl KeyboardButton {
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            request_contact: false,
            request_location: false,
        }
    }

    pub fn share_contact(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            request_contact: true,
            request_location: false,
        }
    }

    pub fn share_location(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            request_contact: false,
            request_location: true,
        }
    }
}

/// Reply-option set attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyMarkup {
    RemoveKeyboard,
    Keyboard(Vec<Vec<KeyboardButton>>),
}

/// A message the core asks the transport to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    pub markup: ReplyMarkup,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: ReplyMarkup::RemoveKeyboard,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, rows: Vec<Vec<KeyboardButton>>) -> Self {
        Self {
            text: text.into(),
            markup: ReplyMarkup::Keyboard(rows),
        }
    }
}

/// A finalized application as handed to the staff notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCard {
    pub vacancy: String,
    pub site: RankedSite,
    pub full_name: String,
    pub phone: String,
    pub age: u8,
    pub applicant: UserId,
    pub submitted_at: DateTime<Utc>,
}
