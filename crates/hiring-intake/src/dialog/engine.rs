//! The conversation state machine.
//!
//! Each inbound event is validated against the current session state,
//! mutates the session, and produces the next prompt. Unmatched state/input
//! combinations never advance the state. Every failure inside a handler is
//! caught in [`DialogEngine::handle`] and degrades to an apology, keeping
//! the event loop alive.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::directory::{placeholder_sites, placeholder_vacancies, SiteDirectory};
use super::domain::{
    ApplicationCard, ChatRef, Command, DialogState, InboundEvent, InboundPayload, LocationKind,
    Session, UserId,
};
use super::input;
use super::outbound::{ApplicationNotifier, ChatGateway, OutboundError};
use super::sessions::SessionStore;
use super::views;
use crate::geo::{nearest, Coordinate, Geocoder, NEAREST_SITE_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Outbound(#[from] OutboundError),
    #[error("conversation reached {state} without required {field}")]
    IncompleteForm {
        state: &'static str,
        field: &'static str,
    },
}

/// The dialog engine wired to its collaborators.
pub struct DialogEngine<D: ?Sized, G: ?Sized, N: ?Sized, T: ?Sized> {
    directory: Arc<D>,
    geocoder: Arc<G>,
    notifier: Arc<N>,
    gateway: Arc<T>,
    sessions: Arc<SessionStore>,
}

impl<D, G, N, T> DialogEngine<D, G, N, T>
where
    D: SiteDirectory + ?Sized,
    G: Geocoder + ?Sized,
    N: ApplicationNotifier + ?Sized,
    T: ChatGateway + ?Sized,
{
    pub fn new(
        directory: Arc<D>,
        geocoder: Arc<G>,
        notifier: Arc<N>,
        gateway: Arc<T>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            directory,
            geocoder,
            notifier,
            gateway,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Entry point for one inbound event. Never returns an error: failures
    /// are logged and answered with an apology so the loop can continue
    /// with other sessions.
    pub async fn handle(&self, event: InboundEvent) {
        self.sessions.touch(event.user, event.chat, Utc::now());

        if let Err(error) = self.dispatch(&event).await {
            warn!(user = event.user.0, %error, "dialog event failed");
            if let Err(error) = self.gateway.send(event.chat, views::apology()).await {
                warn!(user = event.user.0, %error, "apology delivery failed");
            }
        }
    }

    async fn dispatch(&self, event: &InboundEvent) -> Result<(), EngineError> {
        let user = event.user;
        let chat = event.chat;

        match &event.payload {
            InboundPayload::Command(Command::Start) => self.begin(user, chat).await,
            InboundPayload::Command(Command::Cancel) => {
                self.sessions.remove(user);
                info!(user = user.0, "conversation cancelled");
                self.gateway.send(chat, views::cancel_notice()).await?;
                Ok(())
            }
            InboundPayload::Command(Command::Help) => {
                self.gateway.send(chat, views::help_text()).await?;
                Ok(())
            }
            InboundPayload::Contact { phone, owner } => {
                self.on_contact(user, chat, phone, *owner).await
            }
            InboundPayload::Location(coordinate) => self.on_location(user, chat, *coordinate).await,
            InboundPayload::Text(text) => self.on_text(user, chat, text).await,
        }
    }

    async fn begin(&self, user: UserId, chat: ChatRef) -> Result<(), EngineError> {
        info!(user = user.0, "conversation started");
        let session = Session::new(chat, Utc::now());
        self.gateway.send(chat, views::welcome()).await?;
        self.show_vacancies(user, chat, session).await
    }

    /// Fetches the vacancy list (placeholder on failure or empty source)
    /// and moves the session to `ChoosingVacancy`.
    async fn show_vacancies(
        &self,
        user: UserId,
        chat: ChatRef,
        mut session: Session,
    ) -> Result<(), EngineError> {
        if session.form.available_vacancies.is_empty() {
            self.gateway.send(chat, views::loading_vacancies()).await?;
        }

        let vacancies = match self.directory.list_vacancies().await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => {
                warn!("vacancy source returned no rows, using the placeholder list");
                placeholder_vacancies()
            }
            Err(error) => {
                warn!(%error, "vacancy source unavailable, using the placeholder list");
                placeholder_vacancies()
            }
        };

        session.form.available_vacancies = vacancies.clone();
        session.state = DialogState::ChoosingVacancy;
        session.last_activity = Utc::now();
        self.sessions.set(user, session);

        self.gateway.send(chat, views::vacancy_prompt(&vacancies)).await?;
        Ok(())
    }

    async fn on_text(&self, user: UserId, chat: ChatRef, text: &str) -> Result<(), EngineError> {
        let Some(mut session) = self.sessions.get(user) else {
            self.gateway.send(chat, views::finish_current_step()).await?;
            return Ok(());
        };

        debug!(user = user.0, state = session.state.label(), "text event");

        match session.state {
            DialogState::Start => {
                self.gateway.send(chat, views::finish_current_step()).await?;
                Ok(())
            }
            DialogState::ChoosingVacancy => {
                if !session.form.available_vacancies.iter().any(|name| name == text) {
                    self.gateway.send(chat, views::vacancy_rejected()).await?;
                    return Ok(());
                }

                info!(user = user.0, vacancy = text, "vacancy selected");
                session.form.selected_vacancy = Some(text.to_string());
                session.state = DialogState::RequestingLocation;
                self.sessions.set(user, session);
                self.gateway.send(chat, views::location_prompt(text)).await?;
                Ok(())
            }
            DialogState::RequestingLocation => {
                if text == views::BTN_BACK_TO_VACANCIES {
                    return self.show_vacancies(user, chat, session).await;
                }

                self.gateway.send(chat, views::geocoding_notice()).await?;
                match self.geocoder.resolve(text).await {
                    None => {
                        debug!(user = user.0, address = text, "address not resolved");
                        self.gateway.send(chat, views::geocode_failed()).await?;
                        Ok(())
                    }
                    Some(coordinate) => {
                        session.form.user_address = Some(text.to_string());
                        session.form.user_location = Some(coordinate);
                        session.form.location_kind = Some(LocationKind::Address);
                        self.show_shops(user, chat, session).await
                    }
                }
            }
            DialogState::ShowingShops => {
                if text == views::BTN_BACK {
                    session.state = DialogState::RequestingLocation;
                    self.sessions.set(user, session);
                    self.gateway.send(chat, views::location_reprompt()).await?;
                    return Ok(());
                }

                let Some(index) = input::parse_shop_index(text) else {
                    debug!(user = user.0, input = text, "unmatched shop selection");
                    return Ok(());
                };
                let Some(shop) = index
                    .checked_sub(1)
                    .and_then(|i| session.form.available_shops.get(i))
                    .cloned()
                else {
                    debug!(user = user.0, index, "shop index out of range");
                    return Ok(());
                };

                session.form.selected_shop = Some(shop.clone());
                session.state = DialogState::ShowingVacancyDetails;
                self.sessions.set(user, session);
                self.gateway.send(chat, views::shop_details(&shop)).await?;
                Ok(())
            }
            DialogState::ShowingVacancyDetails => {
                if text == views::BTN_APPLY {
                    session.state = DialogState::RequestingFio;
                    self.sessions.set(user, session);
                    self.gateway.send(chat, views::fio_prompt()).await?;
                } else if text == views::BTN_BACK_TO_SHOPS {
                    let vacancy = session
                        .form
                        .selected_vacancy
                        .clone()
                        .unwrap_or_default();
                    let shops = session.form.available_shops.clone();
                    session.state = DialogState::ShowingShops;
                    self.sessions.set(user, session);
                    self.gateway
                        .send(chat, views::shop_list(&vacancy, &shops))
                        .await?;
                }
                Ok(())
            }
            DialogState::RequestingFio => {
                if !input::valid_full_name(text) {
                    self.gateway.send(chat, views::fio_rejected()).await?;
                    return Ok(());
                }

                session.form.full_name = Some(text.trim().to_string());
                session.state = DialogState::RequestingPhone;
                self.sessions.set(user, session);
                self.gateway.send(chat, views::phone_prompt()).await?;
                Ok(())
            }
            DialogState::RequestingPhone => match input::normalize_phone(text) {
                Some(phone) => self.accept_phone(user, chat, session, phone).await,
                None => {
                    self.gateway.send(chat, views::phone_rejected()).await?;
                    Ok(())
                }
            },
            DialogState::RequestingAge => match input::parse_age(text) {
                Some(age) => {
                    session.form.age = Some(age);
                    session.state = DialogState::Confirmation;
                    let summary = self.confirmation_summary(&session)?;
                    self.sessions.set(user, session);
                    self.gateway.send(chat, summary).await?;
                    Ok(())
                }
                None => {
                    self.gateway.send(chat, views::age_rejected()).await?;
                    Ok(())
                }
            },
            DialogState::Confirmation => {
                if text == views::BTN_CONFIRM {
                    self.finalize(user, chat, session).await
                } else if text == views::BTN_REVISE {
                    self.sessions.remove(user);
                    self.gateway.send(chat, views::revise_notice()).await?;
                    Ok(())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// A shared contact is only accepted while the phone is being
    /// requested, and only when it belongs to the sender.
    async fn on_contact(
        &self,
        user: UserId,
        chat: ChatRef,
        phone: &str,
        owner: Option<UserId>,
    ) -> Result<(), EngineError> {
        let Some(session) = self.sessions.get(user) else {
            self.gateway.send(chat, views::finish_current_step()).await?;
            return Ok(());
        };

        if session.state != DialogState::RequestingPhone {
            debug!(
                user = user.0,
                state = session.state.label(),
                "contact outside phone step"
            );
            self.gateway.send(chat, views::finish_current_step()).await?;
            return Ok(());
        }

        if owner != Some(user) {
            warn!(user = user.0, "contact belongs to a different identity");
            self.gateway
                .send(chat, views::foreign_contact_rejected())
                .await?;
            return Ok(());
        }

        // The transport vouches for shared contacts, so unlike manual entry
        // the digits are stored without the 7xxxxxxxxxx check.
        let digits = input::digits_only(phone);
        let phone = if digits.is_empty() {
            phone.to_string()
        } else {
            digits
        };
        self.accept_phone(user, chat, session, phone).await
    }

    async fn accept_phone(
        &self,
        user: UserId,
        chat: ChatRef,
        mut session: Session,
        phone: String,
    ) -> Result<(), EngineError> {
        info!(user = user.0, "phone accepted");
        session.form.phone = Some(phone);
        session.state = DialogState::RequestingAge;
        self.sessions.set(user, session);
        self.gateway.send(chat, views::age_prompt()).await?;
        Ok(())
    }

    async fn on_location(
        &self,
        user: UserId,
        chat: ChatRef,
        coordinate: Coordinate,
    ) -> Result<(), EngineError> {
        let Some(mut session) = self.sessions.get(user) else {
            self.gateway.send(chat, views::finish_current_step()).await?;
            return Ok(());
        };

        if session.state != DialogState::RequestingLocation {
            debug!(
                user = user.0,
                state = session.state.label(),
                "location outside location step"
            );
            self.gateway.send(chat, views::finish_current_step()).await?;
            return Ok(());
        }

        session.form.user_address = None;
        session.form.user_location = Some(coordinate);
        session.form.location_kind = Some(LocationKind::Coordinates);
        self.show_shops(user, chat, session).await
    }

    /// Loads the sites for the selected vacancy, ranks them around the
    /// user, and presents the bounded list.
    async fn show_shops(
        &self,
        user: UserId,
        chat: ChatRef,
        mut session: Session,
    ) -> Result<(), EngineError> {
        let vacancy = session.form.selected_vacancy.clone().ok_or(
            EngineError::IncompleteForm {
                state: "showing_shops",
                field: "selected_vacancy",
            },
        )?;
        let origin = session
            .form
            .user_location
            .ok_or(EngineError::IncompleteForm {
                state: "showing_shops",
                field: "user_location",
            })?;

        self.gateway
            .send(chat, views::searching_notice(&vacancy))
            .await?;

        let sites = match self.directory.sites_for_vacancy(&vacancy).await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => {
                warn!(%vacancy, "no site rows, using the placeholder site");
                placeholder_sites(&vacancy)
            }
            Err(error) => {
                warn!(%vacancy, %error, "site source unavailable, using the placeholder site");
                placeholder_sites(&vacancy)
            }
        };

        let ranked = nearest(origin, sites, NEAREST_SITE_LIMIT);
        session.form.available_shops = ranked.clone();

        if ranked.is_empty() {
            // Nothing rankable near the user; let them try another location.
            session.state = DialogState::RequestingLocation;
            self.sessions.set(user, session);
            self.gateway
                .send(chat, views::shops_not_found(&vacancy))
                .await?;
            return Ok(());
        }

        info!(user = user.0, %vacancy, shown = ranked.len(), "shops presented");
        session.state = DialogState::ShowingShops;
        self.sessions.set(user, session);
        self.gateway
            .send(chat, views::shop_list(&vacancy, &ranked))
            .await?;
        Ok(())
    }

    fn confirmation_summary(
        &self,
        session: &Session,
    ) -> Result<super::domain::OutboundMessage, EngineError> {
        let form = &session.form;
        let (Some(vacancy), Some(shop), Some(full_name), Some(phone), Some(age)) = (
            form.selected_vacancy.as_deref(),
            form.selected_shop.as_ref(),
            form.full_name.as_deref(),
            form.phone.as_deref(),
            form.age,
        ) else {
            return Err(EngineError::IncompleteForm {
                state: "confirmation",
                field: "form",
            });
        };

        Ok(views::confirmation_summary(vacancy, shop, full_name, phone, age))
    }

    /// Sends the application to the staff channel and resets the session.
    /// Notifier failures are logged only: the applicant is told the
    /// application went through either way.
    async fn finalize(
        &self,
        user: UserId,
        chat: ChatRef,
        session: Session,
    ) -> Result<(), EngineError> {
        let card = application_card(user, &session)?;
        let notice = views::application_notice(&card);

        if let Err(error) = self.notifier.deliver(&notice).await {
            warn!(user = user.0, %error, "application notice delivery failed");
        } else {
            info!(user = user.0, vacancy = %card.vacancy, "application delivered");
        }

        self.sessions.remove(user);
        self.gateway.send(chat, views::application_sent()).await?;
        Ok(())
    }
}

fn application_card(user: UserId, session: &Session) -> Result<ApplicationCard, EngineError> {
    let form = &session.form;
    let (Some(vacancy), Some(shop), Some(full_name), Some(phone), Some(age)) = (
        form.selected_vacancy.clone(),
        form.selected_shop.clone(),
        form.full_name.clone(),
        form.phone.clone(),
        form.age,
    ) else {
        return Err(EngineError::IncompleteForm {
            state: "confirmation",
            field: "form",
        });
    };

    Ok(ApplicationCard {
        vacancy,
        site: shop,
        full_name,
        phone,
        age,
        applicant: user,
        submitted_at: Utc::now(),
    })
}
