use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::dialog::directory::{DirectoryError, SiteDirectory};
use crate::dialog::domain::{
    ChatRef, Command, InboundEvent, InboundPayload, OutboundMessage, SiteRecord, UserId,
};
use crate::dialog::engine::DialogEngine;
use crate::dialog::outbound::{ApplicationNotifier, ChatGateway, NotifyError, OutboundError};
use crate::dialog::sessions::SessionStore;
use crate::geo::{Coordinate, Geocoder};

pub(super) const USER: UserId = UserId(42);
pub(super) const CHAT: ChatRef = ChatRef(4242);

pub(super) fn moscow() -> Coordinate {
    Coordinate {
        latitude: 55.7558,
        longitude: 37.6176,
    }
}

pub(super) fn site(city: &str, street: &str, vacancy: &str, at: Option<Coordinate>) -> SiteRecord {
    SiteRecord {
        city: city.to_string(),
        street: street.to_string(),
        full_address: None,
        vacancy: vacancy.to_string(),
        rate: Some("от 50000 руб.".to_string()),
        schedule: Some("5/2".to_string()),
        age_requirement: None,
        description: None,
        project: Some("Ритейл".to_string()),
        coordinate: at,
    }
}

pub(super) struct StubDirectory {
    pub(super) vacancies: Vec<String>,
    pub(super) sites: Vec<SiteRecord>,
    pub(super) fail: bool,
}

impl StubDirectory {
    pub(super) fn with_fixture() -> Self {
        Self {
            vacancies: vec!["Cashier".to_string(), "Повар".to_string()],
            sites: vec![site("Москва", "ул. Тестовая, 1", "Cashier", Some(moscow()))],
            fail: false,
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            vacancies: Vec::new(),
            sites: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SiteDirectory for StubDirectory {
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError> {
        if self.fail {
            return Err(DirectoryError::Unavailable("stub down".to_string()));
        }
        Ok(self.vacancies.clone())
    }

    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError> {
        if self.fail {
            return Err(DirectoryError::Unavailable("stub down".to_string()));
        }
        let wanted = vacancy.to_lowercase();
        Ok(self
            .sites
            .iter()
            .filter(|site| site.vacancy.to_lowercase() == wanted)
            .cloned()
            .collect())
    }
}

pub(super) struct StaticGeocoder(pub(super) Option<Coordinate>);

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, _address: &str) -> Option<Coordinate> {
        self.0
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(super) fn notes(&self) -> Vec<String> {
        self.notes.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ApplicationNotifier for RecordingNotifier {
    async fn deliver(&self, notice: &str) -> Result<(), NotifyError> {
        self.notes.lock().expect("lock").push(notice.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingGateway {
    sent: Mutex<Vec<(ChatRef, OutboundMessage)>>,
}

impl RecordingGateway {
    pub(super) fn sent(&self) -> Vec<(ChatRef, OutboundMessage)> {
        self.sent.lock().expect("lock").clone()
    }

    pub(super) fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|(_, message)| message.text)
            .collect()
    }

    pub(super) fn last_text(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send(&self, chat: ChatRef, message: OutboundMessage) -> Result<(), OutboundError> {
        self.sent.lock().expect("lock").push((chat, message));
        Ok(())
    }
}

pub(super) type TestEngine =
    DialogEngine<StubDirectory, StaticGeocoder, RecordingNotifier, RecordingGateway>;

pub(super) struct Harness {
    pub(super) engine: TestEngine,
    pub(super) gateway: Arc<RecordingGateway>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) sessions: Arc<SessionStore>,
}

pub(super) fn harness(directory: StubDirectory, geocoder: StaticGeocoder) -> Harness {
    let gateway = Arc::new(RecordingGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let sessions = Arc::new(SessionStore::new());
    let engine = DialogEngine::new(
        Arc::new(directory),
        Arc::new(geocoder),
        notifier.clone(),
        gateway.clone(),
        sessions.clone(),
    );
    Harness {
        engine,
        gateway,
        notifier,
        sessions,
    }
}

pub(super) fn fixture_harness() -> Harness {
    harness(StubDirectory::with_fixture(), StaticGeocoder(Some(moscow())))
}

pub(super) fn start_event() -> InboundEvent {
    InboundEvent {
        user: USER,
        chat: CHAT,
        payload: InboundPayload::Command(Command::Start),
    }
}

pub(super) fn text_event(text: &str) -> InboundEvent {
    InboundEvent {
        user: USER,
        chat: CHAT,
        payload: InboundPayload::Text(text.to_string()),
    }
}

pub(super) fn contact_event(phone: &str, owner: Option<UserId>) -> InboundEvent {
    InboundEvent {
        user: USER,
        chat: CHAT,
        payload: InboundPayload::Contact {
            phone: phone.to_string(),
            owner,
        },
    }
}

pub(super) fn location_event(coordinate: Coordinate) -> InboundEvent {
    InboundEvent {
        user: USER,
        chat: CHAT,
        payload: InboundPayload::Location(coordinate),
    }
}

/// Drives the conversation up to the FIO step against the fixture data.
pub(super) async fn advance_to_fio(harness: &Harness) {
    harness.engine.handle(start_event()).await;
    harness.engine.handle(text_event("Cashier")).await;
    harness.engine.handle(location_event(moscow())).await;
    harness
        .engine
        .handle(text_event("1. Москва, ул. Тестовая, 1 (0 м)"))
        .await;
    harness
        .engine
        .handle(text_event(crate::dialog::views::BTN_APPLY))
        .await;
}
