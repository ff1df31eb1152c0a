//! In-memory collaborators for the demo command and tests, plus the
//! runtime directory selection.

use std::sync::Mutex;

use async_trait::async_trait;

use hiring_intake::dialog::{
    ApplicationNotifier, ChatGateway, ChatRef, CsvDirectory, DirectoryError, NotifyError,
    OutboundError, OutboundMessage, ReplyMarkup, SheetsConnector, SheetsDirectory, SiteDirectory,
    SiteRecord,
};
use hiring_intake::geo::{Coordinate, Geocoder};

/// Which backend serves vacancy and site data for this process.
pub(crate) enum DirectoryBackend {
    Sheets(SheetsDirectory<SheetsConnector>),
    Csv(CsvDirectory),
    Memory(MemoryDirectory),
}

#[async_trait]
impl SiteDirectory for DirectoryBackend {
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError> {
        match self {
            DirectoryBackend::Sheets(inner) => inner.list_vacancies().await,
            DirectoryBackend::Csv(inner) => inner.list_vacancies().await,
            DirectoryBackend::Memory(inner) => inner.list_vacancies().await,
        }
    }

    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError> {
        match self {
            DirectoryBackend::Sheets(inner) => inner.sites_for_vacancy(vacancy).await,
            DirectoryBackend::Csv(inner) => inner.sites_for_vacancy(vacancy).await,
            DirectoryBackend::Memory(inner) => inner.sites_for_vacancy(vacancy).await,
        }
    }
}

/// Fixture-backed directory used when no real data source is configured.
pub(crate) struct MemoryDirectory {
    vacancies: Vec<String>,
    sites: Vec<SiteRecord>,
}

impl MemoryDirectory {
    pub(crate) fn new(vacancies: Vec<String>, sites: Vec<SiteRecord>) -> Self {
        Self { vacancies, sites }
    }

    pub(crate) fn fixture() -> Self {
        let site = |city: &str, street: &str, vacancy: &str, lat: f64, lon: f64| SiteRecord {
            city: city.to_string(),
            street: street.to_string(),
            full_address: Some(format!("{city}, {street}")),
            vacancy: vacancy.to_string(),
            rate: Some("от 50000 руб.".to_string()),
            schedule: Some("5/2".to_string()),
            age_requirement: Some("18+".to_string()),
            description: None,
            project: Some("Ритейл".to_string()),
            coordinate: Coordinate::new(lat, lon),
        };

        Self::new(
            vec!["Кассир".to_string(), "Повар".to_string()],
            vec![
                site("Москва", "ул. Тверская, 1", "Кассир", 55.7577, 37.6136),
                site("Москва", "Ленинский пр-т, 30", "Кассир", 55.7074, 37.5856),
                site("Москва", "ул. Арбат, 12", "Повар", 55.7503, 37.5946),
            ],
        )
    }
}

#[async_trait]
impl SiteDirectory for MemoryDirectory {
    async fn list_vacancies(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.vacancies.clone())
    }

    async fn sites_for_vacancy(&self, vacancy: &str) -> Result<Vec<SiteRecord>, DirectoryError> {
        let wanted = vacancy.trim().to_lowercase();
        Ok(self
            .sites
            .iter()
            .filter(|site| site.vacancy.to_lowercase() == wanted)
            .cloned()
            .collect())
    }
}

/// Geocoder stub resolving every address to one fixed point.
pub(crate) struct StaticGeocoder(pub(crate) Option<Coordinate>);

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, _address: &str) -> Option<Coordinate> {
        self.0
    }
}

/// Notifier that records staff notices instead of sending them.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn notes(&self) -> Vec<String> {
        self.notes.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl ApplicationNotifier for RecordingNotifier {
    async fn deliver(&self, notice: &str) -> Result<(), NotifyError> {
        self.notes
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice.to_string());
        Ok(())
    }
}

/// Gateway that renders the conversation to stdout for the demo command.
pub(crate) struct PrintGateway;

#[async_trait]
impl ChatGateway for PrintGateway {
    async fn send(&self, _chat: ChatRef, message: OutboundMessage) -> Result<(), OutboundError> {
        for line in message.text.lines() {
            println!("  bot | {line}");
        }
        if let ReplyMarkup::Keyboard(rows) = &message.markup {
            for row in rows {
                let labels: Vec<&str> = row.iter().map(|button| button.text.as_str()).collect();
                println!("  bot | [{}]", labels.join(" | "));
            }
        }
        println!();
        Ok(())
    }
}
