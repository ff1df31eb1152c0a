//! Conversational intake: domain model, session store, state machine, and
//! the seams to the chat transport, site directory, and staff notifier.

pub mod directory;
pub mod domain;
pub mod engine;
pub mod input;
pub mod outbound;
pub mod sessions;
pub mod sheets;
pub mod views;

#[cfg(test)]
mod tests;

pub use directory::{
    dedup_vacancies, placeholder_sites, placeholder_vacancies, CsvDirectory, DirectoryError,
    SiteDirectory,
};
pub use domain::{
    ApplicationCard, ChatRef, Command, DialogState, FormData, InboundEvent, InboundPayload,
    KeyboardButton, LocationKind, OutboundMessage, RankedSite, ReplyMarkup, Session, SiteRecord,
    UserId,
};
pub use engine::{DialogEngine, EngineError};
pub use outbound::{ApplicationNotifier, ChatGateway, NotifyError, OutboundError};
pub use sessions::{run_sweeper, sweep_once, SessionStore};
pub use sheets::{SheetsConnector, SheetsDirectory};
