use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use hiring_intake::config::AppConfig;
use hiring_intake::dialog::{
    run_sweeper, ChatRef, DialogEngine, SessionStore, SheetsDirectory,
};
use hiring_intake::error::AppError;
use hiring_intake::geo::AddressResolver;
use hiring_intake::telemetry;

use crate::cli::RunArgs;
use crate::infra::{DirectoryBackend, MemoryDirectory};
use crate::routes::{health_router, AppState};
use crate::telegram::{event_from_update, TelegramClient};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

pub(crate) async fn run(mut args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let token = config.transport.require_token()?.to_string();
    let staff_chat = config.notifier.manager_chat_id.map(ChatRef);
    if staff_chat.is_none() {
        warn!("MANAGER_CHAT_ID is not set; confirmed applications will not reach staff");
    }

    let directory = Arc::new(build_directory(&args, &config).await?);
    let geocoder = Arc::new(AddressResolver::standard(
        config.geocoding.yandex_api_key.clone(),
    ));
    let telegram = Arc::new(TelegramClient::new(&token).with_staff_chat(staff_chat));
    let sessions = Arc::new(SessionStore::new());

    let engine = DialogEngine::new(
        directory,
        geocoder,
        telegram.clone(),
        telegram.clone(),
        sessions.clone(),
    );

    tokio::spawn(run_sweeper(
        sessions.clone(),
        telegram.clone(),
        config.sessions,
    ));

    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
    };
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, health_router(state)).await {
            warn!(%error, "health endpoint server stopped");
        }
    });

    let me = telegram.get_me().await.map_err(AppError::transport)?;
    readiness_flag.store(true, Ordering::Release);
    info!(
        ?config.environment,
        %addr,
        bot = me.username.as_deref().unwrap_or("unknown"),
        "vacancy intake bot ready"
    );

    // Updates are handled one at a time: the state machine relies on
    // sequential transitions per session.
    let mut offset = 0i64;
    loop {
        match telegram
            .get_updates(offset, config.transport.poll_timeout_secs)
            .await
        {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(event) = event_from_update(&update) {
                        engine.handle(event).await;
                    }
                }
            }
            Err(error) => {
                warn!(%error, "polling failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}

async fn build_directory(args: &RunArgs, config: &AppConfig) -> Result<DirectoryBackend, AppError> {
    if let Some(path) = &args.sites_csv {
        info!(path = %path.display(), "serving site listings from CSV");
        return Ok(DirectoryBackend::Csv(
            hiring_intake::dialog::CsvDirectory::new(path.clone()),
        ));
    }

    match &config.directory.spreadsheet_id {
        Some(spreadsheet_id) => {
            let directory = SheetsDirectory::from_service_account(
                spreadsheet_id.clone(),
                &config.directory.credentials_path,
            )
            .await?;
            info!("serving site listings from Google Sheets");
            Ok(DirectoryBackend::Sheets(directory))
        }
        None => {
            warn!("GOOGLE_SHEETS_ID is not set; serving fixture listings");
            Ok(DirectoryBackend::Memory(MemoryDirectory::fixture()))
        }
    }
}
