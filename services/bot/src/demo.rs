//! Scripted end-to-end conversation against in-memory collaborators,
//! printed to stdout.

use std::sync::Arc;

use clap::Args;

use hiring_intake::dialog::{
    ChatRef, Command, DialogEngine, InboundEvent, InboundPayload, SessionStore, UserId,
};
use hiring_intake::error::AppError;
use hiring_intake::geo::Coordinate;

use crate::infra::{MemoryDirectory, PrintGateway, RecordingNotifier, StaticGeocoder};

const DEMO_USER: UserId = UserId(1);
const DEMO_CHAT: ChatRef = ChatRef(1);

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Vacancy to apply for (must be in the fixture list)
    #[arg(long, default_value = "Кассир")]
    vacancy: String,
    /// Address the scripted applicant enters
    #[arg(long, default_value = "Москва, Тверская, 1")]
    address: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let notifier = Arc::new(RecordingNotifier::default());
    let sessions = Arc::new(SessionStore::new());
    let engine = DialogEngine::new(
        Arc::new(MemoryDirectory::fixture()),
        // Red Square, so the fixture sites rank within walking distance.
        Arc::new(StaticGeocoder(Coordinate::new(55.7539, 37.6208))),
        notifier.clone(),
        Arc::new(PrintGateway),
        sessions.clone(),
    );

    println!("Vacancy intake demo\n");

    let script: Vec<(&str, InboundPayload)> = vec![
        ("/start", InboundPayload::Command(Command::Start)),
        (args.vacancy.as_str(), InboundPayload::Text(args.vacancy.clone())),
        (args.address.as_str(), InboundPayload::Text(args.address.clone())),
        ("1. (первый магазин)", InboundPayload::Text("1.".to_string())),
        ("✅ Откликнуться", InboundPayload::Text("✅ Откликнуться".to_string())),
        (
            "Иванов Иван Иванович",
            InboundPayload::Text("Иванов Иван Иванович".to_string()),
        ),
        ("79001234567", InboundPayload::Text("79001234567".to_string())),
        ("25", InboundPayload::Text("25".to_string())),
        (
            "✅ Да, отправить отклик",
            InboundPayload::Text("✅ Да, отправить отклик".to_string()),
        ),
    ];

    for (shown, payload) in script {
        println!(" user | {shown}");
        engine
            .handle(InboundEvent {
                user: DEMO_USER,
                chat: DEMO_CHAT,
                payload,
            })
            .await;
    }

    let notes = notifier.notes();
    if let Some(note) = notes.first() {
        println!("Staff channel received:");
        for line in note.lines() {
            println!("  >>> {line}");
        }
    } else {
        println!("Staff channel received nothing");
    }

    println!(
        "\nSessions left in the store: {}",
        sessions.len()
    );
    Ok(())
}
