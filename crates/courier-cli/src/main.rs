//! Demo wiring: build a coordinator from a config document, queue a
//! couple of messages, watch them drain.
//!
//! Usage: `courier-cli [config.json]`. Without an argument a localhost
//! HTTP endpoint config is used.

use courier_core::EndpointConfig;
use courier_core::coordinator::Coordinator;
use courier_core::model::{DomainMessage, MessageLocation, MessageTransition, TransitionEvent};

fn load_config() -> EndpointConfig {
    let document = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(document) => document,
            Err(err) => {
                eprintln!("cannot read {path}: {err}");
                std::process::exit(1);
            }
        },
        None => r#"{
            "mode": "http",
            "username": "demo",
            "device_id": "cli",
            "http": {"url": "http://localhost:8080/pub"},
            "retry": {"base_secs": 1.0, "multiplier": 2.0, "max_delay_secs": 10.0, "max_attempts": 5}
        }"#
        .to_string(),
    };
    match EndpointConfig::from_json_str(&document) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid config: {err}");
            std::process::exit(1);
        }
    }
}

fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = load_config();
    let coordinator = match Coordinator::start(config) {
        Ok(coordinator) => coordinator,
        Err(err) => {
            eprintln!("cannot start delivery: {err}");
            std::process::exit(1);
        }
    };

    // Print every terminal outcome as it happens.
    let mut events = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("delivery: {}", event.status_message());
        }
    });

    // Queue a location fix and a region transition.
    let now = now_epoch();
    let mut fix = MessageLocation::new(52.123, 0.56789, now);
    fix.tid = Some("cl".to_string());
    coordinator
        .queue_message(DomainMessage::Location(fix))
        .await
        .expect("enqueue location");

    let mut transition = MessageTransition::new(TransitionEvent::Enter, 52.12, 0.56, now);
    transition.desc = Some("Demo region".to_string());
    transition.trigger = Some("l".to_string());
    coordinator
        .queue_message(DomainMessage::Transition(transition))
        .await
        .expect("enqueue transition");

    // Wait for everything pending to terminally resolve, then stop.
    coordinator.wait_until_empty().await;
    coordinator.shutdown_and_join().await;
    printer.abort();
}
