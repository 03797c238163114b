//! Reconnect behavior against an in-process server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use gavel_client::dispatch::{ClientMessageDispatcher, NotificationDisplay};
use gavel_client::error::ClientError;
use gavel_client::manager::ClientConnectionManager;
use gavel_client::prompt::Command;
use gavel_client::session::{SessionEnd, run_session};
use gavel_server::build_router;
use gavel_server::hub::{AuctionHub, AuctionPublisher};
use gavel_server::registry::ConnectionRegistry;
use gavel_server::state::AppState;
use gavel_shared::protocol::NotificationPayload;
use gavel_shared::time::SystemClock;

/// Display that records everything for later assertions.
#[derive(Clone)]
struct RecordingDisplay {
    events: Arc<Mutex<Vec<String>>>,
    notifications: Arc<Mutex<Vec<NotificationPayload>>>,
}

impl RecordingDisplay {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn event_count_containing(&self, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl NotificationDisplay for RecordingDisplay {
    fn notification(&mut self, payload: &NotificationPayload) {
        self.notifications.lock().unwrap().push(payload.clone());
    }

    fn event(&mut self, line: String) {
        self.events.lock().unwrap().push(line);
    }
}

async fn start_server() -> (
    SocketAddr,
    Arc<ConnectionRegistry>,
    tokio::task::JoinHandle<()>,
) {
    let registry = Arc::new(ConnectionRegistry::new());
    let state = Arc::new(AppState::new(registry.clone(), Arc::new(SystemClock)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, registry, handle)
}

async fn wait_until<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..250 {
        if predicate().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within deadline");
}

#[tokio::test]
async fn test_client_rejoins_its_auction_after_losing_the_connection() {
    // given: a server, and a client whose desired state says "watch 7"
    let (addr, registry, _server) = start_server().await;
    let display = RecordingDisplay::new();
    let mut manager = ClientConnectionManager::new(format!("ws://{}/ws", addr));
    manager.request_join(7);
    let mut dispatcher = ClientMessageDispatcher::new(None, display.clone());
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();

    // when: the first session is killed server-side mid-watch
    {
        let session = run_session(&mut manager, &mut dispatcher, &mut command_rx);
        let registry = registry.clone();
        let controller = async move {
            wait_until(|| {
                let registry = registry.clone();
                async move { registry.room_member_count(7).await == Some(1) }
            })
            .await;
            // Evict every connection, as a heartbeat timeout would.
            registry.sweep(i64::MAX / 2, 60_000).await;
        };
        let (result, _) = tokio::join!(session, controller);
        match result {
            Ok(SessionEnd::Lost) | Err(ClientError::ConnectionLost(_)) => {}
            other => panic!("expected a lost connection, got {:?}", other),
        }
    }
    manager.on_disconnected(Some(Duration::ZERO));

    // then: the next session re-joins auction 7 with no user command at all
    {
        let session = run_session(&mut manager, &mut dispatcher, &mut command_rx);
        let registry = registry.clone();
        let command_tx = command_tx.clone();
        let controller = async move {
            wait_until(|| {
                let registry = registry.clone();
                async move { registry.room_member_count(7).await == Some(1) }
            })
            .await;
            command_tx.send(Command::Quit).expect("send quit");
        };
        let (result, _) = tokio::join!(session, controller);
        assert!(matches!(result, Ok(SessionEnd::Quit)));
    }

    // Both sessions received a fresh subscription confirmation.
    assert_eq!(display.event_count_containing("auction 7"), 2);
}

#[tokio::test]
async fn test_identified_client_receives_its_notification_end_to_end() {
    // given: a client identified as user 7 and watching auction 42
    let (addr, registry, _server) = start_server().await;
    let hub = AuctionHub::new(registry.clone(), Arc::new(SystemClock));
    let display = RecordingDisplay::new();
    let mut manager = ClientConnectionManager::new(format!("ws://{}/ws", addr));
    manager.set_identity(7);
    manager.request_join(42);
    let mut dispatcher = ClientMessageDispatcher::new(Some(7), display.clone());
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();

    let payload = NotificationPayload {
        user_id: 7,
        kind: "outbid".to_string(),
        listing_id: Some(42),
        message: "You have been outbid".to_string(),
    };

    // when: the notification generator targets user 7
    let session = run_session(&mut manager, &mut dispatcher, &mut command_rx);
    let expected = payload.clone();
    let display_for_controller = display.clone();
    let controller = async move {
        let registry_for_wait = registry.clone();
        wait_until(move || {
            let registry = registry_for_wait.clone();
            async move { registry.user_snapshot(7).await.len() == 1 }
        })
        .await;
        let delivered = hub.notify_user(7, expected).await;
        assert_eq!(delivered, 1);
        wait_until(move || {
            let display = display_for_controller.clone();
            async move { !display.notifications.lock().unwrap().is_empty() }
        })
        .await;
        command_tx.send(Command::Quit).expect("send quit");
    };
    let (result, _) = tokio::join!(session, controller);

    // then:
    assert!(matches!(result, Ok(SessionEnd::Quit)));
    assert_eq!(
        display.notifications.lock().unwrap().as_slice(),
        &[payload]
    );
}
