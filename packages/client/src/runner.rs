//! Client execution loop: sessions, reconnects, backoff.

use std::time::Instant;

use tokio::sync::mpsc;

use gavel_shared::protocol::{ListingId, UserId};

use crate::dispatch::{ClientMessageDispatcher, NotificationDisplay};
use crate::error::ClientError;
use crate::formatter::MessageFormatter;
use crate::manager::ClientConnectionManager;
use crate::prompt::spawn_prompt_thread;
use crate::session::{SessionEnd, run_session};
use crate::ui::TerminalDisplay;

/// Run the auction watcher until the user quits.
///
/// One manager instance owns the connection for the whole process lifetime;
/// it carries the desired identity/subscription across reconnects and
/// schedules each retry with exponential backoff.
pub async fn run_client(
    url: String,
    user_id: Option<UserId>,
    listing_id: Option<ListingId>,
) -> Result<(), ClientError> {
    let mut manager = ClientConnectionManager::new(url);
    if let Some(user_id) = user_id {
        manager.set_identity(user_id);
    }
    if let Some(listing_id) = listing_id {
        manager.request_join(listing_id);
    }

    let prompt_label = user_id.map_or_else(|| "watch".to_string(), |id| format!("user:{}", id));
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let _prompt_thread = spawn_prompt_thread(prompt_label.clone(), command_tx);

    let mut dispatcher =
        ClientMessageDispatcher::new(user_id, TerminalDisplay::new(prompt_label));

    println!("\nCommands: join <listing>, leave, id <user>, status, quit\n");

    loop {
        tracing::info!("Connecting to {}", manager.url());

        let started = Instant::now();
        let result = run_session(&mut manager, &mut dispatcher, &mut command_rx).await;

        match result {
            Ok(SessionEnd::Quit) => {
                tracing::info!("Session ended by user");
                manager.on_disconnected(Some(started.elapsed()));
                break;
            }
            Ok(SessionEnd::Lost) => {
                manager.on_disconnected(Some(started.elapsed()));
            }
            Err(ClientError::Connect(reason)) => {
                tracing::warn!("Connection attempt failed: {}", reason);
                manager.on_disconnected(None);
            }
            Err(ClientError::ConnectionLost(reason)) => {
                tracing::warn!("Connection lost: {}", reason);
                manager.on_disconnected(Some(started.elapsed()));
            }
        }

        // While disconnected the cached state stays on screen; no error UI,
        // no manual retry.
        let delay = manager.reconnect_delay();
        dispatcher
            .display()
            .event(MessageFormatter::format_connection_status(
                manager.quality(),
            ));
        tracing::info!("Reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }

    Ok(())
}
