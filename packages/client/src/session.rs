//! One connection attempt, from handshake to teardown.

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use gavel_shared::heartbeat::CLIENT_PING_INTERVAL;
use gavel_shared::protocol::{ClientMessage, ServerMessage};

use crate::dispatch::{ClientMessageDispatcher, NotificationDisplay};
use crate::error::ClientError;
use crate::formatter::MessageFormatter;
use crate::manager::ClientConnectionManager;
use crate::prompt::Command;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// How a session ended, when it ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked to exit; do not reconnect.
    Quit,
    /// The connection dropped; the caller schedules a reconnect.
    Lost,
}

/// Run a single session: connect, replay desired state, then pump frames,
/// pings, and prompt commands until the connection dies or the user quits.
pub async fn run_session<D: NotificationDisplay>(
    manager: &mut ClientConnectionManager,
    dispatcher: &mut ClientMessageDispatcher<D>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> Result<SessionEnd, ClientError> {
    manager.mark_connecting();

    let (ws_stream, _response) = connect_async(manager.url())
        .await
        .map_err(|e| ClientError::Connect(e.to_string()))?;
    manager.mark_connected();
    tracing::info!("Connected to {}", manager.url());
    dispatcher
        .display()
        .event(MessageFormatter::format_connection_status(
            manager.quality(),
        ));

    let (mut write, mut read) = ws_stream.split();

    // Replay desired state: the server forgot us the moment the previous
    // connection died, so identity and subscription are re-established here
    // without user action.
    let desired = manager.desired();
    if let Some(user_id) = desired.user_id {
        dispatcher.set_identity(user_id);
        send_frame(&mut write, &ClientMessage::IdentifyUser { user_id }).await?;
    }
    if let Some(listing_id) = desired.listing_id {
        send_frame(
            &mut write,
            &ClientMessage::JoinAuction {
                listing_id,
                user_id: desired.user_id,
            },
        )
        .await?;
    }

    // The ping timer is our own clock; pong arrival never resets it.
    let mut ping = tokio::time::interval(CLIENT_PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(msg) => dispatcher.dispatch(msg),
                        Err(e) => tracing::warn!("Discarding unparseable frame: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    return Ok(SessionEnd::Lost);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
            },

            _ = ping.tick() => {
                send_frame(&mut write, &ClientMessage::Ping).await?;
            }

            command = commands.recv() => match command {
                None => {
                    // Prompt thread gone; treat as exit.
                    return Ok(SessionEnd::Quit);
                }
                Some(Command::Join(listing_id)) => {
                    manager.request_join(listing_id);
                    send_frame(
                        &mut write,
                        &ClientMessage::JoinAuction {
                            listing_id,
                            user_id: manager.desired().user_id,
                        },
                    )
                    .await?;
                }
                Some(Command::Leave) => {
                    manager.request_leave();
                    send_frame(&mut write, &ClientMessage::LeaveAuction).await?;
                }
                Some(Command::Identify(user_id)) => {
                    manager.set_identity(user_id);
                    dispatcher.set_identity(user_id);
                    send_frame(&mut write, &ClientMessage::IdentifyUser { user_id }).await?;
                }
                Some(Command::Status) => {
                    let status = MessageFormatter::format_connection_status(manager.quality());
                    let listing_line = manager.desired().listing_id.and_then(|listing_id| {
                        dispatcher.cache().get(listing_id).map(|snapshot| {
                            MessageFormatter::format_bid_update(
                                listing_id,
                                snapshot.current_bid,
                                snapshot.bid_count,
                                snapshot.is_hot,
                            )
                        })
                    });
                    dispatcher.display().event(status);
                    if let Some(line) = listing_line {
                        dispatcher.display().event(line);
                    }
                }
                Some(Command::Quit) => {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(SessionEnd::Quit);
                }
            },
        }
    }
}

async fn send_frame(write: &mut WsWriter, msg: &ClientMessage) -> Result<(), ClientError> {
    let json =
        serde_json::to_string(msg).map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::ConnectionLost(e.to_string()))
}
