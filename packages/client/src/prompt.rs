//! Interactive command prompt.
//!
//! Rustyline is synchronous, so it runs on a dedicated thread and feeds
//! parsed commands into the session over a channel. The thread outlives
//! individual sessions; commands typed while disconnected still land in the
//! channel and update desired state.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use gavel_shared::protocol::{ListingId, UserId};

/// A command typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Join(ListingId),
    Leave,
    Identify(UserId),
    Status,
    Quit,
}

/// Parse one input line into a command.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let word = parts.next().unwrap_or("");
    let arg = parts.next();

    match (word, arg) {
        ("join", Some(value)) => value
            .parse::<ListingId>()
            .map(Command::Join)
            .map_err(|_| format!("'{}' is not a listing id", value)),
        ("join", None) => Err("usage: join <listing-id>".to_string()),
        ("leave", _) => Ok(Command::Leave),
        ("id" | "identify", Some(value)) => value
            .parse::<UserId>()
            .map(Command::Identify)
            .map_err(|_| format!("'{}' is not a user id", value)),
        ("id" | "identify", None) => Err("usage: id <user-id>".to_string()),
        ("status", _) => Ok(Command::Status),
        ("quit" | "exit", _) => Ok(Command::Quit),
        _ => Err(format!(
            "unknown command '{}' (try: join <id>, leave, id <user>, status, quit)",
            word
        )),
    }
}

/// Spawn the blocking readline thread. The thread ends when the channel
/// closes or the user quits.
pub fn spawn_prompt_thread(
    label: String,
    tx: mpsc::UnboundedSender<Command>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", label);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    match parse_command(line) {
                        Ok(command) => {
                            let quit = command == Command::Quit;
                            if tx.send(command).is_err() || quit {
                                break;
                            }
                        }
                        Err(message) => eprintln!("{}", message),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = tx.send(Command::Quit);
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    })
}
