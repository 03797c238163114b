//! Terminal output for the watcher.

use std::io::Write;

use gavel_shared::protocol::NotificationPayload;

use crate::dispatch::NotificationDisplay;

/// Redisplay the prompt after printing over it.
pub fn redisplay_prompt(label: &str) {
    print!("{}> ", label);
    std::io::stdout().flush().ok();
}

/// [`NotificationDisplay`] writing to stdout, interleaved with the readline
/// prompt.
pub struct TerminalDisplay {
    prompt_label: String,
}

impl TerminalDisplay {
    pub fn new(prompt_label: String) -> Self {
        Self { prompt_label }
    }
}

impl NotificationDisplay for TerminalDisplay {
    fn notification(&mut self, payload: &NotificationPayload) {
        // The formatted alert line went through `event`; this hook is where a
        // richer frontend would raise a system notification.
        tracing::info!("Notification [{}]: {}", payload.kind, payload.message);
    }

    fn event(&mut self, line: String) {
        print!("{}", line);
        redisplay_prompt(&self.prompt_label);
    }
}
