use chrono::{DateTime, Local, Utc};
use std::io::Write;

use crate::connection::ConnectionStatus;

/// Everything the session can ask a front end to show.
pub trait ChatView {
    fn status(&mut self, status: ConnectionStatus);
    fn system(&mut self, message: &str, timestamp: DateTime<Utc>);
    fn chat(&mut self, sender: &str, message: &str, timestamp: DateTime<Utc>);
    fn user_count(&mut self, count: usize);
    /// Replaces the typing indicator; an empty summary hides it.
    fn typing(&mut self, summary: &str);
}

pub fn format_user_count(count: usize) -> String {
    if count == 1 {
        "1 user online".to_string()
    } else {
        format!("{} users online", count)
    }
}

pub fn format_clock(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Line-oriented renderer for a plain terminal.
pub struct TerminalView<W: Write> {
    out: W,
    last_typing: String,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_typing: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn status(&mut self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Connecting => self.line("-- connecting..."),
            ConnectionStatus::Connected => self.line("-- connected, type a message and press enter"),
            ConnectionStatus::Disconnected => {
                self.last_typing.clear();
                self.line("-- Disconnected");
            }
        }
    }

    fn system(&mut self, message: &str, timestamp: DateTime<Utc>) {
        self.line(&format!("[{}] * {}", format_clock(timestamp), message));
    }

    fn chat(&mut self, sender: &str, message: &str, timestamp: DateTime<Utc>) {
        self.line(&format!("[{}] {}: {}", format_clock(timestamp), sender, message));
    }

    fn user_count(&mut self, count: usize) {
        self.line(&format!("-- {}", format_user_count(count)));
    }

    fn typing(&mut self, summary: &str) {
        if summary == self.last_typing {
            return;
        }
        self.last_typing = summary.to_string();
        if !summary.is_empty() {
            self.line(&format!("   {}", summary));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn test_user_count_wording() {
        assert_eq!(format_user_count(1), "1 user online");
        assert_eq!(format_user_count(0), "0 users online");
        assert_eq!(format_user_count(12), "12 users online");
    }

    #[test]
    fn test_chat_line_contains_sender_and_message() {
        let mut view = TerminalView::new(Vec::new());
        view.chat("Client 2", "hello", Utc::now());
        let out = rendered(view);
        assert!(out.contains("] Client 2: hello"), "got {:?}", out);
    }

    #[test]
    fn test_typing_indicator_only_redrawn_on_change() {
        let mut view = TerminalView::new(Vec::new());
        view.typing("Client 1 is typing...");
        view.typing("Client 1 is typing...");
        view.typing("");
        view.typing("");
        let out = rendered(view);
        assert_eq!(out.matches("Client 1 is typing...").count(), 1);
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_disconnected_status() {
        let mut view = TerminalView::new(Vec::new());
        view.status(ConnectionStatus::Disconnected);
        assert_eq!(rendered(view), "-- Disconnected\n");
    }
}
