//! Terminal front end: parses typed lines and renders [`UiEvent`]s.
//!
//! Only this module knows what the chat looks like on screen.  It turns input
//! lines into [`UserInput`] values and turns every UI event into one printable
//! line; `main.rs` does the actual reading and writing.
//!
//! # Commands
//!
//! ```text
//! /connect <peer-id>   open a connection to another peer
//! /disconnect          close the current connection
//! /file <path>         send a file
//! /save <n> [dir]      save file message #n to disk
//! /theme               toggle dark/light colours
//! /state               show the connection state
//! /help                list commands
//! /quit                leave
//! anything else        send as a text message
//! ```
//!
//! Messages are numbered from 1 on screen so `/save 3` refers to the third
//! line shown; the command it produces uses the zero-based log index.

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use peerchat_core::{file_type_icon, format_file_size, ChatMessage, MessageKind, PeerIdentity, ThemePreference};

use crate::application::driver::Command;
use crate::application::events::{Notification, Severity, UiEvent};
use crate::application::session::ConnectionState;

pub const HELP: &str = "\
Commands:
  /connect <peer-id>   open a connection to another peer
  /disconnect          close the current connection
  /file <path>         send a file
  /save <n> [dir]      save file message #n to disk
  /theme               toggle dark/light colours
  /state               show the connection state
  /help                show this list
  /quit                leave
Anything else is sent as a text message.";

// ── Input ─────────────────────────────────────────────────────────────────────

/// What one typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Forward to the session driver.
    Command(Command),
    ToggleTheme,
    ShowState,
    Help,
    /// A blank line.
    Empty,
    /// A line that looked like a command but was not usable.
    Invalid(String),
}

/// Parses one line of terminal input.
pub fn parse_input(line: &str) -> UserInput {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return UserInput::Empty;
    }
    if !line.starts_with('/') {
        return UserInput::Command(Command::SendText(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name {
        "/connect" if rest.is_empty() => UserInput::Invalid("usage: /connect <peer-id>".into()),
        "/connect" => UserInput::Command(Command::Connect(rest.to_string())),
        "/disconnect" => UserInput::Command(Command::Disconnect),
        "/file" if rest.is_empty() => UserInput::Invalid("usage: /file <path>".into()),
        "/file" => UserInput::Command(Command::SendFile(PathBuf::from(rest))),
        "/save" => parse_save(rest),
        "/theme" => UserInput::ToggleTheme,
        "/state" => UserInput::ShowState,
        "/help" => UserInput::Help,
        "/quit" | "/exit" => UserInput::Command(Command::Quit),
        other => UserInput::Invalid(format!("unknown command {other}; type /help for a list")),
    }
}

fn parse_save(rest: &str) -> UserInput {
    const USAGE: &str = "usage: /save <n> [dir]";
    let (number, dir) = match rest.split_once(char::is_whitespace) {
        Some((number, dir)) => (number, Some(PathBuf::from(dir.trim()))),
        None => (rest, None),
    };
    match number.parse::<usize>() {
        Ok(n) if n >= 1 => UserInput::Command(Command::SaveFile { index: n - 1, dir }),
        _ => UserInput::Invalid(USAGE.into()),
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// ANSI colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    own: &'static str,
    peer: &'static str,
    muted: &'static str,
    error: &'static str,
    reset: &'static str,
}

const NO_COLOUR: Palette = Palette {
    own: "",
    peer: "",
    muted: "",
    error: "",
    reset: "",
};

impl Palette {
    fn for_theme(theme: ThemePreference) -> Self {
        match theme {
            ThemePreference::Dark => Palette {
                own: "\x1b[96m",
                peer: "\x1b[93m",
                muted: "\x1b[90m",
                error: "\x1b[91m",
                reset: "\x1b[0m",
            },
            ThemePreference::Light => Palette {
                own: "\x1b[34m",
                peer: "\x1b[35m",
                muted: "\x1b[2m",
                error: "\x1b[31m",
                reset: "\x1b[0m",
            },
        }
    }
}

/// Turns UI events into printable lines and remembers what the status bar
/// needs (own name, state, peer).
#[derive(Debug, Clone)]
pub struct TerminalView {
    theme: ThemePreference,
    colour: bool,
    me: Option<PeerIdentity>,
    state: ConnectionState,
    peer: Option<PeerIdentity>,
}

impl TerminalView {
    /// A view that colours its output for `theme`.
    pub fn new(theme: ThemePreference) -> Self {
        Self {
            theme,
            colour: true,
            me: None,
            state: ConnectionState::Idle,
            peer: None,
        }
    }

    /// A view without escape codes, for pipes and tests.
    pub fn plain(theme: ThemePreference) -> Self {
        Self {
            colour: false,
            ..Self::new(theme)
        }
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemePreference) {
        self.theme = theme;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn palette(&self) -> Palette {
        if self.colour {
            Palette::for_theme(self.theme)
        } else {
            NO_COLOUR
        }
    }

    /// Renders `event` as one line, updating the remembered state.
    pub fn render(&mut self, event: &UiEvent) -> String {
        let p = self.palette();
        match event {
            UiEvent::IdentityChosen(id) => {
                self.me = Some(id.clone());
                format!("{}You are {id}. Share this name so others can /connect to you.{}", p.muted, p.reset)
            }
            UiEvent::ConnectionStateChanged { state, peer } => {
                self.state = *state;
                self.peer = peer.clone();
                format!("{}-- {} --{}", p.muted, self.state_line(), p.reset)
            }
            UiEvent::MessageAppended { index, message } => self.render_message(*index, message),
            UiEvent::Notification(notification) => render_notification(notification, p),
            UiEvent::Status(text) => format!("{}{text}{}", p.muted, p.reset),
        }
    }

    /// A one-line summary of the connection state.
    pub fn state_line(&self) -> String {
        let me = self.me.as_ref().map(PeerIdentity::as_str).unwrap_or("?");
        match (self.state, &self.peer) {
            (ConnectionState::Idle, _) => "offline".to_string(),
            (ConnectionState::Registering, _) => format!("registering as {me}"),
            (ConnectionState::Online, _) => format!("online as {me}"),
            (ConnectionState::Connecting, Some(peer)) => format!("connecting to {peer}"),
            (ConnectionState::Connected, Some(peer)) => format!("connected to {peer}"),
            (ConnectionState::Connecting, None) => "connecting".to_string(),
            (ConnectionState::Connected, None) => "connected".to_string(),
            (ConnectionState::Reconnecting, _) => "reconnecting to the signaling server".to_string(),
        }
    }

    fn render_message(&self, index: usize, message: &ChatMessage) -> String {
        let p = self.palette();
        let own = self
            .me
            .as_ref()
            .is_some_and(|me| message.is_from(me));
        let (colour, who) = if own {
            (p.own, "You")
        } else {
            (p.peer, message.sender.as_str())
        };
        let number = index + 1;
        let time = local_time(message.timestamp);

        let body = match (message.kind, &message.file_info) {
            (MessageKind::File, Some(info)) => format!(
                "{} {} ({}){}",
                file_type_icon(&info.name),
                info.name,
                format_file_size(info.size),
                if own {
                    String::new()
                } else {
                    format!("  {}/save {number} to download{}", p.muted, p.reset)
                }
            ),
            _ => message.content.clone(),
        };

        format!("{}[{time}] #{number}{} {colour}{who}{}: {body}", p.muted, p.reset, p.reset)
    }
}

fn render_notification(notification: &Notification, p: Palette) -> String {
    let (colour, tag) = match notification.severity {
        Severity::Info => (p.muted, "info"),
        Severity::Destructive => (p.error, "error"),
    };
    format!(
        "{colour}[{tag}] {}: {}{}",
        notification.title, notification.description, p.reset
    )
}

/// `HH:MM:SS` in local time for a millisecond Unix timestamp.
fn local_time(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use peerchat_core::FileInfo;

    use super::*;

    fn alice() -> PeerIdentity {
        PeerIdentity::parse("Alice").unwrap()
    }

    fn bob() -> PeerIdentity {
        PeerIdentity::parse("Bob").unwrap()
    }

    // ── parse_input ──

    #[test]
    fn test_plain_text_is_sent_as_typed() {
        assert_eq!(
            parse_input("  hello there \n"),
            UserInput::Command(Command::SendText("  hello there ".into()))
        );
    }

    #[test]
    fn test_blank_lines_are_empty() {
        assert_eq!(parse_input("\n"), UserInput::Empty);
        assert_eq!(parse_input("   "), UserInput::Empty);
    }

    #[test]
    fn test_connect_takes_the_peer_id() {
        assert_eq!(
            parse_input("/connect  Bob "),
            UserInput::Command(Command::Connect("Bob".into()))
        );
        assert!(matches!(parse_input("/connect"), UserInput::Invalid(_)));
    }

    #[test]
    fn test_save_numbers_are_one_based() {
        // Arrange / Act
        let first = parse_input("/save 1");
        let with_dir = parse_input("/save 3 /tmp/downloads");

        // Assert
        assert_eq!(
            first,
            UserInput::Command(Command::SaveFile { index: 0, dir: None })
        );
        assert_eq!(
            with_dir,
            UserInput::Command(Command::SaveFile {
                index: 2,
                dir: Some(PathBuf::from("/tmp/downloads")),
            })
        );
    }

    #[test]
    fn test_save_rejects_zero_and_garbage() {
        assert!(matches!(parse_input("/save 0"), UserInput::Invalid(_)));
        assert!(matches!(parse_input("/save x"), UserInput::Invalid(_)));
        assert!(matches!(parse_input("/save"), UserInput::Invalid(_)));
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(parse_input("/theme"), UserInput::ToggleTheme);
        assert_eq!(parse_input("/state"), UserInput::ShowState);
        assert_eq!(parse_input("/help"), UserInput::Help);
        assert_eq!(parse_input("/quit"), UserInput::Command(Command::Quit));
        assert_eq!(parse_input("/disconnect"), UserInput::Command(Command::Disconnect));
        assert_eq!(
            parse_input("/file ./a b.txt"),
            UserInput::Command(Command::SendFile(PathBuf::from("./a b.txt")))
        );
    }

    #[test]
    fn test_unknown_command_is_invalid() {
        assert!(matches!(
            parse_input("/dance"),
            UserInput::Invalid(msg) if msg.contains("/dance")
        ));
    }

    // ── TerminalView ──

    #[test]
    fn test_own_and_remote_text_messages() {
        // Arrange
        let mut view = TerminalView::plain(ThemePreference::Light);
        view.render(&UiEvent::IdentityChosen(alice()));

        // Act
        let mine = view.render(&UiEvent::MessageAppended {
            index: 0,
            message: ChatMessage::text(&alice(), "hi"),
        });
        let theirs = view.render(&UiEvent::MessageAppended {
            index: 1,
            message: ChatMessage::text(&bob(), "hello"),
        });

        // Assert
        assert!(mine.contains("#1 You: hi"), "{mine}");
        assert!(theirs.contains("#2 Bob: hello"), "{theirs}");
    }

    #[test]
    fn test_remote_file_shows_icon_size_and_save_hint() {
        let mut view = TerminalView::plain(ThemePreference::Light);
        view.render(&UiEvent::IdentityChosen(alice()));
        let message = ChatMessage::file(
            &bob(),
            "data:application/pdf;base64,AAAA",
            FileInfo {
                name: "report.pdf".into(),
                size: 1536,
                mime_type: "application/pdf".into(),
            },
        );

        let line = view.render(&UiEvent::MessageAppended { index: 4, message });

        assert!(line.contains("📄 report.pdf (1.5 KB)"), "{line}");
        assert!(line.contains("/save 5"), "{line}");
    }

    #[test]
    fn test_state_changes_are_tracked() {
        let mut view = TerminalView::plain(ThemePreference::Dark);
        view.render(&UiEvent::IdentityChosen(alice()));

        let online = view.render(&UiEvent::ConnectionStateChanged {
            state: ConnectionState::Online,
            peer: None,
        });
        let connected = view.render(&UiEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
            peer: Some(bob()),
        });

        assert_eq!(online, "-- online as Alice --");
        assert_eq!(connected, "-- connected to Bob --");
        assert_eq!(view.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_destructive_notifications_are_tagged_as_errors() {
        let mut view = TerminalView::plain(ThemePreference::Light);

        let line = view.render(&UiEvent::Notification(Notification::destructive(
            "Connection Error",
            "boom",
        )));

        assert_eq!(line, "[error] Connection Error: boom");
    }

    #[test]
    fn test_colour_follows_theme() {
        let mut dark = TerminalView::new(ThemePreference::Dark);
        let mut light = TerminalView::new(ThemePreference::Light);
        let event = UiEvent::Status("x".into());

        assert_ne!(dark.render(&event), light.render(&event));
        light.set_theme(ThemePreference::Dark);
        assert_eq!(dark.render(&event), light.render(&event));
    }

    #[test]
    fn test_out_of_range_timestamp_renders_placeholder() {
        assert_eq!(local_time(u64::MAX), "--:--:--");
    }
}
