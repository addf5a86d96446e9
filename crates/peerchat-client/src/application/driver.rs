//! The single event loop that drives a [`ChatSession`].
//!
//! Three sources feed the loop:
//!
//! - [`SessionEvent`]s pushed by the signaling and link adapters,
//! - [`Command`]s typed by the user,
//! - the reconnect deadline held by the session's timer.
//!
//! Because only this loop touches the session, there is no locking around
//! session state.  File reads and writes for `/file` and `/save` happen here
//! too, so the session itself stays free of disk I/O.

use std::path::{Path, PathBuf};

use peerchat_core::{decode_data_uri, DataUriError, MessageKind, MessageLog};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::events::{SessionEventReceiver, UiEvent, UiEventSender};
use super::ports::SignalingNetwork;
use super::session::{ChatSession, FileAttachment};

/// A user request for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dial the peer with this id.
    Connect(String),
    SendText(String),
    /// Read this file and send it whole.
    SendFile(PathBuf),
    /// Save the file message at `index` (zero-based) into `dir`, or into the
    /// default download directory.
    SaveFile { index: usize, dir: Option<PathBuf> },
    /// Close the current peer connection.
    Disconnect,
    Quit,
}

pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Errors from saving a received file to disk.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("there is no message #{0}")]
    NoSuchMessage(usize),

    #[error("message #{0} is not a file")]
    NotAFile(usize),

    #[error("could not decode file contents: {0}")]
    Decode(#[from] DataUriError),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the session until the user quits or the command channel closes.
///
/// The session is torn down before it is returned, so the caller only gets
/// it back to inspect the final log.
pub async fn run_session<S: SignalingNetwork>(
    mut session: ChatSession<S>,
    mut events: SessionEventReceiver,
    mut commands: CommandReceiver,
    ui: UiEventSender,
    download_dir: PathBuf,
) -> ChatSession<S> {
    loop {
        let deadline = session.reconnect_deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => session.handle(event),
                None => {
                    warn!("network event channel closed");
                    break;
                }
            },
            command = commands.recv() => match command {
                None | Some(Command::Quit) => break,
                Some(command) => apply(&mut session, command, &ui, &download_dir).await,
            },
            _ = wait_until(deadline) => session.fire_reconnect(Instant::now()),
        }
    }

    info!("shutting down session");
    session.teardown();
    session
}

/// Sleeps until `deadline`, or forever if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn apply<S: SignalingNetwork>(
    session: &mut ChatSession<S>,
    command: Command,
    ui: &UiEventSender,
    download_dir: &Path,
) {
    debug!("command: {command:?}");
    let result = match command {
        Command::Connect(target) => session.connect_to(&target),
        Command::SendText(text) => session.send_text(&text),
        Command::SendFile(path) => match read_attachment(&path).await {
            Ok(attachment) => session.send_file(attachment),
            Err(e) => {
                status(ui, format!("could not read {}: {e}", path.display()));
                return;
            }
        },
        Command::SaveFile { index, dir } => {
            let dir = dir.unwrap_or_else(|| download_dir.to_path_buf());
            match save_attachment(session.log(), index, &dir).await {
                Ok(path) => status(ui, format!("saved {}", path.display())),
                Err(e) => status(ui, e.to_string()),
            }
            return;
        }
        Command::Disconnect => {
            session.disconnect();
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        status(ui, e.to_string());
    }
}

fn status(ui: &UiEventSender, text: String) {
    let _ = ui.send(UiEvent::Status(text));
}

/// Reads the whole file at `path`.
async fn read_attachment(path: &Path) -> std::io::Result<FileAttachment> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    Ok(FileAttachment::new(name, bytes))
}

/// Decodes the file message at `index` and writes it into `dir`.
///
/// Only the final path component of the sender-supplied name is used.
///
/// # Errors
///
/// See [`SaveError`].
pub async fn save_attachment(
    log: &MessageLog,
    index: usize,
    dir: &Path,
) -> Result<PathBuf, SaveError> {
    let message = log.get(index).ok_or(SaveError::NoSuchMessage(index + 1))?;
    let info = match (&message.kind, &message.file_info) {
        (MessageKind::File, Some(info)) => info,
        _ => return Err(SaveError::NotAFile(index + 1)),
    };
    let decoded = decode_data_uri(&message.content)?;

    let name = Path::new(&info.name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    let path = dir.join(name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SaveError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, &decoded.bytes)
        .await
        .map_err(|source| SaveError::Io {
            path: path.clone(),
            source,
        })?;
    info!("saved {} bytes to {}", decoded.bytes.len(), path.display());
    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use peerchat_core::{ChatMessage, FileInfo, PeerIdentity};

    use super::*;
    use crate::application::events::SessionEvent;
    use crate::domain::ReconnectPolicy;
    use crate::infrastructure::mock::{MockLink, MockSignaling};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("peerchat-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn file_log(name: &str, content: &str) -> MessageLog {
        let bob = PeerIdentity::parse("Bob").unwrap();
        let mut log = MessageLog::new();
        log.push(ChatMessage::text(&bob, "hi"));
        log.push(ChatMessage::file(
            &bob,
            content,
            FileInfo {
                name: name.to_string(),
                size: 2,
                mime_type: "text/plain".to_string(),
            },
        ));
        log
    }

    #[tokio::test]
    async fn test_save_attachment_writes_decoded_bytes() {
        // Arrange
        let dir = temp_dir("save");
        let log = file_log("hi.txt", "data:text/plain;base64,aGk=");

        // Act
        let path = save_attachment(&log, 1, &dir).await.unwrap();

        // Assert
        assert_eq!(path, dir.join("hi.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hi");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_save_attachment_strips_directories_from_sender_name() {
        let dir = temp_dir("traversal");
        let log = file_log("../../etc/evil.txt", "data:text/plain;base64,aGk=");

        let path = save_attachment(&log, 1, &dir).await.unwrap();

        assert_eq!(path, dir.join("evil.txt"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_save_attachment_rejects_text_and_missing_messages() {
        let dir = temp_dir("reject");
        let log = file_log("hi.txt", "data:text/plain;base64,aGk=");

        assert!(matches!(
            save_attachment(&log, 0, &dir).await,
            Err(SaveError::NotAFile(1))
        ));
        assert!(matches!(
            save_attachment(&log, 7, &dir).await,
            Err(SaveError::NoSuchMessage(8))
        ));
    }

    #[test]
    fn test_save_attachment_reports_corrupt_content() {
        let log = file_log("hi.txt", "not a data uri");

        let result = tokio_test::block_on(save_attachment(&log, 1, &temp_dir("corrupt")));

        assert!(matches!(result, Err(SaveError::Decode(DataUriError::MissingScheme))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_fires_reconnect_when_deadline_passes() {
        // Arrange
        let signaling = MockSignaling::new();
        let (ui_tx, _ui_rx) = mpsc::unbounded_channel();
        let mut session = ChatSession::new(
            PeerIdentity::parse("Alice").unwrap(),
            signaling.clone(),
            ReconnectPolicy::default(),
            ui_tx.clone(),
        );
        session.start().unwrap();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(
            session,
            event_rx,
            command_rx,
            ui_tx,
            PathBuf::from("."),
        ));

        // Act
        event_tx.send(SessionEvent::SignalingDisconnected).unwrap();
        tokio::time::sleep(Duration::from_millis(2100)).await;

        // Assert
        assert_eq!(signaling.state().reconnects, 1);
        command_tx.send(Command::Quit).unwrap();
        let session = task.await.unwrap();
        assert!(session.is_torn_down());
        assert!(signaling.state().destroyed);
    }

    #[tokio::test]
    async fn test_loop_routes_commands_to_the_session() {
        // Arrange
        let signaling = MockSignaling::new();
        let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
        let mut session = ChatSession::new(
            PeerIdentity::parse("Alice").unwrap(),
            signaling.clone(),
            ReconnectPolicy::default(),
            ui_tx.clone(),
        );
        session.start().unwrap();
        session.handle(SessionEvent::SignalingOpened { id: "Alice".into() });
        let bob = MockLink::new("dc_bob", "Bob");
        session.handle(SessionEvent::Offer(Box::new(bob.clone())));
        session.handle(SessionEvent::LinkOpened { link: bob.id().clone() });
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        // Act
        command_tx.send(Command::SendText("hello".into())).unwrap();
        command_tx.send(Command::SendText("   ".into())).unwrap();
        command_tx.send(Command::Disconnect).unwrap();
        command_tx.send(Command::Quit).unwrap();
        let session = run_session(session, event_rx, command_rx, ui_tx, PathBuf::from(".")).await;

        // Assert
        assert_eq!(bob.sent().len(), 1);
        assert!(bob.is_closed());
        assert_eq!(session.log().len(), 1);
        let mut statuses = Vec::new();
        while let Ok(event) = ui_rx.try_recv() {
            if let UiEvent::Status(text) = event {
                statuses.push(text);
            }
        }
        assert_eq!(statuses, vec!["message must not be empty".to_string()]);
    }

    #[tokio::test]
    async fn test_send_file_command_reports_unreadable_path() {
        let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            PeerIdentity::parse("Alice").unwrap(),
            MockSignaling::new(),
            ReconnectPolicy::default(),
            ui_tx.clone(),
        );
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        command_tx
            .send(Command::SendFile(PathBuf::from("/definitely/not/here.bin")))
            .unwrap();
        command_tx.send(Command::Quit).unwrap();
        run_session(session, event_rx, command_rx, ui_tx, PathBuf::from(".")).await;

        let mut saw_error = false;
        while let Ok(event) = ui_rx.try_recv() {
            if let UiEvent::Status(text) = event {
                saw_error |= text.starts_with("could not read /definitely/not/here.bin");
            }
        }
        assert!(saw_error);
    }
}
