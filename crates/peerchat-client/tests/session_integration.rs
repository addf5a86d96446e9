//! End-to-end session flows through `run_session` with the recording mocks.
//!
//! Each test plays the network side by pushing `SessionEvent`s, types
//! commands like the terminal would, and watches the resulting UI events.

use std::path::PathBuf;
use std::time::Duration;

use peerchat_client::application::driver::Command;
use peerchat_client::application::events::{
    Notification, SessionEvent, SessionEventSender, UiEvent, UiEventReceiver,
};
use peerchat_client::application::{run_session, ChatSession, ConnectionState};
use peerchat_client::domain::ReconnectPolicy;
use peerchat_client::infrastructure::mock::{MockLink, MockSignaling};
use peerchat_core::{decode_frame, encode_payload, ChatMessage, MessageKind, PeerIdentity};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Harness {
    signaling: MockSignaling,
    events: SessionEventSender,
    commands: mpsc::UnboundedSender<Command>,
    ui: UiEventReceiver,
    task: JoinHandle<ChatSession<MockSignaling>>,
}

fn start(download_dir: PathBuf) -> Harness {
    let signaling = MockSignaling::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let alice = PeerIdentity::parse("Alice").unwrap();
    let mut session = ChatSession::new(alice, signaling.clone(), ReconnectPolicy::default(), ui_tx.clone());
    session.start().unwrap();
    let task = tokio::spawn(run_session(session, events_rx, commands_rx, ui_tx, download_dir));

    Harness {
        signaling,
        events: events_tx,
        commands: commands_tx,
        ui: ui_rx,
        task,
    }
}

impl Harness {
    /// Waits for the first UI event matching `pred`, skipping others.
    async fn expect(&mut self, what: &str, pred: impl Fn(&UiEvent) -> bool) -> UiEvent {
        loop {
            let event = timeout(Duration::from_secs(5), self.ui.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
                .unwrap_or_else(|| panic!("UI channel closed waiting for {what}"));
            if pred(&event) {
                return event;
            }
        }
    }

    async fn expect_state(&mut self, state: ConnectionState) {
        self.expect(state.as_str(), |e| {
            matches!(e, UiEvent::ConnectionStateChanged { state: s, .. } if *s == state)
        })
        .await;
    }

    async fn expect_message(&mut self) -> (usize, ChatMessage) {
        match self
            .expect("appended message", |e| matches!(e, UiEvent::MessageAppended { .. }))
            .await
        {
            UiEvent::MessageAppended { index, message } => (index, message),
            _ => unreachable!(),
        }
    }

    async fn expect_status(&mut self) -> String {
        match self.expect("status", |e| matches!(e, UiEvent::Status(_))).await {
            UiEvent::Status(text) => text,
            _ => unreachable!(),
        }
    }

    fn send(&self, event: SessionEvent) {
        self.events.send(event).unwrap();
    }

    fn command(&self, command: Command) {
        self.commands.send(command).unwrap();
    }

    /// Goes online and opens a link to Bob.
    async fn connect_to_bob(&mut self) -> MockLink {
        self.send(SessionEvent::SignalingOpened { id: "Alice".into() });
        self.expect_state(ConnectionState::Online).await;

        self.command(Command::Connect("Bob".into()));
        self.expect_state(ConnectionState::Connecting).await;
        let link = self.signaling.last_link().expect("connect created a link");

        self.send(SessionEvent::LinkOpened { link: link.id().clone() });
        self.expect_state(ConnectionState::Connected).await;
        link
    }

    async fn quit(self) -> ChatSession<MockSignaling> {
        self.command(Command::Quit);
        timeout(Duration::from_secs(5), self.task)
            .await
            .expect("session stops after quit")
            .expect("session task did not panic")
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("peerchat-it-{name}-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_chat_round_trip_with_one_peer() {
    // Arrange
    let mut h = start(scratch_dir("chat"));
    let link = h.connect_to_bob().await;

    // Act: Alice types, Bob answers.
    h.command(Command::SendText("hello".into()));
    let (sent_index, sent) = h.expect_message().await;

    let bob = PeerIdentity::parse("Bob").unwrap();
    let reply = encode_payload(&ChatMessage::text(&bob, "hi Alice")).unwrap();
    h.send(SessionEvent::LinkData {
        link: link.id().clone(),
        payload: reply,
    });
    let (received_index, received) = h.expect_message().await;

    // Assert
    assert_eq!((sent_index, sent.content.as_str(), sent.sender.as_str()), (0, "hello", "Alice"));
    assert_eq!((received_index, received.content.as_str()), (1, "hi Alice"));

    let frames = link.sent();
    assert_eq!(frames.len(), 1);
    let on_wire = decode_frame(&frames[0]).unwrap();
    assert_eq!(on_wire, sent);

    let session = h.quit().await;
    assert_eq!(session.log().len(), 2);
    assert!(session.is_torn_down());
}

#[tokio::test]
async fn test_unrecognised_payload_leaves_log_unchanged() {
    let mut h = start(scratch_dir("garbage"));
    let link = h.connect_to_bob().await;

    h.send(SessionEvent::LinkData {
        link: link.id().clone(),
        payload: r#"{"content":"no type"}"#.into(),
    });
    h.send(SessionEvent::LinkData {
        link: link.id().clone(),
        payload: "not json at all".into(),
    });
    h.command(Command::SendText("still here".into()));
    let (index, _) = h.expect_message().await;

    assert_eq!(index, 0);
    let session = h.quit().await;
    assert_eq!(session.log().len(), 1);
}

#[tokio::test]
async fn test_file_is_sent_whole_and_can_be_saved() {
    // Arrange
    let source_dir = scratch_dir("file-src");
    std::fs::create_dir_all(&source_dir).unwrap();
    let source = source_dir.join("notes.txt");
    std::fs::write(&source, b"line one\nline two\n").unwrap();
    let downloads = scratch_dir("file-dst");

    let mut h = start(downloads.clone());
    let link = h.connect_to_bob().await;

    // Act
    h.command(Command::SendFile(source.clone()));
    let (index, message) = h.expect_message().await;
    h.command(Command::SaveFile { index, dir: None });
    let status = h.expect_status().await;

    // Assert
    assert_eq!(message.kind, MessageKind::File);
    let info = message.file_info.as_ref().unwrap();
    assert_eq!(info.name, "notes.txt");
    assert_eq!(info.size, 18);
    assert_eq!(info.mime_type, "text/plain");
    assert!(message.content.starts_with("data:text/plain;base64,"));
    assert_eq!(link.sent().len(), 1);

    let saved = downloads.join("notes.txt");
    assert!(status.contains("saved"), "{status}");
    assert_eq!(std::fs::read(&saved).unwrap(), b"line one\nline two\n");

    h.quit().await;
    let _ = std::fs::remove_dir_all(source_dir);
    let _ = std::fs::remove_dir_all(downloads);
}

#[tokio::test]
async fn test_missing_file_reports_status_and_sends_nothing() {
    let mut h = start(scratch_dir("missing"));
    let link = h.connect_to_bob().await;

    h.command(Command::SendFile(PathBuf::from("/definitely/not/here.bin")));
    let status = h.expect_status().await;

    assert!(status.starts_with("could not read"), "{status}");
    assert!(link.sent().is_empty());
    h.quit().await;
}

#[tokio::test]
async fn test_remote_close_returns_to_online() {
    let mut h = start(scratch_dir("close"));
    let link = h.connect_to_bob().await;

    h.send(SessionEvent::LinkClosed { link: link.id().clone() });
    let toast = h
        .expect("disconnect notification", |e| matches!(e, UiEvent::Notification(_)))
        .await;
    h.expect_state(ConnectionState::Online).await;

    assert_eq!(
        toast,
        UiEvent::Notification(Notification::info("Disconnected", "The peer has disconnected"))
    );
    h.command(Command::SendText("anyone?".into()));
    let status = h.expect_status().await;
    assert!(!status.is_empty());
    h.quit().await;
}

#[tokio::test(start_paused = true)]
async fn test_lost_signaling_reconnects_after_delay() {
    // Arrange
    let mut h = start(scratch_dir("reconnect"));
    h.send(SessionEvent::SignalingOpened { id: "Alice".into() });
    h.expect_state(ConnectionState::Online).await;

    // Act
    h.signaling.set_disconnected(true);
    h.send(SessionEvent::SignalingDisconnected);
    h.expect_state(ConnectionState::Reconnecting).await;
    assert_eq!(h.signaling.state().reconnects, 0);

    tokio::time::sleep(ReconnectPolicy::default().after_disconnect + Duration::from_millis(10)).await;

    // Assert
    assert_eq!(h.signaling.state().reconnects, 1);
    h.signaling.set_disconnected(false);
    h.send(SessionEvent::SignalingOpened { id: "Alice".into() });
    h.expect_state(ConnectionState::Online).await;

    let session = h.quit().await;
    assert!(session.pending_reconnect().is_none());
}

#[tokio::test]
async fn test_quit_releases_signaling() {
    let h = start(scratch_dir("quit"));
    let signaling = h.signaling.clone();

    let session = h.quit().await;

    assert!(session.is_torn_down());
    assert!(signaling.state().destroyed);
    assert_eq!(signaling.state().registered.len(), 1);
}
