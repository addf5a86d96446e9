//! peerchat: terminal peer-to-peer chat client.
//!
//! Registers a username with a PeerJS signaling server, then exchanges text
//! messages and files with one other peer over a WebRTC data channel.  The
//! other side can be another `peerchat` or any PeerJS web client using JSON
//! serialization.
//!
//! # Usage
//!
//! ```text
//! peerchat [OPTIONS]
//!
//! Options:
//!   --username <NAME>                  Skip the prompt and use NAME
//!   --generate                         Skip the prompt and use a random name
//!   --signaling-host <HOST>            [default: 0.peerjs.com]
//!   --signaling-port <PORT>            [default: 443]
//!   --signaling-path <PATH>            [default: /]
//!   --insecure                         Use ws:// instead of wss://
//!   --signaling-key <KEY>              [default: peerjs]
//!   --ping-interval <SECS>             [default: 5]
//!   --stun <URL>                       Repeatable; defaults to public STUN servers
//!   --error-reconnect-delay <SECS>     [default: 5]
//!   --disconnect-reconnect-delay <SECS> [default: 2]
//!   --download-dir <DIR>               [default: .]
//! ```
//!
//! # Environment variable overrides
//!
//! Every option can also be set with a `PEERCHAT_*` variable, e.g.
//! `PEERCHAT_USERNAME`, `PEERCHAT_SIGNALING_HOST`, `PEERCHAT_STUN` (comma
//! separated).  CLI args take precedence when both are present.  Log
//! verbosity follows `RUST_LOG` (default `info`); logs go to stderr.
//!
//! # Architecture overview
//!
//! ```text
//! stdin thread ──lines──▶ terminal loop ──Command──▶ run_session ◀──SessionEvent── PeerJsSignaling
//!                              ▲                          │                           WebRtcLink
//!                              └────────UiEvent───────────┘
//! ```

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use peerchat_client::application::driver::{Command, CommandSender};
use peerchat_client::application::events::UiEvent;
use peerchat_client::application::onboarding::{identity_from_flags, prompt_identity};
use peerchat_client::application::{run_session, ChatSession};
use peerchat_client::domain::{ClientConfig, ReconnectPolicy, SignalingConfig, DEFAULT_STUN_SERVERS};
use peerchat_client::infrastructure::signaling::PeerJsSignaling;
use peerchat_client::infrastructure::storage::PreferenceStore;
use peerchat_client::infrastructure::ui_bridge::{parse_input, TerminalView, UserInput, HELP};
use peerchat_core::ThemePreference;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Peer-to-peer chat over WebRTC data channels.
#[derive(Debug, Parser)]
#[command(name = "peerchat", about = "Peer-to-peer chat over WebRTC data channels", version)]
struct Cli {
    /// Username to register.  Skips the interactive prompt.
    #[arg(long, env = "PEERCHAT_USERNAME")]
    username: Option<String>,

    /// Register under a random `<Adjective><Noun><4 digits>` name.
    #[arg(long, env = "PEERCHAT_GENERATE")]
    generate: bool,

    /// Host name of the PeerJS signaling server.
    #[arg(long, default_value = "0.peerjs.com", env = "PEERCHAT_SIGNALING_HOST")]
    signaling_host: String,

    #[arg(long, default_value_t = 443, env = "PEERCHAT_SIGNALING_PORT")]
    signaling_port: u16,

    /// Mount path of the signaling server.
    #[arg(long, default_value = "/", env = "PEERCHAT_SIGNALING_PATH")]
    signaling_path: String,

    /// Connect with plain `ws://` (for a local signaling server).
    #[arg(long, env = "PEERCHAT_INSECURE")]
    insecure: bool,

    /// API key of the signaling server.
    #[arg(long, default_value = "peerjs", env = "PEERCHAT_SIGNALING_KEY")]
    signaling_key: String,

    /// Seconds between heartbeats to the signaling server.
    #[arg(
        long,
        default_value_t = 5,
        env = "PEERCHAT_PING_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    ping_interval: u64,

    /// STUN/TURN server URL.  Repeat for several.
    #[arg(long = "stun", env = "PEERCHAT_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    /// Seconds to wait before reconnecting after a signaling error.
    #[arg(long, default_value_t = 5, env = "PEERCHAT_ERROR_RECONNECT_DELAY")]
    error_reconnect_delay: u64,

    /// Seconds to wait before reconnecting after losing the signaling server.
    #[arg(long, default_value_t = 2, env = "PEERCHAT_DISCONNECT_RECONNECT_DELAY")]
    disconnect_reconnect_delay: u64,

    /// Where `/save` writes files when no directory is given.
    #[arg(long, default_value = ".", env = "PEERCHAT_DOWNLOAD_DIR")]
    download_dir: PathBuf,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the signaling host is blank.
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let host = self.signaling_host.trim();
        if host.is_empty() {
            anyhow::bail!("--signaling-host must not be empty");
        }

        let ice_servers = if self.stun.is_empty() {
            DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect()
        } else {
            self.stun
        };

        Ok(ClientConfig {
            signaling: SignalingConfig {
                host: host.to_string(),
                port: self.signaling_port,
                path: self.signaling_path,
                secure: !self.insecure,
                key: self.signaling_key,
                ping_interval: Duration::from_secs(self.ping_interval),
            },
            ice_servers,
            reconnect: ReconnectPolicy {
                after_error: Duration::from_secs(self.error_reconnect_delay),
                after_disconnect: Duration::from_secs(self.disconnect_reconnect_delay),
            },
            download_dir: self.download_dir,
        })
    }
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Owns the view and turns typed lines into commands or local actions.
struct Terminal {
    view: TerminalView,
    store: Option<PreferenceStore>,
    commands: CommandSender,
}

impl Terminal {
    fn show(&mut self, event: &UiEvent) {
        println!("{}", self.view.render(event));
    }

    fn input(&mut self, line: &str) {
        match parse_input(line) {
            UserInput::Command(command) => {
                if self.commands.send(command).is_err() {
                    warn!("session has stopped; input ignored");
                }
            }
            UserInput::ToggleTheme => {
                let theme = self.view.theme().toggle();
                self.view.set_theme(theme);
                if let Some(store) = &self.store {
                    if let Err(e) = store.set_theme(theme) {
                        warn!("could not save theme: {e}");
                    }
                }
                self.show(&UiEvent::Status(format!("Theme: {theme}")));
            }
            UserInput::ShowState => {
                let line = self.view.state_line();
                self.show(&UiEvent::Status(line));
            }
            UserInput::Help => println!("{HELP}"),
            UserInput::Empty => {}
            UserInput::Invalid(reason) => self.show(&UiEvent::Status(reason)),
        }
    }
}

/// Reads stdin on a plain thread so a pending read never holds up shutdown.
///
/// `leftover` holds bytes already buffered during onboarding; its lines are
/// delivered first.
fn spawn_stdin_reader(leftover: Vec<u8>) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    for line in String::from_utf8_lossy(&leftover).lines() {
        let _ = tx.send(line.to_string());
    }
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read error: {e}");
                    break;
                }
            }
        }
    });
    rx
}

fn load_theme(store: Option<&PreferenceStore>) -> ThemePreference {
    let Some(store) = store else {
        return ThemePreference::default();
    };
    match store.load() {
        Ok(prefs) => prefs.theme,
        Err(e) => {
            warn!("could not load preferences from {}: {e}", store.path().display());
            ThemePreference::default()
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // wss:// needs a process-wide rustls crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let username = cli.username.clone();
    let generate = cli.generate;
    let config = cli.into_client_config()?;

    // ── Onboarding ────────────────────────────────────────────────────────────
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let identity = match identity_from_flags(username.as_deref(), generate, &mut rand::thread_rng())? {
        Some(identity) => identity,
        None => prompt_identity(&mut stdin, &mut stdout, &mut rand::thread_rng())
            .await
            .context("could not choose a username")?,
    };
    let leftover = stdin.buffer().to_vec();
    drop(stdin);

    let store = match PreferenceStore::platform() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("preferences will not be saved: {e}");
            None
        }
    };
    let theme = load_theme(store.as_ref());
    let view = if std::io::stdout().is_terminal() {
        TerminalView::new(theme)
    } else {
        TerminalView::plain(theme)
    };

    info!(
        "peerchat starting as {identity}, signaling={}:{}",
        config.signaling.host, config.signaling.port
    );

    // ── Session ───────────────────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let signaling = PeerJsSignaling::new(config.signaling.clone(), config.ice_servers.clone(), event_tx);
    let mut session = ChatSession::new(identity, signaling, config.reconnect, ui_tx.clone());
    session.start().context("could not register with the signaling server")?;

    let mut terminal = Terminal {
        view,
        store,
        commands: command_tx.clone(),
    };
    println!("Type /help for commands.");

    let session_done = run_session(session, event_rx, command_rx, ui_tx, config.download_dir);
    tokio::pin!(session_done);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut lines = spawn_stdin_reader(leftover);
    let mut input_open = true;
    let mut interrupted = false;

    // ── Main loop ─────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            session = &mut session_done => {
                while let Ok(event) = ui_rx.try_recv() {
                    terminal.show(&event);
                }
                info!("session ended with {} messages", session.log().len());
                break;
            }
            Some(event) = ui_rx.recv() => terminal.show(&event),
            line = lines.recv(), if input_open => match line {
                Some(line) => terminal.input(&line),
                None => {
                    input_open = false;
                    let _ = command_tx.send(Command::Quit);
                }
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("received Ctrl+C; shutting down");
                let _ = command_tx.send(Command::Quit);
            }
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
