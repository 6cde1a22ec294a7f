use std::sync::Arc;

use {
    freshet_channels::{ChannelCommands, SubscriptionRegistry},
    freshet_config::IrcServerConfig,
    secrecy::ExposeSecret,
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::{
            TcpStream,
            tcp::{OwnedReadHalf, OwnedWriteHalf},
        },
        runtime::{Handle, RuntimeFlavor},
        sync::{mpsc, watch},
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, trace, warn},
};

use crate::{
    error::{Error, Result},
    message::{IrcMessage, Outbound, strip_formatting},
};

const QUIT_REASON: &str = "freshet shutting down";

/// `freshet-bot-<random u32>`.
pub fn random_nick() -> String {
    format!("freshet-bot-{}", rand::random::<u32>())
}

/// Queues JOIN and PART for the connection writer.
///
/// Sending never blocks. Commands queued before the server welcomes the
/// client are held back until registration completes.
#[derive(Debug, Clone)]
pub struct IrcCommands {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl IrcCommands {
    fn send(&self, command: Outbound) {
        if self.tx.send(command).is_err() {
            debug!("connection writer is gone, dropping command");
        }
    }
}

impl ChannelCommands for IrcCommands {
    fn send_join(&self, channel: &str) {
        self.send(Outbound::Join(channel.to_owned()));
    }

    fn send_leave(&self, channel: &str) {
        self.send(Outbound::Part(channel.to_owned()));
    }
}

/// A not-yet-connected client.
///
/// Build the registry on [`IrcClient::commands`] first so subscriptions made
/// before [`IrcClient::connect`] are joined as soon as the server accepts the
/// client.
pub struct IrcClient {
    config: IrcServerConfig,
    nick: String,
    commands_tx: mpsc::UnboundedSender<Outbound>,
    commands_rx: mpsc::UnboundedReceiver<Outbound>,
}

impl IrcClient {
    pub fn new(config: &IrcServerConfig) -> Self {
        let nick = config.nick.clone().unwrap_or_else(random_nick);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            config: config.clone(),
            nick,
            commands_tx,
            commands_rx,
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn commands(&self) -> IrcCommands {
        IrcCommands {
            tx: self.commands_tx.clone(),
        }
    }

    /// Open the TCP connection, register and start the reader and writer
    /// tasks. Channel messages are handed to `registry`.
    pub async fn connect(self, registry: Arc<SubscriptionRegistry>) -> Result<IrcConnection> {
        let address = self.config.address();
        let timeout = self.config.connect_timeout();
        info!(address = %address, nick = %self.nick, "connecting to IRC server");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| Error::ConnectTimeout {
                address: address.clone(),
                timeout,
            })?
            .map_err(|source| Error::Connect {
                address: address.clone(),
                source,
            })?;
        let (read_half, mut write_half) = stream.into_split();

        for line in registration_lines(&self.config, &self.nick) {
            write_half.write_all(line.as_bytes()).await?;
        }
        write_half.flush().await?;
        debug!(nick = %self.nick, "registration sent");

        let cancel = CancellationToken::new();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (registered_tx, registered_rx) = watch::channel(false);

        let reader = tokio::spawn(read_loop(
            read_half,
            ReaderContext {
                registry,
                control: control_tx,
                registered: registered_tx,
                nick: self.nick.clone(),
            },
            cancel.clone(),
        ));
        let writer = tokio::spawn(write_loop(
            write_half,
            self.commands_rx,
            control_rx,
            registered_rx,
            cancel.clone(),
        ));

        Ok(IrcConnection {
            nick: self.nick,
            cancel,
            reader,
            writer,
            _commands: self.commands_tx,
        })
    }
}

/// A live connection. Dropping it without [`IrcConnection::stop`] leaves the
/// tasks running until the server closes the socket.
pub struct IrcConnection {
    nick: String,
    cancel: CancellationToken,
    reader: JoinHandle<Result<()>>,
    writer: JoinHandle<Result<()>>,
    // Keeps the command queue open for as long as the connection lives.
    _commands: mpsc::UnboundedSender<Outbound>,
}

impl IrcConnection {
    /// Nickname sent at registration.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Resolves once the connection is shutting down, either because the
    /// server closed it or because [`IrcConnection::stop`] was called.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Stop reading, flush queued commands, send `QUIT` and wait for both
    /// tasks to finish.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        let read = self.reader.await;
        let write = self.writer.await;
        info!("IRC connection stopped");
        read??;
        write?
    }
}

pub(crate) fn registration_lines(config: &IrcServerConfig, nick: &str) -> Vec<String> {
    let username = config.username.as_deref().unwrap_or(nick);
    let realname = config.realname.as_deref().unwrap_or(nick);

    let mut lines = Vec::with_capacity(3);
    if let Some(password) = &config.password {
        lines.push(format!("PASS {}\r\n", password.expose_secret()));
    }
    lines.push(format!("NICK {nick}\r\n"));
    lines.push(format!("USER {username} 0 * :{realname}\r\n"));
    lines
}

struct ReaderContext {
    registry: Arc<SubscriptionRegistry>,
    control: mpsc::UnboundedSender<Outbound>,
    registered: watch::Sender<bool>,
    nick: String,
}

impl ReaderContext {
    fn handle_line(&mut self, line: &str) {
        let Some(msg) = IrcMessage::parse(line) else {
            return;
        };
        trace!(command = %msg.command, "inbound");

        match msg.command.as_str() {
            "PING" => {
                let token = msg.trailing().unwrap_or_default().to_owned();
                let _ = self.control.send(Outbound::Pong(token));
            },
            "PRIVMSG" => self.handle_privmsg(&msg),
            "001" => {
                info!(
                    nick = %self.nick,
                    server = msg.prefix.as_deref().unwrap_or_default(),
                    "registered with IRC server"
                );
                self.registered.send_replace(true);
            },
            "433" if !*self.registered.borrow() => {
                let retry = format!("{}_", self.nick);
                warn!(nick = %self.nick, retry = %retry, "nickname in use, retrying");
                self.nick = retry.clone();
                let _ = self.control.send(Outbound::Nick(retry));
            },
            "JOIN" if msg.nick() == Some(self.nick.as_str()) => {
                info!(channel = msg.param(0).unwrap_or_default(), "joined channel");
            },
            "PART" if msg.nick() == Some(self.nick.as_str()) => {
                info!(channel = msg.param(0).unwrap_or_default(), "left channel");
            },
            "KICK" if msg.param(1) == Some(self.nick.as_str()) => {
                warn!(
                    channel = msg.param(0).unwrap_or_default(),
                    by = msg.nick().unwrap_or_default(),
                    reason = msg.param(2).unwrap_or_default(),
                    "kicked from channel"
                );
            },
            "NICK" if msg.nick() == Some(self.nick.as_str()) => {
                if let Some(new) = msg.param(0) {
                    info!(old = %self.nick, new = %new, "nickname changed");
                    self.nick = new.to_owned();
                }
            },
            "NOTICE" => {
                info!(
                    from = msg.nick().unwrap_or_default(),
                    text = %strip_formatting(msg.trailing().unwrap_or_default()),
                    "notice"
                );
            },
            "TOPIC" => {
                info!(
                    channel = msg.param(0).unwrap_or_default(),
                    topic = %strip_formatting(msg.trailing().unwrap_or_default()),
                    "topic changed"
                );
            },
            "ERROR" => {
                warn!(reason = msg.trailing().unwrap_or_default(), "server error");
            },
            _ if msg.is_error_reply() => {
                warn!(
                    code = %msg.command,
                    text = msg.trailing().unwrap_or_default(),
                    "server rejected a command"
                );
            },
            other => debug!(command = %other, "ignoring command"),
        }
    }

    fn handle_privmsg(&self, msg: &IrcMessage) {
        let (Some(target), Some(text)) = (msg.param(0), msg.trailing()) else {
            return;
        };
        if msg.params.len() < 2 || !target.starts_with(['#', '&']) {
            trace!(to = %target, "ignoring private message");
            return;
        }
        let Some(source) = msg.nick() else {
            debug!(channel = %target, "channel message without a source, dropping");
            return;
        };
        let text = strip_formatting(text);
        debug!(channel = %target, source = %source, text = %text, "channel message");
        run_listeners(|| self.registry.on_channel_message(target, source, &text));
    }
}

/// Listeners may do blocking file I/O. On a multi-thread runtime the worker
/// hands its other tasks off first; elsewhere `f` just runs inline.
fn run_listeners<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        },
        _ => f(),
    }
}

async fn read_loop(
    read_half: OwnedReadHalf,
    mut ctx: ReaderContext,
    cancel: CancellationToken,
) -> Result<()> {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::with_capacity(512);

    let outcome = loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => {
                info!("IRC server closed the connection");
                break Ok(());
            },
            Ok(_) => ctx.handle_line(&String::from_utf8_lossy(&buf)),
            Err(e) => {
                warn!(error = %e, "error reading from IRC server");
                break Err(e.into());
            },
        }
    };

    cancel.cancel();
    outcome
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut commands: mpsc::UnboundedReceiver<Outbound>,
    mut control: mpsc::UnboundedReceiver<Outbound>,
    mut registered: watch::Receiver<bool>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let ready = *registered.borrow_and_update();
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(command) = control.recv() => command,
            Some(command) = commands.recv(), if ready => command,
            changed = registered.changed(), if !ready => {
                if changed.is_err() {
                    break;
                }
                continue;
            },
        };
        debug!(command = ?next, "outbound");
        write_half.write_all(next.to_line().as_bytes()).await?;
    }

    if *registered.borrow() {
        while let Ok(command) = commands.try_recv() {
            debug!(command = ?command, "outbound on shutdown");
            write_half.write_all(command.to_line().as_bytes()).await?;
        }
    }
    write_half
        .write_all(Outbound::Quit(QUIT_REASON.into()).to_line().as_bytes())
        .await?;
    write_half.shutdown().await?;
    Ok(())
}
