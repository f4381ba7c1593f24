//! LiveChannel - One live transport driven by its reconnection controller.
//!
//! A channel is a background task that exclusively owns the transport's
//! connection, the `ConnectionLifecycle` and the `SubscriptionRegistry`.
//! Callers talk to it through a command queue, so there is never more than
//! one physical connection per channel and every state change happens on a
//! single task.
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!                               |                  |
//!                             error          error/close/silence
//!                               v                  v
//!                          Reconnecting <----------+
//!                               |
//!                    backoff elapsed / budget spent
//!                               v
//!                      Connecting  |  Failed
//! ```
//!
//! Every transition is published as `EventKind::ConnectionChanged`.
//!
//! ## Graceful Shutdown
//!
//! `shutdown()` closes the live connection, cancels any pending backoff and
//! waits for the task to finish.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::routing::MessageRouter;
use crate::domain::connection::{
    ConnectionLifecycle, ConnectionState, ReconnectPolicy, RetryDecision, SubscriptionRegistry,
    Topic, Transition,
};
use crate::domain::foundation::{Credentials, EventKind, EventSource, LiveEvent};
use crate::ports::{EventPublisher, Inbound, InboundMessage, LiveConnection, LiveTransport, TransportError};

/// Configuration for one live channel.
#[derive(Debug, Clone)]
pub struct LiveChannelConfig {
    /// Reconnection bound and backoff.
    pub policy: ReconnectPolicy,
    /// Topics subscribed on every successful connect.
    pub topics: Vec<Topic>,
    /// Inbound silence longer than this counts as a transport failure.
    pub liveness_timeout: Option<Duration>,
}

impl Default for LiveChannelConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            topics: Vec::new(),
            liveness_timeout: None,
        }
    }
}

impl LiveChannelConfig {
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_topics(mut self, topics: impl IntoIterator<Item = Topic>) -> Self {
        self.topics = topics.into_iter().collect();
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.liveness_timeout = timeout;
        self
    }
}

#[derive(Debug)]
enum Command {
    Connect(Credentials),
    Disconnect,
    Send { destination: String, body: String },
    Subscribe(Topic),
    Unsubscribe(Topic),
}

/// Handle to a running channel task.
pub struct LiveChannel {
    name: &'static str,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChannel {
    /// Spawns the channel task. The channel starts `Disconnected`.
    pub fn spawn(
        transport: Arc<dyn LiveTransport>,
        router: Arc<dyn MessageRouter>,
        publisher: Arc<dyn EventPublisher>,
        config: LiveChannelConfig,
    ) -> Self {
        let name = transport.name();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut registry = SubscriptionRegistry::new();
        if transport.supports_send() {
            for topic in &config.topics {
                registry.request(topic.clone());
            }
        }

        let driver = ChannelDriver {
            name,
            transport,
            router,
            publisher,
            lifecycle: ConnectionLifecycle::new(config.policy),
            registry,
            liveness_timeout: config.liveness_timeout,
            silent_after: None,
            credentials: Credentials::anonymous(),
            connection: None,
            retry_at: None,
            commands: command_rx,
            shutdown: shutdown_rx,
            state: state_tx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            name,
            commands: command_tx,
            state: state_rx,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Requests a connection. No-op while connecting, connected or
    /// reconnecting; from `Failed` it starts a fresh retry budget.
    pub fn connect(&self, credentials: Credentials) {
        self.command(Command::Connect(credentials));
    }

    /// Closes the connection and cancels any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Sends a message; dropped with a log line unless connected.
    pub fn send(&self, destination: impl Into<String>, body: impl Into<String>) {
        self.command(Command::Send {
            destination: destination.into(),
            body: body.into(),
        });
    }

    /// Adds a topic to the set restored on every connect.
    pub fn subscribe(&self, topic: Topic) {
        self.command(Command::Subscribe(topic));
    }

    pub fn unsubscribe(&self, topic: Topic) {
        self.command(Command::Unsubscribe(topic));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state the channel enters.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stops the task and waits for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(channel = self.name, error = %e, "live channel task aborted");
            }
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!(channel = self.name, "live channel already stopped");
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// What woke the driver up.
enum Step {
    Shutdown,
    Command(Command),
    Opened(Result<Box<dyn LiveConnection>, TransportError>),
    Inbound(Result<Option<Inbound>, TransportError>),
    RetryDue,
}

struct ChannelDriver {
    name: &'static str,
    transport: Arc<dyn LiveTransport>,
    router: Arc<dyn MessageRouter>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: ConnectionLifecycle,
    registry: SubscriptionRegistry,
    liveness_timeout: Option<Duration>,
    /// Inbound silence past this instant is a transport failure.
    silent_after: Option<Instant>,
    credentials: Credentials,
    connection: Option<Box<dyn LiveConnection>>,
    retry_at: Option<Instant>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<ConnectionState>,
}

impl ChannelDriver {
    async fn run(mut self) {
        tracing::debug!(channel = self.name, "live channel started");
        loop {
            let step = match self.lifecycle.state() {
                ConnectionState::Disconnected | ConnectionState::Failed => self.idle().await,
                ConnectionState::Connecting => self.connecting().await,
                ConnectionState::Connected => self.connected().await,
                ConnectionState::Reconnecting => self.reconnecting().await,
            };
            match step {
                Step::Shutdown => break,
                Step::Command(command) => self.on_command(command).await,
                Step::Opened(result) => self.on_opened(result).await,
                Step::Inbound(result) => self.on_inbound(result).await,
                Step::RetryDue => self.on_retry_due().await,
            }
        }

        self.close_connection().await;
        if let Some(transition) = self.lifecycle.disconnect() {
            self.announce(transition).await;
        }
        tracing::debug!(channel = self.name, "live channel stopped");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Waiting, per state
    // ─────────────────────────────────────────────────────────────────────

    async fn idle(&mut self) -> Step {
        tokio::select! {
            _ = wait_shutdown(&mut self.shutdown) => Step::Shutdown,
            command = self.commands.recv() => command.map_or(Step::Shutdown, Step::Command),
        }
    }

    /// Opens the transport. Commands keep flowing while the handshake runs;
    /// a disconnect drops the half-open attempt.
    async fn connecting(&mut self) -> Step {
        let transport = Arc::clone(&self.transport);
        let credentials = self.credentials.clone();
        let open = transport.open(&credentials);
        tokio::pin!(open);

        loop {
            let step = tokio::select! {
                _ = wait_shutdown(&mut self.shutdown) => Step::Shutdown,
                command = self.commands.recv() => command.map_or(Step::Shutdown, Step::Command),
                result = &mut open => Step::Opened(result),
            };
            match step {
                Step::Command(command) => {
                    self.on_command(command).await;
                    if self.lifecycle.state() != ConnectionState::Connecting {
                        return Step::Opened(Err(TransportError::Closed("connect cancelled".into())));
                    }
                }
                other => return other,
            }
        }
    }

    async fn connected(&mut self) -> Step {
        let liveness = self.silent_after.zip(self.liveness_timeout);
        let Some(connection) = self.connection.as_mut() else {
            return Step::Inbound(Err(TransportError::Closed("connection missing".into())));
        };
        tokio::select! {
            _ = wait_shutdown(&mut self.shutdown) => Step::Shutdown,
            command = self.commands.recv() => command.map_or(Step::Shutdown, Step::Command),
            inbound = next_inbound(&mut **connection, liveness) => Step::Inbound(inbound),
        }
    }

    /// Restarts the silence deadline; only inbound traffic counts.
    fn heard_from_peer(&mut self) {
        self.silent_after = self.liveness_timeout.map(|limit| Instant::now() + limit);
    }

    async fn reconnecting(&mut self) -> Step {
        let deadline = match self.retry_at {
            Some(deadline) => deadline,
            None => match self.lifecycle.retry_decision() {
                RetryDecision::RetryAfter(delay) => {
                    tracing::info!(
                        channel = self.name,
                        attempt = self.lifecycle.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "scheduling reconnect"
                    );
                    let deadline = Instant::now() + delay;
                    self.retry_at = Some(deadline);
                    deadline
                }
                RetryDecision::GiveUp => return Step::RetryDue,
            },
        };
        tokio::select! {
            _ = wait_shutdown(&mut self.shutdown) => Step::Shutdown,
            command = self.commands.recv() => command.map_or(Step::Shutdown, Step::Command),
            _ = time::sleep_until(deadline) => Step::RetryDue,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reactions
    // ─────────────────────────────────────────────────────────────────────

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect(credentials) => {
                self.credentials = credentials;
                match self.lifecycle.connect() {
                    Some(transition) => self.announce(transition).await,
                    None => tracing::debug!(
                        channel = self.name,
                        state = self.lifecycle.state().as_str(),
                        "connect ignored"
                    ),
                }
            }
            Command::Disconnect => {
                self.close_connection().await;
                self.retry_at = None;
                if let Some(transition) = self.lifecycle.disconnect() {
                    self.announce(transition).await;
                }
            }
            Command::Send { destination, body } => self.send(&destination, &body).await,
            Command::Subscribe(topic) => {
                if !self.transport.supports_send() {
                    tracing::warn!(channel = self.name, topic = %topic, "channel has no topics");
                    return;
                }
                if self.registry.request(topic.clone()) && self.lifecycle.state() == ConnectionState::Connected {
                    self.activate_pending().await;
                }
            }
            Command::Unsubscribe(topic) => {
                let was_active = self.registry.release(&topic).unwrap_or(false);
                if !was_active {
                    return;
                }
                if let Some(connection) = self.connection.as_mut() {
                    if let Err(e) = connection.unsubscribe(&topic).await {
                        self.on_failure(e).await;
                    }
                }
            }
        }
    }

    async fn send(&mut self, destination: &str, body: &str) {
        if !self.transport.supports_send() {
            tracing::warn!(channel = self.name, destination, "channel is receive-only; send dropped");
            return;
        }
        let Some(connection) = self.connection.as_mut() else {
            tracing::info!(
                channel = self.name,
                destination,
                state = self.lifecycle.state().as_str(),
                "not connected; send dropped"
            );
            return;
        };
        if let Err(e) = connection.send(destination, body).await {
            self.on_failure(e).await;
        }
    }

    async fn on_opened(&mut self, result: Result<Box<dyn LiveConnection>, TransportError>) {
        if self.lifecycle.state() != ConnectionState::Connecting {
            // Cancelled by a command while the handshake ran.
            return;
        }
        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.heard_from_peer();
                match self.lifecycle.on_connected() {
                    Ok(transition) => {
                        tracing::info!(channel = self.name, "live channel connected");
                        self.announce(transition).await;
                        self.activate_pending().await;
                    }
                    Err(e) => tracing::error!(channel = self.name, error = %e, "invalid transition"),
                }
            }
            Err(e) => self.on_failure(e).await,
        }
    }

    async fn on_inbound(&mut self, result: Result<Option<Inbound>, TransportError>) {
        if let Ok(Some(_)) = &result {
            self.heard_from_peer();
        }
        match result {
            Ok(Some(Inbound::Message(message))) => self.dispatch(message).await,
            Ok(Some(Inbound::KeepAlive)) => {
                tracing::trace!(channel = self.name, "keep-alive");
            }
            Ok(None) => self.on_failure(TransportError::Closed("closed by peer".into())).await,
            Err(e) => self.on_failure(e).await,
        }
    }

    async fn dispatch(&mut self, message: InboundMessage) {
        match self.router.route(&message) {
            Ok(Some(event)) => {
                tracing::debug!(channel = self.name, kind = %event.kind, "live event");
                if let Err(e) = self.publisher.publish(event).await {
                    tracing::warn!(channel = self.name, error = %e, "publishing live event failed");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    channel = self.name,
                    topic = %message.channel,
                    error = %e,
                    "dropping unparseable message"
                );
            }
        }
    }

    async fn on_retry_due(&mut self) {
        self.retry_at = None;
        match self.lifecycle.retry_decision() {
            RetryDecision::GiveUp => match self.lifecycle.give_up() {
                Ok(transition) => {
                    tracing::error!(
                        channel = self.name,
                        attempts = self.lifecycle.connect_attempts(),
                        "reconnection attempts exhausted; live updates stopped"
                    );
                    self.announce(transition).await;
                }
                Err(e) => tracing::error!(channel = self.name, error = %e, "invalid transition"),
            },
            RetryDecision::RetryAfter(_) => match self.lifecycle.retry() {
                Ok(transition) => self.announce(transition).await,
                Err(e) => tracing::error!(channel = self.name, error = %e, "invalid transition"),
            },
        }
    }

    /// Closes whatever is open, then moves to `Reconnecting`.
    async fn on_failure(&mut self, error: TransportError) {
        tracing::warn!(
            channel = self.name,
            state = self.lifecycle.state().as_str(),
            error = %error,
            "live channel transport failure"
        );
        self.close_connection().await;
        match self.lifecycle.on_transport_failure() {
            Ok(transition) => self.announce(transition).await,
            Err(e) => tracing::debug!(channel = self.name, error = %e, "failure outside a live state"),
        }
    }

    /// Issues SUBSCRIBE for every wanted topic not yet active.
    async fn activate_pending(&mut self) {
        for topic in self.registry.pending() {
            let Some(connection) = self.connection.as_mut() else {
                return;
            };
            match connection.subscribe(&topic).await {
                Ok(()) => {
                    self.registry.activate(&topic);
                    tracing::debug!(channel = self.name, topic = %topic, "subscribed");
                }
                Err(e) => {
                    self.on_failure(e).await;
                    return;
                }
            }
        }
    }

    async fn close_connection(&mut self) {
        self.registry.deactivate_all();
        self.silent_after = None;
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::debug!(channel = self.name, error = %e, "error while closing connection");
            }
        }
    }

    /// Publishes the transition, then exposes the new state to watchers.
    async fn announce(&mut self, transition: Transition) {
        tracing::debug!(
            channel = self.name,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            attempt = transition.attempt,
            "connection state changed"
        );
        let event = LiveEvent::new(
            EventKind::ConnectionChanged,
            EventSource::Local,
            json!({
                "channel": self.name,
                "from": transition.from.as_str(),
                "to": transition.to.as_str(),
                "attempt": transition.attempt,
            }),
        );
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(channel = self.name, error = %e, "publishing connection change failed");
        }
        self.state.send_replace(transition.to);
    }
}

/// Resolves once shutdown is requested or the handle is gone.
async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn next_inbound(
    connection: &mut dyn LiveConnection,
    liveness: Option<(Instant, Duration)>,
) -> Result<Option<Inbound>, TransportError> {
    match liveness {
        Some((deadline, limit)) => time::timeout_at(deadline, connection.recv())
            .await
            .map_err(|_| TransportError::Silent(limit))?,
        None => connection.recv().await,
    }
}
