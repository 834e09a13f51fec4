//! Live update channel: one streaming connection scoped to one resource id.
//!
//! [`LiveUpdateChannel::open`] returns a [`ChannelHandle`] right away and
//! connects in a spawned task. The task decodes each text frame and forwards
//! [`ChannelEvent`]s, one at a time and in transport order, until the stream
//! ends, a terminal message arrives, the idle bound elapses, or the handle is
//! closed. The transport is closed exactly once per successful connect.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::ChannelConfig;
use common::{LeaderboardUpdate, SubmissionUpdate};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// A payload that can arrive over a live update channel.
pub trait StreamMessage: DeserializeOwned + Send + 'static {
    /// Whether this message ends the stream.
    fn is_terminal(&self) -> bool {
        false
    }
}

impl StreamMessage for SubmissionUpdate {
    fn is_terminal(&self) -> bool {
        SubmissionUpdate::is_terminal(self)
    }
}

impl StreamMessage for LeaderboardUpdate {}

/// An open message-oriented connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next complete text frame; `None` once the peer closed the stream.
    async fn next_frame(&mut self) -> Option<Result<String>>;

    /// Close the underlying connection.
    async fn close(&mut self);
}

/// Opens [`FrameSource`]s for URLs.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FrameSource>>;
}

/// Why a channel stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A terminal message was delivered.
    Terminal,
    /// The handle was closed or dropped.
    Requested,
    /// The peer ended the stream.
    RemoteClosed,
    /// The connection broke after it was established.
    ConnectionLost,
    /// The connection could not be established.
    ConnectFailed,
    /// No frame arrived within the idle bound.
    IdleTimeout,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Terminal => "terminal update received",
            Self::Requested => "closed by client",
            Self::RemoteClosed => "closed by server",
            Self::ConnectionLost => "connection lost",
            Self::ConnectFailed => "could not connect",
            Self::IdleTimeout => "no updates received in time",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent<M> {
    Opened,
    Message(M),
    /// `MalformedMessage`, `Channel` or `Timeout`; malformed frames do not
    /// end the channel.
    Error(ClientError),
    /// Always the last event.
    Closed(CloseReason),
}

/// Timeouts and buffering for a channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    pub connect_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub buffer: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::from(&ChannelConfig::default())
    }
}

impl From<&ChannelConfig> for ChannelSettings {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
            buffer: config.event_buffer.max(1),
        }
    }
}

pub struct LiveUpdateChannel;

impl LiveUpdateChannel {
    /// Start a channel for `resource_id` on `url`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<M: StreamMessage>(
        connector: &Arc<dyn Connector>,
        resource_id: impl Into<String>,
        url: Url,
        settings: ChannelSettings,
    ) -> ChannelHandle<M> {
        let resource_id = resource_id.into();
        let (tx, rx) = mpsc::channel(settings.buffer.max(1));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_channel::<M>(
            Arc::clone(connector),
            resource_id.clone(),
            url,
            settings,
            tx,
            cancel.clone(),
        ));

        ChannelHandle {
            resource_id,
            events: rx,
            cancel,
            task: Some(task),
            finished: false,
        }
    }
}

/// Owner's side of an open channel.
///
/// Dropping the handle closes the channel.
pub struct ChannelHandle<M> {
    resource_id: String,
    events: mpsc::Receiver<ChannelEvent<M>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl<M> ChannelHandle<M> {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Next event, `None` after `Closed` has been delivered.
    pub async fn recv(&mut self) -> Option<ChannelEvent<M>> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match event {
            Some(ChannelEvent::Closed(_)) | None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Stop the channel. Safe to call repeatedly and before the connection
    /// is established.
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!(resource_id = %self.resource_id, "Closing live update channel");
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.finished || self.cancel.is_cancelled()
    }

    /// Close and wait for the channel task to release the transport.
    ///
    /// Undelivered events are discarded.
    pub async fn shutdown(mut self) {
        self.close();
        self.events.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<M> Drop for ChannelHandle<M> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn next_frame_within(
    source: &mut dyn FrameSource,
    idle_timeout: Option<Duration>,
) -> std::result::Result<Option<Result<String>>, Duration> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, source.next_frame())
            .await
            .map_err(|_| limit),
        None => Ok(source.next_frame().await),
    }
}

/// Deliver `event` unless the channel is cancelled while the buffer is full.
///
/// Returns `false` when the event could not be delivered.
async fn emit<M>(
    tx: &mpsc::Sender<ChannelEvent<M>>,
    cancel: &CancellationToken,
    event: ChannelEvent<M>,
) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Closed(_)) => false,
        Err(mpsc::error::TrySendError::Full(event)) => tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = tx.send(event) => sent.is_ok(),
        },
    }
}

async fn run_channel<M: StreamMessage>(
    connector: Arc<dyn Connector>,
    resource_id: String,
    url: Url,
    settings: ChannelSettings,
    tx: mpsc::Sender<ChannelEvent<M>>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(resource_id = %resource_id, "Channel closed before connecting");
            emit(&tx, &cancel, ChannelEvent::Closed(CloseReason::Requested)).await;
            return;
        }
        result = tokio::time::timeout(settings.connect_timeout, connector.connect(&url)) => result,
    };

    let mut source = match connected {
        Ok(Ok(source)) => source,
        Ok(Err(e)) => {
            warn!(resource_id = %resource_id, url = %url, error = %e, "Channel connect failed");
            let error = match e {
                ClientError::Channel(_) => e,
                other => ClientError::Channel(other.to_string()),
            };
            emit(&tx, &cancel, ChannelEvent::Error(error)).await;
            emit(&tx, &cancel, ChannelEvent::Closed(CloseReason::ConnectFailed)).await;
            return;
        }
        Err(_) => {
            warn!(resource_id = %resource_id, url = %url, "Channel connect timed out");
            let error = ClientError::Channel(format!(
                "connect timed out after {:?}",
                settings.connect_timeout
            ));
            emit(&tx, &cancel, ChannelEvent::Error(error)).await;
            emit(&tx, &cancel, ChannelEvent::Closed(CloseReason::ConnectFailed)).await;
            return;
        }
    };

    info!(resource_id = %resource_id, url = %url, "Live update channel open");
    let reason = forward_frames(source.as_mut(), &resource_id, &settings, &tx, &cancel).await;

    source.close().await;
    info!(resource_id = %resource_id, reason = %reason, "Live update channel closed");
    emit(&tx, &cancel, ChannelEvent::Closed(reason)).await;
}

/// Forward frames from an open source until the channel has to stop.
async fn forward_frames<M: StreamMessage>(
    source: &mut dyn FrameSource,
    resource_id: &str,
    settings: &ChannelSettings,
    tx: &mpsc::Sender<ChannelEvent<M>>,
    cancel: &CancellationToken,
) -> CloseReason {
    if !emit(tx, cancel, ChannelEvent::Opened).await {
        return CloseReason::Requested;
    }

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return CloseReason::Requested,
            next = next_frame_within(source, settings.idle_timeout) => next,
        };

        let event = match next {
            Err(limit) => {
                warn!(resource_id = %resource_id, idle_ms = limit.as_millis() as u64, "Channel idle timeout");
                emit(tx, cancel, ChannelEvent::Error(ClientError::Timeout(limit))).await;
                return CloseReason::IdleTimeout;
            }
            Ok(None) => return CloseReason::RemoteClosed,
            Ok(Some(Err(ClientError::MalformedMessage(reason)))) => {
                warn!(resource_id = %resource_id, reason = %reason, "Discarding undecodable frame");
                ChannelEvent::Error(ClientError::MalformedMessage(reason))
            }
            Ok(Some(Err(e))) => {
                warn!(resource_id = %resource_id, error = %e, "Channel connection error");
                let error = match e {
                    ClientError::Channel(_) => e,
                    other => ClientError::Channel(other.to_string()),
                };
                emit(tx, cancel, ChannelEvent::Error(error)).await;
                return CloseReason::ConnectionLost;
            }
            Ok(Some(Ok(text))) => match serde_json::from_str::<M>(&text) {
                Ok(message) => {
                    let terminal = message.is_terminal();
                    if !emit(tx, cancel, ChannelEvent::Message(message)).await {
                        return CloseReason::Requested;
                    }
                    if terminal {
                        return CloseReason::Terminal;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(resource_id = %resource_id, error = %e, "Discarding malformed message");
                    ChannelEvent::Error(ClientError::MalformedMessage(e.to_string()))
                }
            },
        };

        if !emit(tx, cancel, event).await {
            return CloseReason::Requested;
        }
    }
}
