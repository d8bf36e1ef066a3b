use crate::error::SimError;
use crate::reading::Reading;
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Well-known destination for production readings, declared durable on the
/// default exchange. Downstream consumers bind to this name.
pub const PRODUCTION_QUEUE: &str = "pv_production";

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

const CLOSE_REPLY_SUCCESS: u16 = 200;

/// Destination for confirmed readings.
///
/// The engine drives delivery through this trait so the transport stays
/// swappable in tests; [`BrokerPublisher`] is the AMQP implementation.
#[async_trait]
pub trait ReadingSink {
    /// Delivers one reading, returning only once it is confirmed or the
    /// retry budget is exhausted.
    async fn deliver(&mut self, reading: &Reading) -> Result<(), SimError>;
}

/// Bounded exponential backoff schedule for transient delivery failures.
///
/// The policy is independent of the transport: it only decides how many
/// attempts are allowed and how long to wait between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after the given 1-based failed attempt:
    /// `initial * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let millis = (self.initial_backoff.as_millis() as u64)
            .saturating_mul(1_u64 << doublings)
            .min(self.max_backoff.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Delivery counters for one run.
#[derive(Debug, Clone, Default)]
pub struct PublisherStats {
    /// Readings confirmed by the broker.
    pub confirmed: u64,
    /// Attempts beyond the first, across all readings.
    pub retries: u32,
    /// Negative acknowledgements received.
    pub nacks: u32,
}

/// Owns the AMQP connection and channel for one run.
///
/// Publishes one message per reading to [`PRODUCTION_QUEUE`] with publisher
/// confirms enabled and persistent delivery mode, in generation order.
/// Transient failures (socket errors, broker nack) are retried under the
/// injected [`RetryPolicy`], re-establishing the connection when the
/// transport broke; everything else is fatal.
pub struct BrokerPublisher {
    broker_url: String,
    connection: Connection,
    channel: Channel,
    policy: RetryPolicy,
    stats: PublisherStats,
}

impl BrokerPublisher {
    /// Connects, enables confirms and declares the destination queue,
    /// retrying transient failures under the policy. Exhaustion or a
    /// non-transient failure (bad URL, rejected credentials) surfaces as
    /// [`SimError::Connection`].
    pub async fn connect(broker_url: &str, policy: RetryPolicy) -> Result<Self, SimError> {
        let mut attempt = 0;
        let (connection, channel) = loop {
            attempt += 1;
            match open_confirmed_channel(broker_url).await {
                Ok(transport) => break transport,
                Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
                    let backoff = policy.backoff_for(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "broker connection failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(SimError::Connection(err)),
            }
        };

        debug!(queue = PRODUCTION_QUEUE, "broker connection established");
        Ok(Self {
            broker_url: broker_url.to_string(),
            connection,
            channel,
            policy,
            stats: PublisherStats::default(),
        })
    }

    /// Publishes one reading and blocks until the broker confirms it.
    ///
    /// Transient failures back off, reconnect if the transport broke, and
    /// retry; after `max_attempts` the run is aborted with
    /// [`SimError::Publish`].
    pub async fn publish(&mut self, reading: &Reading) -> Result<(), SimError> {
        let payload = serde_json::to_vec(reading)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.publish_once(&payload).await {
                Ok(()) => {
                    self.stats.confirmed += 1;
                    return Ok(());
                }
                Err(failure) => failure,
            };

            if let PublishFailure::Nack = failure {
                self.stats.nacks += 1;
            }
            let transient = match &failure {
                PublishFailure::Nack => true,
                PublishFailure::Transport(err) => is_transient(err),
            };
            if !transient || attempt >= self.policy.max_attempts {
                return Err(SimError::Publish(format!(
                    "{} after {} attempt(s)",
                    failure, attempt
                )));
            }

            self.stats.retries += 1;
            let backoff = self.policy.backoff_for(attempt);
            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %failure,
                "delivery not confirmed, backing off"
            );
            tokio::time::sleep(backoff).await;

            if matches!(failure, PublishFailure::Transport(_)) {
                if let Err(err) = self.reopen().await {
                    // The next attempt fails fast and keeps consuming the
                    // retry budget.
                    warn!(error = %err, "reconnect failed");
                }
            }
        }
    }

    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    /// Releases the channel and connection. Close failures are logged, not
    /// surfaced: the broker reclaims the resources either way.
    pub async fn disconnect(self) {
        if let Err(err) = self.channel.close(CLOSE_REPLY_SUCCESS, "simulation complete").await {
            debug!(error = %err, "channel close failed");
        }
        if let Err(err) = self
            .connection
            .close(CLOSE_REPLY_SUCCESS, "simulation complete")
            .await
        {
            debug!(error = %err, "connection close failed");
        }
    }

    async fn publish_once(&mut self, payload: &[u8]) -> Result<(), PublishFailure> {
        let confirmation = self
            .channel
            .basic_publish(
                "",
                PRODUCTION_QUEUE,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(PublishFailure::Transport)?
            .await
            .map_err(PublishFailure::Transport)?;

        match confirmation {
            Confirmation::Nack(_) => Err(PublishFailure::Nack),
            _ => Ok(()),
        }
    }

    async fn reopen(&mut self) -> Result<(), lapin::Error> {
        let (connection, channel) = open_confirmed_channel(&self.broker_url).await?;
        self.connection = connection;
        self.channel = channel;
        debug!("broker connection re-established");
        Ok(())
    }
}

#[async_trait]
impl ReadingSink for BrokerPublisher {
    async fn deliver(&mut self, reading: &Reading) -> Result<(), SimError> {
        self.publish(reading).await
    }
}

async fn open_confirmed_channel(
    broker_url: &str,
) -> Result<(Connection, Channel), lapin::Error> {
    let connection = Connection::connect(broker_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await?;
    channel
        .queue_declare(
            PRODUCTION_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok((connection, channel))
}

/// Failures worth retrying: the socket broke, the heartbeat lapsed, or the
/// transport state went stale after a drop. Protocol-level rejections
/// (authentication, misconfigured destination) are not.
fn is_transient(err: &lapin::Error) -> bool {
    matches!(
        err,
        lapin::Error::IOError(_)
            | lapin::Error::MissingHeartbeatError
            | lapin::Error::InvalidChannelState(_)
            | lapin::Error::InvalidConnectionState(_)
    )
}

#[derive(Debug, Error)]
enum PublishFailure {
    #[error("broker returned nack")]
    Nack,
    #[error("transport error: {0}")]
    Transport(lapin::Error),
}
