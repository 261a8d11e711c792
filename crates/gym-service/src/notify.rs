//! Booking notifications.
//!
//! Notifications are sent after a transaction commits and never affect its
//! outcome. [`dispatch`] runs the send on its own task; failures are logged
//! and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gym_core::{BookingId, MemberId, OccurrenceId, TrainerId};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::crypto::{hmac_sha256_hex, SIGNATURE_HEADER};

/// Header carrying a unique id per notification, stable across retries.
pub const DELIVERY_HEADER: &str = "x-gym-delivery";

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The receiver answered with a non-success status.
    #[error("webhook returned {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Who a notification is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Recipient {
    /// The member who holds the booking.
    Member(MemberId),
    /// Front-desk staff.
    Staff,
    /// The trainer assigned to the occurrence.
    Trainer(TrainerId),
}

/// A notification about a committed booking change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum Notification {
    /// A booking was made.
    BookingConfirmed {
        /// Booking.
        booking_id: BookingId,
        /// Member.
        member_id: MemberId,
        /// Occurrence.
        occurrence_id: OccurrenceId,
        /// Start instant.
        starts_at: DateTime<Utc>,
        /// Addressees.
        recipients: Vec<Recipient>,
    },
    /// A booking was cancelled and refunded.
    BookingCancelled {
        /// Booking.
        booking_id: BookingId,
        /// Member.
        member_id: MemberId,
        /// Occurrence.
        occurrence_id: OccurrenceId,
        /// Start instant.
        starts_at: DateTime<Utc>,
        /// `member` or `staff`.
        cancelled_by: &'static str,
        /// Addressees.
        recipients: Vec<Recipient>,
    },
}

impl Notification {
    /// Event name, for logs.
    #[must_use]
    pub const fn event(&self) -> &'static str {
        match self {
            Self::BookingConfirmed { .. } => "booking_confirmed",
            Self::BookingCancelled { .. } => "booking_cancelled",
        }
    }

    /// The booking this notification is about.
    #[must_use]
    pub const fn booking_id(&self) -> BookingId {
        match self {
            Self::BookingConfirmed { booking_id, .. } | Self::BookingCancelled { booking_id, .. } => {
                *booking_id
            }
        }
    }
}

/// A destination for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            event = notification.event(),
            booking_id = %notification.booking_id(),
            "Notification"
        );
        Ok(())
    }
}

/// Backoff between webhook attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): doubles each time, capped.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Posts notifications as JSON to a webhook.
///
/// When a secret is set the body is signed with HMAC-SHA256 and the hex
/// digest sent in [`SIGNATURE_HEADER`].
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
    retry: RetryPolicy,
}

impl WebhookNotifier {
    /// Create a webhook notifier.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` for an empty URL and
    /// `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(NotifyError::Configuration("webhook URL is empty".into()));
        }
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            url,
            secret,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_once(&self, body: &[u8], delivery: &str) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(DELIVERY_HEADER, delivery)
            .body(body.to_vec());

        if let Some(secret) = &self.secret {
            let signature = hmac_sha256_hex(secret, body)
                .map_err(|e| NotifyError::Configuration(e.to_string()))?;
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// Whether a failed attempt is worth repeating.
fn is_retryable(err: &NotifyError) -> bool {
    match err {
        NotifyError::Http(_) => true,
        NotifyError::Rejected { status } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        NotifyError::Serialization(_) | NotifyError::Configuration(_) => false,
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(notification)?;
        let delivery = uuid::Uuid::new_v4().to_string();

        let mut attempt = 0;
        loop {
            match self.send_once(&body, &delivery).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.max_retries && is_retryable(&e) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::debug!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Notification delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Send `notification` on a background task. Failures are logged, not returned.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            tracing::warn!(
                error = %e,
                event = notification.event(),
                booking_id = %notification.booking_id(),
                "Notification dropped"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_signature;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn confirmed() -> Notification {
        let member = MemberId::generate();
        Notification::BookingConfirmed {
            booking_id: BookingId::generate(),
            member_id: member,
            occurrence_id: OccurrenceId::generate(),
            starts_at: "2026-10-20T18:00:00Z".parse().unwrap(),
            recipients: vec![Recipient::Member(member), Recipient::Staff],
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(1));
    }

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_value(confirmed()).unwrap();
        assert_eq!(json["event"], "booking_confirmed");
        assert_eq!(json["recipients"][1]["type"], "staff");
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            WebhookNotifier::new("  ", None),
            Err(NotifyError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn signs_body_when_secret_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/gym"))
            .and(header_exists(SIGNATURE_HEADER))
            .and(header_exists(DELIVERY_HEADER))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/hooks/gym", server.uri()), Some("s3cret".into()))
                .unwrap();
        notifier.notify(&confirmed()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let request = &received[0];
        let signature = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
        assert!(verify_signature("s3cret", &request.body, signature));
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), None)
            .unwrap()
            .with_retry(fast_retry());
        notifier.notify(&confirmed()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 3);
        // The delivery id is the same on every attempt.
        let ids: Vec<_> = received
            .iter()
            .map(|r| r.headers.get(DELIVERY_HEADER).unwrap().clone())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), None)
            .unwrap()
            .with_retry(fast_retry());
        let err = notifier.notify(&confirmed()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 400 }));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), None)
            .unwrap()
            .with_retry(fast_retry());
        assert!(notifier.notify(&confirmed()).await.is_err());
    }
}
