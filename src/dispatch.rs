//! Notification delivery, isolated from the rest of the pipeline.
//!
//! The [`Dispatcher`] fans a message out to resolved targets through an
//! opaque [`Notifier`] transport. Each target is attempted
//! independently (one failure never aborts the others), concurrency is
//! bounded by a worker count, every attempt has a timeout, and the
//! whole dispatch can be cancelled. Every target ends up in the
//! [`DispatchReport`] either as delivered or as failed with a reason;
//! nothing is silently dropped. The dispatcher knows nothing about the
//! audit store and cannot influence persisted state.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::config::RagtrackConfig;
use crate::error::TransportError;
use crate::escalation::EscalationTarget;

/// Opaque delivery capability: address + subject + body in, success or
/// failure out.
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

/// Why a single target was not delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DispatchFailure {
    /// The transport reported an error.
    Transport(String),
    /// The attempt exceeded the per-target timeout.
    Timeout,
    /// The dispatch was cancelled before or during the attempt.
    Cancelled,
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchFailure::Transport(reason) => write!(f, "transport error: {reason}"),
            DispatchFailure::Timeout => write!(f, "timed out"),
            DispatchFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-address outcome of one dispatch. Failures are kept per
/// recipient, never collapsed into a single opaque error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: BTreeSet<String>,
    pub failed: BTreeMap<String, DispatchFailure>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fan-out delivery with bounded concurrency, per-target timeout and
/// cooperative cancellation.
pub struct Dispatcher<N> {
    notifier: N,
    workers: usize,
    per_target_timeout: Duration,
}

impl<N: Notifier> Dispatcher<N> {
    pub fn new(notifier: N, workers: usize, per_target_timeout: Duration) -> Self {
        Self {
            notifier,
            workers: workers.max(1),
            per_target_timeout,
        }
    }

    pub fn from_config(notifier: N, config: &RagtrackConfig) -> Self {
        Self::new(
            notifier,
            config.dispatch_workers,
            Duration::from_millis(config.dispatch_timeout_ms),
        )
    }

    #[allow(dead_code)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Attempt delivery to every target. At-least-once semantics: a
    /// retry by the caller may duplicate a delivery, but no target is
    /// ever dropped from the report.
    pub async fn dispatch(
        &self,
        targets: &[EscalationTarget],
        subject: &str,
        body: &str,
        cancel: watch::Receiver<bool>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let mut attempts = futures::stream::iter(targets.iter().map(|target| {
            let mut cancel = cancel.clone();
            async move {
                if *cancel.borrow() {
                    return (target.address.clone(), Err(DispatchFailure::Cancelled));
                }
                let cancelled = async {
                    // A dropped sender means cancellation can no longer
                    // arrive; park this branch instead of firing it.
                    if cancel.wait_for(|c| *c).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };
                let outcome = tokio::select! {
                    _ = cancelled => Err(DispatchFailure::Cancelled),
                    attempt = timeout(
                        self.per_target_timeout,
                        self.notifier.send(&target.address, subject, body),
                    ) => match attempt {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(DispatchFailure::Transport(e.to_string())),
                        Err(_) => Err(DispatchFailure::Timeout),
                    },
                };
                (target.address.clone(), outcome)
            }
        }))
        .buffer_unordered(self.workers);

        while let Some((address, outcome)) = attempts.next().await {
            match outcome {
                Ok(()) => {
                    log::debug!("delivered notification to {address}");
                    report.delivered.insert(address);
                }
                Err(reason) => {
                    log::warn!("notification to {address} failed: {reason}");
                    report.failed.insert(address, reason);
                }
            }
        }

        report
    }
}

/// Simulated delivery: prints each mail to the terminal and always
/// succeeds. The default transport when no webhook URL is configured.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        println!("Sending email to: {address}");
        println!("Subject: {subject}");
        println!("Body: {body}");
        println!();
        Ok(())
    }
}

/// JSON envelope posted to the webhook sink.
#[derive(Debug, Serialize)]
struct WebhookEnvelope<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Delivery through an HTTP webhook: POSTs a JSON envelope per
/// recipient to the configured sink URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client, url }
    }
}

impl Notifier for WebhookNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let envelope = WebhookEnvelope {
            to: address,
            subject,
            body,
        };
        let response = self.client.post(&self.url).json(&envelope).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// The transport selected by configuration: webhook when a URL is set,
/// simulated console delivery otherwise.
pub enum AnyNotifier {
    Console(ConsoleNotifier),
    Webhook(WebhookNotifier),
}

impl AnyNotifier {
    pub fn from_config(config: &RagtrackConfig) -> Self {
        if config.webhook_url.is_empty() {
            AnyNotifier::Console(ConsoleNotifier)
        } else {
            AnyNotifier::Webhook(WebhookNotifier::new(config.webhook_url.clone()))
        }
    }
}

impl Notifier for AnyNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        match self {
            AnyNotifier::Console(n) => n.send(address, subject, body).await,
            AnyNotifier::Webhook(n) => n.send(address, subject, body).await,
        }
    }
}
