//! Message-queue writer over the Kafka REST proxy (v2 JSON API).
//!
//! Records are buffered on a bounded channel and delivered in batches by a
//! background flusher. Releasing the writer closes the channel and waits for
//! the flusher to deliver everything still buffered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::config::QueueSettings;
use crate::resources::error::{BackendError, QueueError, ReleaseError};
use crate::resources::{endpoint_url, BackendKind, Resource};

const PRODUCE_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";
const METADATA_ACCEPT: &str = "application/vnd.kafka.v2+json";

/// One record as accepted by the REST proxy produce endpoint.
#[derive(Debug, Clone, Serialize)]
struct QueueRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: &'a [QueueRecord],
}

/// Buffered writer for a single topic.
#[derive(Debug)]
pub struct QueueWriter {
    topic: String,
    sender: Mutex<Option<mpsc::Sender<QueueRecord>>>,
    flusher: Mutex<Option<JoinHandle<usize>>>,
    released: AtomicBool,
}

impl QueueWriter {
    /// Check that the proxy serves the topic, then start the flusher.
    pub(crate) async fn connect(settings: &QueueSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let topic_url = endpoint_url(&settings.endpoint, &format!("topics/{}", settings.topic))?;

        let response = client
            .get(topic_url.clone())
            .header(ACCEPT, METADATA_ACCEPT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let batch_size = settings.batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size * 4);
        let flusher = tokio::spawn(run_flusher(
            client,
            topic_url,
            rx,
            batch_size,
            Duration::from_millis(settings.flush_interval_ms.max(1)),
        ));

        tracing::info!(
            endpoint = %settings.endpoint,
            topic = %settings.topic,
            batch_size,
            "Queue writer ready"
        );

        Ok(Self {
            topic: settings.topic.clone(),
            sender: Mutex::new(Some(tx)),
            flusher: Mutex::new(Some(flusher)),
            released: AtomicBool::new(false),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the writer still accepts records.
    pub fn is_open(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }

    /// Enqueue a record for delivery. Waits when the buffer is full.
    pub async fn send(
        &self,
        key: Option<String>,
        value: serde_json::Value,
    ) -> Result<(), QueueError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(QueueError::Released)?;

        sender
            .send(QueueRecord { key, value })
            .await
            .map_err(|_| QueueError::Released)
    }
}

#[async_trait]
impl Resource for QueueWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::Queue
    }

    async fn release(&self) -> Result<(), ReleaseError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Dropping the last sender lets the flusher drain and exit.
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let flusher = self
            .flusher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(flusher) = flusher {
            let undelivered = flusher.await?;
            if undelivered > 0 {
                return Err(ReleaseError::Undelivered { undelivered });
            }
        }
        Ok(())
    }
}

/// Deliver buffered records until the channel closes. Returns the number of undelivered records.
async fn run_flusher(
    client: reqwest::Client,
    url: Url,
    mut rx: mpsc::Receiver<QueueRecord>,
    batch_size: usize,
    interval: Duration,
) -> usize {
    let mut buffer = Vec::with_capacity(batch_size);
    let mut undelivered = 0;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(record) => {
                    buffer.push(record);
                    if buffer.len() >= batch_size {
                        undelivered += flush(&client, &url, &mut buffer).await;
                    }
                }
                None => {
                    undelivered += flush(&client, &url, &mut buffer).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                undelivered += flush(&client, &url, &mut buffer).await;
            }
        }
    }

    tracing::debug!(undelivered, "Queue flusher stopped");
    undelivered
}

async fn flush(client: &reqwest::Client, url: &Url, buffer: &mut Vec<QueueRecord>) -> usize {
    if buffer.is_empty() {
        return 0;
    }

    let count = buffer.len();
    let result = client
        .post(url.clone())
        .header(CONTENT_TYPE, PRODUCE_CONTENT_TYPE)
        .json(&ProduceRequest { records: buffer.as_slice() })
        .send()
        .await;
    buffer.clear();

    match result {
        Ok(response) if response.status().is_success() => {
            tracing::trace!(count, "Queue batch delivered");
            0
        }
        Ok(response) => {
            tracing::error!(count, status = %response.status(), "Queue batch rejected");
            count
        }
        Err(e) => {
            tracing::error!(count, error = %e, "Queue batch delivery failed");
            count
        }
    }
}
