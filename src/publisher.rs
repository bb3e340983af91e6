use std::future::Future;

use futures_util::future::join_all;
use tracing::{error, info};

use crate::error::PublishError;

// SNS PublishBatch accepts at most 10 entries and 256 KiB per request
const MAX_BATCH_MESSAGES: usize = 10;
const MAX_BATCH_BYTES: usize = 256 * 1024;

/// A row payload on its way to the topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Unique within one request, e.g. `row-3`.
    pub id: String,
    pub data: String,
}

impl OutboundMessage {
    pub fn for_row(index: usize, data: String) -> Self {
        OutboundMessage {
            id: format!("row-{index}"),
            data,
        }
    }
}

/// Limits for grouping messages into a single publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub max_messages: usize,
    pub max_bytes: usize,
}

impl BatchSettings {
    pub fn new(max_messages: usize, max_bytes: usize) -> Self {
        BatchSettings {
            max_messages: max_messages.clamp(1, MAX_BATCH_MESSAGES),
            max_bytes: max_bytes.clamp(1, MAX_BATCH_BYTES),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            max_messages: 10,
            max_bytes: 1024,
        }
    }
}

/// Result of publishing one message of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub id: String,
    /// Broker-assigned message id on success.
    pub result: Result<String, PublishError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub published: usize,
    pub failed: usize,
}

/// Sends a batch of messages to a topic, yielding one outcome per message.
pub trait Publisher: Send + Sync {
    fn publish_batch(
        &self,
        batch: Vec<OutboundMessage>,
    ) -> impl Future<Output = Vec<PublishOutcome>> + Send;
}

/// Splits messages, in order, into batches within the configured limits.
/// A message larger than `max_bytes` travels alone.
pub fn batch_messages(
    messages: Vec<OutboundMessage>,
    settings: &BatchSettings,
) -> Vec<Vec<OutboundMessage>> {
    let mut batches = Vec::new();
    let mut current: Vec<OutboundMessage> = Vec::new();
    let mut current_bytes = 0;

    for message in messages {
        let size = message.data.len();
        let full = current.len() >= settings.max_messages
            || current_bytes + size > settings.max_bytes;
        if !current.is_empty() && full {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(message);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Publishes every message and waits until all batches have been acknowledged
/// or have failed.
pub async fn publish_all<P: Publisher>(
    publisher: &P,
    settings: &BatchSettings,
    messages: Vec<OutboundMessage>,
) -> PublishSummary {
    let batches = batch_messages(messages, settings);
    let outcomes = join_all(batches.into_iter().map(|batch| publisher.publish_batch(batch))).await;

    let mut summary = PublishSummary::default();
    for outcome in outcomes.into_iter().flatten() {
        match outcome.result {
            Ok(message_id) => {
                info!(entry = %outcome.id, message_id = %message_id, "Message published");
                summary.published += 1;
            }
            Err(e) => {
                error!(entry = %outcome.id, error = %e, "Failed to publish message");
                summary.failed += 1;
            }
        }
    }
    summary
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingPublisher, SlowPublisher};
    use super::*;
    use std::time::Duration;

    fn messages(sizes: &[usize]) -> Vec<OutboundMessage> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| OutboundMessage::for_row(i, "x".repeat(*size)))
            .collect()
    }

    fn ids(batches: &[Vec<OutboundMessage>]) -> Vec<Vec<&str>> {
        batches
            .iter()
            .map(|b| b.iter().map(|m| m.id.as_str()).collect())
            .collect()
    }

    #[test]
    fn settings_are_clamped_to_broker_limits() {
        assert_eq!(BatchSettings::new(0, 0), BatchSettings::new(1, 1));
        let wide = BatchSettings::new(100, usize::MAX);
        assert_eq!(wide.max_messages, 10);
        assert_eq!(wide.max_bytes, 256 * 1024);
    }

    #[test]
    fn batches_split_on_message_count() {
        let settings = BatchSettings::new(2, 1024);
        let batches = batch_messages(messages(&[1, 1, 1, 1, 1]), &settings);

        assert_eq!(
            ids(&batches),
            vec![vec!["row-0", "row-1"], vec!["row-2", "row-3"], vec!["row-4"]]
        );
    }

    #[test]
    fn batches_split_on_bytes_and_oversized_messages_travel_alone() {
        let settings = BatchSettings::new(10, 10);
        let batches = batch_messages(messages(&[4, 6, 1, 25, 3]), &settings);

        assert_eq!(
            ids(&batches),
            vec![vec!["row-0", "row-1"], vec!["row-2"], vec!["row-3"], vec!["row-4"]]
        );
    }

    #[test]
    fn no_messages_means_no_batches() {
        assert!(batch_messages(Vec::new(), &BatchSettings::default()).is_empty());
    }

    #[tokio::test]
    async fn publish_all_waits_for_every_batch_and_counts_failures() {
        let publisher = RecordingPublisher::failing(&["row-3"]);
        let settings = BatchSettings::new(2, 1024);

        let summary = publish_all(&publisher, &settings, messages(&[1, 1, 1, 1, 1])).await;

        assert_eq!(summary, PublishSummary { published: 4, failed: 1 });
        assert_eq!(publisher.batches.lock().unwrap().len(), 3);
        assert_eq!(publisher.published(), messages(&[1, 1, 1, 1, 1]));
    }

    #[tokio::test]
    async fn publish_all_sends_batches_concurrently_and_waits_for_slow_acks() {
        let publisher = SlowPublisher::failing(Duration::from_millis(50), &["row-1"]);
        let settings = BatchSettings::new(2, 1024);

        let summary = publish_all(&publisher, &settings, messages(&[1, 1, 1, 1, 1, 1, 1])).await;

        assert_eq!(summary, PublishSummary { published: 6, failed: 1 });
        assert_eq!(publisher.settled(), 7);
        assert_eq!(publisher.recorded.batches.lock().unwrap().len(), 4);
        assert_eq!(publisher.max_in_flight(), 4);
    }
}
