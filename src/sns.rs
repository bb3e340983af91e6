use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::types::{BatchResultErrorEntry, PublishBatchRequestEntry, PublishBatchResultEntry};
use aws_sdk_sns::Client;

use crate::error::PublishError;
use crate::publisher::{OutboundMessage, PublishOutcome, Publisher};

/// Publishes to one SNS topic with `PublishBatch`.
pub struct SnsPublisher {
    client: Client,
    topic_arn: String,
}

impl SnsPublisher {
    pub fn new(client: Client, topic_arn: impl Into<String>) -> Self {
        SnsPublisher {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

impl Publisher for SnsPublisher {
    async fn publish_batch(&self, batch: Vec<OutboundMessage>) -> Vec<PublishOutcome> {
        let ids: Vec<String> = batch.iter().map(|m| m.id.clone()).collect();

        let entries = batch
            .into_iter()
            .map(|m| PublishBatchRequestEntry::builder().id(m.id).message(m.data).build())
            .collect::<Result<Vec<_>, _>>();
        let entries = match entries {
            Ok(entries) => entries,
            Err(e) => return fail_all(ids, PublishError::InvalidEntry(e.to_string())),
        };

        let response = self
            .client
            .publish_batch()
            .topic_arn(&self.topic_arn)
            .set_publish_batch_request_entries(Some(entries))
            .send()
            .await;

        match response {
            Ok(output) => match_receipts(ids, output.successful(), output.failed()),
            Err(e) => fail_all(ids, PublishError::Request(DisplayErrorContext(&e).to_string())),
        }
    }
}

fn fail_all(ids: Vec<String>, error: PublishError) -> Vec<PublishOutcome> {
    ids.into_iter()
        .map(|id| PublishOutcome {
            id,
            result: Err(error.clone()),
        })
        .collect()
}

// One outcome per requested id, in request order
fn match_receipts(
    ids: Vec<String>,
    successful: &[PublishBatchResultEntry],
    failed: &[BatchResultErrorEntry],
) -> Vec<PublishOutcome> {
    ids.into_iter()
        .map(|id| {
            let result = if let Some(ok) = successful.iter().find(|e| e.id() == Some(id.as_str())) {
                Ok(ok.message_id().unwrap_or_default().to_string())
            } else if let Some(rejected) = failed.iter().find(|e| e.id() == id) {
                Err(PublishError::Rejected {
                    code: rejected.code().to_string(),
                    message: rejected.message().unwrap_or_default().to_string(),
                })
            } else {
                Err(PublishError::MissingReceipt)
            };
            PublishOutcome { id, result }
        })
        .collect()
}
