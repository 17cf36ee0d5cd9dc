//! NATS intake for prediction batches

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Receives prediction batches on the request subject
pub struct RequestConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl RequestConsumer {
    pub fn new(client: Client, subject: &str, queue_group: Option<&str>) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group.map(str::to_string),
        }
    }

    /// Subscribe to the request subject, joining the queue group when one is
    /// configured so replicas share the load
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => {
                self.client
                    .queue_subscribe(self.subject.clone(), group.clone())
                    .await?
            }
            None => self.client.subscribe(self.subject.clone()).await?,
        };

        info!(
            subject = %self.subject,
            queue_group = ?self.queue_group,
            "Subscribed to request subject"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
