//! Replies to prediction requests

use crate::types::request::PredictionResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes prediction responses to the requester's reply subject
#[derive(Clone)]
pub struct ResponsePublisher {
    client: Client,
}

impl ResponsePublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn reply(&self, reply_to: Subject, response: &PredictionResponse) -> Result<()> {
        let payload = encode(response)?;

        self.client.publish(reply_to.clone(), payload.into()).await?;

        debug!(
            reply_to = %reply_to,
            error = response.is_error(),
            "Published prediction response"
        );

        Ok(())
    }
}

/// JSON body of a response
pub fn encode(response: &PredictionResponse) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}
