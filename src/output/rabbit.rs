//! Asset publishing sink

use super::error::OutputResult;
use super::OutputSink;
use crate::generator::Asset;
use crate::messaging::EventPublisher;
use async_trait::async_trait;
use std::sync::Arc;

/// Publishes each asset as a JSON message
pub struct RabbitSink {
    name: String,
    publisher: Arc<dyn EventPublisher>,
    routing_key: String,
}

impl RabbitSink {
    pub fn new(publisher: Arc<dyn EventPublisher>, routing_key: impl Into<String>) -> Self {
        Self {
            name: format!("rabbit_mq:{}", publisher.exchange()),
            publisher,
            routing_key: routing_key.into(),
        }
    }
}

#[async_trait]
impl OutputSink for RabbitSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> OutputResult<()> {
        Ok(())
    }

    async fn write(&mut self, assets: &[Asset]) -> OutputResult<()> {
        for asset in assets {
            let body = serde_json::to_vec(asset)?;
            self.publisher.publish_bytes(&self.routing_key, body).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
