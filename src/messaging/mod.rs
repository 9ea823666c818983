//! Stocktake event publishing
//!
//! [`EventPublisher`] is implemented by [`RabbitPublisher`] for a broker and by
//! [`FanoutExchange`] in process. Both deliver every message to every bound
//! queue of a fanout exchange; the routing key is carried along but does not
//! select queues.

pub mod error;
pub mod event;
pub mod exchange;
pub mod rabbit;

pub use error::{MessagingError, MessagingResult};
pub use event::StocktakeEvent;
pub use exchange::{BoundQueue, Delivery, FanoutExchange};
pub use rabbit::RabbitPublisher;

use async_trait::async_trait;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Name of the exchange messages go to
    fn exchange(&self) -> &str;

    async fn publish_bytes(&self, routing_key: &str, body: Vec<u8>) -> MessagingResult<()>;

    async fn publish_event(&self, routing_key: &str, event: &StocktakeEvent) -> MessagingResult<()> {
        let body = serde_json::to_vec(event)?;
        self.publish_bytes(routing_key, body).await
    }

    async fn close(&self) -> MessagingResult<()> {
        Ok(())
    }
}
