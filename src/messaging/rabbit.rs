//! RabbitMQ publisher

use super::error::{MessagingError, MessagingResult};
use super::EventPublisher;
use crate::config::{ExchangeType, RabbitSession};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

const CONTENT_TYPE: &str = "application/json";

fn exchange_kind(kind: ExchangeType) -> ExchangeKind {
    match kind {
        ExchangeType::Fanout => ExchangeKind::Fanout,
        ExchangeType::Topic => ExchangeKind::Topic,
        ExchangeType::Direct => ExchangeKind::Direct,
        ExchangeType::Headers => ExchangeKind::Headers,
    }
}

/// A broker nack fails the publish; acks and returned messages pass
fn check_confirmation(
    confirmation: Confirmation,
    exchange: &str,
    routing_key: &str,
) -> MessagingResult<()> {
    if confirmation.is_nack() {
        return Err(MessagingError::Nacked {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        });
    }
    Ok(())
}

/// Connection URI for a session; credentials never appear in its Display
fn connection_uri(session: &RabbitSession) -> AMQPUri {
    AMQPUri {
        scheme: AMQPScheme::AMQP,
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: session.user.clone(),
                password: session.password.clone(),
            },
            host: session.host.clone(),
            port: session.port,
        },
        vhost: session.vhost.clone(),
        query: AMQPQueryString {
            heartbeat: Some(session.heartbeat),
            ..AMQPQueryString::default()
        },
    }
}

fn endpoint(session: &RabbitSession) -> String {
    format!(
        "amqp://{}@{}:{}/{}",
        session.user,
        session.host,
        session.port,
        session.vhost.trim_start_matches('/')
    )
}

/// Publishes to a declared exchange over one AMQP channel in confirm mode
pub struct RabbitPublisher {
    connection: Connection,
    channel: Channel,
    exchange: String,
}

impl RabbitPublisher {
    /// Connect and declare the configured exchange
    pub async fn connect(session: &RabbitSession) -> MessagingResult<Self> {
        let endpoint = endpoint(session);
        log::debug!("Initialising new RabbitMQ connection to {}", endpoint);

        let connection = Connection::connect_uri(connection_uri(session), ConnectionProperties::default())
            .await
            .map_err(|source| MessagingError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;

        let exchange = session.exchange.name.clone();
        let amqp = |operation: &'static str| {
            let exchange = exchange.clone();
            move |source| MessagingError::Amqp {
                operation,
                exchange,
                source,
            }
        };

        let channel = connection
            .create_channel()
            .await
            .map_err(amqp("channel open"))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(amqp("confirm select"))?;

        let options = &session.exchange.options;
        channel
            .exchange_declare(
                &exchange,
                exchange_kind(session.exchange.kind),
                ExchangeDeclareOptions {
                    durable: options.durable,
                    auto_delete: options.auto_delete,
                    internal: options.internal,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(amqp("exchange declare"))?;

        log::info!(
            "Connected to RabbitMQ at {}, exchange '{}' ({:?})",
            endpoint,
            exchange,
            session.exchange.kind
        );
        Ok(Self {
            connection,
            channel,
            exchange,
        })
    }
}

#[async_trait]
impl EventPublisher for RabbitPublisher {
    fn exchange(&self) -> &str {
        &self.exchange
    }

    async fn publish_bytes(&self, routing_key: &str, body: Vec<u8>) -> MessagingResult<()> {
        log::debug!(
            "Publishing message to exchange {}, with routing key {}",
            self.exchange,
            routing_key
        );
        let failed = |operation: &'static str| {
            let exchange = self.exchange.clone();
            move |source| MessagingError::Amqp {
                operation,
                exchange,
                source,
            }
        };

        let confirmation = self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_content_type(CONTENT_TYPE.into()),
            )
            .await
            .map_err(failed("publish"))?
            .await
            .map_err(failed("publish confirm"))?;
        check_confirmation(confirmation, &self.exchange, routing_key)
    }

    async fn close(&self) -> MessagingResult<()> {
        log::debug!("Closing RabbitMQ connection.");
        self.connection
            .close(200, "OK")
            .await
            .map_err(|source| MessagingError::Amqp {
                operation: "connection close",
                exchange: self.exchange.clone(),
                source,
            })
    }
}
