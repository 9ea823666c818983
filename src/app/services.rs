//! Connections to the external services named in the settings

use crate::config::Settings;
use crate::messaging::{EventPublisher, RabbitPublisher};
use crate::search::{ElasticClient, SearchBackend};
use crate::stocktake::StocktakeResult;
use std::sync::Arc;

pub struct Services {
    pub search: Arc<dyn SearchBackend>,
    /// Present when the settings carry a RABBIT section
    pub publisher: Option<Arc<dyn EventPublisher>>,
}

impl Services {
    pub async fn connect(settings: &Settings) -> StocktakeResult<Self> {
        let client = ElasticClient::from_session(&settings.elasticsearch.session)?;
        log::debug!("Elasticsearch hosts: {}", client.hosts().join(", "));

        let publisher: Option<Arc<dyn EventPublisher>> = match &settings.rabbit {
            Some(rabbit) => Some(Arc::new(RabbitPublisher::connect(&rabbit.session).await?)),
            None => {
                log::info!("No RABBIT section; stocktake events are not published");
                None
            }
        };

        Ok(Self {
            search: Arc::new(client),
            publisher,
        })
    }

    /// Close the broker connection, if any
    pub async fn shutdown(&self) {
        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.close().await {
                log::warn!("Failed to close connection to exchange {}: {}", publisher.exchange(), e);
            }
        }
    }
}
