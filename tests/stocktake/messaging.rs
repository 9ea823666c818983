//! Stocktake events on a fanout exchange

use crate::common::{badc_paths, Fixture, Layout};
use serde_json::Value;
use stac_stocktake::messaging::{BoundQueue, EventPublisher, FanoutExchange, StocktakeEvent};
use stac_stocktake::search::MemorySearch;
use std::sync::Arc;

fn bodies(queue: &BoundQueue) -> Vec<Vec<u8>> {
    queue
        .drain()
        .unwrap()
        .iter()
        .map(|delivery| delivery.body.clone())
        .collect()
}

#[tokio::test]
async fn test_fanout_delivery_ignores_routing_key() {
    let exchange = FanoutExchange::new("stac_stocktake");
    let indexer = exchange.bind("indexer").unwrap();
    let auditor = exchange.bind("auditor").unwrap();
    let publisher: Arc<dyn EventPublisher> = Arc::new(exchange.clone());

    let add = StocktakeEvent::Add {
        uri: "/badc/cru/a.nc".to_string(),
        slice: 0,
        chunk: 0,
    };
    let remove = StocktakeEvent::Remove {
        uri: "/badc/cru/old.nc".to_string(),
        slice: 0,
        chunk: 0,
    };
    publisher.publish_event("stac.stocktake", &add).await.unwrap();
    publisher.publish_event("something.else", &remove).await.unwrap();

    let indexer_bodies = bodies(&indexer);
    assert_eq!(indexer_bodies.len(), 2);
    assert_eq!(indexer_bodies, bodies(&auditor));

    let events: Vec<StocktakeEvent> = indexer_bodies
        .iter()
        .map(|body| serde_json::from_slice(body).unwrap())
        .collect();
    assert_eq!(events, vec![add, remove]);
}

#[tokio::test]
async fn test_run_publishes_events_and_assets_to_every_queue() {
    let fixture = Fixture::with_rabbit(Layout::unsliced());
    let paths = badc_paths("cru", 4);
    let search = MemorySearch::new()
        .with_files(paths.clone())
        .with_stac_uris([paths[0].clone()]);

    let exchange = FanoutExchange::new("stocktake-test");
    let first = exchange.bind("first").unwrap();
    let second = exchange.bind("second").unwrap();

    let stocktake = fixture
        .builder(&search)
        .publisher(Arc::new(exchange.clone()))
        .build()
        .unwrap();
    stocktake.run(false).await.unwrap();

    let deliveries = first.drain().unwrap();
    assert!(deliveries
        .iter()
        .all(|delivery| delivery.routing_key == "stac.stocktake"));
    assert_eq!(
        deliveries.iter().map(|d| d.body.clone()).collect::<Vec<_>>(),
        bodies(&second)
    );

    let messages: Vec<Value> = deliveries
        .iter()
        .map(|delivery| delivery.json().unwrap())
        .collect();
    let actions: Vec<&str> = messages
        .iter()
        .filter_map(|message| message["action"].as_str())
        .collect();
    let assets = messages
        .iter()
        .filter(|message| message.get("action").is_none())
        .count();

    assert_eq!(assets, 3, "rabbit_mq output publishes each generated asset");
    assert_eq!(actions.iter().filter(|a| **a == "add").count(), 3);
    assert!(actions.contains(&"summary"));
    assert!(!actions.contains(&"remove"));
}
