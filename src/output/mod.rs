//! Output sinks for generated assets
//!
//! Every configured sink receives the same batch. [`FanoutWriter`] drives
//! them best-effort: a failing sink does not stop the others, and the
//! failures are reported together once every sink was tried.

pub mod error;
pub mod file;
pub mod rabbit;

pub use error::{OutputError, OutputResult};
pub use file::{JsonFileSink, TextFileSink};
pub use rabbit::RabbitSink;

use crate::config::{OutputMethod, OutputSettings};
use crate::generator::Asset;
use crate::messaging::EventPublisher;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait OutputSink: Send {
    /// `method:target`, used in logs and failure reports
    fn name(&self) -> &str;

    async fn open(&mut self) -> OutputResult<()>;

    async fn write(&mut self, assets: &[Asset]) -> OutputResult<()>;

    async fn close(&mut self) -> OutputResult<()>;
}

/// Build one sink per configured output
///
/// `publisher` and `routing_key` back the `rabbit_mq` method.
pub fn build_sinks(
    outputs: &[OutputSettings],
    publisher: Option<Arc<dyn EventPublisher>>,
    routing_key: &str,
) -> OutputResult<Vec<Box<dyn OutputSink>>> {
    outputs
        .iter()
        .map(|output| -> OutputResult<Box<dyn OutputSink>> {
            let filepath = || {
                output
                    .filepath
                    .as_deref()
                    .ok_or(OutputError::MissingFilepath {
                        method: output.method,
                    })
            };
            let sink: Box<dyn OutputSink> = match output.method {
                OutputMethod::JsonFile => Box::new(JsonFileSink::new(filepath()?)),
                OutputMethod::TextFile => Box::new(TextFileSink::new(filepath()?)),
                OutputMethod::RabbitMq => {
                    let publisher = publisher.clone().ok_or(OutputError::MissingPublisher)?;
                    Box::new(RabbitSink::new(publisher, routing_key))
                }
            };
            Ok(sink)
        })
        .collect()
}

pub struct FanoutWriter {
    sinks: Vec<Box<dyn OutputSink>>,
}

impl FanoutWriter {
    pub fn new(sinks: Vec<Box<dyn OutputSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    fn collect(&self, failures: Vec<String>) -> OutputResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(OutputError::Fanout {
                total: self.sinks.len(),
                failures,
            })
        }
    }

    pub async fn open_all(&mut self) -> OutputResult<()> {
        let mut failures = Vec::new();
        for sink in &mut self.sinks {
            if let Err(e) = sink.open().await {
                log::error!("Failed to open output {}: {}", sink.name(), e);
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }
        self.collect(failures)
    }

    pub async fn write_all(&mut self, assets: &[Asset]) -> OutputResult<()> {
        if assets.is_empty() {
            return Ok(());
        }
        let mut failures = Vec::new();
        for sink in &mut self.sinks {
            match sink.write(assets).await {
                Ok(()) => log::debug!("Wrote {} assets to {}", assets.len(), sink.name()),
                Err(e) => {
                    log::error!("Failed to write {} assets to {}: {}", assets.len(), sink.name(), e);
                    failures.push(format!("{}: {}", sink.name(), e));
                }
            }
        }
        self.collect(failures)
    }

    pub async fn close_all(&mut self) -> OutputResult<()> {
        let mut failures = Vec::new();
        for sink in &mut self.sinks {
            if let Err(e) = sink.close().await {
                log::warn!("Failed to close output {}: {}", sink.name(), e);
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }
        self.collect(failures)
    }
}
