//! File sinks
//!
//! Both sinks append, one asset per line, so an interrupted run that is
//! resumed keeps what it already wrote.

use super::error::{OutputError, OutputResult};
use super::OutputSink;
use crate::generator::Asset;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Line formats of the file sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineFormat {
    /// One JSON asset object per line
    Json,
    /// `uri<TAB>collection_id<TAB>id`
    Text,
}

impl LineFormat {
    fn render(self, asset: &Asset) -> OutputResult<String> {
        Ok(match self {
            LineFormat::Json => serde_json::to_string(asset)?,
            LineFormat::Text => format!("{}\t{}\t{}", asset.uri(), asset.collection_id, asset.id),
        })
    }
}

struct LineFileSink {
    name: String,
    path: PathBuf,
    format: LineFormat,
    writer: Option<BufWriter<File>>,
}

impl LineFileSink {
    fn new(method: &str, path: &Path, format: LineFormat) -> Self {
        Self {
            name: format!("{method}:{}", path.display()),
            path: path.to_path_buf(),
            format,
            writer: None,
        }
    }

    fn io(&self, source: std::io::Error) -> OutputError {
        OutputError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn open(&mut self) -> OutputResult<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io(e))?;
        self.writer = Some(BufWriter::new(file));
        log::debug!("Opened output {}", self.name);
        Ok(())
    }

    async fn write(&mut self, assets: &[Asset]) -> OutputResult<()> {
        let mut buffer = String::new();
        for asset in assets {
            buffer.push_str(&self.format.render(asset)?);
            buffer.push('\n');
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(OutputError::NotOpen {
                name: self.name.clone(),
            });
        };
        let written = match writer.write_all(buffer.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| self.io(e))
    }

    async fn close(&mut self) -> OutputResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.map_err(|e| self.io(e))?;
        }
        Ok(())
    }
}

macro_rules! line_file_sink {
    ($(#[$doc:meta])* $sink:ident, $method:literal, $format:expr) => {
        $(#[$doc])*
        pub struct $sink(LineFileSink);

        impl $sink {
            pub fn new(path: impl AsRef<Path>) -> Self {
                Self(LineFileSink::new($method, path.as_ref(), $format))
            }

            pub fn path(&self) -> &Path {
                &self.0.path
            }
        }

        #[async_trait]
        impl OutputSink for $sink {
            fn name(&self) -> &str {
                &self.0.name
            }

            async fn open(&mut self) -> OutputResult<()> {
                self.0.open().await
            }

            async fn write(&mut self, assets: &[Asset]) -> OutputResult<()> {
                self.0.write(assets).await
            }

            async fn close(&mut self) -> OutputResult<()> {
                self.0.close().await
            }
        }
    };
}

line_file_sink!(
    /// Assets as JSON lines
    JsonFileSink,
    "json_file",
    LineFormat::Json
);

line_file_sink!(
    /// Assets as tab-separated `uri collection_id id` lines
    TextFileSink,
    "text_file",
    LineFormat::Text
);
