//! Point-in-time lifecycle

use crate::config::KeepAlive;
use crate::search::{SearchBackend, SearchResult};

/// A point in time on the FBI index
///
/// An owned PIT was opened by this process and is released by [`close`].
/// A borrowed PIT was handed in by an operator (`batch --pit`) and is
/// left open for whoever created it.
///
/// [`close`]: PointInTime::close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointInTime {
    id: String,
    keep_alive: KeepAlive,
    owned: bool,
}

impl PointInTime {
    pub async fn open(
        backend: &dyn SearchBackend,
        index: &str,
        keep_alive: &KeepAlive,
    ) -> SearchResult<Self> {
        let id = backend.open_point_in_time(index, keep_alive).await?;
        Ok(Self {
            id,
            keep_alive: keep_alive.clone(),
            owned: true,
        })
    }

    pub fn borrowed(id: impl Into<String>, keep_alive: &KeepAlive) -> Self {
        Self {
            id: id.into(),
            keep_alive: keep_alive.clone(),
            owned: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Adopt the id returned with the latest page
    pub fn refresh(&mut self, id: Option<String>) {
        if let Some(id) = id {
            if id != self.id {
                log::trace!("Point in time id refreshed");
                self.id = id;
            }
        }
    }

    pub async fn close(self, backend: &dyn SearchBackend) -> SearchResult<()> {
        if !self.owned {
            log::debug!("Leaving borrowed point in time open");
            return Ok(());
        }
        backend.close_point_in_time(&self.id).await
    }
}
