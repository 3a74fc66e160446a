//! Room catalog.
//!
//! Reads rooms from the platform and caches each filtered list for five
//! minutes. When the platform cannot be reached the built-in catalog is
//! served instead; fallback results are never cached so the live catalog
//! comes back as soon as the platform does.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use haven_core::{Room, RoomCategory, RoomFilter, RoomId, fallback_rooms};

use crate::platform::{PlatformError, RoomSource};

/// Rooms shown on the home page.
const FEATURED_COUNT: usize = 3;

/// Catalog lookup errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("room not found: {0}")]
    NotFound(RoomId),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Cached access to the room catalog.
#[derive(Clone)]
pub struct RoomCatalog {
    inner: Arc<RoomCatalogInner>,
}

struct RoomCatalogInner {
    source: Arc<dyn RoomSource>,
    cache: Cache<RoomFilter, Arc<Vec<Room>>>,
}

impl RoomCatalog {
    #[must_use]
    pub fn new(source: Arc<dyn RoomSource>) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(RoomCatalogInner { source, cache }),
        }
    }

    /// Rooms matching `filter`, cheapest first.
    ///
    /// Falls back to the built-in catalog if the platform request fails. An
    /// empty remote list is returned as-is.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: RoomFilter) -> Vec<Room> {
        if let Some(rooms) = self.inner.cache.get(&filter).await {
            debug!("Cache hit for room list");
            return rooms.as_ref().clone();
        }

        match self.inner.source.list_rooms(filter).await {
            Ok(rooms) => {
                self.inner
                    .cache
                    .insert(filter, Arc::new(rooms.clone()))
                    .await;
                rooms
            }
            Err(e) => {
                warn!(error = %e, "Room list unavailable, serving built-in catalog");
                filter.apply(&fallback_rooms())
            }
        }
    }

    /// Every room.
    pub async fn all(&self) -> Vec<Room> {
        self.list(RoomFilter::all()).await
    }

    /// Rooms that can currently be booked.
    pub async fn available(&self) -> Vec<Room> {
        self.list(RoomFilter::available()).await
    }

    /// Rooms of one tier.
    pub async fn by_category(&self, category: RoomCategory) -> Vec<Room> {
        self.list(RoomFilter::category(category)).await
    }

    /// The first few rooms of the catalog, for the home page.
    pub async fn featured(&self) -> Vec<Room> {
        let mut rooms = self.all().await;
        rooms.truncate(FEATURED_COUNT);
        rooms
    }

    /// A single room.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown ids and
    /// `CatalogError::Platform` when the platform fails and the id is not in
    /// the built-in catalog either.
    #[instrument(skip(self), fields(room_id = %id))]
    pub async fn room(&self, id: RoomId) -> Result<Room, CatalogError> {
        match self.inner.source.room(id).await {
            Ok(Some(room)) => Ok(room),
            Ok(None) => Err(CatalogError::NotFound(id)),
            Err(e) => {
                warn!(error = %e, "Room lookup failed, trying built-in catalog");
                fallback_rooms()
                    .into_iter()
                    .find(|room| room.id == id)
                    .ok_or(CatalogError::Platform(e))
            }
        }
    }
}
