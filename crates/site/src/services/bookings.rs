//! Booking records for the signed-in visitor.
//!
//! Every platform call carries the visitor's access token, so which rows are
//! visible or changeable is decided by the platform's policies. Booking lists
//! are cached per user for a minute and dropped whenever a booking of that
//! user is created or cancelled, or the user signs out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use haven_core::{
    Booking, BookingId, BookingRequest, GuestCount, GuestCountError, RoomId, StayDates, StayError,
    UserId,
};

use crate::error::add_breadcrumb;
use crate::platform::{BookingStore, PlatformError};
use crate::services::auth::{AuthEvent, AuthEvents, SessionContext};
use crate::services::rooms::{CatalogError, RoomCatalog};

/// Booking errors.
#[derive(Debug, Error)]
pub enum BookingError {
    /// No signed-in identity; nothing was written.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid guest count: {0}")]
    Guests(#[from] GuestCountError),

    #[error("invalid dates: {0}")]
    Stay(#[from] StayError),

    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("room is not available: {0}")]
    RoomUnavailable(RoomId),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl From<CatalogError> for BookingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::RoomNotFound(id),
            CatalogError::Platform(e) => Self::Platform(e),
        }
    }
}

/// Booking form as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDraft {
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u8,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl BookingDraft {
    /// Validate the draft against the catalog and price it.
    ///
    /// The total is always computed from the room's current rate.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::RoomNotFound` or `BookingError::RoomUnavailable`
    /// for a room that cannot be booked, `BookingError::Stay` for dates that
    /// are in the past or cover no nights, and `BookingError::Guests` for a
    /// guest count outside 1 to 6 or above the room's capacity.
    pub async fn prepare(
        &self,
        catalog: &RoomCatalog,
        today: NaiveDate,
    ) -> Result<BookingRequest, BookingError> {
        let room = catalog.room(self.room_id).await?;
        if !room.available {
            return Err(BookingError::RoomUnavailable(room.id));
        }

        let stay = StayDates::starting_from(today, self.check_in, self.check_out)?;
        let guests = GuestCount::new(self.guests)?;
        if u32::from(guests.get()) > room.capacity {
            return Err(BookingError::Guests(GuestCountError::TooMany {
                max: u8::try_from(room.capacity).unwrap_or(u8::MAX),
            }));
        }

        Ok(BookingRequest::for_room(
            &room,
            stay,
            guests,
            self.special_requests.as_deref(),
        ))
    }
}

/// Lists, creates and cancels the visitor's bookings.
#[derive(Clone)]
pub struct BookingManager {
    inner: Arc<BookingManagerInner>,
}

struct BookingManagerInner {
    store: Arc<dyn BookingStore>,
    cache: Cache<UserId, Arc<Vec<Booking>>>,
    /// Bumped on every invalidation. A list fetched across a bump may predate
    /// the write and must not stay cached.
    generation: AtomicU64,
}

impl BookingManager {
    #[must_use]
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            inner: Arc::new(BookingManagerInner {
                store,
                cache,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// The visitor's bookings, newest first. Empty when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Platform` if the platform request fails.
    #[instrument(skip_all)]
    pub async fn list(&self, ctx: &SessionContext) -> Result<Vec<Booking>, BookingError> {
        let (Some(identity), Some(token)) = (ctx.identity(), ctx.access_token()) else {
            return Ok(Vec::new());
        };

        if let Some(bookings) = self.inner.cache.get(&identity.id).await {
            debug!(user_id = %identity.id, "Cache hit for bookings");
            return Ok(bookings.as_ref().clone());
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let bookings = self.inner.store.list_for_user(token, identity.id).await?;
        self.inner
            .cache
            .insert(identity.id, Arc::new(bookings.clone()))
            .await;
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(user_id = %identity.id, "Bookings changed during fetch, not caching");
            self.inner.cache.invalidate(&identity.id).await;
        }
        Ok(bookings)
    }

    /// Store a booking owned by the visitor.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotAuthenticated` without writing anything when
    /// nobody is signed in, and `BookingError::Platform` if the insert fails.
    #[instrument(skip_all, fields(room_id = %request.room_id))]
    pub async fn create(
        &self,
        ctx: &SessionContext,
        request: &BookingRequest,
    ) -> Result<Booking, BookingError> {
        let (Some(identity), Some(token)) = (ctx.identity(), ctx.access_token()) else {
            return Err(BookingError::NotAuthenticated);
        };

        let booking = self.inner.store.insert(token, identity.id, request).await?;
        self.invalidate(identity.id).await;

        let booking_id = booking.id.to_string();
        add_breadcrumb("booking", "Booking created", Some(&[("booking_id", booking_id.as_str())]));
        info!(booking_id = %booking.id, user_id = %identity.id, "Booking created");
        Ok(booking)
    }

    /// Mark a booking cancelled.
    ///
    /// Whether the visitor may cancel it is up to the platform; a booking they
    /// cannot see is left untouched. The cached lists of both the visitor and
    /// the booking's owner are dropped.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotAuthenticated` when nobody is signed in and
    /// `BookingError::Platform` if the update fails.
    #[instrument(skip(self, ctx))]
    pub async fn cancel(&self, ctx: &SessionContext, id: BookingId) -> Result<(), BookingError> {
        let (Some(identity), Some(token)) = (ctx.identity(), ctx.access_token()) else {
            return Err(BookingError::NotAuthenticated);
        };

        let owner = self.inner.store.cancel(token, id).await?;
        self.invalidate(identity.id).await;
        match owner {
            Some(owner) => {
                if owner != identity.id {
                    self.invalidate(owner).await;
                }
                info!(booking_id = %id, user_id = %identity.id, %owner, "Booking cancelled");
            }
            None => debug!(booking_id = %id, user_id = %identity.id, "No booking cancelled"),
        }
        Ok(())
    }

    /// Number of bookings the visitor can see.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotAuthenticated` when nobody is signed in and
    /// `BookingError::Platform` if the request fails.
    pub async fn count_visible(&self, ctx: &SessionContext) -> Result<usize, BookingError> {
        let token = ctx.access_token().ok_or(BookingError::NotAuthenticated)?;
        Ok(self.inner.store.count_visible(token).await?)
    }

    /// Drop the cached list for one user.
    pub async fn invalidate(&self, user_id: UserId) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cache.invalidate(&user_id).await;
    }

    /// Drop every cached list.
    pub async fn invalidate_all(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Drop cached lists when their owner signs out.
    ///
    /// Runs until the event channel closes.
    #[must_use]
    pub fn spawn_invalidation(&self, events: &AuthEvents) -> JoinHandle<()> {
        let manager = self.clone();
        let mut rx = events.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::SignedOut {
                        user_id: Some(user_id),
                    }) => manager.invalidate(user_id).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Auth events lagged, clearing booking cache");
                        manager.invalidate_all().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
