//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::Session;

use crate::config::SiteConfig;
use crate::platform::{BookingStore, IdentityProvider, ProfileStore, RolePolicy, RoomSource};
use crate::services::access::RoleGate;
use crate::services::auth::{AuthEvents, SessionContext};
use crate::services::bookings::BookingManager;
use crate::services::rooms::RoomCatalog;

/// The platform services the site talks to.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub rooms: Arc<dyn RoomSource>,
    pub bookings: Arc<dyn BookingStore>,
    pub roles: Arc<dyn RolePolicy>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Backend {
    /// Use one platform implementation for every service.
    #[must_use]
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: IdentityProvider + RoomSource + BookingStore + RolePolicy + ProfileStore + 'static,
    {
        Self {
            identity: platform.clone(),
            rooms: platform.clone(),
            bookings: platform.clone(),
            roles: platform.clone(),
            profiles: platform,
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    identity: Arc<dyn IdentityProvider>,
    events: AuthEvents,
    catalog: RoomCatalog,
    bookings: BookingManager,
    gate: RoleGate,
}

impl AppState {
    /// Create the application state.
    ///
    /// Spawns the task that drops cached booking lists on sign-out, so this
    /// must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(config: SiteConfig, backend: Backend) -> Self {
        let events = AuthEvents::new();
        let bookings = BookingManager::new(backend.bookings);
        // Runs for the life of the process; the sender lives in this state.
        drop(bookings.spawn_invalidation(&events));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity: backend.identity,
                events,
                catalog: RoomCatalog::new(backend.rooms),
                bookings,
                gate: RoleGate::new(backend.roles, backend.profiles),
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the room catalog.
    #[must_use]
    pub fn catalog(&self) -> &RoomCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the booking manager.
    #[must_use]
    pub fn bookings(&self) -> &BookingManager {
        &self.inner.bookings
    }

    /// Get a reference to the admin role gate.
    #[must_use]
    pub fn gate(&self) -> &RoleGate {
        &self.inner.gate
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// Build an unresolved session context for one request.
    #[must_use]
    pub fn session_context(&self, session: Session) -> SessionContext {
        SessionContext::new(
            session,
            self.inner.identity.clone(),
            self.inner.events.clone(),
        )
    }
}
