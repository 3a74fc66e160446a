//! In-process platform backend.
//!
//! Behaves like the hosted platform for everything the site relies on:
//! password accounts with optional email confirmation, opaque bearer tokens
//! with refresh, and the row policies on the tables (guests see and change
//! only their own bookings, roles and profile; admins see every booking).
//! Compiled for the test suites behind the `memory` feature.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use haven_core::{
    AppRole, Booking, BookingId, BookingRequest, BookingRoomSummary, BookingStatus, Email, Room,
    RoomFilter, RoomId, UserId, fallback_rooms,
};

use super::{
    AuthSession, BookingStore, Identity, IdentityProvider, PlatformError, Profile, ProfileStore,
    RolePolicy, RoomSource, SignUpOutcome, SignUpRequest, UserDirectory,
};
use crate::services::auth::AuthError;

/// Minimum password length enforced by the identity service.
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
    confirmed: bool,
}

#[derive(Debug)]
struct State {
    accounts: HashMap<UserId, Account>,
    access_tokens: HashMap<String, UserId>,
    /// Refresh token to the user and the access token issued alongside it.
    refresh_tokens: HashMap<String, (UserId, String)>,
    rooms: Vec<Room>,
    bookings: Vec<Booking>,
    roles: HashSet<(UserId, AppRole)>,
    profiles: HashMap<UserId, Profile>,
    require_confirmation: bool,
    token_lifetime_secs: i64,
    rooms_offline: bool,
}

impl State {
    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|account| {
            account
                .identity
                .email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }

    fn issue_session(&mut self, user: &Identity) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        self.access_tokens.insert(access_token.clone(), user.id);
        self.refresh_tokens
            .insert(refresh_token.clone(), (user.id, access_token.clone()));

        AuthSession {
            access_token,
            refresh_token,
            expires_in: self.token_lifetime_secs,
            obtained_at: Utc::now().timestamp(),
            user: user.clone(),
        }
    }

    fn caller(&self, access_token: &str) -> Result<UserId, PlatformError> {
        self.access_tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| api(401, "bad_jwt", "invalid JWT: unable to parse or verify signature"))
    }

    fn revoke(&mut self, user_id: UserId) {
        self.access_tokens.retain(|_, owner| *owner != user_id);
        self.refresh_tokens.retain(|_, (owner, _)| *owner != user_id);
    }

    fn is_admin(&self, user_id: UserId) -> bool {
        self.roles.contains(&(user_id, AppRole::Admin))
    }

    fn with_room(&self, mut booking: Booking) -> Booking {
        booking.room = self
            .rooms
            .iter()
            .find(|room| room.id == booking.room_id)
            .map(|room| BookingRoomSummary {
                name: room.name.clone(),
                category: room.category,
                price: room.price,
            });
        booking
    }
}

fn api(status: u16, code: &str, message: &str) -> PlatformError {
    PlatformError::Api {
        status,
        code: Some(code.to_owned()),
        message: message.to_owned(),
    }
}

/// Platform backend held entirely in memory.
#[derive(Debug)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    /// A platform whose `rooms` table holds the built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rooms(fallback_rooms())
    }

    /// A platform with the given rooms.
    #[must_use]
    pub fn with_rooms(rooms: Vec<Room>) -> Self {
        Self {
            state: Mutex::new(State {
                accounts: HashMap::new(),
                access_tokens: HashMap::new(),
                refresh_tokens: HashMap::new(),
                rooms,
                bookings: Vec::new(),
                roles: HashSet::new(),
                profiles: HashMap::new(),
                require_confirmation: false,
                token_lifetime_secs: 3600,
                rooms_offline: false,
            }),
        }
    }

    /// New sign-ups must confirm their email before signing in.
    #[must_use]
    pub fn requiring_email_confirmation(mut self) -> Self {
        self.state.get_mut().require_confirmation = true;
        self
    }

    /// Issue access tokens that live for `secs` seconds.
    #[must_use]
    pub fn with_token_lifetime(mut self, secs: i64) -> Self {
        self.state.get_mut().token_lifetime_secs = secs;
        self
    }

    /// Create a confirmed account directly.
    pub async fn add_user(&self, email: &Email, password: &str) -> Identity {
        let identity = Identity {
            id: UserId::random(),
            email: Some(email.as_str().to_owned()),
        };
        self.state.lock().await.accounts.insert(
            identity.id,
            Account {
                identity: identity.clone(),
                password: password.to_owned(),
                confirmed: true,
            },
        );
        identity
    }

    /// Mark an account's email as confirmed.
    pub async fn confirm_email(&self, user_id: UserId) {
        if let Some(account) = self.state.lock().await.accounts.get_mut(&user_id) {
            account.confirmed = true;
        }
    }

    /// Grant a role directly.
    pub async fn grant_role(&self, user_id: UserId, role: AppRole) {
        self.state.lock().await.roles.insert((user_id, role));
    }

    /// End every session of a user on the platform side, as an operator
    /// revoking access would.
    pub async fn revoke_sessions(&self, user_id: UserId) {
        self.state.lock().await.revoke(user_id);
    }

    /// Make room reads fail as if the platform were unreachable.
    pub async fn set_rooms_offline(&self, offline: bool) {
        self.state.lock().await.rooms_offline = offline;
    }

    /// Every stored booking, in insertion order.
    pub async fn bookings(&self) -> Vec<Booking> {
        self.state.lock().await.bookings.clone()
    }

    /// Number of live access tokens.
    pub async fn active_sessions(&self) -> usize {
        self.state.lock().await.access_tokens.len()
    }

    /// Stored profile for a user.
    pub async fn stored_profile(&self, user_id: UserId) -> Option<Profile> {
        self.state.lock().await.profiles.get(&user_id).cloned()
    }

    /// Whether a user can sign in with `password`.
    pub async fn password_matches(&self, user_id: UserId, password: &str) -> bool {
        self.state
            .lock()
            .await
            .accounts
            .get(&user_id)
            .is_some_and(|account| account.password == password)
    }
}

#[async_trait]
impl IdentityProvider for MemoryPlatform {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, AuthError> {
        let mut state = self.state.lock().await;
        let account = state
            .account_by_email(email.as_str())
            .filter(|account| account.password == password)
            .cloned()
            .ok_or_else(|| {
                AuthError::from_platform(api(400, "invalid_credentials", "Invalid login credentials"))
            })?;

        if !account.confirmed {
            return Err(AuthError::from_platform(api(
                400,
                "email_not_confirmed",
                "Email not confirmed",
            )));
        }
        Ok(state.issue_session(&account.identity))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::from_platform(api(
                422,
                "weak_password",
                "Password should be at least 6 characters.",
            )));
        }

        let mut state = self.state.lock().await;
        if state.account_by_email(request.email.as_str()).is_some() {
            return Err(AuthError::from_platform(api(
                422,
                "user_already_exists",
                "User already registered",
            )));
        }

        let identity = Identity {
            id: UserId::random(),
            email: Some(request.email.as_str().to_owned()),
        };
        let confirmed = !state.require_confirmation;
        state.accounts.insert(
            identity.id,
            Account {
                identity: identity.clone(),
                password: request.password.clone(),
                confirmed,
            },
        );
        state.profiles.insert(
            identity.id,
            Profile {
                user_id: identity.id,
                email: identity.email.clone(),
                first_name: Some(request.first_name.clone()),
                last_name: Some(request.last_name.clone()),
            },
        );

        if confirmed {
            Ok(SignUpOutcome::SignedIn(state.issue_session(&identity)))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(identity))
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let user_id = state.caller(access_token).map_err(AuthError::from_platform)?;
        state.revoke(user_id);
        Ok(())
    }

    async fn user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let state = self.state.lock().await;
        let user_id = state.caller(access_token).map_err(AuthError::from_platform)?;
        state
            .accounts
            .get(&user_id)
            .map(|account| account.identity.clone())
            .ok_or(AuthError::NotAuthenticated)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let mut state = self.state.lock().await;
        let (user_id, previous) = state.refresh_tokens.remove(refresh_token).ok_or_else(|| {
            AuthError::from_platform(api(
                400,
                "refresh_token_not_found",
                "Invalid Refresh Token: Refresh Token Not Found",
            ))
        })?;
        state.access_tokens.remove(&previous);
        let identity = state
            .accounts
            .get(&user_id)
            .map(|account| account.identity.clone())
            .ok_or(AuthError::NotAuthenticated)?;
        Ok(state.issue_session(&identity))
    }

    async fn ping(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[async_trait]
impl RoomSource for MemoryPlatform {
    async fn list_rooms(&self, filter: RoomFilter) -> Result<Vec<Room>, PlatformError> {
        let state = self.state.lock().await;
        if state.rooms_offline {
            return Err(api(503, "unavailable", "upstream connect error"));
        }
        Ok(filter.apply(&state.rooms))
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, PlatformError> {
        let state = self.state.lock().await;
        if state.rooms_offline {
            return Err(api(503, "unavailable", "upstream connect error"));
        }
        Ok(state.rooms.iter().find(|room| room.id == id).cloned())
    }
}

#[async_trait]
impl BookingStore for MemoryPlatform {
    async fn list_for_user(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Vec<Booking>, PlatformError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if caller != user_id && !state.is_admin(caller) {
            return Ok(Vec::new());
        }

        let mut bookings: Vec<Booking> = state
            .bookings
            .iter()
            .rev()
            .filter(|booking| booking.user_id == user_id)
            .map(|booking| state.with_room(booking.clone()))
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn insert(
        &self,
        access_token: &str,
        user_id: UserId,
        request: &BookingRequest,
    ) -> Result<Booking, PlatformError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if caller != user_id {
            return Err(api(
                403,
                "42501",
                "new row violates row-level security policy for table \"bookings\"",
            ));
        }
        if !state.rooms.iter().any(|room| room.id == request.room_id) {
            return Err(api(
                409,
                "23503",
                "insert or update on table \"bookings\" violates foreign key constraint \"bookings_room_id_fkey\"",
            ));
        }

        let booking = Booking {
            id: BookingId::random(),
            user_id,
            room_id: request.room_id,
            check_in: request.stay.check_in(),
            check_out: request.stay.check_out(),
            guests: u32::from(request.guests.get()),
            total_price: request.total_price.rounded(),
            status: BookingStatus::Pending,
            special_requests: request.special_requests.clone(),
            created_at: Utc::now(),
            room: None,
        };
        state.bookings.push(booking.clone());
        Ok(state.with_room(booking))
    }

    async fn cancel(
        &self,
        access_token: &str,
        id: BookingId,
    ) -> Result<Option<UserId>, PlatformError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let is_admin = state.is_admin(caller);

        // Rows hidden by policy are silently skipped, like an UPDATE matching nothing.
        Ok(state
            .bookings
            .iter_mut()
            .find(|booking| booking.id == id && (booking.user_id == caller || is_admin))
            .map(|booking| {
                booking.status = BookingStatus::Cancelled;
                booking.user_id
            }))
    }

    async fn count_visible(&self, access_token: &str) -> Result<usize, PlatformError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if state.is_admin(caller) {
            return Ok(state.bookings.len());
        }
        Ok(state
            .bookings
            .iter()
            .filter(|booking| booking.user_id == caller)
            .count())
    }
}

#[async_trait]
impl RolePolicy for MemoryPlatform {
    async fn has_role(
        &self,
        access_token: &str,
        user_id: UserId,
        role: AppRole,
    ) -> Result<bool, PlatformError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if caller != user_id && !state.is_admin(caller) {
            return Ok(false);
        }
        Ok(state.roles.contains(&(user_id, role)))
    }
}

#[async_trait]
impl ProfileStore for MemoryPlatform {
    async fn profile(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Option<Profile>, PlatformError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if caller != user_id && !state.is_admin(caller) {
            return Ok(None);
        }
        Ok(state.profiles.get(&user_id).cloned())
    }
}

#[async_trait]
impl UserDirectory for MemoryPlatform {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, PlatformError> {
        let state = self.state.lock().await;
        Ok(state
            .account_by_email(email.as_str())
            .map(|account| account.identity.clone()))
    }

    async fn create_user(&self, email: &Email, password: &str) -> Result<Identity, PlatformError> {
        let mut state = self.state.lock().await;
        if state.account_by_email(email.as_str()).is_some() {
            return Err(api(
                422,
                "email_exists",
                "A user with this email address has already been registered",
            ));
        }

        let identity = Identity {
            id: UserId::random(),
            email: Some(email.as_str().to_owned()),
        };
        state.accounts.insert(
            identity.id,
            Account {
                identity: identity.clone(),
                password: password.to_owned(),
                confirmed: true,
            },
        );
        Ok(identity)
    }

    async fn update_password(&self, user_id: UserId, password: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| api(404, "user_not_found", "User not found"))?;
        password.clone_into(&mut account.password);
        Ok(())
    }

    async fn upsert_role(&self, user_id: UserId, role: AppRole) -> Result<(), PlatformError> {
        self.grant_role(user_id, role).await;
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError> {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }
}
