//! Location service boundary: update requests, delivered batches, and a
//! replaying service for recorded fixes.
//!
//! Delivery itself is the platform's business. The overlay only needs a way to
//! start and stop updates ([`LocationService`]) and a batch type to ingest
//! ([`LocationResult`]). A [`Subscription`] stops updates when dropped, so a
//! screen that goes away cannot leave the service running.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::consts::DEFAULT_UPDATE_INTERVAL_MS;
use crate::error::OverlayError;
use crate::location::Fix;

/// Identifier for an active update subscription.
pub type SubscriptionId = Uuid;

/// Power/accuracy trade-off requested from the location service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
    Passive,
}

/// Parameters for a location update subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub priority: Priority,
    pub interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self { priority: Priority::HighAccuracy, interval: Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS) }
    }
}

/// One delivery from the location service, oldest fix first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub fixes: Vec<Fix>,
}

impl LocationResult {
    #[must_use]
    pub fn new(fixes: Vec<Fix>) -> Self {
        Self { fixes }
    }

    /// The most recent fix in the delivery.
    #[must_use]
    pub fn last_fix(&self) -> Option<Fix> {
        self.fixes.last().copied()
    }
}

/// Platform location service.
pub trait LocationService {
    /// Start delivering updates.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::PermissionUnavailable`] when the user has not
    /// granted location access.
    fn request_location_updates(&self, request: &LocationRequest) -> Result<SubscriptionId, OverlayError>;

    /// Stop delivering updates for `id`. Unknown ids are ignored.
    fn remove_location_updates(&self, id: SubscriptionId);
}

/// An active subscription; removes its updates when dropped.
pub struct Subscription<'a, L: LocationService + ?Sized> {
    service: &'a L,
    id: SubscriptionId,
}

impl<'a, L: LocationService + ?Sized> Subscription<'a, L> {
    /// Request updates from `service`.
    ///
    /// # Errors
    ///
    /// Propagates the service's error, typically
    /// [`OverlayError::PermissionUnavailable`].
    pub fn start(service: &'a L, request: &LocationRequest) -> Result<Self, OverlayError> {
        let id = service.request_location_updates(request)?;
        debug!(%id, interval = ?request.interval, "location updates requested");
        Ok(Self { service, id })
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl<L: LocationService + ?Sized> Drop for Subscription<'_, L> {
    fn drop(&mut self) {
        self.service.remove_location_updates(self.id);
        debug!(id = %self.id, "location updates removed");
    }
}

/// Replays recorded deliveries, one per [`next_result`](Self::next_result) call,
/// while a subscription is active.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    pending: RefCell<VecDeque<LocationResult>>,
    active: Cell<Option<(SubscriptionId, LocationRequest)>>,
    permission_denied: bool,
}

impl ReplayFeed {
    #[must_use]
    pub fn new(results: Vec<LocationResult>) -> Self {
        Self { pending: RefCell::new(results.into()), ..Self::default() }
    }

    /// One delivery per fix.
    #[must_use]
    pub fn from_fixes(fixes: Vec<Fix>) -> Self {
        Self::new(fixes.into_iter().map(|fix| LocationResult::new(vec![fix])).collect())
    }

    /// Parse a JSON array of fixes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the input is not an array of fixes.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fixes: Vec<Fix> = serde_json::from_str(json)?;
        Ok(Self::from_fixes(fixes))
    }

    /// Simulate a user who refused location access.
    #[must_use]
    pub fn deny_permission(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get().is_some()
    }

    /// The request of the active subscription.
    #[must_use]
    pub fn request(&self) -> Option<LocationRequest> {
        self.active.get().map(|(_, request)| request)
    }

    /// Deliveries not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Next delivery, or `None` when drained or no subscription is active.
    #[must_use]
    pub fn next_result(&self) -> Option<LocationResult> {
        if !self.is_active() {
            return None;
        }
        self.pending.borrow_mut().pop_front()
    }
}

impl LocationService for ReplayFeed {
    fn request_location_updates(&self, request: &LocationRequest) -> Result<SubscriptionId, OverlayError> {
        if self.permission_denied {
            warn!("location permission denied; overlay will stay without a fix");
            return Err(OverlayError::PermissionUnavailable);
        }
        let id = Uuid::new_v4();
        self.active.set(Some((id, *request)));
        Ok(id)
    }

    fn remove_location_updates(&self, id: SubscriptionId) {
        if self.active.get().is_some_and(|(active, _)| active == id) {
            self.active.set(None);
        }
    }
}
