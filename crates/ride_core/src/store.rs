//! Persistence collaborator: a best-effort mirror of ride state.
//!
//! The core calls the store fire-and-forget. A failure is logged and surfaced
//! as a notice; it never rolls back or blocks local lifecycle progress — the
//! in-process state is the source of truth for the simulation.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;

use crate::ecs::{PaymentMethod, RideStatus};
use crate::pricing::CostBreakdown;
use crate::telemetry::{Notice, NoticeLog};

#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "ride store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// One ride as the backend remembers it.
#[derive(Debug, Clone)]
pub struct RideHistoryItem {
    pub ride_id: String,
    pub user_id: String,
    pub pickup: String,
    pub dropoff: String,
    pub status: RideStatus,
    pub payment_method: PaymentMethod,
    pub data_used_mb: f64,
    pub total_cost: Option<f64>,
    pub completed_at: Option<u64>,
}

pub trait RideStore: Send + Sync {
    fn create_ride(
        &self,
        user_id: &str,
        pickup: &str,
        dropoff: &str,
        payment_method: PaymentMethod,
    ) -> Result<String, StoreError>;

    fn update_ride_status(&self, ride_id: &str, status: RideStatus) -> Result<(), StoreError>;

    fn record_data_usage(&self, ride_id: &str, amount_mb: f64) -> Result<(), StoreError>;

    fn complete_ride(
        &self,
        ride_id: &str,
        cost: CostBreakdown,
        completed_at: u64,
    ) -> Result<(), StoreError>;

    /// Rides for one user, most recently completed first.
    fn ride_history(&self, user_id: &str) -> Result<Vec<RideHistoryItem>, StoreError>;

    /// Remaining MB on the session user's data plan, as the backend sees it.
    /// The session user is implied, the way an authenticated client SDK scopes
    /// its calls.
    fn user_data_balance(&self) -> Result<f64, StoreError>;

    /// Mirrors one session accrual tick to the backend.
    fn increment_user_data_usage(&self, amount_mb: f64) -> Result<(), StoreError>;
}

/// Resource wrapper for the store trait object.
#[derive(Resource)]
pub struct RideStoreResource(pub Box<dyn RideStore>);

impl RideStoreResource {
    pub fn new(store: Box<dyn RideStore>) -> Self {
        Self(store)
    }
}

impl std::ops::Deref for RideStoreResource {
    type Target = dyn RideStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Runs one store call fire-and-forget: on failure, log, push a notice, keep
/// going. Returns whether the call succeeded.
pub fn notify_store<F>(
    store: &RideStoreResource,
    notices: &mut NoticeLog,
    context: &str,
    op: F,
) -> bool
where
    F: FnOnce(&dyn RideStore) -> Result<(), StoreError>,
{
    match op(&**store) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("{context}: {err}");
            notices.push(Notice::CollaboratorUnavailable(context.to_string()));
            false
        }
    }
}

#[derive(Default)]
struct InMemoryState {
    rides: HashMap<String, RideHistoryItem>,
    user_used_mb: f64,
}

/// In-process store used by tests and the demo. Interior mutability because
/// systems reach it through a shared resource reference.
pub struct InMemoryRideStore {
    state: Mutex<InMemoryState>,
    next_id: AtomicU64,
    user_balance_mb: f64,
}

impl Default for InMemoryRideStore {
    fn default() -> Self {
        Self::with_user_balance(500.0)
    }
}

impl InMemoryRideStore {
    pub fn with_user_balance(balance_mb: f64) -> Self {
        Self {
            state: Mutex::default(),
            next_id: AtomicU64::new(0),
            user_balance_mb: balance_mb,
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut InMemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        f(&mut state)
    }
}

impl RideStore for InMemoryRideStore {
    fn create_ride(
        &self,
        user_id: &str,
        pickup: &str,
        dropoff: &str,
        payment_method: PaymentMethod,
    ) -> Result<String, StoreError> {
        let ride_id = format!("ride-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let item = RideHistoryItem {
            ride_id: ride_id.clone(),
            user_id: user_id.to_string(),
            pickup: pickup.to_string(),
            dropoff: dropoff.to_string(),
            status: RideStatus::Searching,
            payment_method,
            data_used_mb: 0.0,
            total_cost: None,
            completed_at: None,
        };
        self.with_state(|state| {
            state.rides.insert(ride_id.clone(), item);
            Ok(ride_id.clone())
        })
    }

    fn update_ride_status(&self, ride_id: &str, status: RideStatus) -> Result<(), StoreError> {
        self.with_state(|state| {
            let item = state
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| StoreError::Unavailable(format!("unknown ride {ride_id}")))?;
            item.status = status;
            Ok(())
        })
    }

    fn record_data_usage(&self, ride_id: &str, amount_mb: f64) -> Result<(), StoreError> {
        self.with_state(|state| {
            let item = state
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| StoreError::Unavailable(format!("unknown ride {ride_id}")))?;
            item.data_used_mb += amount_mb;
            Ok(())
        })
    }

    fn complete_ride(
        &self,
        ride_id: &str,
        cost: CostBreakdown,
        completed_at: u64,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let item = state
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| StoreError::Unavailable(format!("unknown ride {ride_id}")))?;
            item.status = RideStatus::Completed;
            item.total_cost = Some(cost.total_cost);
            item.completed_at = Some(completed_at);
            Ok(())
        })
    }

    fn ride_history(&self, user_id: &str) -> Result<Vec<RideHistoryItem>, StoreError> {
        self.with_state(|state| {
            let mut rides: Vec<RideHistoryItem> = state
                .rides
                .values()
                .filter(|item| item.user_id == user_id)
                .cloned()
                .collect();
            rides.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
            Ok(rides)
        })
    }

    fn user_data_balance(&self) -> Result<f64, StoreError> {
        self.with_state(|state| Ok((self.user_balance_mb - state.user_used_mb).max(0.0)))
    }

    fn increment_user_data_usage(&self, amount_mb: f64) -> Result<(), StoreError> {
        self.with_state(|state| {
            state.user_used_mb += amount_mb;
            Ok(())
        })
    }
}
