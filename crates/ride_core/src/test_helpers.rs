//! Shared fixtures for unit tests and the demo. Behind the `test-helpers`
//! feature so downstream builds can drop them.

use crate::commands::RideRequest;
use crate::ecs::{PaymentMethod, RideStatus};
use crate::pricing::CostBreakdown;
use crate::store::{RideHistoryItem, RideStore, StoreError};

/// A valid, minimal ride request.
pub fn test_request() -> RideRequest {
    RideRequest {
        user_id: "user-1".to_string(),
        pickup: "123 Main St".to_string(),
        dropoff: "456 Market St".to_string(),
        payment_method: PaymentMethod::Cash,
    }
}

/// A store whose every call fails. Used to assert the core stays on the happy
/// path when the persistence collaborator is down.
#[derive(Default)]
pub struct FailingRideStore;

impl FailingRideStore {
    fn down<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

impl RideStore for FailingRideStore {
    fn create_ride(
        &self,
        _user_id: &str,
        _pickup: &str,
        _dropoff: &str,
        _payment_method: PaymentMethod,
    ) -> Result<String, StoreError> {
        self.down()
    }

    fn update_ride_status(&self, _ride_id: &str, _status: RideStatus) -> Result<(), StoreError> {
        self.down()
    }

    fn record_data_usage(&self, _ride_id: &str, _amount_mb: f64) -> Result<(), StoreError> {
        self.down()
    }

    fn complete_ride(
        &self,
        _ride_id: &str,
        _cost: CostBreakdown,
        _completed_at: u64,
    ) -> Result<(), StoreError> {
        self.down()
    }

    fn ride_history(&self, _user_id: &str) -> Result<Vec<RideHistoryItem>, StoreError> {
        self.down()
    }

    fn user_data_balance(&self) -> Result<f64, StoreError> {
        self.down()
    }

    fn increment_user_data_usage(&self, _amount_mb: f64) -> Result<(), StoreError> {
        self.down()
    }
}
