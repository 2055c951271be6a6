use bevy_ecs::prelude::{Component, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStatus {
    Searching,
    SelectingDriver,
    Matched,
    Arriving,
    InProgress,
    Completed,
}

impl RideStatus {
    /// Wire/export name, matching the backend's status strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Searching => "searching",
            RideStatus::SelectingDriver => "selectingDriver",
            RideStatus::Matched => "matched",
            RideStatus::Arriving => "arriving",
            RideStatus::InProgress => "inProgress",
            RideStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

#[derive(Debug, Clone, Component)]
pub struct Ride {
    pub status: RideStatus,
    pub user_id: String,
    pub pickup: String,
    pub dropoff: String,
    pub payment_method: PaymentMethod,
    /// Set once when a driver is assigned; immutable until the ride ends.
    pub assigned_driver: Option<Entity>,
    /// Advances by 1 per second tick, only while the ride is InProgress.
    pub elapsed_seconds: u64,
    /// Advances only while InProgress and the data simulation is active.
    pub data_used_during_ride_mb: f64,
    /// Fixed at creation; the data charge is added on top at completion.
    pub base_fare: f64,
    pub distance_km: f64,
    pub duration_min: u64,
    /// Identifier returned by the persistence collaborator, if it was reachable.
    pub backend_id: Option<String>,
    /// Simulation time when the ride was requested.
    pub requested_at: u64,
    pub matched_at: Option<u64>,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Component)]
pub struct Driver {
    pub name: String,
    pub rating: f64,
    pub vehicle: String,
    pub license_plate: String,
    pub status: DriverStatus,
}

/// Drivers offered to the rider while the ride sits in SelectingDriver.
#[derive(Debug, Clone, Default, Component)]
pub struct AvailableDrivers(pub Vec<Entity>);
