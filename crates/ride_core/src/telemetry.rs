//! Telemetry: read-only snapshots for the presentation layer, the notice log,
//! and completed-ride records.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::{PaymentMethod, RideStatus};
use crate::pricing::CostBreakdown;

/// Read-only view of one driver as shown to the rider.
#[derive(Debug, Clone)]
pub struct DriverProfile {
    pub entity: Entity,
    pub name: String,
    pub rating: f64,
    pub vehicle: String,
    pub license_plate: String,
}

/// Immutable snapshot of one ride at a point in time, captured after every
/// processed event. The presentation layer reads these; it never touches the
/// live components.
#[derive(Debug, Clone)]
pub struct RideSnapshot {
    pub timestamp_ms: u64,
    pub ride: Entity,
    pub status: RideStatus,
    pub pickup: String,
    pub dropoff: String,
    pub payment_method: PaymentMethod,
    pub assigned_driver: Option<DriverProfile>,
    pub available_drivers: Vec<DriverProfile>,
    pub elapsed_seconds: u64,
    pub data_used_during_ride_mb: f64,
    pub session_used_mb: f64,
    pub session_balance_mb: f64,
    pub cost: CostBreakdown,
}

/// Snapshot buffer configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SnapshotConfig {
    pub max_snapshots: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct RideSnapshots {
    pub snapshots: VecDeque<RideSnapshot>,
}

impl RideSnapshots {
    pub fn push(&mut self, snapshot: RideSnapshot, max_snapshots: usize) {
        if self.snapshots.len() >= max_snapshots {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn latest_for(&self, ride: Entity) -> Option<&RideSnapshot> {
        self.snapshots.iter().rev().find(|s| s.ride == ride)
    }

    /// Statuses in capture order for one ride, deduplicated consecutively.
    /// Handy for asserting the transition sequence.
    pub fn status_trace(&self, ride: Entity) -> Vec<RideStatus> {
        let mut trace: Vec<RideStatus> = Vec::new();
        for snapshot in self.snapshots.iter().filter(|s| s.ride == ride) {
            if trace.last() != Some(&snapshot.status) {
                trace.push(snapshot.status);
            }
        }
        trace
    }
}

/// Non-blocking user-visible notifications; the demo renders these as toasts.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    DriverFound(String),
    DriverArriving,
    RideStarted,
    RideCompleted,
    ExhaustedBalance,
    CollaboratorUnavailable(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::DriverFound(name) => format!("{name} will be your driver!"),
            Notice::DriverArriving => "Your driver is arriving!".to_string(),
            Notice::RideStarted => "Your ride has started!".to_string(),
            Notice::RideCompleted => "You've arrived at your destination!".to_string(),
            Notice::ExhaustedBalance => "You've used up your data balance".to_string(),
            Notice::CollaboratorUnavailable(context) => {
                format!("Couldn't reach the server ({context})")
            }
        }
    }
}

#[derive(Debug, Default, Resource)]
pub struct NoticeLog(pub Vec<Notice>);

impl NoticeLog {
    pub fn push(&mut self, notice: Notice) {
        self.0.push(notice);
    }
}

/// One completed ride, recorded when the lifecycle reaches Completed.
/// Timestamps are simulation ms; use the helper methods for derived KPIs.
#[derive(Debug, Clone)]
pub struct CompletedRideRecord {
    pub ride_entity: Entity,
    pub driver_entity: Option<Entity>,
    pub requested_at: u64,
    pub matched_at: u64,
    pub started_at: u64,
    pub completed_at: u64,
    pub data_used_mb: f64,
    pub cost: CostBreakdown,
}

impl CompletedRideRecord {
    /// Time from request to driver assignment.
    pub fn time_to_match(&self) -> u64 {
        self.matched_at.saturating_sub(self.requested_at)
    }

    /// Time from driver assignment to the ride starting.
    pub fn time_to_pickup(&self) -> u64 {
        self.started_at.saturating_sub(self.matched_at)
    }

    /// Time from ride start to completion.
    pub fn ride_duration(&self) -> u64 {
        self.completed_at.saturating_sub(self.started_at)
    }
}

/// Collects completed rides for analysis and the demo's summary output.
#[derive(Debug, Default, Resource)]
pub struct RideTelemetry {
    pub completed_rides: Vec<CompletedRideRecord>,
}
