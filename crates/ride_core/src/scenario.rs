//! Session setup: configuration resources, the driver roster, and the data
//! session. Mirrors the backing demo's constants; everything the source
//! hardcoded in drifting variants is configuration here.

use bevy_ecs::prelude::{Resource, World};
use serde::{Deserialize, Serialize};

use crate::clock::{EventKind, SimulationClock};
use crate::directory::seed_drivers;
use crate::pricing::{TripEstimator, DEFAULT_BASE_FARE, PER_MB_RATE};
use crate::session::DataSession;
use crate::store::{InMemoryRideStore, RideStore, RideStoreResource};
use crate::telemetry::{NoticeLog, RideSnapshots, RideTelemetry, SnapshotConfig};

/// Base fare policy: the canonical demo pins 8.50; the estimated variant
/// derives the fare from sampled distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BaseFarePolicy {
    Fixed(f64),
    Estimated,
}

/// Lifecycle timing and matching options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
pub struct RideConfig {
    /// Delay in Searching before drivers are presented (or auto-matched).
    pub search_delay_ms: u64,
    /// Delay for Matched -> Arriving and Arriving -> InProgress.
    pub status_advance_delay_ms: u64,
    /// The ride completes once elapsed seconds exceed this threshold.
    pub ride_completion_threshold_secs: u64,
    /// When false, the first available driver is assigned without the
    /// SelectingDriver pause.
    pub driver_selection: bool,
    pub base_fare: BaseFarePolicy,
    /// Random seed for reproducibility (optional; if None, uses entropy).
    pub seed: Option<u64>,
}

impl Default for RideConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: 3_000,
            status_advance_delay_ms: 5_000,
            ride_completion_threshold_secs: 10,
            driver_selection: true,
            base_fare: BaseFarePolicy::Fixed(DEFAULT_BASE_FARE),
            seed: None,
        }
    }
}

impl RideConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_driver_selection(mut self, enabled: bool) -> Self {
        self.driver_selection = enabled;
        self
    }

    pub fn with_base_fare(mut self, policy: BaseFarePolicy) -> Self {
        self.base_fare = policy;
        self
    }

    /// Compress all lifecycle delays, for fast tests and demos.
    pub fn with_delays_ms(mut self, search: u64, advance: u64) -> Self {
        self.search_delay_ms = search;
        self.status_advance_delay_ms = advance;
        self
    }
}

/// Data plan: the two tick streams, the per-MB rate, and the balance. The two
/// streams have distinct cadences and amounts by design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
pub struct DataPlanConfig {
    pub session_tick_interval_ms: u64,
    pub session_tick_amount_mb: f64,
    pub ride_tick_interval_ms: u64,
    pub ride_tick_amount_mb: f64,
    pub per_mb_rate: f64,
    pub initial_balance_mb: f64,
    pub simulation_active_default: bool,
}

impl Default for DataPlanConfig {
    fn default() -> Self {
        Self {
            session_tick_interval_ms: 30_000,
            session_tick_amount_mb: 0.5,
            ride_tick_interval_ms: 5_000,
            ride_tick_amount_mb: 0.2,
            per_mb_rate: PER_MB_RATE,
            initial_balance_mb: 500.0,
            simulation_active_default: true,
        }
    }
}

impl DataPlanConfig {
    pub fn with_balance_mb(mut self, balance_mb: f64) -> Self {
        self.initial_balance_mb = balance_mb;
        self
    }

    pub fn with_session_stream(mut self, interval_ms: u64, amount_mb: f64) -> Self {
        self.session_tick_interval_ms = interval_ms;
        self.session_tick_amount_mb = amount_mb;
        self
    }

    pub fn with_ride_stream(mut self, interval_ms: u64, amount_mb: f64) -> Self {
        self.ride_tick_interval_ms = interval_ms;
        self.ride_tick_amount_mb = amount_mb;
        self
    }

    pub fn with_simulation_active(mut self, active: bool) -> Self {
        self.simulation_active_default = active;
        self
    }
}

/// Hard stop for the runner: events at or past this time are not processed.
/// Needed because the session tick stream is self-perpetuating.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SessionEndTimeMs(pub u64);

/// Populates `world` with clock, telemetry, session, store, and the driver
/// roster, using the in-memory store. Schedules the first session data tick
/// when the simulation starts active.
pub fn build_session(world: &mut World, ride_config: RideConfig, data_config: DataPlanConfig) {
    build_session_with_store(
        world,
        ride_config,
        data_config,
        Box::new(InMemoryRideStore::default()),
    );
}

pub fn build_session_with_store(
    world: &mut World,
    ride_config: RideConfig,
    data_config: DataPlanConfig,
    store: Box<dyn RideStore>,
) {
    world.insert_resource(SimulationClock::default());
    world.insert_resource(RideTelemetry::default());
    world.insert_resource(RideSnapshots::default());
    world.insert_resource(SnapshotConfig::default());
    world.insert_resource(NoticeLog::default());
    world.insert_resource(DataSession::new(
        data_config.initial_balance_mb,
        data_config.simulation_active_default,
    ));
    world.insert_resource(TripEstimator::new(ride_config.seed));
    world.insert_resource(RideStoreResource::new(store));
    world.insert_resource(ride_config);
    world.insert_resource(data_config);

    seed_drivers(world);

    if data_config.simulation_active_default {
        let mut clock = world.resource_mut::<SimulationClock>();
        clock.schedule_in(
            data_config.session_tick_interval_ms,
            EventKind::SessionDataTick,
            None,
        );
    }
}
