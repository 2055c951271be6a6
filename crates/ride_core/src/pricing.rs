//! Fare calculation: a fixed or estimated base fare plus the simulated data
//! charge.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Default base fare in currency units when fare estimation is disabled.
pub const DEFAULT_BASE_FARE: f64 = 8.50;

/// Default per-kilometer rate used by the trip estimator.
pub const PER_KM_RATE: f64 = 2.0;

/// Default data charge per megabyte.
pub const PER_MB_RATE: f64 = 0.01;

/// Derived fare view; recomputed from ride state, never stored on the ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub base_fare: f64,
    pub data_cost: f64,
    pub total_cost: f64,
}

/// Pure cost mapping: `total = base + data`, with the data charge reported as
/// zero whenever the simulation is inactive. Idempotent for identical inputs.
pub fn compute_cost(
    base_fare: f64,
    data_used_mb: f64,
    per_mb_rate: f64,
    simulation_active: bool,
) -> CostBreakdown {
    let data_cost = if simulation_active {
        data_used_mb * per_mb_rate
    } else {
        0.0
    };
    CostBreakdown {
        base_fare,
        data_cost,
        total_cost: base_fare + data_cost,
    }
}

/// One estimated trip: rough distance, duration, and the base fare derived
/// from them. The demo has no real routing, so these are sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripEstimate {
    pub distance_km: f64,
    pub duration_min: u64,
    pub base_fare: f64,
}

/// Seeded estimator resource so scenarios are reproducible.
#[derive(Resource)]
pub struct TripEstimator {
    rng: StdRng,
    per_km_rate: f64,
}

impl TripEstimator {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_rate(seed, PER_KM_RATE)
    }

    pub fn with_rate(seed: Option<u64>, per_km_rate: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, per_km_rate }
    }

    /// Samples a trip: 2-10 km, roughly 3 minutes per km plus jitter, fare at
    /// the per-km rate rounded to cents.
    pub fn estimate(&mut self) -> TripEstimate {
        let distance_km = (self.rng.gen_range(2.0..=10.0_f64) * 10.0).round() / 10.0;
        let duration_min = (distance_km * 3.0 + self.rng.gen_range(0.0..10.0)).round() as u64;
        let base_fare = (distance_km * self.per_km_rate * 100.0).round() / 100.0;
        TripEstimate {
            distance_km,
            duration_min,
            base_fare,
        }
    }
}
