//! Session data balance: metered accrual clamped at the plan ceiling.

use bevy_ecs::prelude::Resource;

/// Outcome of one accrual tick against the session balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccrualOutcome {
    /// Full amount applied.
    Applied(f64),
    /// The balance ceiling was reached on this tick; only part of the amount
    /// applied. Reported exactly once per balance-reaching event.
    Exhausted(f64),
    /// Balance already exhausted; the tick is a no-op until top-up.
    Rejected,
    /// Data simulation inactive; the tick is ignored.
    Inactive,
}

/// Per-session data state, shared by the session-wide and per-ride tick
/// streams. Passed explicitly as a resource; there is no ambient global.
#[derive(Debug, Clone, Resource)]
pub struct DataSession {
    /// Ceiling for `used_mb`; never decreases except by explicit top-up.
    pub balance_mb: f64,
    /// Cumulative usage across the session, independent of ride status.
    pub used_mb: f64,
    pub simulation_active: bool,
}

impl DataSession {
    pub fn new(balance_mb: f64, simulation_active: bool) -> Self {
        Self {
            balance_mb,
            used_mb: 0.0,
            simulation_active,
        }
    }

    pub fn remaining_mb(&self) -> f64 {
        (self.balance_mb - self.used_mb).max(0.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used_mb >= self.balance_mb
    }

    /// Applies one tick, clamped so `used_mb` never exceeds `balance_mb`. A
    /// tick that would overshoot applies partially and reports `Exhausted`;
    /// every later tick reports `Rejected` without re-signalling.
    pub fn accrue(&mut self, amount_mb: f64) -> AccrualOutcome {
        if !self.simulation_active {
            return AccrualOutcome::Inactive;
        }
        if self.is_exhausted() {
            return AccrualOutcome::Rejected;
        }
        let applied = amount_mb.min(self.balance_mb - self.used_mb);
        self.used_mb += applied;
        if self.is_exhausted() {
            AccrualOutcome::Exhausted(applied)
        } else {
            AccrualOutcome::Applied(applied)
        }
    }
}
