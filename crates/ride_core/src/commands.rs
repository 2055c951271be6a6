//! Command surface for the presentation layer: request a ride, select a
//! driver, confirm payment, tear down. Commands validate synchronously and
//! mutate the world directly; timed progress happens through scheduled events.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::ecs::{Driver, DriverStatus, PaymentMethod, Ride, RideStatus};
use crate::error::RideError;
use crate::pricing::{compute_cost, CostBreakdown, TripEstimator};
use crate::scenario::{BaseFarePolicy, DataPlanConfig, RideConfig};
use crate::session::DataSession;
use crate::store::{RideStoreResource, StoreError};
use crate::systems::snapshot::capture_now;
use crate::telemetry::{Notice, NoticeLog};

/// Trip parameters supplied by the rider.
#[derive(Debug, Clone)]
pub struct RideRequest {
    pub user_id: String,
    pub pickup: String,
    pub dropoff: String,
    pub payment_method: PaymentMethod,
}

fn report_store_failure(world: &mut World, context: &str, err: StoreError) {
    log::warn!("{context}: {err}");
    world
        .resource_mut::<NoticeLog>()
        .push(Notice::CollaboratorUnavailable(context.to_string()));
}

/// Creates the ride in Searching and begins timer-driven auto-advance.
///
/// Returns the ride handle; state-change notifications arrive through the
/// [`crate::telemetry::RideSnapshots`] buffer and [`NoticeLog`].
pub fn request_ride(world: &mut World, request: RideRequest) -> Result<Entity, RideError> {
    if request.pickup.trim().is_empty() {
        return Err(RideError::InvalidRequest("pickup is empty".to_string()));
    }
    if request.dropoff.trim().is_empty() {
        return Err(RideError::InvalidRequest("dropoff is empty".to_string()));
    }
    if request.user_id.trim().is_empty() {
        return Err(RideError::InvalidRequest("user id is empty".to_string()));
    }

    let config = *world.resource::<RideConfig>();
    let estimate = world.resource_mut::<TripEstimator>().estimate();
    let base_fare = match config.base_fare {
        BaseFarePolicy::Fixed(fare) => fare,
        BaseFarePolicy::Estimated => estimate.base_fare,
    };

    let created = world.resource::<RideStoreResource>().create_ride(
        &request.user_id,
        &request.pickup,
        &request.dropoff,
        request.payment_method,
    );
    let backend_id = match created {
        Ok(ride_id) => Some(ride_id),
        Err(err) => {
            report_store_failure(world, "create ride", err);
            None
        }
    };

    let now = world.resource::<SimulationClock>().now();
    let ride = world
        .spawn(Ride {
            status: RideStatus::Searching,
            user_id: request.user_id,
            pickup: request.pickup,
            dropoff: request.dropoff,
            payment_method: request.payment_method,
            assigned_driver: None,
            elapsed_seconds: 0,
            data_used_during_ride_mb: 0.0,
            base_fare,
            distance_km: estimate.distance_km,
            duration_min: estimate.duration_min,
            backend_id,
            requested_at: now,
            matched_at: None,
            started_at: None,
            completed_at: None,
        })
        .id();

    world.resource_mut::<SimulationClock>().schedule_in(
        config.search_delay_ms,
        EventKind::SearchCompleted,
        Some(EventSubject::Ride(ride)),
    );

    log::debug!("ride {ride:?} requested, searching");
    capture_now(world);
    Ok(ride)
}

/// Assigns the chosen driver and advances the ride to Matched. Valid only
/// while the ride sits in SelectingDriver.
pub fn select_driver(world: &mut World, ride: Entity, driver: Entity) -> Result<(), RideError> {
    let status = world.get::<Ride>(ride).ok_or(RideError::NoSuchRide)?.status;
    if status != RideStatus::SelectingDriver {
        return Err(RideError::InvalidTransition {
            command: "select_driver",
            expected: RideStatus::SelectingDriver,
            actual: status,
        });
    }

    let driver_record = world.get::<Driver>(driver).ok_or(RideError::NoSuchDriver)?;
    if driver_record.status != DriverStatus::Available {
        return Err(RideError::DriverUnavailable(driver_record.name.clone()));
    }
    let driver_name = driver_record.name.clone();

    let config = *world.resource::<RideConfig>();
    let now = world.resource::<SimulationClock>().now();

    let backend_id = {
        let mut ride_record = world
            .get_mut::<Ride>(ride)
            .ok_or(RideError::NoSuchRide)?;
        ride_record.status = RideStatus::Matched;
        ride_record.assigned_driver = Some(driver);
        ride_record.matched_at = Some(now);
        ride_record.backend_id.clone()
    };
    if let Some(mut record) = world.get_mut::<Driver>(driver) {
        record.status = DriverStatus::Busy;
    }

    if let Some(ride_id) = backend_id {
        let result = world
            .resource::<RideStoreResource>()
            .update_ride_status(&ride_id, RideStatus::Matched);
        if let Err(err) = result {
            report_store_failure(world, "update ride status", err);
        }
    }

    world
        .resource_mut::<NoticeLog>()
        .push(Notice::DriverFound(driver_name));
    world.resource_mut::<SimulationClock>().schedule_in(
        config.status_advance_delay_ms,
        EventKind::DriverArriving,
        Some(EventSubject::Ride(ride)),
    );

    log::debug!("ride {ride:?} matched with driver {driver:?}");
    capture_now(world);
    Ok(())
}

/// Finalizes the cost breakdown and releases the ride. Valid only once the
/// ride is Completed.
pub fn confirm_payment(world: &mut World, ride: Entity) -> Result<CostBreakdown, RideError> {
    let ride_record = world.get::<Ride>(ride).ok_or(RideError::NoSuchRide)?;
    if ride_record.status != RideStatus::Completed {
        return Err(RideError::InvalidTransition {
            command: "confirm_payment",
            expected: RideStatus::Completed,
            actual: ride_record.status,
        });
    }

    let base_fare = ride_record.base_fare;
    let data_used_mb = ride_record.data_used_during_ride_mb;
    let plan = *world.resource::<DataPlanConfig>();
    let active = world.resource::<DataSession>().simulation_active;
    let cost = compute_cost(base_fare, data_used_mb, plan.per_mb_rate, active);

    world
        .resource_mut::<SimulationClock>()
        .cancel_subject(EventSubject::Ride(ride));
    world.despawn(ride);

    log::debug!("ride {ride:?} paid and released, total {:.3}", cost.total_cost);
    Ok(cost)
}

/// Teardown on navigate-away: cancels every pending timer for the ride and
/// discards it, so no orphaned callback can mutate a dead ride. Frees the
/// assigned driver when the ride had not finished.
pub fn teardown_ride(world: &mut World, ride: Entity) {
    let removed = world
        .resource_mut::<SimulationClock>()
        .cancel_subject(EventSubject::Ride(ride));
    if removed > 0 {
        log::debug!("ride {ride:?} teardown cancelled {removed} pending events");
    }

    let assigned = world.get::<Ride>(ride).and_then(|record| {
        if record.status.is_terminal() {
            None
        } else {
            record.assigned_driver
        }
    });
    if let Some(driver) = assigned {
        if let Some(mut record) = world.get_mut::<Driver>(driver) {
            record.status = DriverStatus::Available;
        }
    }

    if world.get_entity(ride).is_some() {
        world.despawn(ride);
    }
}

/// Toggles the data simulation for the session. Deactivating cancels the
/// pending session tick; activating schedules a fresh one. Cancellation keeps
/// the invariant that at most one SessionDataTick is ever in the heap, so
/// toggling can never stack a second stream on the same cadence.
pub fn set_data_simulation(world: &mut World, active: bool) {
    let was_active = {
        let mut session = world.resource_mut::<DataSession>();
        let was = session.simulation_active;
        session.simulation_active = active;
        was
    };
    if active == was_active {
        return;
    }
    if active {
        let plan = *world.resource::<DataPlanConfig>();
        world.resource_mut::<SimulationClock>().schedule_in(
            plan.session_tick_interval_ms,
            EventKind::SessionDataTick,
            None,
        );
    } else {
        world
            .resource_mut::<SimulationClock>()
            .cancel_kind(EventKind::SessionDataTick);
    }
}
