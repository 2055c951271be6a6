use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Driver, DriverStatus, Ride, RideStatus};
use crate::pricing::compute_cost;
use crate::scenario::DataPlanConfig;
use crate::session::DataSession;
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{CompletedRideRecord, Notice, NoticeLog, RideTelemetry};

/// InProgress -> Completed: freezes the counters, frees the driver, records
/// the completed ride. Completed is terminal; a late duplicate event is a
/// no-op.
pub fn ride_completed_system(
    clock: Res<SimulationClock>,
    event: Res<CurrentEvent>,
    plan: Res<DataPlanConfig>,
    session: Res<DataSession>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
    mut telemetry: ResMut<RideTelemetry>,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<&mut Driver>,
) {
    if event.0.kind != EventKind::RideCompleted {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(ride_entity) else {
        return;
    };
    if ride.status != RideStatus::InProgress {
        return;
    }

    ride.status = RideStatus::Completed;
    ride.completed_at = Some(clock.now());
    notices.push(Notice::RideCompleted);

    if let Some(driver_entity) = ride.assigned_driver {
        if let Ok(mut driver) = drivers.get_mut(driver_entity) {
            driver.status = DriverStatus::Available;
        }
    }

    let cost = compute_cost(
        ride.base_fare,
        ride.data_used_during_ride_mb,
        plan.per_mb_rate,
        session.simulation_active,
    );

    if let Some(ride_id) = ride.backend_id.clone() {
        let completed_at = clock.now();
        notify_store(&store, &mut notices, "complete ride", |s| {
            s.complete_ride(&ride_id, cost, completed_at)
        });
    }

    telemetry.completed_rides.push(CompletedRideRecord {
        ride_entity,
        driver_entity: ride.assigned_driver,
        requested_at: ride.requested_at,
        matched_at: ride.matched_at.unwrap_or(ride.requested_at),
        started_at: ride.started_at.unwrap_or(ride.requested_at),
        completed_at: clock.now(),
        data_used_mb: ride.data_used_during_ride_mb,
        cost,
    });
}
