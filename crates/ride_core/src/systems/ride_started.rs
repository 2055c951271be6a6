use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, ONE_SEC_MS};
use crate::ecs::{Ride, RideStatus};
use crate::scenario::DataPlanConfig;
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{Notice, NoticeLog};

/// Arriving -> InProgress: starts the elapsed-time ticker and the per-ride
/// data tick stream.
pub fn ride_started_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    plan: Res<DataPlanConfig>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
    mut rides: Query<&mut Ride>,
) {
    if event.0.kind != EventKind::RideStarted {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(ride_entity) else {
        return;
    };
    if ride.status != RideStatus::Arriving {
        return;
    }

    ride.status = RideStatus::InProgress;
    ride.started_at = Some(clock.now());
    notices.push(Notice::RideStarted);

    if let Some(ride_id) = ride.backend_id.clone() {
        notify_store(&store, &mut notices, "update ride status", |s| {
            s.update_ride_status(&ride_id, RideStatus::InProgress)
        });
    }

    let subject = Some(EventSubject::Ride(ride_entity));
    clock.schedule_in(ONE_SEC_MS, EventKind::ElapsedTick, subject);
    clock.schedule_in(plan.ride_tick_interval_ms, EventKind::RideDataTick, subject);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::commands::request_ride;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::test_helpers::test_request;

    #[test]
    fn arriving_ride_starts_and_schedules_both_tickers() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");
        world
            .get_mut::<Ride>(ride)
            .expect("ride")
            .status = RideStatus::Arriving;
        // Drop the original search event; drive the start directly.
        world
            .resource_mut::<SimulationClock>()
            .cancel_subject(EventSubject::Ride(ride));
        world.resource_mut::<SimulationClock>().schedule_at(
            13_000,
            EventKind::RideStarted,
            Some(EventSubject::Ride(ride)),
        );

        let event = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("start event");
        world.insert_resource(CurrentEvent(event));
        let mut schedule = Schedule::default();
        schedule.add_systems(ride_started_system);
        schedule.run(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert_eq!(record.status, RideStatus::InProgress);
        assert_eq!(record.started_at, Some(13_000));

        let first = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("elapsed tick");
        assert_eq!(first.kind, EventKind::ElapsedTick);
        assert_eq!(first.timestamp, 14_000);

        let second = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("ride data tick");
        assert_eq!(second.kind, EventKind::RideDataTick);
        assert_eq!(second.timestamp, 18_000);
    }
}
