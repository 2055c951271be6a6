use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, ONE_SEC_MS};
use crate::ecs::{Ride, RideStatus};
use crate::scenario::RideConfig;

/// One-second ride ticker. The counter advances only while the ride is
/// InProgress: zero before, frozen after. Completion policy: the ride ends
/// once elapsed seconds exceed the configured threshold.
pub fn elapsed_tick_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<RideConfig>,
    mut rides: Query<&mut Ride>,
) {
    if event.0.kind != EventKind::ElapsedTick {
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

    ride.elapsed_seconds += 1;

    let subject = Some(EventSubject::Ride(ride_entity));
    if ride.elapsed_seconds > config.ride_completion_threshold_secs {
        clock.schedule_in(0, EventKind::RideCompleted, subject);
    } else {
        clock.schedule_in(ONE_SEC_MS, EventKind::ElapsedTick, subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::commands::request_ride;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::test_helpers::test_request;

    fn tick_once(world: &mut World) -> Option<crate::clock::Event> {
        let event = world.resource_mut::<SimulationClock>().pop_next()?;
        world.insert_resource(CurrentEvent(event));
        let mut schedule = Schedule::default();
        schedule.add_systems(elapsed_tick_system);
        schedule.run(world);
        Some(event)
    }

    #[test]
    fn counter_only_advances_while_in_progress() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");
        world
            .resource_mut::<SimulationClock>()
            .cancel_subject(EventSubject::Ride(ride));

        // A tick while still Searching is a no-op.
        world.resource_mut::<SimulationClock>().schedule_at(
            1_000,
            EventKind::ElapsedTick,
            Some(EventSubject::Ride(ride)),
        );
        tick_once(&mut world).expect("tick");
        assert_eq!(world.get::<Ride>(ride).expect("ride").elapsed_seconds, 0);
        assert!(world.resource::<SimulationClock>().is_empty(), "not rescheduled");

        // In progress: each tick adds exactly one second and reschedules.
        world.get_mut::<Ride>(ride).expect("ride").status = RideStatus::InProgress;
        world.resource_mut::<SimulationClock>().schedule_at(
            2_000,
            EventKind::ElapsedTick,
            Some(EventSubject::Ride(ride)),
        );
        tick_once(&mut world).expect("tick");
        assert_eq!(world.get::<Ride>(ride).expect("ride").elapsed_seconds, 1);
        assert_eq!(
            world.resource::<SimulationClock>().next_event_time(),
            Some(3_000)
        );
    }

    #[test]
    fn crossing_the_threshold_schedules_completion() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");
        world
            .resource_mut::<SimulationClock>()
            .cancel_subject(EventSubject::Ride(ride));
        {
            let mut record = world.get_mut::<Ride>(ride).expect("ride");
            record.status = RideStatus::InProgress;
            record.elapsed_seconds = 10;
        }

        world.resource_mut::<SimulationClock>().schedule_at(
            24_000,
            EventKind::ElapsedTick,
            Some(EventSubject::Ride(ride)),
        );
        tick_once(&mut world).expect("tick");

        assert_eq!(world.get::<Ride>(ride).expect("ride").elapsed_seconds, 11);
        let next = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("completion event");
        assert_eq!(next.kind, EventKind::RideCompleted);
        assert_eq!(next.timestamp, 24_000);
        assert!(
            world.resource::<SimulationClock>().is_empty(),
            "elapsed ticker stops once completion is due"
        );
    }
}
