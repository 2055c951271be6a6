use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Ride, RideStatus};
use crate::scenario::DataPlanConfig;
use crate::session::{AccrualOutcome, DataSession};
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{Notice, NoticeLog};

/// Per-ride data stream: while the ride is InProgress, each tick draws from
/// the shared session balance and advances the ride counter by whatever the
/// session actually accepted. The stream lapses when the ride leaves
/// InProgress; exhausted or inactive sessions make the tick a no-op.
pub fn ride_data_tick_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    plan: Res<DataPlanConfig>,
    mut session: ResMut<DataSession>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
    mut rides: Query<&mut Ride>,
) {
    if event.0.kind != EventKind::RideDataTick {
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

    match session.accrue(plan.ride_tick_amount_mb) {
        AccrualOutcome::Applied(applied) => {
            ride.data_used_during_ride_mb += applied;
            if let Some(ride_id) = ride.backend_id.clone() {
                notify_store(&store, &mut notices, "record data usage", |s| {
                    s.record_data_usage(&ride_id, applied)
                });
            }
        }
        AccrualOutcome::Exhausted(applied) => {
            ride.data_used_during_ride_mb += applied;
            log::warn!("session data balance exhausted during ride {ride_entity:?}");
            notices.push(Notice::ExhaustedBalance);
            if let Some(ride_id) = ride.backend_id.clone() {
                notify_store(&store, &mut notices, "record data usage", |s| {
                    s.record_data_usage(&ride_id, applied)
                });
            }
        }
        AccrualOutcome::Rejected | AccrualOutcome::Inactive => {}
    }

    clock.schedule_in(
        plan.ride_tick_interval_ms,
        EventKind::RideDataTick,
        Some(EventSubject::Ride(ride_entity)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::commands::request_ride;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::telemetry::NoticeLog;
    use crate::test_helpers::test_request;

    fn tick_once(world: &mut World) {
        let event = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("tick event");
        world.insert_resource(CurrentEvent(event));
        let mut schedule = Schedule::default();
        schedule.add_systems(ride_data_tick_system);
        schedule.run(world);
    }

    fn in_progress_world(plan: DataPlanConfig) -> (World, bevy_ecs::prelude::Entity) {
        let mut world = World::new();
        build_session(&mut world, RideConfig::default().with_seed(42), plan);
        let ride = request_ride(&mut world, test_request()).expect("ride");
        world
            .resource_mut::<SimulationClock>()
            .cancel_subject(EventSubject::Ride(ride));
        world.get_mut::<Ride>(ride).expect("ride").status = RideStatus::InProgress;
        (world, ride)
    }

    #[test]
    fn tick_advances_ride_and_session_counters_together() {
        // Session stream disabled by pointing its interval far out; only the
        // ride stream runs here.
        let (mut world, ride) =
            in_progress_world(DataPlanConfig::default().with_session_stream(10_000_000, 0.0));
        world.resource_mut::<SimulationClock>().schedule_at(
            5_000,
            EventKind::RideDataTick,
            Some(EventSubject::Ride(ride)),
        );

        tick_once(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert!((record.data_used_during_ride_mb - 0.2).abs() < 1e-9);
        let session = world.resource::<DataSession>();
        assert!((session.used_mb - 0.2).abs() < 1e-9);

        // Stream keeps itself alive while in progress.
        let pending: Vec<_> = {
            let mut clock = world.resource_mut::<SimulationClock>();
            std::iter::from_fn(move || clock.pop_next()).collect()
        };
        assert!(pending
            .iter()
            .any(|e| e.kind == EventKind::RideDataTick && e.timestamp == 10_000));
    }

    #[test]
    fn exhausted_balance_freezes_the_ride_counter_and_signals_once() {
        let (mut world, ride) = in_progress_world(
            DataPlanConfig::default()
                .with_balance_mb(0.5)
                .with_ride_stream(5_000, 0.2)
                .with_session_stream(10_000_000, 0.0),
        );

        for i in 1..=4u64 {
            world.resource_mut::<SimulationClock>().schedule_at(
                i * 5_000,
                EventKind::RideDataTick,
                Some(EventSubject::Ride(ride)),
            );
            tick_once(&mut world);
            // Drop the self-rescheduled tick; we drive the cadence explicitly.
            world
                .resource_mut::<SimulationClock>()
                .cancel_subject(EventSubject::Ride(ride));
        }

        // 0.2, 0.4, then clamped to 0.5, then rejected.
        let record = world.get::<Ride>(ride).expect("ride");
        assert!((record.data_used_during_ride_mb - 0.5).abs() < 1e-9);
        let session = world.resource::<DataSession>();
        assert!((session.used_mb - 0.5).abs() < 1e-9);

        let notices = world.resource::<NoticeLog>();
        let exhausted = notices
            .0
            .iter()
            .filter(|n| **n == Notice::ExhaustedBalance)
            .count();
        assert_eq!(exhausted, 1, "one signal per balance-reaching event");
    }

    #[test]
    fn inactive_simulation_accrues_nothing() {
        let (mut world, ride) = in_progress_world(
            DataPlanConfig::default()
                .with_simulation_active(false)
                .with_session_stream(10_000_000, 0.0),
        );
        world.resource_mut::<SimulationClock>().schedule_at(
            5_000,
            EventKind::RideDataTick,
            Some(EventSubject::Ride(ride)),
        );

        tick_once(&mut world);

        assert_eq!(
            world.get::<Ride>(ride).expect("ride").data_used_during_ride_mb,
            0.0
        );
        assert_eq!(world.resource::<DataSession>().used_mb, 0.0);
    }
}
