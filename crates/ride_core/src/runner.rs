//! Session runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::scenario::SessionEndTimeMs;
use crate::systems::{
    driver_arriving::driver_arriving_system, elapsed_tick::elapsed_tick_system,
    ride_completed::ride_completed_system, ride_data_tick::ride_data_tick_system,
    ride_started::ride_started_system, search_completed::search_completed_system,
    session_data_tick::session_data_tick_system, snapshot::capture_snapshot_system,
};

// Condition functions for each event kind
fn is_search_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SearchCompleted)
        .unwrap_or(false)
}

fn is_driver_arriving(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::DriverArriving)
        .unwrap_or(false)
}

fn is_ride_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideStarted)
        .unwrap_or(false)
}

fn is_elapsed_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ElapsedTick)
        .unwrap_or(false)
}

fn is_ride_data_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideDataTick)
        .unwrap_or(false)
}

fn is_session_data_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SessionDataTick)
        .unwrap_or(false)
}

fn is_ride_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideCompleted)
        .unwrap_or(false)
}

/// Runs one session step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `true` if an event was processed, `false` if the clock was empty or if the next event
/// is at or past [SessionEndTimeMs] (when that resource is present). The end-time guard matters
/// because the session data stream re-arms itself indefinitely while the balance lasts.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let stop_at = world.get_resource::<SessionEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return false;
        }
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));

    schedule.run(world);
    true
}

/// Runs session steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs session steps until a predicate over the world holds, the queue drains,
/// or `max_steps` is reached. Returns `true` if the predicate was satisfied.
pub fn run_until<F>(world: &mut World, schedule: &mut Schedule, max_steps: usize, mut done: F) -> bool
where
    F: FnMut(&World) -> bool,
{
    let mut steps = 0;
    while steps < max_steps {
        if done(world) {
            return true;
        }
        if !run_next_event(world, schedule) {
            return done(world);
        }
        steps += 1;
    }
    done(world)
}

/// Builds the default session schedule: all event-reacting systems plus [apply_deferred]
/// so that spawned entities are applied before the next step.
///
/// Systems are conditionally executed based on event type to reduce overhead.
pub fn ride_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    // The chain pins the execution order: event-reacting systems, then
    // apply_deferred so inserts/despawns land, then the snapshot capture,
    // which must observe the post-event state.
    schedule.add_systems(
        (
            // Group systems by event type using conditions to avoid running all systems on every event
            (
                // SearchCompleted
                search_completed_system.run_if(is_search_completed),
                // DriverArriving
                driver_arriving_system.run_if(is_driver_arriving),
                // RideStarted
                ride_started_system.run_if(is_ride_started),
                // ElapsedTick
                elapsed_tick_system.run_if(is_elapsed_tick),
                // RideDataTick
                ride_data_tick_system.run_if(is_ride_data_tick),
                // SessionDataTick
                session_data_tick_system.run_if(is_session_data_tick),
                // RideCompleted
                ride_completed_system.run_if(is_ride_completed),
            ),
            apply_deferred,
            capture_snapshot_system,
        )
            .chain(),
    );

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;

    use crate::commands::request_ride;
    use crate::ecs::RideStatus;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::telemetry::RideSnapshots;
    use crate::test_helpers::test_request;

    #[test]
    fn per_event_snapshot_records_the_post_event_state() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");

        let mut schedule = ride_schedule();
        assert!(run_next_event(&mut world, &mut schedule), "search step");

        // The snapshot taken for the SearchCompleted event must already show
        // the transition it caused, including the offered driver list.
        let snapshots = world.resource::<RideSnapshots>();
        let snapshot = snapshots.latest_for(ride).expect("snapshot");
        assert_eq!(snapshot.timestamp_ms, 3_000);
        assert_eq!(snapshot.status, RideStatus::SelectingDriver);
        assert_eq!(snapshot.available_drivers.len(), 5);
    }
}
