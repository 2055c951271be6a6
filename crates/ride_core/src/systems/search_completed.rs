//! SearchCompleted: present available drivers for selection, or auto-match
//! the first one when driver choice is disabled.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::directory::DIRECTORY_LIMIT;
use crate::ecs::{AvailableDrivers, Driver, DriverStatus, Ride, RideStatus};
use crate::scenario::RideConfig;
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{Notice, NoticeLog};

pub fn search_completed_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<RideConfig>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<(Entity, &mut Driver)>,
) {
    if event.0.kind != EventKind::SearchCompleted {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(ride_entity) else {
        return;
    };
    if ride.status != RideStatus::Searching {
        return;
    }

    let available: Vec<Entity> = drivers
        .iter()
        .filter(|(_, driver)| driver.status == DriverStatus::Available)
        .take(DIRECTORY_LIMIT)
        .map(|(entity, _)| entity)
        .collect();

    if config.driver_selection || available.is_empty() {
        // Waits for an external select_driver. With no drivers the ride stays
        // here; deciding how long to wait is the caller's concern.
        ride.status = RideStatus::SelectingDriver;
        commands
            .entity(ride_entity)
            .insert(AvailableDrivers(available));
        return;
    }

    let driver_entity = available[0];
    let Ok((_, mut driver)) = drivers.get_mut(driver_entity) else {
        return;
    };
    driver.status = DriverStatus::Busy;
    let driver_name = driver.name.clone();

    ride.status = RideStatus::Matched;
    ride.assigned_driver = Some(driver_entity);
    ride.matched_at = Some(clock.now());
    notices.push(Notice::DriverFound(driver_name));

    if let Some(ride_id) = ride.backend_id.clone() {
        notify_store(&store, &mut notices, "update ride status", |s| {
            s.update_ride_status(&ride_id, RideStatus::Matched)
        });
    }

    clock.schedule_in(
        config.status_advance_delay_ms,
        EventKind::DriverArriving,
        Some(EventSubject::Ride(ride_entity)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::commands::request_ride;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::test_helpers::test_request;

    fn step_search(world: &mut World) {
        let event = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("search event");
        assert_eq!(event.kind, EventKind::SearchCompleted);
        world.insert_resource(CurrentEvent(event));
        let mut schedule = Schedule::default();
        schedule.add_systems(search_completed_system);
        schedule.run(world);
    }

    #[test]
    fn selection_variant_pauses_with_the_driver_list() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");

        step_search(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert_eq!(record.status, RideStatus::SelectingDriver);
        assert_eq!(record.assigned_driver, None);

        let offered = world.get::<AvailableDrivers>(ride).expect("driver list");
        assert_eq!(offered.0.len(), 5);

        // No auto-advance is pending; progress waits on select_driver.
        assert!(world.resource::<SimulationClock>().is_empty());
    }

    #[test]
    fn auto_match_variant_assigns_the_first_available_driver() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default()
                .with_seed(42)
                .with_driver_selection(false),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");

        step_search(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert_eq!(record.status, RideStatus::Matched);
        let driver_entity = record.assigned_driver.expect("assigned driver");
        assert_eq!(record.matched_at, Some(3_000));

        let driver = world.get::<Driver>(driver_entity).expect("driver");
        assert_eq!(driver.status, DriverStatus::Busy);

        let next = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("arrival event");
        assert_eq!(next.kind, EventKind::DriverArriving);
        assert_eq!(next.timestamp, 8_000);
    }

    #[test]
    fn no_available_drivers_leaves_the_ride_selecting() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default()
                .with_seed(42)
                .with_driver_selection(false),
            DataPlanConfig::default().with_simulation_active(false),
        );
        // Take every driver off duty.
        let all: Vec<Entity> = world
            .query::<(Entity, &Driver)>()
            .iter(&world)
            .map(|(entity, _)| entity)
            .collect();
        for entity in all {
            world
                .get_mut::<Driver>(entity)
                .expect("driver")
                .status = DriverStatus::Offline;
        }
        let ride = request_ride(&mut world, test_request()).expect("ride");

        step_search(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert_eq!(record.status, RideStatus::SelectingDriver);
        let offered = world.get::<AvailableDrivers>(ride).expect("driver list");
        assert!(offered.0.is_empty());
        assert!(world.resource::<SimulationClock>().is_empty());
    }

    #[test]
    fn stale_search_event_for_a_finished_ride_is_a_no_op() {
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
            .status = RideStatus::Completed;

        step_search(&mut world);

        let record = world.get::<Ride>(ride).expect("ride");
        assert_eq!(record.status, RideStatus::Completed, "no backward move");
    }
}
