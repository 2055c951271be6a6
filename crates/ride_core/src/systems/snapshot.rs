//! Snapshot capture: one read-only [`RideSnapshot`] per live ride after every
//! processed event, plus an immediate capture hook for the command surface.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Mut, Query, Res, ResMut, World};

use crate::clock::SimulationClock;
use crate::ecs::{AvailableDrivers, Driver, Ride};
use crate::pricing::compute_cost;
use crate::scenario::DataPlanConfig;
use crate::session::DataSession;
use crate::telemetry::{DriverProfile, RideSnapshot, RideSnapshots, SnapshotConfig};

fn profile(entity: Entity, driver: &Driver) -> DriverProfile {
    DriverProfile {
        entity,
        name: driver.name.clone(),
        rating: driver.rating,
        vehicle: driver.vehicle.clone(),
        license_plate: driver.license_plate.clone(),
    }
}

fn build_snapshot(
    now: u64,
    ride_entity: Entity,
    ride: &Ride,
    available: Option<&AvailableDrivers>,
    lookup: &dyn Fn(Entity) -> Option<DriverProfile>,
    session: &DataSession,
    plan: &DataPlanConfig,
) -> RideSnapshot {
    // With the simulation off, ride data usage and its cost read as zero no
    // matter what accrued earlier.
    let data_used_mb = if session.simulation_active {
        ride.data_used_during_ride_mb
    } else {
        0.0
    };
    RideSnapshot {
        timestamp_ms: now,
        ride: ride_entity,
        status: ride.status,
        pickup: ride.pickup.clone(),
        dropoff: ride.dropoff.clone(),
        payment_method: ride.payment_method,
        assigned_driver: ride.assigned_driver.and_then(lookup),
        available_drivers: available
            .map(|list| list.0.iter().filter_map(|entity| lookup(*entity)).collect())
            .unwrap_or_default(),
        elapsed_seconds: ride.elapsed_seconds,
        data_used_during_ride_mb: data_used_mb,
        session_used_mb: session.used_mb,
        session_balance_mb: session.balance_mb,
        cost: compute_cost(
            ride.base_fare,
            ride.data_used_during_ride_mb,
            plan.per_mb_rate,
            session.simulation_active,
        ),
    }
}

pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    session: Res<DataSession>,
    plan: Res<DataPlanConfig>,
    config: Res<SnapshotConfig>,
    mut snapshots: ResMut<RideSnapshots>,
    rides: Query<(Entity, &Ride, Option<&AvailableDrivers>)>,
    drivers: Query<(Entity, &Driver)>,
) {
    let lookup = |entity: Entity| drivers.get(entity).ok().map(|(e, d)| profile(e, d));
    for (ride_entity, ride, available) in rides.iter() {
        let snapshot = build_snapshot(
            clock.now(),
            ride_entity,
            ride,
            available,
            &lookup,
            &session,
            &plan,
        );
        snapshots.push(snapshot, config.max_snapshots);
    }
}

/// Immediate capture for commands, which mutate the world between runner
/// steps. Same snapshot shape as the per-event system.
pub fn capture_now(world: &mut World) {
    world.resource_scope(|world, mut snapshots: Mut<RideSnapshots>| {
        let now = world.resource::<SimulationClock>().now();
        let session = world.resource::<DataSession>().clone();
        let plan = *world.resource::<DataPlanConfig>();
        let max_snapshots = world.resource::<SnapshotConfig>().max_snapshots;

        let mut driver_map: HashMap<Entity, DriverProfile> = HashMap::new();
        for (entity, driver) in world.query::<(Entity, &Driver)>().iter(world) {
            driver_map.insert(entity, profile(entity, driver));
        }
        let lookup = |entity: Entity| driver_map.get(&entity).cloned();

        let rides: Vec<(Entity, Ride, Option<AvailableDrivers>)> = world
            .query::<(Entity, &Ride, Option<&AvailableDrivers>)>()
            .iter(world)
            .map(|(entity, ride, available)| (entity, ride.clone(), available.cloned()))
            .collect();

        for (entity, ride, available) in &rides {
            let snapshot =
                build_snapshot(now, *entity, ride, available.as_ref(), &lookup, &session, &plan);
            snapshots.push(snapshot, max_snapshots);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::request_ride;
    use crate::scenario::{build_session, DataPlanConfig, RideConfig};
    use crate::test_helpers::test_request;

    #[test]
    fn capture_now_records_the_current_ride_state() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default(),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");

        let snapshots = world.resource::<RideSnapshots>();
        let snapshot = snapshots.latest_for(ride).expect("snapshot");
        assert_eq!(snapshot.status, crate::ecs::RideStatus::Searching);
        assert_eq!(snapshot.elapsed_seconds, 0);
        assert_eq!(snapshot.session_balance_mb, 500.0);
        assert!((snapshot.cost.total_cost - snapshot.cost.base_fare).abs() < 1e-9);
    }

    #[test]
    fn inactive_simulation_reports_zero_ride_data() {
        let mut world = World::new();
        build_session(
            &mut world,
            RideConfig::default().with_seed(42),
            DataPlanConfig::default().with_simulation_active(false),
        );
        let ride = request_ride(&mut world, test_request()).expect("ride");

        // Force some accrued usage onto the component; the snapshot must still
        // report zero while the simulation is off.
        world
            .get_mut::<Ride>(ride)
            .expect("ride component")
            .data_used_during_ride_mb = 3.0;
        capture_now(&mut world);

        let snapshots = world.resource::<RideSnapshots>();
        let snapshot = snapshots.latest_for(ride).expect("snapshot");
        assert_eq!(snapshot.data_used_during_ride_mb, 0.0);
        assert_eq!(snapshot.cost.data_cost, 0.0);
    }
}
