//! Driver directory: the roster of drivers a ride can be matched with.
//!
//! Drivers are plain entities; the directory is queries over them. The demo
//! has no geo index, so availability is the only matching criterion.

use bevy_ecs::prelude::{Entity, World};

use crate::ecs::{Driver, DriverStatus};
use crate::error::RideError;

/// Max drivers surfaced to a rider at once.
pub const DIRECTORY_LIMIT: usize = 5;

/// Seed roster for demo sessions. One driver starts offline so availability
/// filtering is observable.
pub fn seed_drivers(world: &mut World) -> Vec<Entity> {
    let roster: [(&str, f64, &str, &str, DriverStatus); 6] = [
        ("Omar Rayyan", 4.94, "Toyota Corolla", "CAI 2741", DriverStatus::Available),
        ("Sara Ahmed", 4.8, "Hyundai Elantra", "GIZ 1186", DriverStatus::Available),
        ("James Wilson", 4.8, "Toyota Camry", "ABC 123", DriverStatus::Available),
        ("Michael Brown", 4.9, "Honda Accord", "DEF 456", DriverStatus::Available),
        ("Fatma Hassan", 4.9, "Kia Cerato", "ALX 7310", DriverStatus::Available),
        ("Karim Adel", 4.9, "Nissan Sunny", "CAI 9954", DriverStatus::Offline),
    ];

    roster
        .into_iter()
        .map(|(name, rating, vehicle, license_plate, status)| {
            world
                .spawn(Driver {
                    name: name.to_string(),
                    rating,
                    vehicle: vehicle.to_string(),
                    license_plate: license_plate.to_string(),
                    status,
                })
                .id()
        })
        .collect()
}

/// Up to `limit` drivers currently available for matching. May return empty;
/// the caller decides how long to wait.
pub fn available_drivers(world: &mut World, limit: usize) -> Vec<Entity> {
    world
        .query::<(Entity, &Driver)>()
        .iter(world)
        .filter(|(_, driver)| driver.status == DriverStatus::Available)
        .take(limit)
        .map(|(entity, _)| entity)
        .collect()
}

pub fn set_driver_status(
    world: &mut World,
    driver: Entity,
    status: DriverStatus,
) -> Result<(), RideError> {
    let mut entity = world.get_entity_mut(driver).ok_or(RideError::NoSuchDriver)?;
    let mut record = entity
        .get_mut::<Driver>()
        .ok_or(RideError::NoSuchDriver)?;
    record.status = status;
    Ok(())
}
