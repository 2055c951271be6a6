use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Ride, RideStatus};
use crate::scenario::RideConfig;
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{Notice, NoticeLog};

pub fn driver_arriving_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    config: Res<RideConfig>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
    mut rides: Query<&mut Ride>,
) {
    if event.0.kind != EventKind::DriverArriving {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(ride_entity) else {
        return;
    };
    if ride.status != RideStatus::Matched {
        return;
    }

    ride.status = RideStatus::Arriving;
    notices.push(Notice::DriverArriving);

    if let Some(ride_id) = ride.backend_id.clone() {
        notify_store(&store, &mut notices, "update ride status", |s| {
            s.update_ride_status(&ride_id, RideStatus::Arriving)
        });
    }

    clock.schedule_in(
        config.status_advance_delay_ms,
        EventKind::RideStarted,
        Some(EventSubject::Ride(ride_entity)),
    );
}
