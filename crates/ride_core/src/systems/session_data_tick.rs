use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::scenario::DataPlanConfig;
use crate::session::{AccrualOutcome, DataSession};
use crate::store::{notify_store, RideStoreResource};
use crate::telemetry::{Notice, NoticeLog};

/// Session-wide data stream: runs from session start, independent of any
/// ride. The stream re-arms itself while the balance holds and pauses once it
/// is exhausted or the simulation is switched off;
/// [`crate::commands::set_data_simulation`] restarts it. Accepted accrual is
/// mirrored to the backend fire-and-forget.
pub fn session_data_tick_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    plan: Res<DataPlanConfig>,
    mut session: ResMut<DataSession>,
    store: Res<RideStoreResource>,
    mut notices: ResMut<NoticeLog>,
) {
    if event.0.kind != EventKind::SessionDataTick {
        return;
    }

    match session.accrue(plan.session_tick_amount_mb) {
        AccrualOutcome::Applied(applied) => {
            notify_store(&store, &mut notices, "record user data usage", |s| {
                s.increment_user_data_usage(applied)
            });
            clock.schedule_in(plan.session_tick_interval_ms, EventKind::SessionDataTick, None);
        }
        AccrualOutcome::Exhausted(applied) => {
            notify_store(&store, &mut notices, "record user data usage", |s| {
                s.increment_user_data_usage(applied)
            });
            log::warn!("session data balance exhausted");
            notices.push(Notice::ExhaustedBalance);
        }
        AccrualOutcome::Rejected | AccrualOutcome::Inactive => {}
    }
}
