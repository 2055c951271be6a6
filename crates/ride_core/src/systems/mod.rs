pub mod driver_arriving;
pub mod elapsed_tick;
pub mod ride_completed;
pub mod ride_data_tick;
pub mod ride_started;
pub mod search_completed;
pub mod session_data_tick;
pub mod snapshot;
