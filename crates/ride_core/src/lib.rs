pub mod clock;
pub mod commands;
pub mod directory;
pub mod ecs;
pub mod error;
pub mod pricing;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod store;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
