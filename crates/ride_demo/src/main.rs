//! Scripted demo: one ride driven end to end through the event clock, with the
//! lifecycle, data usage, and the final receipt printed to stdout.

use std::error::Error;
use std::fs::File;

use bevy_ecs::prelude::World;
use clap::{Parser, ValueEnum};
use serde::Serialize;

use ride_core::clock::SimulationClock;
use ride_core::commands::{confirm_payment, request_ride, RideRequest};
use ride_core::ecs::{AvailableDrivers, Driver, PaymentMethod, Ride, RideStatus};
use ride_core::runner::{ride_schedule, run_until};
use ride_core::scenario::{build_session_with_store, DataPlanConfig, RideConfig, SessionEndTimeMs};
use ride_core::store::{InMemoryRideStore, RideStoreResource};
use ride_core::telemetry::{NoticeLog, RideSnapshots};

#[derive(Parser)]
#[command(
    name = "ride_demo",
    about = "Runs one simulated ride from request to payment"
)]
struct Cli {
    /// Pickup address
    #[arg(long, default_value = "123 Main St")]
    pickup: String,
    /// Dropoff address
    #[arg(long, default_value = "456 Market St")]
    dropoff: String,
    /// Payment method
    #[arg(value_enum, long, default_value_t = Payment::Cash)]
    payment: Payment,
    /// Random seed for reproducible trip estimates
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Assign the first available driver instead of pausing for selection
    #[arg(long)]
    auto_match: bool,
    /// Starting data balance in MB
    #[arg(long, default_value_t = 500.0)]
    balance_mb: f64,
    /// Disable the data usage simulation
    #[arg(long)]
    no_data_sim: bool,
    /// Write a JSON summary of the ride to this path
    #[arg(long)]
    export: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Payment {
    Cash,
    Card,
}

impl From<Payment> for PaymentMethod {
    fn from(payment: Payment) -> Self {
        match payment {
            Payment::Cash => PaymentMethod::Cash,
            Payment::Card => PaymentMethod::Card,
        }
    }
}

#[derive(Serialize)]
struct RideSummary {
    pickup: String,
    dropoff: String,
    driver: Option<String>,
    requested_at_ms: u64,
    matched_at_ms: Option<u64>,
    started_at_ms: Option<u64>,
    completed_at_ms: Option<u64>,
    data_used_mb: f64,
    base_fare: f64,
    data_cost: f64,
    total_cost: f64,
    notices: Vec<String>,
    status_trace: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut world = World::new();
    build_session_with_store(
        &mut world,
        RideConfig::default()
            .with_seed(cli.seed)
            .with_driver_selection(!cli.auto_match),
        DataPlanConfig::default()
            .with_balance_mb(cli.balance_mb)
            .with_simulation_active(!cli.no_data_sim),
        Box::new(InMemoryRideStore::with_user_balance(cli.balance_mb)),
    );
    // The session data stream never drains on its own; cap the session at ten
    // simulated minutes.
    world.insert_resource(SessionEndTimeMs(10 * 60 * 1000));
    let mut schedule = ride_schedule();

    let ride = request_ride(
        &mut world,
        RideRequest {
            user_id: "demo-user".to_string(),
            pickup: cli.pickup.clone(),
            dropoff: cli.dropoff.clone(),
            payment_method: cli.payment.into(),
        },
    )?;
    println!("Requested ride from {} to {}", cli.pickup, cli.dropoff);

    run_until(&mut world, &mut schedule, 10_000, |world| {
        world
            .get::<Ride>(ride)
            .map(|r| r.status != RideStatus::Searching)
            .unwrap_or(true)
    });

    if world
        .get::<Ride>(ride)
        .map(|r| r.status == RideStatus::SelectingDriver)
        .unwrap_or(false)
    {
        let offered = world
            .get::<AvailableDrivers>(ride)
            .map(|list| list.0.clone())
            .unwrap_or_default();
        println!("Available drivers:");
        for entity in &offered {
            if let Some(driver) = world.get::<Driver>(*entity) {
                println!(
                    "  {} ({:.2}) - {} [{}]",
                    driver.name, driver.rating, driver.vehicle, driver.license_plate
                );
            }
        }
        // Pick the highest-rated driver on offer.
        let chosen = offered
            .iter()
            .copied()
            .max_by(|a, b| {
                let rating = |e| world.get::<Driver>(e).map(|d| d.rating).unwrap_or(0.0);
                rating(*a).total_cmp(&rating(*b))
            })
            .ok_or("no drivers available")?;
        ride_core::commands::select_driver(&mut world, ride, chosen)?;
    }

    let completed = run_until(&mut world, &mut schedule, 10_000, |world| {
        world
            .get::<Ride>(ride)
            .map(|r| r.status == RideStatus::Completed)
            .unwrap_or(false)
    });
    if !completed {
        return Err("ride did not complete within the session window".into());
    }

    let record = world.get::<Ride>(ride).ok_or("ride missing")?.clone();
    let driver_name = record
        .assigned_driver
        .and_then(|entity| world.get::<Driver>(entity))
        .map(|driver| driver.name.clone());
    let status_trace: Vec<String> = world
        .resource::<RideSnapshots>()
        .status_trace(ride)
        .iter()
        .map(|status| status.as_str().to_string())
        .collect();

    let cost = confirm_payment(&mut world, ride)?;
    let notices: Vec<String> = world
        .resource::<NoticeLog>()
        .0
        .iter()
        .map(|notice| notice.message())
        .collect();

    println!();
    for message in &notices {
        println!("* {message}");
    }
    println!();
    println!("Lifecycle: {}", status_trace.join(" -> "));
    println!(
        "Completed at {:.1}s, {:.1} MB used during the ride",
        world.resource::<SimulationClock>().now() as f64 / 1000.0,
        record.data_used_during_ride_mb
    );
    println!("Base fare:  {:>8.2}", cost.base_fare);
    println!("Data cost:  {:>8.3}", cost.data_cost);
    println!("Total:      {:>8.3}", cost.total_cost);
    match world.resource::<RideStoreResource>().user_data_balance() {
        Ok(remaining) => println!("Data plan:  {remaining:.1} MB remaining (server)"),
        Err(err) => log::warn!("fetch data balance: {err}"),
    }

    if let Some(path) = cli.export {
        let summary = RideSummary {
            pickup: record.pickup,
            dropoff: record.dropoff,
            driver: driver_name,
            requested_at_ms: record.requested_at,
            matched_at_ms: record.matched_at,
            started_at_ms: record.started_at,
            completed_at_ms: record.completed_at,
            data_used_mb: record.data_used_during_ride_mb,
            base_fare: cost.base_fare,
            data_cost: cost.data_cost,
            total_cost: cost.total_cost,
            notices,
            status_trace,
        };
        serde_json::to_writer_pretty(File::create(&path)?, &summary)?;
        println!("Summary written to {path}");
    }

    Ok(())
}
