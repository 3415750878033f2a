//! The `route-planner` binary: load stops, build the matrix, solve, write results.

use std::error::Error as StdError;

use colored::*;
use tracing::{error, info, span, Instrument, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Settings;
use crate::distance::matrix::{print_dist_matrix, DistanceSource};
use crate::domain::problem::RouteProblem;
use crate::domain::types::{Coordinate, Location, Tour};
use crate::error::Result;
use crate::output::{route_ids, save_history_csv, write_route};
use crate::setup::load_locations;
use crate::simulate::simulate_route;
use crate::solver::{solve_with_config, SolverConfig};

/// Install the tracing subscriber; `.env` is read later by `Settings::from_env`.
fn init_tracing() -> std::result::Result<(), Box<dyn StdError>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .try_init()?;
    Ok(())
}

pub async fn run() -> std::result::Result<(), Box<dyn StdError>> {
    init_tracing()?;

    if let Err(e) = plan().await {
        error!("{}", e);
        eprintln!("{}", format!("Error: {e}").red());
        return Err(e.into());
    }
    Ok(())
}

async fn plan() -> Result<()> {
    let settings = Settings::from_env()?;
    info!(
        "Starting route planner: provider {:?}, {} vehicle(s), time limit {:?}",
        settings.provider, settings.num_vehicles, settings.time_limit
    );

    let locations = load_locations(&settings.locations_csv)?;
    let points: Vec<Coordinate> = locations.iter().map(Location::coordinate).collect();

    let matrix = async {
        let source = DistanceSource::from_settings(&settings)?;
        source.distance_matrix(&points).await
    }
    .instrument(span!(Level::INFO, "setup"))
    .await?;
    print_dist_matrix(&matrix);
    let problem = RouteProblem::new(matrix, settings.depot_index, settings.num_vehicles)?;

    let config = SolverConfig::with_time_limit(settings.time_limit);
    let outcome =
        tokio::task::spawn_blocking(move || solve_with_config(&problem, &config)).await??;

    info!(
        "Improved from {:.2} m to {:.2} m in {} iterations",
        outcome.initial_cost,
        outcome.tour.cost(),
        outcome.iterations
    );

    let routes = route_ids(&outcome.tour, &locations);
    write_route(&settings.route_output, &routes)?;
    save_history_csv(&settings.history_csv, &outcome)?;

    print_tour(&outcome.tour, &locations, settings.average_speed_kmh);
    Ok(())
}

fn print_tour(tour: &Tour, locations: &[Location], speed_kmh: f64) {
    println!(
        "{}",
        format!("Total distance: {:.2} km", tour.cost() / 1000.0).green()
    );

    for (vehicle, route) in tour.routes().iter().enumerate() {
        println!("{}", format!("Vehicle {}", vehicle + 1).bold());
        if route.len() <= 2 {
            println!("  {}", "no stops".dimmed());
            continue;
        }

        let coords: Vec<Coordinate> = route.iter().map(|&n| locations[n].coordinate()).collect();
        for leg in simulate_route(&coords, speed_kmh) {
            let from = &locations[route[leg.index]];
            let to = &locations[route[leg.index + 1]];
            println!(
                "  {} -> {}: {:.2} km, {} min (total {:.2} km, {} min)",
                from.address,
                to.address.cyan(),
                leg.distance_km,
                leg.travel_time.as_secs() / 60,
                leg.cumulative_km,
                leg.elapsed.as_secs() / 60
            );
        }
    }
}
