use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::domain::types::{Location, Tour};
use crate::error::Result;
use crate::solver::SearchOutcome;

/// Map every node index of every vehicle route to the id of its location.
pub fn route_ids(tour: &Tour, locations: &[Location]) -> Vec<Vec<i64>> {
    debug_assert!(
        tour.routes().iter().flatten().all(|&node| node < locations.len()),
        "tour references a node outside the location list"
    );
    tour.routes()
        .iter()
        .map(|route| route.iter().map(|&node| locations[node].id).collect())
        .collect()
}

/// A single vehicle is written as a flat array of ids, several as nested arrays.
pub fn write_route_to<W: Write>(writer: W, routes: &[Vec<i64>]) -> Result<()> {
    match routes {
        [only] => serde_json::to_writer(writer, only)?,
        _ => serde_json::to_writer(writer, routes)?,
    }
    Ok(())
}

pub fn write_route(path: &Path, routes: &[Vec<i64>]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_route_to(&mut writer, routes)?;
    writer.flush()?;
    info!("Saved route for {} vehicle(s) to {}", routes.len(), path.display());
    Ok(())
}

/// Improvement history, one row per new best tour.
pub fn save_history_csv(path: &Path, outcome: &SearchOutcome) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    write_history(&mut wtr, outcome)?;
    info!("Saved improvement history to {}", path.display());
    Ok(())
}

fn write_history<W: Write>(wtr: &mut Writer<W>, outcome: &SearchOutcome) -> Result<()> {
    wtr.write_record(["iteration", "best_cost", "initial_cost"])?;
    for (iteration, cost) in &outcome.improvements {
        wtr.write_record([
            iteration.to_string(),
            cost.to_string(),
            outcome.initial_cost.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
