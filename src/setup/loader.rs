use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::domain::types::Location;
use crate::error::{Error, Result};

const REQUIRED_COLUMNS: [&str; 4] = ["id", "latitude", "longitude", "address"];

/// Read the location file at `path`. Row order is node order, so the first
/// row is node 0.
pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let file = File::open(path)
        .map_err(|e| Error::Load(format!("cannot open {}: {}", path.display(), e)))?;
    let locations = read_locations(file)?;
    info!("Loaded {} locations from {}", locations.len(), path.display());
    Ok(locations)
}

/// Parse `id,latitude,longitude,address` rows. Column order is free and extra
/// columns are ignored.
pub fn read_locations<R: Read>(reader: R) -> Result<Vec<Location>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| Error::Load(format!("cannot read header row: {e}")))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Load(format!(
            "missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut seen = HashSet::new();
    let mut locations = Vec::new();
    for (row, record) in reader.deserialize::<Location>().enumerate() {
        // header is line 1
        let line = row + 2;
        let location = record.map_err(|e| Error::Load(format!("line {line}: {e}")))?;

        if !(-90.0..=90.0).contains(&location.latitude) {
            return Err(Error::Load(format!(
                "line {line}: latitude {} out of range",
                location.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&location.longitude) {
            return Err(Error::Load(format!(
                "line {line}: longitude {} out of range",
                location.longitude
            )));
        }
        if !seen.insert(location.id) {
            return Err(Error::Load(format!(
                "line {line}: duplicate id {}",
                location.id
            )));
        }

        debug!("Location {}: {}", location.id, location.address);
        locations.push(location);
    }

    if locations.is_empty() {
        return Err(Error::Load("no locations in file".into()));
    }
    Ok(locations)
}
