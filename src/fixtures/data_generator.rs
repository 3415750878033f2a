use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::domain::types::{Coordinate, Location};
use crate::error::{Error, Result};

/// Half-width of the box random stops are scattered in, in degrees (about 11 km).
const SPREAD_DEG: f64 = 0.1;

/// Seeded random locations scattered around `center`; the first one is the
/// center itself so it can serve as the depot. Ids count up from 1.
pub fn generate_random_locations(count: usize, center: Coordinate, seed: u64) -> Vec<Location> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut locations = Vec::with_capacity(count);

    for index in 0..count {
        let (latitude, longitude) = if index == 0 {
            (center.latitude, center.longitude)
        } else {
            (
                (center.latitude + rng.gen_range(-SPREAD_DEG..SPREAD_DEG)).clamp(-90.0, 90.0),
                (center.longitude + rng.gen_range(-SPREAD_DEG..SPREAD_DEG)).clamp(-180.0, 180.0),
            )
        };
        locations.push(Location {
            id: index as i64 + 1,
            latitude,
            longitude,
            address: if index == 0 {
                "Depot".to_string()
            } else {
                format!("Stop {index}")
            },
        });
    }

    debug!("Generated {} random locations (seed {})", count, seed);
    locations
}

/// Render locations in the loader's CSV format.
pub fn locations_to_csv(locations: &[Location]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for location in locations {
        wtr.serialize(location)?;
    }
    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::loader::read_locations;

    #[test]
    fn test_seeded_and_unique() {
        let center = Coordinate::new(1.3521, 103.8198);
        let a = generate_random_locations(20, center, 42);
        let b = generate_random_locations(20, center, 42);
        assert_eq!(a, b);
        assert_eq!(a[0].coordinate(), center);
        assert!(a
            .iter()
            .all(|l| (l.latitude - center.latitude).abs() <= SPREAD_DEG));
        assert_ne!(a, generate_random_locations(20, center, 43));
    }

    #[test]
    fn test_csv_loads_back() {
        let locations = generate_random_locations(5, Coordinate::new(40.7, -74.0), 1);
        let csv = locations_to_csv(&locations).unwrap();
        assert!(csv.starts_with("id,latitude,longitude,address\n"));
        assert_eq!(read_locations(csv.as_bytes()).unwrap(), locations);
    }
}
