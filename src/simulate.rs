//! Drive-through of a finished route at a constant average speed.

use std::time::Duration;

use crate::distance::haversine::great_circle_distance;
use crate::domain::types::Coordinate;

/// One hop between consecutive stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub index: usize,
    pub from: Coordinate,
    pub to: Coordinate,
    pub distance_km: f64,
    pub travel_time: Duration,
    pub cumulative_km: f64,
    pub elapsed: Duration,
}

/// Lazily yield a [`Leg`] for every consecutive pair in `coords`.
///
/// A speed that is zero or negative gives `Duration::MAX` travel times.
pub fn simulate_route(
    coords: &[Coordinate],
    average_speed_kmh: f64,
) -> impl Iterator<Item = Leg> + '_ {
    coords
        .windows(2)
        .enumerate()
        .scan((0.0, Duration::ZERO), move |(cumulative_km, elapsed), (index, pair)| {
            let (from, to) = (pair[0], pair[1]);
            let distance_km = great_circle_distance(from, to) / 1000.0;
            let travel_time = travel_time(distance_km, average_speed_kmh);

            *cumulative_km += distance_km;
            *elapsed = elapsed.saturating_add(travel_time);

            Some(Leg {
                index,
                from,
                to,
                distance_km,
                travel_time,
                cumulative_km: *cumulative_km,
                elapsed: *elapsed,
            })
        })
}

fn travel_time(distance_km: f64, speed_kmh: f64) -> Duration {
    if distance_km == 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(distance_km / speed_kmh * 3600.0).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legs_accumulate() {
        // one degree of latitude is about 111.19 km
        let route = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(2.0, 0.0),
        ];
        let legs: Vec<Leg> = simulate_route(&route, 40.0).collect();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[1].index, 1);
        assert!((legs[0].distance_km - 111.19).abs() < 0.01);
        assert!((legs[1].cumulative_km - 2.0 * legs[0].distance_km).abs() < 1e-6);

        let hours = legs[0].travel_time.as_secs_f64() / 3600.0;
        assert!((hours - legs[0].distance_km / 40.0).abs() < 1e-6);
        assert_eq!(legs[1].elapsed, legs[0].travel_time + legs[1].travel_time);
    }

    #[test]
    fn test_short_routes_have_no_legs() {
        assert_eq!(simulate_route(&[], 40.0).count(), 0);
        assert_eq!(simulate_route(&[Coordinate::new(1.0, 1.0)], 40.0).count(), 0);
    }

    #[test]
    fn test_standing_still_takes_no_time() {
        let p = Coordinate::new(1.35, 103.8);
        let leg = simulate_route(&[p, p], 0.0).next().unwrap();
        assert_eq!(leg.travel_time, Duration::ZERO);
    }

    #[test]
    fn test_zero_speed_saturates() {
        let route = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
        let leg = simulate_route(&route, 0.0).next().unwrap();
        assert_eq!(leg.travel_time, Duration::MAX);
    }
}
