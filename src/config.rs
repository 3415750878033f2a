use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub mod constant {
    pub const SEED: u64 = 12345;
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
    pub const DEFAULT_TIME_LIMIT_SECS: u64 = 30;
    pub const DEFAULT_SPEED_KMH: f64 = 40.0;
    pub const GLS_LAMBDA_COEFFICIENT: f64 = 0.1;
    pub const PERTURBATION_INTERVAL: usize = 50;
    pub const MAX_SEGMENT_LEN: usize = 3;
    pub const GOOGLE_TILE_SIZE: usize = 10;
    pub const OSRM_MAX_URL_LEN: usize = 8000;
    pub const OSRM_CONCURRENT_REQUESTS: usize = 8;
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
    pub const GOOGLE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
    pub const OSRM_BASE_URL: &str = "http://router.project-osrm.org";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Geometric,
    Google,
    OsrmRoute,
    OsrmTable,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometric" | "haversine" => Ok(ProviderKind::Geometric),
            "google" => Ok(ProviderKind::Google),
            "osrm" | "osrm-route" => Ok(ProviderKind::OsrmRoute),
            "osrm-table" => Ok(ProviderKind::OsrmTable),
            other => Err(Error::Config(format!(
                "unknown distance provider '{other}'"
            ))),
        }
    }
}

/// Runtime settings for the planner binary, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,
    pub google_api_key: Option<String>,
    pub google_matrix_url: String,
    pub osrm_base_url: String,
    pub locations_csv: PathBuf,
    pub route_output: PathBuf,
    pub history_csv: PathBuf,
    pub num_vehicles: usize,
    pub depot_index: usize,
    pub time_limit: Duration,
    pub average_speed_kmh: f64,
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("DISTANCE_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => ProviderKind::Geometric,
        };

        let google_api_key = lookup("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty());
        if provider == ProviderKind::Google {
            match &google_api_key {
                Some(_) => info!("Loaded Google Maps API key from environment"),
                None => {
                    return Err(Error::Config(
                        "DISTANCE_PROVIDER is 'google' but GOOGLE_API_KEY is not set".into(),
                    ))
                }
            }
        }

        let osrm_base_url = lookup("OSRM_BASE_URL").unwrap_or_else(|| {
            if matches!(provider, ProviderKind::OsrmRoute | ProviderKind::OsrmTable) {
                warn!("OSRM_BASE_URL not set, using public OSRM server");
            }
            constant::OSRM_BASE_URL.to_string()
        });

        Ok(Settings {
            provider,
            google_api_key,
            google_matrix_url: lookup("GOOGLE_MATRIX_URL")
                .unwrap_or_else(|| constant::GOOGLE_MATRIX_URL.to_string()),
            osrm_base_url,
            locations_csv: lookup("LOCATIONS_CSV")
                .unwrap_or_else(|| "data/locations.csv".to_string())
                .into(),
            route_output: lookup("ROUTE_OUTPUT")
                .unwrap_or_else(|| "app/route_result.json".to_string())
                .into(),
            history_csv: lookup("HISTORY_CSV")
                .unwrap_or_else(|| "best_so_far.csv".to_string())
                .into(),
            num_vehicles: parse_or(&lookup, "NUM_VEHICLES", 1)?,
            depot_index: parse_or(&lookup, "DEPOT_INDEX", 0)?,
            time_limit: Duration::from_secs(parse_or(
                &lookup,
                "SOLVER_TIME_LIMIT_SECS",
                constant::DEFAULT_TIME_LIMIT_SECS,
            )?),
            average_speed_kmh: parse_or(&lookup, "AVERAGE_SPEED_KMH", constant::DEFAULT_SPEED_KMH)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}='{raw}': {e}"))),
        None => Ok(default),
    }
}
