pub mod geometric;
pub mod google;
pub mod osrm;

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::warn;

use crate::config::constant::HTTP_TIMEOUT_SECS;

pub use geometric::GeometricProvider;
pub use google::GoogleMatrixProvider;
pub use osrm::{OsrmRouteProvider, OsrmTableProvider};

fn http_client() -> Client {
    build_or_fallback(
        Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(concat!("route-planner/", env!("CARGO_PKG_VERSION"))),
    )
}

/// The fallback client has no request timeout, so its use is always logged.
fn build_or_fallback(builder: ClientBuilder) -> Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            warn!(
                "Failed to build HTTP client ({}), falling back to defaults without the {}s timeout",
                e, HTTP_TIMEOUT_SECS
            );
            Client::new()
        }
    }
}
