use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use route_planner::distance::providers::{
    GoogleMatrixProvider, OsrmRouteProvider, OsrmTableProvider,
};
use route_planner::distance::{DistanceSource, UNREACHABLE};
use route_planner::domain::Coordinate;
use route_planner::Error;

/// Serve every GET with `handler(path_and_query) -> (status, body)` on a
/// random local port and return the base URL.
async fn serve<F>(handler: F) -> String
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = handler(&path);
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    if status == 200 { "OK" } else { "Error" },
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn local_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

fn points(n: usize) -> Vec<Coordinate> {
    (0..n)
        .map(|i| Coordinate::new(1.0 + i as f64 * 0.25, 103.5 + i as f64 * 0.25))
        .collect()
}

/// Count `lat,lon` pairs in a query parameter, whether `|` is escaped or not.
fn count_points(path: &str, param: &str) -> usize {
    let start = path.find(&format!("{param}=")).unwrap() + param.len() + 1;
    let value = path[start..].split('&').next().unwrap();
    value.matches('|').count() + value.matches("%7C").count() + 1
}

fn google_ok_body(rows: usize, cols: usize, element: &str) -> String {
    let row = format!("{{\"elements\": [{}]}}", vec![element; cols].join(","));
    format!(
        "{{\"status\": \"OK\", \"rows\": [{}]}}",
        vec![row.as_str(); rows].join(",")
    )
}

#[tokio::test]
async fn google_error_status_fails_whole_matrix() {
    let base = serve(|_| {
        (
            200,
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#
                .to_string(),
        )
    })
    .await;

    let provider = GoogleMatrixProvider::new("bad-key")
        .with_base_url(&base)
        .with_client(local_client());
    match provider.distance_matrix(&points(3)).await {
        Err(Error::ProviderUnavailable { provider, reason }) => {
            assert_eq!(provider, "google");
            assert!(reason.contains("REQUEST_DENIED"), "{reason}");
        }
        other => panic!("expected ProviderUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn google_http_error_fails_whole_matrix() {
    let base = serve(|_| (500, "{}".to_string())).await;
    let provider = GoogleMatrixProvider::new("key")
        .with_base_url(&base)
        .with_client(local_client());
    assert!(matches!(
        provider.distance_matrix(&points(4)).await,
        Err(Error::ProviderUnavailable { .. })
    ));
}

#[tokio::test]
async fn google_small_request_is_one_call() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let base = serve(move |path| {
        recorder.lock().unwrap().push(path.to_string());
        let (rows, cols) = (count_points(path, "origins"), count_points(path, "destinations"));
        (
            200,
            google_ok_body(rows, cols, r#"{"status": "OK", "distance": {"value": 750}}"#),
        )
    })
    .await;

    let provider = GoogleMatrixProvider::new("secret-key")
        .with_base_url(&base)
        .with_client(local_client());
    let matrix = provider.distance_matrix(&points(10)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    // lat,lon pairs joined by '|', credential in the query
    let path = seen[0].replace("%7C", "|");
    assert!(path.starts_with("/?origins=1,103.5|1.25,103.75|"), "{path}");
    assert!(path.contains("&destinations=1,103.5|1.25,103.75|"), "{path}");
    assert!(path.ends_with("&key=secret-key"), "{path}");
    assert_eq!(count_points(&path, "origins"), 10);
    assert_eq!(count_points(&path, "destinations"), 10);

    assert_eq!(matrix.size(), 10);
    assert_eq!(matrix.get(0, 9), 750.0);
    assert_eq!(matrix.get(4, 4), 0.0);
}

#[tokio::test]
async fn google_large_request_is_tiled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let base = serve(move |path| {
        counter.fetch_add(1, Ordering::SeqCst);
        let (rows, cols) = (count_points(path, "origins"), count_points(path, "destinations"));
        (
            200,
            google_ok_body(rows, cols, r#"{"status": "OK", "distance": {"value": 42}}"#),
        )
    })
    .await;

    let provider = GoogleMatrixProvider::new("key")
        .with_base_url(&base)
        .with_client(local_client());
    let matrix = provider.distance_matrix(&points(12)).await.unwrap();

    // 12 points in tiles of 10: 2 x 2 requests
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(matrix.get(11, 0), 42.0);
    assert_eq!(matrix.get(3, 10), 42.0);
    assert_eq!(matrix.unreachable_count(), 0);
}

#[tokio::test]
async fn google_missing_element_is_unreachable() {
    let base = serve(|path| {
        let (rows, cols) = (count_points(path, "origins"), count_points(path, "destinations"));
        (200, google_ok_body(rows, cols, r#"{"status": "ZERO_RESULTS"}"#))
    })
    .await;

    let provider = GoogleMatrixProvider::new("key")
        .with_base_url(&base)
        .with_client(local_client());
    let matrix = provider.distance_matrix(&points(3)).await.unwrap();
    assert_eq!(matrix.get(0, 1), UNREACHABLE);
    assert_eq!(matrix.get(1, 1), 0.0);
}

#[tokio::test]
async fn osrm_route_failure_degrades_only_that_pair() {
    let pts = points(3);
    // the pair 0 -> 2, in OSRM's lon,lat order
    let failing = "/route/v1/driving/103.5,1;104,1.5?overview=false";
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let base = serve(move |path| {
        recorder.lock().unwrap().push(path.to_string());
        if path == failing {
            (500, "{}".to_string())
        } else {
            (
                200,
                r#"{"code": "Ok", "routes": [{"distance": 1200.5, "duration": 90.0}]}"#
                    .to_string(),
            )
        }
    })
    .await;

    let provider = OsrmRouteProvider::new(&base).with_client(local_client());
    let matrix = provider.distance_matrix(&pts).await;

    assert_eq!(matrix.get(0, 2), UNREACHABLE);
    assert_eq!(matrix.get(2, 0), 1200.5);
    assert_eq!(matrix.get(0, 1), 1200.5);
    assert_eq!(matrix.get(1, 1), 0.0);
    assert_eq!(matrix.unreachable_count(), 1);

    // one request per ordered pair, lon,lat;lon,lat with no overview
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            "/route/v1/driving/103.5,1;103.75,1.25?overview=false",
            "/route/v1/driving/103.5,1;104,1.5?overview=false",
            "/route/v1/driving/103.75,1.25;103.5,1?overview=false",
            "/route/v1/driving/103.75,1.25;104,1.5?overview=false",
            "/route/v1/driving/104,1.5;103.5,1?overview=false",
            "/route/v1/driving/104,1.5;103.75,1.25?overview=false",
        ]
    );
}

#[tokio::test]
async fn osrm_route_no_route_is_unreachable() {
    let base = serve(|_| {
        (
            200,
            r#"{"code": "NoRoute", "message": "Impossible route between points"}"#.to_string(),
        )
    })
    .await;

    let provider = OsrmRouteProvider::new(&base).with_client(local_client());
    let matrix = provider.distance_matrix(&points(2)).await;
    assert_eq!(matrix.unreachable_count(), 2);
}

#[tokio::test]
async fn osrm_table_reads_whole_matrix() {
    let base = serve(|path| {
        assert!(path.starts_with("/table/v1/driving/"), "{path}");
        assert!(path.ends_with("?annotations=distance"), "{path}");
        (
            200,
            r#"{"code": "Ok", "distances": [[0, 5.5, 7], [5.5, 0, null], [7, 3, 0]]}"#.to_string(),
        )
    })
    .await;

    let provider = OsrmTableProvider::new(&base).with_client(local_client());
    let matrix = provider.distance_matrix(&points(3)).await.unwrap();
    assert_eq!(matrix.get(0, 1), 5.5);
    assert_eq!(matrix.get(2, 1), 3.0);
    assert_eq!(matrix.get(1, 2), UNREACHABLE);
}

#[tokio::test]
async fn osrm_table_http_error_fails_whole_matrix() {
    let base = serve(|_| (503, "{}".to_string())).await;
    let provider = OsrmTableProvider::new(&base).with_client(local_client());
    assert!(matches!(
        provider.distance_matrix(&points(3)).await,
        Err(Error::ProviderUnavailable { provider: "osrm-table", .. })
    ));
}

#[tokio::test]
async fn osrm_table_non_json_body_is_reported() {
    // error! formats the body only when a subscriber listens
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .with_writer(std::io::sink)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let base = serve(|_| (200, format!("{}é and more", "x".repeat(199)))).await;
    let provider = OsrmTableProvider::new(&base).with_client(local_client());
    assert!(matches!(
        provider.distance_matrix(&points(3)).await,
        Err(Error::ProviderUnavailable { provider: "osrm-table", .. })
    ));
}

#[tokio::test]
async fn geometric_source_on_identical_points() {
    let p = Coordinate::new(48.8566, 2.3522);
    let matrix = DistanceSource::Geometric(Default::default())
        .distance_matrix(&[p, p])
        .await
        .unwrap();
    assert!(matrix.rows().flatten().all(|d| d.abs() < 1e-6));
}
