use route_planner::planner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    planner::run().await
}
