use anyhow::Result;
use apis_rpc::config::{self, ServiceConfig};
use apis_rpc::grpc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let addr = config::server_addr()?;

    info!(address = %addr, "Welcome to ApisServer!");

    grpc::start_server(addr, ServiceConfig::default()).await
}
