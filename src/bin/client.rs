use std::time::Duration;

use anyhow::{Result, bail};
use apis_rpc::CallDriver;
use apis_rpc::config::{self, DriverConfig};
use tracing::{info, warn};

const SERVER_STREAM_STEPS: i32 = 9;
const SHORT_DEADLINE: Duration = Duration::from_secs(1);
const LONG_DEADLINE: Duration = Duration::from_secs(5);

const CALLS: [&str; 6] = [
    "unary",
    "client-stream",
    "server-stream",
    "bidirection",
    "deadline",
    "error",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let url = config::server_url();

    let selected: Vec<String> = match std::env::args().nth(1) {
        Some(call) if CALLS.contains(&call.as_str()) => vec![call],
        Some(call) => bail!("unknown call '{call}', expected one of {CALLS:?}"),
        None => CALLS.iter().map(|call| call.to_string()).collect(),
    };

    info!(url = %url, "Welcome to ApisClient!");

    let mut driver = CallDriver::connect(url, DriverConfig::default()).await?;

    for call in selected {
        run_call(&mut driver, &call).await?;
    }

    Ok(())
}

async fn run_call(driver: &mut CallDriver, call: &str) -> Result<()> {
    match call {
        "unary" => {
            driver.unary("aloha").await?;
        }
        "client-stream" => {
            driver.client_stream().await?;
        }
        "server-stream" => {
            driver.server_stream(SERVER_STREAM_STEPS).await?;
        }
        "bidirection" => {
            driver.bidirection().await?;
        }
        "deadline" => {
            for timeout in [SHORT_DEADLINE, LONG_DEADLINE] {
                if let Err(e) = driver.unary_with_deadline("aloha", timeout).await {
                    warn!(timeout_ms = timeout.as_millis() as u64, error = %e, "UnaryWithDeadline failed");
                }
            }
        }
        "error" => match driver.error_handle().await {
            Ok(response) => warn!(response = ?response, "ErrorHandle unexpectedly succeeded"),
            Err(e) => info!(code = ?e.code(), error = %e, "ErrorHandle failed as expected"),
        },
        other => bail!("unknown call '{other}'"),
    }

    Ok(())
}
