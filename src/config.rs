use std::net::SocketAddr;
use std::time::Duration;

use bon::Builder;

use crate::deadline::PollBudget;

/// Numbers the driver sends on the client-streaming and bidirectional calls.
pub const DEFAULT_NUMBERS: [i32; 8] = [11, 52, 32, 94, 45, 2, 24, 5];

/// Default server bind address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8199";

/// Default client endpoint.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8199";

/// Configuration for the service handlers.
#[derive(Debug, Clone, Builder)]
pub struct ServiceConfig {
    /// Delay after each item of the server-streaming call.
    #[builder(default = Duration::from_millis(200))]
    pub stream_pacing: Duration,

    /// Checks performed by the deadline-aware unary call.
    #[builder(default)]
    pub deadline_budget: PollBudget,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the [`CallDriver`](crate::client::CallDriver).
#[derive(Debug, Clone, Builder)]
pub struct DriverConfig {
    /// Ordered numbers sent by the streaming calls.
    #[builder(default = DEFAULT_NUMBERS.to_vec())]
    pub numbers: Vec<i32>,

    /// Delay after each send on the client-streaming call.
    #[builder(default = Duration::from_secs(1))]
    pub client_stream_interval: Duration,

    /// Delay after each send on the bidirectional call.
    #[builder(default = Duration::from_millis(100))]
    pub bidirection_interval: Duration,

    /// Requests the driver may have in flight towards the server.
    #[builder(default = 1)]
    pub outbound_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Server bind address from `APIS_ADDR`, falling back to [`DEFAULT_ADDR`].
pub fn server_addr() -> Result<SocketAddr, std::net::AddrParseError> {
    std::env::var("APIS_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
}

/// Client endpoint from `APIS_URL`, falling back to [`DEFAULT_URL`].
pub fn server_url() -> String {
    std::env::var("APIS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.stream_pacing, Duration::from_millis(200));
        assert_eq!(config.deadline_budget.attempts, 3);
        assert_eq!(config.deadline_budget.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_driver_overrides() {
        let config = DriverConfig::builder()
            .numbers(vec![1, 2, 3])
            .client_stream_interval(Duration::ZERO)
            .build();

        assert_eq!(config.numbers, vec![1, 2, 3]);
        assert_eq!(config.client_stream_interval, Duration::ZERO);
        assert_eq!(config.bidirection_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_driver_defaults_send_reference_numbers() {
        assert_eq!(DriverConfig::default().numbers, DEFAULT_NUMBERS.to_vec());
    }
}
