//! Client side of `ApisService`.
//!
//! The [`CallDriver`] reproduces each interaction pattern against a server: it produces the
//! client-to-server messages, consumes the server-to-client ones, and reports what came back.
//!
//! # Example
//!
//! ```ignore
//! use apis_rpc::client::CallDriver;
//! use apis_rpc::config::DriverConfig;
//!
//! let mut driver = CallDriver::connect("http://127.0.0.1:8199", DriverConfig::default()).await?;
//!
//! let greeting = driver.unary("aloha").await?;
//! let summary = driver.client_stream().await?;
//! let sequence = driver.server_stream(9).await?;
//! let extremes = driver.bidirection().await?;
//! ```

mod driver;

pub use driver::CallDriver;
