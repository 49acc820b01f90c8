pub mod call;
pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod grpc;
pub mod service;
pub mod session;
pub mod state_machine;

pub mod apis_proto {
    include!(concat!(env!("OUT_DIR"), "/apis.rs"));
}

pub use client::CallDriver;
pub use error::{DriverError, ServiceError, SessionError};
