mod server;

pub use crate::apis_proto::apis_service_client::ApisServiceClient;
pub use crate::apis_proto::apis_service_server::ApisServiceServer;
pub use server::{ApisServiceImpl, serve_with_listener, start_server};
