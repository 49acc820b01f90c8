use thiserror::Error;
use tonic::{Code, Status};

use crate::state_machine::stats::NoSamples;

/// Failures of a single stream operation.
///
/// End-of-stream is not an error: [`Inbound::recv`](crate::session::Inbound::recv) reports it as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The local side already closed the stream for sending.
    #[error("stream already closed for sending")]
    SendClosed,

    /// The receiving side of the stream has gone away.
    #[error("peer disconnected")]
    PeerGone,

    /// The call was cancelled or its deadline passed.
    #[error("call cancelled: {0}")]
    Cancelled(String),

    /// Any other failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(Status),
}

impl From<Status> for SessionError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Cancelled | Code::DeadlineExceeded => {
                SessionError::Cancelled(status.message().to_string())
            }
            _ => SessionError::Transport(status),
        }
    }
}

impl From<SessionError> for Status {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SendClosed => Status::internal(err.to_string()),
            SessionError::PeerGone => Status::unavailable(err.to_string()),
            SessionError::Cancelled(message) => Status::cancelled(message),
            SessionError::Transport(status) => status,
        }
    }
}

/// Failures of a service handler. Each one aborts only the call it happened in.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The client closed its stream without sending a single number.
    #[error("client stream ended before any number was received")]
    EmptyStream,

    /// More sequence steps were requested than can be represented.
    #[error("requested {requested} steps, at most {max} are supported")]
    StepsOutOfRange { requested: i32, max: i32 },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<NoSamples> for ServiceError {
    fn from(_: NoSamples) -> Self {
        ServiceError::EmptyStream
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::EmptyStream => Status::failed_precondition(err.to_string()),
            ServiceError::StepsOutOfRange { .. } => Status::out_of_range(err.to_string()),
            ServiceError::Session(session) => session.into(),
        }
    }
}

/// Failures seen by the [`CallDriver`](crate::client::CallDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    /// Dialing the server failed.
    #[error("failed to connect: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// The server answered the call with an error status.
    #[error("rpc failed: {0}")]
    Rpc(#[from] Status),

    /// A stream operation on the client side failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A driver task ended without reporting completion.
    #[error("driver task failed: {0}")]
    Task(String),
}

impl DriverError {
    /// The gRPC status code carried by this error, if any.
    pub fn code(&self) -> Option<Code> {
        match self {
            DriverError::Rpc(status) => Some(status.code()),
            DriverError::Session(SessionError::Transport(status)) => Some(status.code()),
            DriverError::Session(SessionError::Cancelled(_)) => Some(Code::Cancelled),
            _ => None,
        }
    }
}
