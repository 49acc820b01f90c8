use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::{info, warn};

use crate::apis_proto::apis_service_server::{ApisService, ApisServiceServer};
use crate::apis_proto::{
    BidirectionRequest, BidirectionResponse, ClientStreamRequest, ClientStreamResponse,
    ServerStreamRequest, ServerStreamResponse, UnaryRequest, UnaryResponse,
};
use crate::call::CallId;
use crate::config::ServiceConfig;
use crate::deadline::{self, CallContext};
use crate::service;
use crate::session::{self, StreamInbound};

/// Replies a streaming handler may have in flight towards the client.
///
/// Bidirection answers each number before reading the next, so a single slot is all it may use.
pub(crate) const REPLY_CAPACITY: usize = 1;

pub async fn start_server(addr: SocketAddr, config: ServiceConfig) -> anyhow::Result<()> {
    let service = ApisServiceImpl::new(config);

    info!(address = %addr, "gRPC server starting");

    tonic::transport::Server::builder()
        .add_service(ApisServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

/// Serve on an already bound listener, e.g. one bound to port 0.
pub async fn serve_with_listener(
    listener: TcpListener,
    config: ServiceConfig,
) -> Result<(), tonic::transport::Error> {
    let service = ApisServiceImpl::new(config);

    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "gRPC server starting");
    }

    tonic::transport::Server::builder()
        .add_service(ApisServiceServer::new(service))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}

/// Binds the handlers in [`service`] to the generated tonic service.
///
/// Holds only immutable configuration; every call builds its own sessions and state.
#[derive(Debug, Clone, Default)]
pub struct ApisServiceImpl {
    config: ServiceConfig,
}

impl ApisServiceImpl {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }
}

#[tonic::async_trait]
impl ApisService for ApisServiceImpl {
    async fn unary(
        &self,
        request: Request<UnaryRequest>,
    ) -> Result<Response<UnaryResponse>, Status> {
        let call_id = CallId::generate();
        Ok(Response::new(service::unary(&call_id, request.into_inner())))
    }

    async fn client_stream(
        &self,
        request: Request<Streaming<ClientStreamRequest>>,
    ) -> Result<Response<ClientStreamResponse>, Status> {
        let call_id = CallId::generate();
        let mut inbound = StreamInbound::new(request.into_inner());

        let summary = service::client_stream(&call_id, &mut inbound).await?;

        Ok(Response::new(summary))
    }

    type ServerStreamStream = ReceiverStream<Result<ServerStreamResponse, Status>>;

    async fn server_stream(
        &self,
        request: Request<ServerStreamRequest>,
    ) -> Result<Response<Self::ServerStreamStream>, Status> {
        let call_id = CallId::generate();
        let steps = request.into_inner().steps;

        // Reject before the stream is handed out so the caller gets a plain status.
        service::validate_steps(steps)?;

        let (mut outbound, stream) = session::response_channel(REPLY_CAPACITY);
        let pacing = self.config.stream_pacing;

        tokio::spawn(async move {
            service::server_stream(&call_id, steps, &mut outbound, pacing).await;
        });

        Ok(Response::new(stream))
    }

    type BidirectionStream = ReceiverStream<Result<BidirectionResponse, Status>>;

    async fn bidirection(
        &self,
        request: Request<Streaming<BidirectionRequest>>,
    ) -> Result<Response<Self::BidirectionStream>, Status> {
        let call_id = CallId::generate();
        let mut inbound = StreamInbound::new(request.into_inner());
        let (mut outbound, stream) = session::response_channel(REPLY_CAPACITY);

        tokio::spawn(async move {
            if let Err(e) = service::bidirection(&call_id, &mut inbound, &mut outbound).await {
                warn!(call_id = %call_id, error = %e, "Bidirection failed");
                let _ = outbound.fail(e.into()).await;
            }
        });

        Ok(Response::new(stream))
    }

    async fn unary_with_deadline(
        &self,
        request: Request<UnaryRequest>,
    ) -> Result<Response<UnaryResponse>, Status> {
        let call_id = CallId::generate();
        let timeout = deadline::timeout_from_metadata(request.metadata());
        let budget = self.config.deadline_budget;

        // The guard lives in this future. If the transport gives up on the call and drops it,
        // the spawned check loop sees the cancellation at its next poll.
        let (ctx, _guard) = CallContext::new(timeout.map(|timeout| Instant::now() + timeout));

        let work = tokio::spawn(async move {
            service::unary_with_deadline(&call_id, &ctx, &budget).await
        });

        let response = work
            .await
            .map_err(|e| Status::internal(format!("deadline task failed: {e}")))?;

        Ok(Response::new(response))
    }

    async fn error_handle(
        &self,
        _request: Request<UnaryRequest>,
    ) -> Result<Response<UnaryResponse>, Status> {
        let call_id = CallId::generate();
        Err(service::error_handle(&call_id))
    }
}
