use std::time::Duration;

use tokio::sync::oneshot;
use tonic::Request;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

use crate::apis_proto::apis_service_client::ApisServiceClient;
use crate::apis_proto::{
    BidirectionRequest, BidirectionResponse, ClientStreamRequest, ClientStreamResponse,
    ServerStreamRequest, ServerStreamResponse, UnaryRequest, UnaryResponse,
};
use crate::config::DriverConfig;
use crate::error::{DriverError, SessionError};
use crate::session::{self, Inbound, Outbound, StreamInbound};

/// Issues calls against an `ApisService` server, one method per interaction pattern.
///
/// Calls are never retried; the first failure is returned to the caller.
#[derive(Debug, Clone)]
pub struct CallDriver {
    client: ApisServiceClient<Channel>,
    config: DriverConfig,
}

impl CallDriver {
    /// Dial `url` and build a driver on the resulting channel.
    pub async fn connect(url: impl Into<String>, config: DriverConfig) -> Result<Self, DriverError> {
        let url = url.into();
        info!(url = %url, "Connecting to server");

        let client = ApisServiceClient::connect(url).await?;
        Ok(Self::new(client, config))
    }

    pub fn new(client: ApisServiceClient<Channel>, config: DriverConfig) -> Self {
        Self { client, config }
    }

    /// One request, one response.
    pub async fn unary(&mut self, msg: &str) -> Result<String, DriverError> {
        info!(msg = %msg, "Calling Unary");

        let response = self
            .client
            .unary(UnaryRequest {
                req_msg: msg.to_string(),
            })
            .await?;

        let resp_msg = response.into_inner().resp_msg;
        info!(resp_msg = %resp_msg, "Unary responded");
        Ok(resp_msg)
    }

    /// Send the configured numbers one by one, close, then wait for the summary.
    pub async fn client_stream(&mut self) -> Result<ClientStreamResponse, DriverError> {
        info!(count = self.config.numbers.len(), "Calling ClientStream");

        let (mut outbound, requests) =
            session::request_channel::<ClientStreamRequest>(self.config.outbound_capacity);
        let numbers = self.config.numbers.clone();
        let interval = self.config.client_stream_interval;

        let sending = async move {
            for num in numbers {
                debug!(num, "ClientStream sending");
                outbound.send(ClientStreamRequest { num }).await?;
                tokio::time::sleep(interval).await;
            }
            outbound.close();
            Ok::<_, SessionError>(())
        };

        let (sent, response) = tokio::join!(sending, self.client.client_stream(requests));

        let summary = response?.into_inner();
        sent?;

        info!(
            max = summary.max,
            min = summary.min,
            average = summary.average,
            "ClientStream responded"
        );
        Ok(summary)
    }

    /// Ask for `steps` sequence items and read them until end-of-stream.
    pub async fn server_stream(
        &mut self,
        steps: i32,
    ) -> Result<Vec<ServerStreamResponse>, DriverError> {
        info!(steps, "Calling ServerStream");

        let response = self
            .client
            .server_stream(ServerStreamRequest { steps })
            .await?;
        let mut inbound = StreamInbound::new(response.into_inner());

        let mut items = Vec::new();
        while let Some(item) = inbound.recv().await? {
            info!(position = item.position, value = item.value, "ServerStream received");
            items.push(item);
        }

        info!(received = items.len(), "ServerStream finished");
        Ok(items)
    }

    /// Send the configured numbers and read the running extremes concurrently.
    ///
    /// Sending and receiving run as separate tasks. Only the receiving task reports back, so
    /// this returns once the server has closed its side, whether or not sending is done.
    pub async fn bidirection(&mut self) -> Result<Vec<BidirectionResponse>, DriverError> {
        info!(count = self.config.numbers.len(), "Calling Bidirection");

        let (mut outbound, requests) =
            session::request_channel::<BidirectionRequest>(self.config.outbound_capacity);
        let numbers = self.config.numbers.clone();
        let interval = self.config.bidirection_interval;

        tokio::spawn(async move {
            for num in numbers {
                debug!(num, "Bidirection sending");
                if let Err(e) = outbound.send(BidirectionRequest { num }).await {
                    warn!(num, error = %e, "Bidirection send failed");
                    break;
                }
                tokio::time::sleep(interval).await;
            }
            outbound.close();
        });

        let response = self.client.bidirection(requests).await?;
        let mut inbound = StreamInbound::new(response.into_inner());

        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut replies = Vec::new();
            let outcome = loop {
                match inbound.recv().await {
                    Ok(Some(reply)) => {
                        info!(max = reply.max, min = reply.min, "Bidirection received");
                        replies.push(reply);
                    }
                    Ok(None) => break Ok(replies),
                    Err(e) => break Err(e),
                }
            };
            let _ = done_tx.send(outcome);
        });

        let replies = done_rx.await.map_err(|_| {
            DriverError::Task("bidirection receiver stopped without reporting".to_string())
        })??;

        info!(received = replies.len(), "Bidirection finished");
        Ok(replies)
    }

    /// Call `UnaryWithDeadline` with `timeout` attached to the request.
    pub async fn unary_with_deadline(
        &mut self,
        msg: &str,
        timeout: Duration,
    ) -> Result<String, DriverError> {
        info!(msg = %msg, timeout_ms = timeout.as_millis() as u64, "Calling UnaryWithDeadline");

        let mut request = Request::new(UnaryRequest {
            req_msg: msg.to_string(),
        });
        request.set_timeout(timeout);

        let response = self.client.unary_with_deadline(request).await?;

        let resp_msg = response.into_inner().resp_msg;
        info!(resp_msg = %resp_msg, "UnaryWithDeadline responded");
        Ok(resp_msg)
    }

    /// Call `ErrorHandle`; a server that honours the contract always makes this fail.
    pub async fn error_handle(&mut self) -> Result<UnaryResponse, DriverError> {
        info!("Calling ErrorHandle");

        let response = self.client.error_handle(UnaryRequest::default()).await?;
        Ok(response.into_inner())
    }
}
