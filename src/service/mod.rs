//! Transport-agnostic handlers for the six methods of `ApisService`.
//!
//! Handlers hold no state of their own. Everything a call mutates ([`RunningStats`],
//! [`FibonacciMachine`], its sessions) is created inside the call and dropped when it returns.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::apis_proto::{
    BidirectionRequest, BidirectionResponse, ClientStreamRequest, ClientStreamResponse,
    ServerStreamResponse, UnaryRequest, UnaryResponse,
};
use crate::call::CallId;
use crate::deadline::{CallContext, Completion, PollBudget, poll_until_cancelled};
use crate::error::ServiceError;
use crate::session::{Inbound, Outbound};
use crate::state_machine::StateMachine;
use crate::state_machine::fibonacci::{
    FibonacciInput, FibonacciMachine, FibonacciOutput, MAX_POSITION,
};
use crate::state_machine::stats::{RunningStats, StatsInput};

pub const GREETING: &str = "Hello ";
pub const NORMAL_RESPONSE: &str = "Server response to client normaly!";
pub const CANCELLED_RESPONSE: &str = "Server response to client none-normaly!";
pub const ERROR_HANDLE_MESSAGE: &str = "Server cancel request!";

/// Greet the caller.
pub fn unary(call_id: &CallId, request: UnaryRequest) -> UnaryResponse {
    info!(call_id = %call_id, msg = %request.req_msg, "Unary call");

    UnaryResponse {
        resp_msg: format!("{GREETING}{}", request.req_msg),
    }
}

/// Aggregate every number the client sends into a single summary.
///
/// Fails with [`ServiceError::EmptyStream`] if the client closes without sending anything.
pub async fn client_stream<I>(
    call_id: &CallId,
    inbound: &mut I,
) -> Result<ClientStreamResponse, ServiceError>
where
    I: Inbound<ClientStreamRequest>,
{
    info!(call_id = %call_id, "ClientStream call");

    let mut stats = RunningStats::new();

    loop {
        match inbound.recv().await {
            Ok(Some(request)) => {
                debug!(call_id = %call_id, num = request.num, "ClientStream received number");
                stats.process_input(StatsInput::Sample(request.num));
            }
            Ok(None) => break,
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "ClientStream receive failed");
                return Err(e.into());
            }
        }
    }

    let summary = stats.summary()?;
    info!(
        call_id = %call_id,
        count = stats.count(),
        max = summary.max,
        min = summary.min,
        average = summary.average,
        "ClientStream finished"
    );

    Ok(ClientStreamResponse {
        max: summary.max,
        min: summary.min,
        average: summary.average,
    })
}

/// Reject step counts whose values cannot be represented before any item is sent.
pub fn validate_steps(steps: i32) -> Result<(), ServiceError> {
    if steps > MAX_POSITION {
        return Err(ServiceError::StepsOutOfRange {
            requested: steps,
            max: MAX_POSITION,
        });
    }

    Ok(())
}

/// Send the first `steps` Fibonacci numbers, waiting `pacing` after each one.
///
/// Callers reject out-of-range counts with [`validate_steps`] first; positions past
/// [`MAX_POSITION`] end the stream early. A failed send ends the stream quietly; the peer is
/// gone and nobody is left to tell. The outbound half is closed when this returns.
pub async fn server_stream<O>(call_id: &CallId, steps: i32, outbound: &mut O, pacing: Duration)
where
    O: Outbound<ServerStreamResponse>,
{
    info!(call_id = %call_id, steps, "ServerStream call");

    let mut machine = FibonacciMachine::new();

    for _ in 0..steps.max(0) {
        machine.process_input(FibonacciInput::Step);
        let Some(FibonacciOutput::Item(item)) = machine.poll_output() else {
            break;
        };

        debug!(call_id = %call_id, position = item.position, value = item.value, "ServerStream sending");

        let response = ServerStreamResponse {
            position: item.position,
            value: item.value,
        };
        if let Err(e) = outbound.send(response).await {
            warn!(call_id = %call_id, position = item.position, error = %e, "ServerStream send failed, stopping");
            break;
        }

        tokio::time::sleep(pacing).await;
    }

    outbound.close();
    info!(call_id = %call_id, sent = machine.position(), "ServerStream finished");
}

/// Answer every received number with the running max/min, one reply per number.
///
/// Ends successfully at end-of-stream or when a reply cannot be delivered. Receive failures are
/// returned to the caller.
pub async fn bidirection<I, O>(
    call_id: &CallId,
    inbound: &mut I,
    outbound: &mut O,
) -> Result<(), ServiceError>
where
    I: Inbound<BidirectionRequest>,
    O: Outbound<BidirectionResponse>,
{
    info!(call_id = %call_id, "Bidirection call");

    let mut stats = RunningStats::new();

    loop {
        let request = match inbound.recv().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                info!(call_id = %call_id, count = stats.count(), "Bidirection client finished");
                break;
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Bidirection receive failed");
                return Err(e.into());
            }
        };

        debug!(call_id = %call_id, num = request.num, "Bidirection received number");
        let extremes = stats.record(request.num);

        let response = BidirectionResponse {
            max: extremes.max,
            min: extremes.min,
        };
        if let Err(e) = outbound.send(response).await {
            warn!(call_id = %call_id, error = %e, "Bidirection send failed, stopping");
            break;
        }
    }

    outbound.close();
    Ok(())
}

/// Check the call context against `budget`, answering with a distinct message when the call was
/// cancelled before the budget ran out.
pub async fn unary_with_deadline(
    call_id: &CallId,
    ctx: &CallContext,
    budget: &PollBudget,
) -> UnaryResponse {
    info!(call_id = %call_id, attempts = budget.attempts, "UnaryWithDeadline call");

    let completion = poll_until_cancelled(ctx, budget).await;
    info!(call_id = %call_id, ?completion, "UnaryWithDeadline finished");

    let resp_msg = match completion {
        Completion::Normal => NORMAL_RESPONSE,
        Completion::Cancelled => CANCELLED_RESPONSE,
    };

    UnaryResponse {
        resp_msg: resp_msg.to_string(),
    }
}

/// Always fails with `FAILED_PRECONDITION`.
pub fn error_handle(call_id: &CallId) -> tonic::Status {
    info!(call_id = %call_id, "ErrorHandle call");
    tonic::Status::failed_precondition(ERROR_HANDLE_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NUMBERS;
    use crate::error::SessionError;
    use crate::session::{self, ChannelOutbound};
    use tonic::{Code, Status};

    async fn send_all<T: Send + 'static>(outbound: &mut ChannelOutbound<T>, items: Vec<T>) {
        for item in items {
            outbound.send(item).await.unwrap();
        }
        outbound.close();
    }

    #[test]
    fn test_unary_greets() {
        let call_id = CallId::generate();
        let response = unary(
            &call_id,
            UnaryRequest {
                req_msg: "aloha".to_string(),
            },
        );
        assert_eq!(response.resp_msg, "Hello aloha");

        let response = unary(&call_id, UnaryRequest::default());
        assert_eq!(response.resp_msg, "Hello ");
    }

    #[tokio::test]
    async fn test_client_stream_summary() {
        let (mut outbound, mut inbound) = session::channel(DEFAULT_NUMBERS.len());
        let requests = DEFAULT_NUMBERS
            .iter()
            .map(|&num| ClientStreamRequest { num })
            .collect();
        send_all(&mut outbound, requests).await;

        let summary = client_stream(&CallId::generate(), &mut inbound)
            .await
            .unwrap();
        assert_eq!(summary.max, 94);
        assert_eq!(summary.min, 2);
        assert_eq!(summary.average, 33.0);
    }

    #[tokio::test]
    async fn test_client_stream_empty() {
        let (mut outbound, mut inbound) = session::channel::<ClientStreamRequest>(1);
        outbound.close();

        let result = client_stream(&CallId::generate(), &mut inbound).await;
        assert!(matches!(result, Err(ServiceError::EmptyStream)));
        assert_eq!(
            Status::from(result.unwrap_err()).code(),
            Code::FailedPrecondition
        );
    }

    #[tokio::test]
    async fn test_client_stream_receive_error_aborts() {
        let (mut outbound, mut inbound) = session::channel(4);
        outbound.send(ClientStreamRequest { num: 5 }).await.unwrap();
        outbound.fail(Status::data_loss("corrupt")).await.unwrap();

        let result = client_stream(&CallId::generate(), &mut inbound).await;
        assert!(matches!(
            result,
            Err(ServiceError::Session(SessionError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_server_stream_sequence() {
        let (mut outbound, mut inbound) = session::channel(16);

        server_stream(&CallId::generate(), 9, &mut outbound, Duration::ZERO).await;
        assert!(outbound.is_closed());

        let mut items = Vec::new();
        while let Some(item) = inbound.recv().await.unwrap() {
            items.push((item.position, item.value));
        }
        assert_eq!(
            items,
            vec![
                (1, 1),
                (2, 1),
                (3, 2),
                (4, 3),
                (5, 5),
                (6, 8),
                (7, 13),
                (8, 21),
                (9, 34)
            ]
        );
    }

    #[tokio::test]
    async fn test_server_stream_non_positive_steps() {
        for steps in [0, -4] {
            let (mut outbound, mut inbound) = session::channel(1);
            server_stream(&CallId::generate(), steps, &mut outbound, Duration::ZERO).await;
            assert_eq!(inbound.recv().await.unwrap(), None);
        }
    }

    #[test]
    fn test_validate_steps() {
        assert!(validate_steps(-1).is_ok());
        assert!(validate_steps(0).is_ok());
        assert!(validate_steps(MAX_POSITION).is_ok());
        assert!(matches!(
            validate_steps(MAX_POSITION + 1),
            Err(ServiceError::StepsOutOfRange { requested, max })
                if requested == MAX_POSITION + 1 && max == MAX_POSITION
        ));
    }

    #[tokio::test]
    async fn test_server_stream_ends_at_max_position() {
        let capacity = (MAX_POSITION + 8) as usize;
        let (mut outbound, mut inbound) = session::channel(capacity);

        server_stream(
            &CallId::generate(),
            MAX_POSITION + 8,
            &mut outbound,
            Duration::ZERO,
        )
        .await;

        let mut last = None;
        let mut count = 0;
        while let Some(item) = inbound.recv().await.unwrap() {
            count += 1;
            last = Some(item.position);
        }
        assert_eq!(count, MAX_POSITION);
        assert_eq!(last, Some(MAX_POSITION));
    }

    #[tokio::test]
    async fn test_server_stream_stops_quietly_when_peer_leaves() {
        let (mut outbound, inbound) = session::channel(1);
        drop(inbound);

        server_stream(&CallId::generate(), 9, &mut outbound, Duration::ZERO).await;
        assert!(outbound.is_closed());
    }

    #[tokio::test]
    async fn test_bidirection_running_extremes() {
        let (mut client_tx, mut server_rx) = session::channel(1);
        let (mut server_tx, mut client_rx) = session::channel(1);

        let server = tokio::spawn(async move {
            bidirection(&CallId::generate(), &mut server_rx, &mut server_tx).await
        });

        let mut replies = Vec::new();
        for num in DEFAULT_NUMBERS {
            client_tx.send(BidirectionRequest { num }).await.unwrap();
            let reply = client_rx.recv().await.unwrap().unwrap();
            replies.push((reply.max, reply.min));
        }
        client_tx.close();

        assert_eq!(client_rx.recv().await.unwrap(), None);
        server.await.unwrap().unwrap();

        assert_eq!(replies.len(), DEFAULT_NUMBERS.len());
        assert_eq!(replies[0], (11, 11));
        for pair in replies.windows(2) {
            assert!(pair[1].0 >= pair[0].0);
            assert!(pair[1].1 <= pair[0].1);
        }
        assert_eq!(replies.last(), Some(&(94, 2)));
    }

    #[tokio::test]
    async fn test_bidirection_send_failure_is_not_an_error() {
        let (mut client_tx, mut server_rx) = session::channel(4);
        let (mut server_tx, client_rx) = session::channel(1);
        drop(client_rx);

        client_tx.send(BidirectionRequest { num: 1 }).await.unwrap();
        client_tx.send(BidirectionRequest { num: 2 }).await.unwrap();

        let result = bidirection(&CallId::generate(), &mut server_rx, &mut server_tx).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bidirection_receive_error_propagates() {
        let (mut client_tx, mut server_rx) = session::channel::<BidirectionRequest>(1);
        let (mut server_tx, _client_rx) = session::channel(1);
        client_tx.fail(Status::aborted("reset")).await.unwrap();

        let result = bidirection(&CallId::generate(), &mut server_rx, &mut server_tx).await;
        assert!(matches!(result, Err(ServiceError::Session(_))));
    }

    #[tokio::test]
    async fn test_unary_with_deadline_normal() {
        let (ctx, _guard) = CallContext::new(None);
        let budget = PollBudget {
            attempts: 3,
            interval: Duration::from_millis(5),
        };

        let response = unary_with_deadline(&CallId::generate(), &ctx, &budget).await;
        assert_eq!(response.resp_msg, NORMAL_RESPONSE);
    }

    #[tokio::test]
    async fn test_unary_with_deadline_cancelled() {
        let (ctx, _guard) = CallContext::with_timeout(Duration::from_millis(15));
        let budget = PollBudget {
            attempts: 3,
            interval: Duration::from_millis(20),
        };

        let response = unary_with_deadline(&CallId::generate(), &ctx, &budget).await;
        assert_eq!(response.resp_msg, CANCELLED_RESPONSE);
    }

    #[test]
    fn test_error_handle_status() {
        let status = error_handle(&CallId::generate());
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert_eq!(status.message(), ERROR_HANDLE_MESSAGE);
    }
}
