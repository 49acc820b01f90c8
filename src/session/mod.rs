//! Stream sessions: ordered, one-directional message channels shared by the handlers and the
//! call driver.
//!
//! A call uses an [`Inbound`] half for the direction it reads and an [`Outbound`] half for the
//! direction it writes. Both halves are transport-agnostic; the tonic streams of a real call and
//! the in-memory [`channel`] used in tests look the same to the code driving them.

mod inbound;
mod outbound;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

use crate::error::SessionError;

pub use inbound::StreamInbound;
pub use outbound::ChannelOutbound;

/// The receiving half of a stream session.
#[tonic::async_trait]
pub trait Inbound<T>: Send {
    /// Wait for the next item.
    ///
    /// Returns `Ok(None)` once the peer has signalled end-of-stream, and keeps returning
    /// `Ok(None)` on every later call. After an `Err` the half is finished as well.
    async fn recv(&mut self) -> Result<Option<T>, SessionError>;
}

/// The sending half of a stream session.
#[tonic::async_trait]
pub trait Outbound<T: Send + 'static>: Send {
    /// Wait until the transport accepts `item`.
    ///
    /// Fails with [`SessionError::SendClosed`] after [`close`](Outbound::close) and with
    /// [`SessionError::PeerGone`] once the receiving side has gone away.
    async fn send(&mut self, item: T) -> Result<(), SessionError>;

    /// Signal end-of-stream to the peer. Closing twice is a no-op.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// An in-memory session pair.
pub fn channel<T: Send + 'static>(
    capacity: usize,
) -> (
    ChannelOutbound<T>,
    StreamInbound<ReceiverStream<Result<T, Status>>>,
) {
    let (outbound, stream) = response_channel(capacity);
    (outbound, StreamInbound::new(stream))
}

/// A session whose receiving end is a server response stream.
pub fn response_channel<T: Send + 'static>(
    capacity: usize,
) -> (ChannelOutbound<T>, ReceiverStream<Result<T, Status>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelOutbound::new(tx), ReceiverStream::new(rx))
}

/// A session whose receiving end is a client request stream.
///
/// The request stream ends when the outbound half is closed or dropped.
pub fn request_channel<T: Send + 'static>(
    capacity: usize,
) -> (ChannelOutbound<T>, impl Stream<Item = T> + Send + 'static) {
    let (tx, mut rx) = mpsc::channel::<Result<T, Status>>(capacity.max(1));

    let requests = async_stream::stream! {
        while let Some(Ok(item)) = rx.recv().await {
            yield item;
        }
    };

    (ChannelOutbound::new(tx), requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_items_arrive_in_order() {
        let (mut outbound, mut inbound) = channel::<i32>(4);

        for num in [3, 1, 2] {
            outbound.send(num).await.unwrap();
        }
        outbound.close();

        assert_eq!(inbound.recv().await.unwrap(), Some(3));
        assert_eq!(inbound.recv().await.unwrap(), Some(1));
        assert_eq!(inbound.recv().await.unwrap(), Some(2));
        assert_eq!(inbound.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_end_of_stream_is_sticky() {
        let (outbound, mut inbound) = channel::<i32>(1);
        drop(outbound);

        for _ in 0..3 {
            assert_eq!(inbound.recv().await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (mut outbound, _inbound) = channel::<i32>(1);
        outbound.close();
        outbound.close();

        assert!(outbound.is_closed());
        assert!(matches!(
            outbound.send(1).await,
            Err(SessionError::SendClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (mut outbound, inbound) = channel::<i32>(1);
        drop(inbound);

        assert!(matches!(outbound.send(1).await, Err(SessionError::PeerGone)));
    }

    #[tokio::test]
    async fn test_failure_finishes_inbound() {
        let (mut outbound, mut inbound) = channel::<i32>(2);
        outbound.send(7).await.unwrap();
        outbound.fail(Status::aborted("boom")).await.unwrap();

        assert_eq!(inbound.recv().await.unwrap(), Some(7));
        assert!(matches!(
            inbound.recv().await,
            Err(SessionError::Transport(ref status)) if status.message() == "boom"
        ));
        assert_eq!(inbound.recv().await.unwrap(), None);
        assert!(outbound.is_closed());
    }

    #[tokio::test]
    async fn test_request_stream_ends_on_close() {
        let (mut outbound, requests) = request_channel::<i32>(1);

        let collector = tokio::spawn(requests.collect::<Vec<_>>());
        outbound.send(11).await.unwrap();
        outbound.send(52).await.unwrap();
        outbound.close();

        assert_eq!(collector.await.unwrap(), vec![11, 52]);
    }
}
