use tokio::sync::mpsc;
use tonic::Status;

use super::Outbound;
use crate::error::SessionError;

/// Sends into a bounded channel whose receiving end the transport drains.
///
/// The channel bound is the only buffering on this side; back-pressure beyond it belongs to the
/// transport.
#[derive(Debug)]
pub struct ChannelOutbound<T> {
    tx: Option<mpsc::Sender<Result<T, Status>>>,
}

impl<T> ChannelOutbound<T> {
    pub(crate) fn new(tx: mpsc::Sender<Result<T, Status>>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Deliver `status` to the peer as the final item, then close.
    pub async fn fail(&mut self, status: Status) -> Result<(), SessionError> {
        let tx = self.tx.take().ok_or(SessionError::SendClosed)?;
        tx.send(Err(status))
            .await
            .map_err(|_| SessionError::PeerGone)
    }
}

#[tonic::async_trait]
impl<T: Send + 'static> Outbound<T> for ChannelOutbound<T> {
    async fn send(&mut self, item: T) -> Result<(), SessionError> {
        let tx = self.tx.as_ref().ok_or(SessionError::SendClosed)?;
        tx.send(Ok(item)).await.map_err(|_| SessionError::PeerGone)
    }

    fn close(&mut self) {
        self.tx = None;
    }

    fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}
