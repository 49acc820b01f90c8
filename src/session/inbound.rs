use futures::{Stream, StreamExt};
use tonic::Status;

use super::Inbound;
use crate::error::SessionError;

/// Receives from any stream of `Result<T, Status>`, such as [`tonic::Streaming`].
#[derive(Debug)]
pub struct StreamInbound<S> {
    stream: S,
    finished: bool,
}

impl<S> StreamInbound<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            finished: false,
        }
    }
}

#[tonic::async_trait]
impl<S, T> Inbound<T> for StreamInbound<S>
where
    S: Stream<Item = Result<T, Status>> + Unpin + Send + 'static,
    T: Send + 'static,
{
    async fn recv(&mut self) -> Result<Option<T>, SessionError> {
        if self.finished {
            return Ok(None);
        }

        match self.stream.next().await {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(status)) => {
                self.finished = true;
                Err(status.into())
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}
