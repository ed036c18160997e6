//! Output sinks for encoded frames.

use crate::common::error::{Error, Result};
use bytes::Bytes;
use tokio::sync::mpsc;

/// Destination of encoded frames, usually one client connection.
///
/// A write that fails means the client is gone; implementations return
/// [`Error::SinkClosed`] and the caller stops without retrying.
pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;
}

/// Sink backed by a bounded tokio channel whose receiver feeds an HTTP body.
///
/// The receiver being dropped (the response body was dropped because the
/// connection closed) is what turns into [`Error::SinkClosed`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub const fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiver it writes to.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Resolves once the receiving side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| Error::SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_frames_until_receiver_drops() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.send_frame(Bytes::from_static(b"data:1\n\n")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"data:1\n\n"));

        drop(rx);
        assert!(sink.is_closed());
        sink.closed().await;
        let err = sink
            .send_frame(Bytes::from_static(b"data:2\n\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SinkClosed));
    }
}
