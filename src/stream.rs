//! The consumer end of a tail engine's notifications.

use crate::model::TailEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A stream of [`TailEvent`]s from one [`TailEngine`](crate::TailEngine).
///
/// Events arrive in the order the engine produced them. The stream ends once
/// the engine has been dropped.
pub struct TailEvents {
    receiver: mpsc::UnboundedReceiver<TailEvent>,
}

impl TailEvents {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<TailEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event.
    pub async fn recv(&mut self) -> Option<TailEvent> {
        self.receiver.recv().await
    }

    /// Returns an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<TailEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for TailEvents {
    type Item = TailEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TailState;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = TailEvents::new(rx);

        tx.send(TailEvent::StateChanged(TailState::Running)).unwrap();
        tx.send(TailEvent::LinesAdded(Vec::new())).unwrap();

        assert!(matches!(
            events.next().await,
            Some(TailEvent::StateChanged(TailState::Running))
        ));
        assert!(matches!(events.next().await, Some(TailEvent::LinesAdded(_))));
    }

    #[tokio::test]
    async fn test_stream_ends_when_sender_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = TailEvents::new(rx);
        drop(tx);

        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_try_recv_does_not_block() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut events = TailEvents::new(rx);

        assert!(events.try_recv().is_none());
        let waited = tokio::time::timeout(Duration::from_millis(10), events.recv()).await;
        assert!(waited.is_err());
    }
}
