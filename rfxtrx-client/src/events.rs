use futures_core::Stream;
use rfxtrx_rs_protocol::decode::DecodedEvent;
use rfxtrx_rs_protocol::{InterfaceStatus, SequenceId};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Everything the engine publishes to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// `open()` was called; bring-up has started.
    Connecting,
    /// The handshake finished; the device reported this status.
    Ready(InterfaceStatus),
    /// A Ready link went down.
    Disconnect { reason: String },
    /// Bring-up ended before the link became Ready.
    ConnectFailed { reason: String },
    /// A decoded inbound packet.
    Decoded(DecodedEvent),
    /// A tracked command under `TimeoutPolicy::Complete` ran out its window.
    CommandCompleted { sequence: SequenceId },
}

/// Fan-out of [`EngineEvent`]s to any number of subscribers.
///
/// Publishing never blocks. A subscriber that falls more than the configured
/// capacity behind loses the oldest events.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

/// Convert a subscription into a [`Stream`] of events.
///
/// Lagged gaps are skipped with a warning; the stream ends when the engine
/// and every clone of its sink are dropped.
pub fn event_stream(mut rx: broadcast::Receiver<EngineEvent>) -> impl Stream<Item = EngineEvent> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::pin;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn stream_yields_published_events() {
        let sink = EventSink::new(8);
        let mut stream = pin!(event_stream(sink.subscribe()));

        sink.publish(EngineEvent::Connecting);
        sink.publish(EngineEvent::CommandCompleted {
            sequence: SequenceId::new(3),
        });

        assert_eq!(stream.next().await, Some(EngineEvent::Connecting));
        assert_eq!(
            stream.next().await,
            Some(EngineEvent::CommandCompleted {
                sequence: SequenceId::new(3)
            })
        );
    }

    #[tokio::test]
    async fn stream_skips_lagged_gap() {
        let sink = EventSink::new(2);
        let mut stream = pin!(event_stream(sink.subscribe()));

        for i in 0..5u8 {
            sink.publish(EngineEvent::CommandCompleted {
                sequence: SequenceId::new(i),
            });
        }

        // Only the two newest survive.
        assert_eq!(
            stream.next().await,
            Some(EngineEvent::CommandCompleted {
                sequence: SequenceId::new(3)
            })
        );
        assert_eq!(
            stream.next().await,
            Some(EngineEvent::CommandCompleted {
                sequence: SequenceId::new(4)
            })
        );
    }

    #[tokio::test]
    async fn stream_ends_when_sink_dropped() {
        let sink = EventSink::new(4);
        let stream = event_stream(sink.subscribe());
        sink.publish(EngineEvent::Connecting);
        drop(sink);

        let collected: Vec<_> = pin!(stream).collect().await;
        assert_eq!(collected, vec![EngineEvent::Connecting]);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let sink = EventSink::new(4);
        sink.publish(EngineEvent::Connecting);
        let mut rx = sink.subscribe();
        assert!(rx.try_recv().is_err());
        sink.publish(EngineEvent::Connecting);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Connecting);
    }
}
