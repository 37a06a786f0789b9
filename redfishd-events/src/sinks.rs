//! Delivery sinks.
//!
//! A sink takes a serialized event envelope and gets it to the subscriber.
//! The three implementations cover the three subscriber shapes: HTTP POST
//! destinations, SSE streams, and in-process channels for tests.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Delivery failure, retried by the event service per its policy.
#[derive(Debug)]
pub struct DeliveryError(pub String);

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DeliveryError {}

pub type SinkFuture = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send>>;

/// Abstract event destination.
pub trait EventSink: Send + Sync {
    fn deliver(&self, payload: String) -> SinkFuture;
}

/// HTTP POST delivery to the subscription's destination URI.
pub struct HttpPostSink {
    client: reqwest::Client,
    destination: String,
    headers: Vec<(String, String)>,
}

impl HttpPostSink {
    pub fn new(destination: String, headers: Vec<(String, String)>) -> HttpPostSink {
        HttpPostSink {
            client: reqwest::Client::new(),
            destination,
            headers,
        }
    }
}

impl EventSink for HttpPostSink {
    fn deliver(&self, payload: String) -> SinkFuture {
        let mut request = self
            .client
            .post(&self.destination)
            .header("content-type", "application/json")
            .body(payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| DeliveryError(e.to_string()))?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(DeliveryError(format!(
                    "destination answered {}",
                    response.status()
                )))
            }
        })
    }
}

/// In-process sink handing payloads to a channel. Test subscriber.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, payload: String) -> SinkFuture {
        let result = self
            .tx
            .send(payload)
            .map_err(|_| DeliveryError("receiver dropped".to_string()));
        Box::pin(std::future::ready(result))
    }
}

/// Broadcast fan-out for Server-Sent Events.
///
/// One broadcaster backs the SSE route; each connected client subscribes
/// and receives every delivered payload as an SSE `data:` frame. Slow
/// clients that lag past the buffer skip ahead rather than stall
/// delivery.
#[derive(Clone)]
pub struct SseBroadcaster {
    tx: broadcast::Sender<String>,
}

impl SseBroadcaster {
    pub fn new(capacity: usize) -> SseBroadcaster {
        let (tx, _) = broadcast::channel(capacity);
        SseBroadcaster { tx }
    }

    /// A sink delivering into this broadcaster.
    pub fn sink(&self) -> SseSink {
        SseSink { tx: self.tx.clone() }
    }

    /// A new client stream of SSE frames.
    pub fn subscribe(&self) -> SseStream {
        SseStream {
            rx: self.tx.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Sink side of [`SseBroadcaster`].
pub struct SseSink {
    tx: broadcast::Sender<String>,
}

impl EventSink for SseSink {
    fn deliver(&self, payload: String) -> SinkFuture {
        // No receiver just means no client is attached right now.
        if self.tx.send(payload).is_err() {
            debug!("SSE event dropped, no connected clients");
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Stream of `data:` frames for one SSE client.
pub struct SseStream {
    rx: broadcast::Receiver<String>,
}

impl futures_core::Stream for SseStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.rx.try_recv() {
                Ok(payload) => {
                    return Poll::Ready(Some(Ok(Bytes::from(format!("data: {payload}\n\n")))));
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Closed) => return Poll::Ready(None),
                Err(broadcast::error::TryRecvError::Empty) => break,
            }
        }
        // Nothing ready; park on recv(). The receiver's cursor only advances
        // on a successful read, so dropping the future loses nothing.
        let rx = &mut self.rx;
        let mut recv = Box::pin(rx.recv());
        match recv.as_mut().poll(cx) {
            Poll::Ready(Ok(payload)) => {
                Poll::Ready(Some(Ok(Bytes::from(format!("data: {payload}\n\n")))))
            }
            Poll::Ready(Err(broadcast::error::RecvError::Closed)) => Poll::Ready(None),
            Poll::Ready(Err(broadcast::error::RecvError::Lagged(_))) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn channel_sink_hands_payloads_through() {
        let (sink, mut rx) = ChannelSink::new();
        sink.deliver("payload".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn sse_clients_receive_frames() {
        let broadcaster = SseBroadcaster::new(16);
        let mut stream = broadcaster.subscribe();
        let sink = broadcaster.sink();
        sink.deliver(r#"{"Id":"1"}"#.to_string()).await.unwrap();

        let frame = tokio::time::timeout(std::time::Duration::from_millis(100), stream.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("no io error");
        assert_eq!(frame, Bytes::from("data: {\"Id\":\"1\"}\n\n"));
    }

    #[tokio::test]
    async fn sse_delivery_without_clients_is_ok() {
        let broadcaster = SseBroadcaster::new(16);
        let sink = broadcaster.sink();
        assert!(sink.deliver("x".to_string()).await.is_ok());
    }
}
