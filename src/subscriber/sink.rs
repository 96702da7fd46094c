//! Outbound connection abstraction
//!
//! The broadcast loop only needs to write text frames, notice when the peer
//! goes away, and close. [`SubscriberSink`] captures that, so the loop runs
//! the same over a real WebSocket or an in-memory channel.

use std::future::Future;

use axum::extract::ws::{Message, WebSocket};

use crate::error::{Error, Result};

/// Write side of a subscriber connection
pub trait SubscriberSink: Send + 'static {
    /// Write one text message
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<()>> + Send;

    /// Resolve once the peer has closed the connection
    ///
    /// Must be cancel safe: the loop polls it in a `select!` every tick.
    fn closed(&mut self) -> impl Future<Output = ()> + Send;

    /// Close the connection
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

impl SubscriberSink for WebSocket {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn closed(&mut self) {
        // Incoming frames are ignored; pings are answered by the protocol layer
        loop {
            match self.recv().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(mut self) {
        let _ = self.send(Message::Close(None)).await;
    }
}
