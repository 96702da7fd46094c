//! Subscriber connections
//!
//! Each admitted connection runs its own [`SubscriberStream`], which writes
//! the hub's current snapshot at a fixed interval until the connection fails.

pub mod sink;
pub mod state;
pub mod stream;

pub use sink::SubscriberSink;
pub use state::{CloseReason, SubscriberPhase, SubscriberState};
pub use stream::SubscriberStream;
