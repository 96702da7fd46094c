//! Session factory trait
//!
//! The hub does not know how telemetry is obtained. It asks a
//! [`SessionFactory`] for a run loop bound to an address, spawns it, and later
//! stops it through the [`ShutdownSignal`](super::ShutdownSignal) in the
//! context.

use std::future::Future;
use std::pin::Pin;

use super::context::SessionContext;
use super::error::SessionError;

/// Run loop of a telemetry session
pub type SessionFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Creates telemetry sessions for the hub
///
/// Implementations validate the address synchronously and return the
/// session's run loop. The loop must publish through `ctx.publisher`, return
/// promptly once `ctx.shutdown` fires, and handle upstream errors itself:
/// the hub never restarts a session on its own.
pub trait SessionFactory: Send + Sync + 'static {
    /// Build the run loop for a new session
    fn start(&self, ctx: SessionContext) -> Result<SessionFuture, SessionError>;
}
