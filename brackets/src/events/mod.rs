//! Events emitted toward the notification collaborator, and the sinks that
//! receive them. The engine never depends on a concrete transport.

pub mod models;
pub mod sink;

pub use models::{BracketEvent, SideUpdate};
pub use sink::{BroadcastEventSink, EventSink, LogEventSink, NoopEventSink};
