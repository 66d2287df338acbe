//! Telemetry
//!
//! Observability for the authorization state machine.
//!
//! Every transition, and in particular every self-healing path, is reported as
//! an [`AuthEvent`] to an [`EventSink`]. The default sink logs through `tracing`.

pub mod events;

pub use events::{AuthEvent, EventSink, InMemoryEventSink, NoOpEventSink, TracingEventSink};
