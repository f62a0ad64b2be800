//! Event sinks for registry observability.
//!
//! Sinks are passed to the registry explicitly; there is no process-wide
//! default.

mod sink;

pub use sink::{
    CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, AGGREGATE_PUBLISHED,
    EVALUATION_FAILED, REGISTRY_MISUSE,
};
