//! Observability utilities.

mod logging;
mod tracing;

pub use logging::init_logging;
pub use tracing::{RecomputeAttributes, SpanTimer};
