//! Minimal push-based publish/subscribe primitives.

mod subject;

pub use subject::{Listener, Subject, Subscription};
