//! Async stream over published aggregates.

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::Publisher;
use crate::contributions::Contributions;
use crate::reactive::Subscription;

/// Yields the current aggregate, then every published aggregate.
///
/// The stream is unbounded. A publication superseded by a newer one while
/// subscribers are still being notified is not yielded, so the last item
/// is always the registry's aggregate. It ends when the registry is
/// dropped.
#[must_use = "streams do nothing unless polled"]
pub struct AggregateStream {
    receiver: mpsc::UnboundedReceiver<Arc<Contributions>>,
    subscription: Option<Subscription>,
}

impl AggregateStream {
    pub(crate) fn new(publisher: &Publisher) -> Self {
        let (tx, receiver) = mpsc::unbounded();
        let subscription = publisher.subscribe(move |aggregate| {
            // The receiver may be gone while the subscription is being torn down.
            let _ = tx.unbounded_send(Arc::clone(aggregate));
        });
        Self {
            receiver,
            subscription: Some(subscription),
        }
    }

    /// Unsubscribes. Aggregates already queued are still yielded.
    pub fn close(&mut self) {
        self.subscription = None;
        self.receiver.close();
    }
}

impl Stream for AggregateStream {
    type Item = Arc<Contributions>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for AggregateStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateStream")
            .field("active", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}
