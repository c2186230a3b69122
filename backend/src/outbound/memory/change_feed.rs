//! Broadcast-backed catalogue change feed.

use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ports::{CatalogueChange, ChangeFeed};

const DEFAULT_CAPACITY: usize = 256;

/// In-process [`ChangeFeed`] fanning notifications out to every subscriber.
///
/// Slow subscribers observe `Lagged` and are expected to reload in full.
#[derive(Debug, Clone)]
pub struct BroadcastChangeFeed {
    sender: broadcast::Sender<CatalogueChange>,
}

impl BroadcastChangeFeed {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for BroadcastChangeFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed for BroadcastChangeFeed {
    fn publish(&self, change: CatalogueChange) {
        let receivers = self.sender.send(change).unwrap_or(0);
        trace!(receivers, "published catalogue change");
    }

    fn subscribe(&self) -> broadcast::Receiver<CatalogueChange> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductId;
    use crate::domain::ports::CatalogueChangeKind;

    #[tokio::test]
    async fn every_subscriber_sees_each_change() {
        let feed = BroadcastChangeFeed::default();
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        let id = ProductId::random();

        feed.publish(CatalogueChange::product(CatalogueChangeKind::Updated, id));

        for rx in [&mut first, &mut second] {
            let change = rx.recv().await.expect("change delivered");
            assert_eq!(change.kind, CatalogueChangeKind::Updated);
            assert_eq!(change.product_id, Some(id));
        }
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        BroadcastChangeFeed::with_capacity(0).publish(CatalogueChange::imported());
    }
}
