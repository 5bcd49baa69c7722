use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::ports::gateway::{OrderChange, OrderGateway};

use crate::errors::AppError;

/// Client-side cache of the order list, fed by one bulk load plus the live
/// change stream. Holds at most one entry per order id, most recent first
/// (events arriving out of creation order make that an approximation, which
/// is acceptable for a console list).
#[derive(Clone, Default)]
pub struct OrderFeed {
    inner: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    orders: Vec<Order>,
    selected: Option<Uuid>,
}

impl FeedState {
    /// Insert keeping the no-duplicate-id invariant: a second insert for a
    /// known id replaces the entry in place instead of prepending a twin.
    fn upsert_front(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.insert(0, order),
        }
    }
}

impl OrderFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        // A panic mid-reconciliation cannot leave the cache half-merged
        // (each rule writes through a single entry), so a poisoned lock is
        // safe to keep using.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the cache wholesale from the gateway. On failure the previous
    /// cache is left untouched and the error surfaces to the caller.
    pub async fn load<G: OrderGateway>(&self, gateway: &G) -> Result<(), AppError> {
        let orders = gateway.fetch_orders().await?;
        let mut state = self.state();
        state.orders = orders;
        if let Some(id) = state.selected {
            if !state.orders.iter().any(|o| o.id == id) {
                state.selected = None;
            }
        }
        Ok(())
    }

    /// Reconcile one live change event into the cache. Tolerates duplicate
    /// and out-of-order delivery; applying the same update twice leaves the
    /// cache identical.
    pub fn apply(&self, change: OrderChange) {
        let mut state = self.state();
        match change {
            OrderChange::Inserted(order) => state.upsert_front(order),
            OrderChange::Updated(patch) => {
                match state.orders.iter_mut().find(|o| o.id == patch.id) {
                    Some(existing) => existing.apply_patch(&patch),
                    // The backend is the source of truth: an update for an
                    // order we have not seen yet becomes an insert.
                    None => state.upsert_front(patch.into_order(Utc::now())),
                }
            }
            OrderChange::Deleted(id) => {
                state.orders.retain(|o| o.id != id);
                if state.selected == Some(id) {
                    state.selected = None;
                }
            }
        }
    }

    /// Spawn the reconciliation task over the gateway's live channel. The
    /// returned guard aborts the task when dropped, so the subscription is
    /// released on every exit path of the consuming scope.
    pub fn watch<G: OrderGateway>(&self, gateway: &G) -> FeedWatch {
        let mut rx = gateway.subscribe_order_changes();
        let feed = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => feed.apply(change),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "order change stream lagged; events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        FeedWatch { task }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    pub fn len(&self) -> usize {
        self.state().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().orders.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.state().orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn status_of(&self, id: Uuid) -> Option<OrderStatus> {
        self.state()
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.status)
    }

    pub fn select(&self, id: Option<Uuid>) {
        self.state().selected = id;
    }

    pub fn selected(&self) -> Option<Order> {
        let state = self.state();
        state
            .selected
            .and_then(|id| state.orders.iter().find(|o| o.id == id).cloned())
    }
}

/// Live subscription handle. Dropping it detaches the feed from the change
/// stream and stops the reconciliation task.
#[derive(Debug)]
pub struct FeedWatch {
    task: JoinHandle<()>,
}

impl Drop for FeedWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
