use std::sync::Arc;

use uuid::Uuid;

use forecourt_types::domain::order::{Order, OrderStatus};
use forecourt_types::ports::gateway::OrderGateway;

use crate::application::order_feed::{FeedWatch, OrderFeed};
use crate::errors::AppError;

/// Order list and lifecycle operations for the console's orders view.
pub struct OrderService<G> {
    gateway: Arc<G>,
    feed: OrderFeed,
}

impl<G: OrderGateway> OrderService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            feed: OrderFeed::new(),
        }
    }

    pub fn feed(&self) -> &OrderFeed {
        &self.feed
    }

    /// Bulk (re)load of the cached list.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.feed.load(&*self.gateway).await
    }

    /// Attach the feed to the live change stream. Hold the guard for as long
    /// as the view is alive; dropping it detaches.
    pub fn watch(&self) -> FeedWatch {
        self.feed.watch(&*self.gateway)
    }

    pub fn list(&self) -> Vec<Order> {
        self.feed.orders()
    }

    /// Full order projection for the detail view, marking it as selected.
    pub async fn view_details(&self, id: Uuid) -> Result<Order, AppError> {
        let order = self.gateway.fetch_order_by_id(id).await?;
        self.feed.select(Some(id));
        Ok(order)
    }

    pub fn clear_selection(&self) {
        self.feed.select(None);
    }

    /// Apply a status change, enforcing the lifecycle transition table. An
    /// illegal transition is rejected here and never reaches the gateway. On
    /// success the cache is brought up to date by the confirming change
    /// event rather than mutated optimistically, so a failed write leaves
    /// the displayed status exactly as it was.
    pub async fn update_status(
        &self,
        id: Uuid,
        requested: OrderStatus,
    ) -> Result<(), AppError> {
        let current = self
            .feed
            .status_of(id)
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
        if !current.can_transition_to(requested) {
            return Err(AppError::InvalidTransition {
                from: current,
                to: requested,
            });
        }
        self.gateway.update_order_status(id, requested).await?;
        Ok(())
    }
}
