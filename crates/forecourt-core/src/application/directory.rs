use std::sync::Arc;

use uuid::Uuid;

use forecourt_types::domain::delivery::Delivery;
use forecourt_types::domain::profile::{NewRider, Profile, ProfileUpdate, Role};
use forecourt_types::ports::gateway::ProfileGateway;

use crate::application::reports::RiderStats;
use crate::errors::AppError;

/// Customer and rider administration.
pub struct DirectoryService<G> {
    gateway: Arc<G>,
}

impl<G: ProfileGateway> DirectoryService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn customers(&self) -> Result<Vec<Profile>, AppError> {
        Ok(self.gateway.fetch_profiles(Some(Role::Customer)).await?)
    }

    pub async fn riders(&self) -> Result<Vec<Profile>, AppError> {
        Ok(self.gateway.fetch_profiles(Some(Role::Rider)).await?)
    }

    pub async fn profile(&self, id: Uuid) -> Result<Profile, AppError> {
        Ok(self.gateway.fetch_profile_by_id(id).await?)
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Profile, AppError> {
        Ok(self.gateway.update_profile(id, update).await?)
    }

    pub async fn add_rider(&self, rider: NewRider) -> Result<Profile, AppError> {
        if rider.full_name.trim().is_empty() {
            return Err(AppError::Validation("full name is required".into()));
        }
        if !rider.email.contains('@') {
            return Err(AppError::Validation("invalid email".into()));
        }
        Ok(self.gateway.create_rider(rider).await?)
    }

    /// Toggle a rider's availability. Only rider profiles carry the flag.
    pub async fn set_rider_active(&self, id: Uuid, active: bool) -> Result<Profile, AppError> {
        let profile = self.gateway.fetch_profile_by_id(id).await?;
        if profile.role != Role::Rider {
            return Err(AppError::Validation(format!(
                "profile {id} is not a rider"
            )));
        }
        Ok(self
            .gateway
            .update_profile(
                id,
                ProfileUpdate {
                    is_active: Some(active),
                    ..ProfileUpdate::default()
                },
            )
            .await?)
    }

    pub async fn rider_deliveries(&self, rider: Uuid) -> Result<Vec<Delivery>, AppError> {
        Ok(self.gateway.fetch_deliveries(Some(rider)).await?)
    }

    pub async fn rider_stats(&self, rider: Uuid) -> Result<RiderStats, AppError> {
        let deliveries = self.gateway.fetch_deliveries(Some(rider)).await?;
        Ok(RiderStats::build(&deliveries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forecourt_gateway::memory::MemoryGateway;
    use forecourt_types::domain::delivery::DeliveryStatus;

    fn new_rider(name: &str, email: &str) -> NewRider {
        NewRider {
            full_name: name.into(),
            email: email.into(),
            phone_number: "0918".into(),
            address: "Rider barracks".into(),
        }
    }

    #[tokio::test]
    async fn add_rider_validates_input_locally() {
        let gateway = Arc::new(MemoryGateway::new());
        let svc = DirectoryService::new(gateway.clone());

        let err = svc.add_rider(new_rider(" ", "carlo@station.ph")).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        let err = svc.add_rider(new_rider("Carlo Diaz", "not-an-email")).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(svc.riders().await.unwrap().is_empty());

        let rider = svc
            .add_rider(new_rider("Carlo Diaz", "carlo@station.ph"))
            .await
            .unwrap();
        assert_eq!(rider.role, Role::Rider);
    }

    #[tokio::test]
    async fn activation_toggle_is_rider_only() {
        let gateway = Arc::new(MemoryGateway::new());
        let svc = DirectoryService::new(gateway.clone());
        let rider = svc
            .add_rider(new_rider("Carlo Diaz", "carlo@station.ph"))
            .await
            .unwrap();

        let off_duty = svc.set_rider_active(rider.id, false).await.unwrap();
        assert!(!off_duty.is_active);

        let now = Utc::now();
        let customer = Profile {
            id: Uuid::new_v4(),
            full_name: "Ana Cruz".into(),
            email: "ana@example.com".into(),
            phone_number: "0917".into(),
            address: "12 Main St".into(),
            role: Role::Customer,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        gateway.seed_user(customer.clone(), "pw").unwrap();
        let err = svc.set_rider_active(customer.id, false).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn rider_stats_come_from_their_deliveries() {
        let gateway = Arc::new(MemoryGateway::new());
        let svc = DirectoryService::new(gateway.clone());
        let rider = svc
            .add_rider(new_rider("Carlo Diaz", "carlo@station.ph"))
            .await
            .unwrap();

        let assigned = Utc::now() - Duration::hours(2);
        gateway.insert_delivery(Delivery {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            rider_id: rider.id,
            status: DeliveryStatus::Delivered,
            assigned_at: assigned,
            delivered_at: Some(assigned + Duration::minutes(30)),
        });
        gateway.insert_delivery(Delivery {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            rider_id: rider.id,
            status: DeliveryStatus::Assigned,
            assigned_at: Utc::now(),
            delivered_at: None,
        });
        // Someone else's delivery must not count.
        gateway.insert_delivery(Delivery {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            status: DeliveryStatus::Failed,
            assigned_at: Utc::now(),
            delivered_at: None,
        });

        let stats = svc.rider_stats(rider.id).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.avg_delivery_minutes, Some(30));
    }
}
