use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forecourt_types::domain::profile::{Profile, Role};
use forecourt_types::ports::gateway::{AuthGateway, AuthUser, ProfileGateway};

use crate::errors::AppError;

/// An authenticated admin session. Created by `sign_in`, consumed by
/// `sign_out`; components that need the signed-in identity take it as an
/// argument instead of reading shared mutable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: AuthUser,
    pub profile: Profile,
    pub signed_in_at: DateTime<Utc>,
}

/// Sign-in/sign-out against the hosted auth service, gated to admin
/// profiles: the console is back-office only, so any other role is signed
/// straight back out.
pub struct SessionService<G> {
    gateway: Arc<G>,
}

impl<G: AuthGateway + ProfileGateway> SessionService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = self.gateway.sign_in(email, password).await?;
        self.admit(user).await
    }

    /// Rebuild a session from a still-live backend session, if any.
    pub async fn resume(&self) -> Result<Option<Session>, AppError> {
        match self.gateway.current_user().await? {
            Some(user) => Ok(Some(self.admit(user).await?)),
            None => Ok(None),
        }
    }

    pub async fn sign_out(&self, session: Session) -> Result<(), AppError> {
        drop(session);
        Ok(self.gateway.sign_out().await?)
    }

    async fn admit(&self, user: AuthUser) -> Result<Session, AppError> {
        let profile = match self.gateway.fetch_profile_by_id(user.id).await {
            Ok(profile) => profile,
            Err(err) => {
                // Best effort: do not leave a half-authenticated backend
                // session behind.
                let _ = self.gateway.sign_out().await;
                return Err(err.into());
            }
        };
        if profile.role != Role::Admin {
            let _ = self.gateway.sign_out().await;
            return Err(AppError::AccessDenied(
                "you do not have admin privileges".into(),
            ));
        }
        Ok(Session {
            user,
            profile,
            signed_in_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forecourt_gateway::memory::MemoryGateway;
    use uuid::Uuid;

    fn profile(role: Role, email: &str) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            full_name: "Some Person".into(),
            email: email.into(),
            phone_number: "0917".into(),
            address: "Somewhere".into(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn admin_sign_in_creates_a_session() {
        let gateway = Arc::new(MemoryGateway::new());
        let admin = profile(Role::Admin, "admin@station.ph");
        gateway.seed_user(admin.clone(), "secret").unwrap();
        let svc = SessionService::new(gateway.clone());

        let session = svc.sign_in("admin@station.ph", "secret").await.unwrap();
        assert_eq!(session.user.id, admin.id);
        assert_eq!(session.profile.role, Role::Admin);

        let resumed = svc.resume().await.unwrap();
        assert_eq!(resumed.map(|s| s.user.id), Some(admin.id));

        svc.sign_out(session).await.unwrap();
        assert!(svc.resume().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_admin_is_denied_and_signed_out() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .seed_user(profile(Role::Rider, "carlo@station.ph"), "secret")
            .unwrap();
        let svc = SessionService::new(gateway.clone());

        let err = svc.sign_in("carlo@station.ph", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
        // The backend session must not linger after the denial.
        assert!(svc.resume().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_credentials_surface_as_auth_errors() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .seed_user(profile(Role::Admin, "admin@station.ph"), "secret")
            .unwrap();
        let svc = SessionService::new(gateway);

        let err = svc.sign_in("admin@station.ph", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        let err = svc.sign_in("ghost@station.ph", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
