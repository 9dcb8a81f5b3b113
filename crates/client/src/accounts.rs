//! Login, logout, registration and the current user.

use std::sync::Arc;

use crate::error::{ApiError, ClientError};
use crate::gateway::InventoryGateway;
use crate::session::{CurrentUser, Session};
use crate::wire::{Credentials, Registration};

pub struct Accounts {
    gateway: Arc<dyn InventoryGateway>,
    session: Session,
}

impl Accounts {
    /// `session` must be the one the gateway reads its token from.
    pub fn new(gateway: Arc<dyn InventoryGateway>, session: Session) -> Self {
        Self { gateway, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Exchange credentials for a token and store it in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let credentials = Credentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let token = match self.gateway.obtain_token(&credentials).await {
            Ok(token) => token,
            Err(ApiError::Status { .. } | ApiError::AuthRequired { .. }) => {
                return Err(ClientError::InvalidCredentials);
            }
            Err(other) => return Err(other.into()),
        };
        self.session.issue(token);
        tracing::info!(username = %credentials.username, "logged in");
        Ok(())
    }

    pub fn logout(&self) {
        self.session.clear();
        tracing::info!("logged out");
    }

    pub async fn register(&self, registration: Registration) -> Result<(), ClientError> {
        if registration.password != registration.password_confirm {
            return Err(ClientError::validation("Passwords do not match."));
        }
        if registration.username.trim().is_empty() {
            return Err(ClientError::validation("Username is required."));
        }
        self.gateway.register(&registration).await?;
        tracing::info!(username = %registration.username, "account registered");
        Ok(())
    }

    /// Who is logged in. Without a token, or when `/me/` fails, the user is
    /// an anonymous non-admin.
    pub async fn current_user(&self) -> CurrentUser {
        if !self.session.is_authenticated() {
            return CurrentUser::anonymous();
        }
        match self.gateway.current_user().await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "could not load current user");
                CurrentUser::anonymous()
            }
        }
    }
}
