use std::sync::Arc;

use tracing::info;

use crate::api::{CreatedUser, NewUser, RiskApi};
use crate::error::{AppError, AppResult, Operation};
use crate::identity::{AdminGuard, Role, SessionStore};
use crate::notify::{Notice, Notifier};

use super::surface;

impl NewUser {
    /// Form checks done before anything is sent.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [("username", &self.username), ("email", &self.email), ("password", &self.password)] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", name)));
            }
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(AppError::InvalidInput(format!("'{}' is not an email address", email))),
        }
        if !matches!(Role::parse(self.role.trim()), Role::Admin | Role::User) {
            return Err(AppError::InvalidInput(format!("role must be 'admin' or 'user', got '{}'", self.role)));
        }
        Ok(())
    }
}

/// Create-user screen.
pub struct UserAdminController<A: RiskApi> {
    api: A,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
}

impl<A: RiskApi> UserAdminController<A> {
    pub fn new(api: A, session: SessionStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, session, notifier }
    }

    pub async fn register(&self, form: NewUser) -> AppResult<CreatedUser> {
        AdminGuard::new(&self.session).require_admin_or(self.notifier.as_ref())?;
        form.validate().map_err(|e| surface(self.notifier.as_ref(), e))?;
        let form = NewUser {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password,
            role: form.role.trim().to_string(),
        };
        let created = self.api.register_user(&form).await
            .map_err(|e| surface(self.notifier.as_ref(), AppError::from_api(Operation::Register, e)))?;
        info!(target: "riskbase::workflow", "user '{}' registered", created.username);
        self.notifier.notify(Notice::success(
            "User created".to_string(),
            format!("The user \"{}\" was registered successfully.", created.username),
        ));
        Ok(created)
    }
}
