use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ApiError, LoginRequest, RiskApi};
use crate::error::{AppError, AppResult, Operation};
use crate::identity::{decode, Claims, SessionStore};
use crate::notify::{Notice, Notifier};

use super::surface;

const DEFAULT_TOKEN_TYPE: &str = "bearer";

pub struct LoginController<A: RiskApi> {
    api: A,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
}

impl<A: RiskApi> LoginController<A> {
    pub fn new(api: A, session: SessionStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, session, notifier }
    }

    /// Exchange email/password for a bearer credential and persist it.
    ///
    /// A token that cannot be decoded is not stored. A decodable token without a role claim
    /// is stored but reported as [`AppError::MissingRole`].
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Claims> {
        let req = LoginRequest { email: email.trim().to_string(), password: password.to_string() };
        let resp = self.api.login(&req).await.map_err(|e| {
            let err = match e {
                ApiError::Unauthorized(_) | ApiError::Status { .. } => AppError::InvalidLogin,
                other => AppError::from_api(Operation::Login, other),
            };
            surface(self.notifier.as_ref(), err)
        })?;

        let token = resp.access_token.filter(|t| !t.is_empty())
            .ok_or_else(|| surface(self.notifier.as_ref(), AppError::failed(Operation::Login, "no token received")))?;
        let claims = decode(&token).map_err(|e| {
            warn!(target: "riskbase::workflow", "login returned an undecodable token: {}", e);
            surface(self.notifier.as_ref(), AppError::failed(Operation::Login, "invalid token"))
        })?;

        let token_type = resp.token_type.filter(|t| !t.is_empty()).unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        self.session.set_credential(&token, &token_type).map_err(|e| surface(self.notifier.as_ref(), e))?;

        let Some(role) = claims.role() else {
            return Err(surface(self.notifier.as_ref(), AppError::MissingRole));
        };
        info!(target: "riskbase::workflow", "logged in as {} (role={})", claims.sub.as_deref().unwrap_or("?"), role.as_str());
        self.notifier.notify(Notice::success("Welcome!", "Login successful."));
        Ok(claims)
    }

    pub fn logout(&self) -> AppResult<()> {
        self.session.clear().map_err(|e| surface(self.notifier.as_ref(), e))?;
        info!(target: "riskbase::workflow", "logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TokenResponse;
    use crate::identity::Role;
    use crate::notify::RecordingNotifier;
    use crate::workflow::fake_api::{session_with_role, FakeApi};

    fn token_for(role: Option<&str>) -> String {
        session_with_role(role).credential().unwrap().token
    }

    fn controller(api: &FakeApi, session: SessionStore) -> LoginController<FakeApi> {
        LoginController::new(api.clone(), session, Arc::new(RecordingNotifier::default()))
    }

    #[tokio::test]
    async fn stores_credential_on_success() {
        let api = FakeApi::new();
        let token = token_for(Some("admin"));
        api.script(|s| s.login = Ok(TokenResponse { access_token: Some(token.clone()), token_type: Some("bearer".into()) }));
        let session = SessionStore::in_memory();

        let claims = controller(&api, session.clone()).login(" ana@example.com ", "pw").await.unwrap();
        assert_eq!(claims.role(), Some(Role::Admin));
        assert_eq!(api.calls(), vec!["login ana@example.com".to_string()]);
        assert_eq!(session.credential().unwrap().token, token);
    }

    #[tokio::test]
    async fn rejected_login_is_invalid_login_and_stores_nothing() {
        let api = FakeApi::new();
        api.script(|s| s.login = Err(ApiError::Unauthorized(401)));
        let session = SessionStore::in_memory();
        assert_eq!(controller(&api, session.clone()).login("a@b.c", "x").await, Err(AppError::InvalidLogin));
        assert!(session.credential().is_none());

        api.script(|s| s.login = Err(ApiError::Transport("refused".into())));
        assert!(matches!(controller(&api, session.clone()).login("a@b.c", "x").await, Err(AppError::OperationFailed { .. })));
    }

    #[tokio::test]
    async fn token_without_role_is_kept_but_reported() {
        let api = FakeApi::new();
        let token = token_for(None);
        api.script(|s| s.login = Ok(TokenResponse { access_token: Some(token.clone()), token_type: None }));
        let session = SessionStore::in_memory();

        assert_eq!(controller(&api, session.clone()).login("a@b.c", "x").await, Err(AppError::MissingRole));
        let cred = session.credential().unwrap();
        assert_eq!(cred.token, token);
        assert_eq!(cred.token_type, "bearer");
    }

    #[tokio::test]
    async fn missing_or_undecodable_token_is_not_stored() {
        let api = FakeApi::new();
        let session = SessionStore::in_memory();
        assert!(controller(&api, session.clone()).login("a@b.c", "x").await.is_err());
        api.script(|s| s.login = Ok(TokenResponse { access_token: Some("opaque".into()), token_type: None }));
        assert!(controller(&api, session.clone()).login("a@b.c", "x").await.is_err());
        assert!(session.credential().is_none());
    }

    #[test]
    fn logout_clears_session() {
        let api = FakeApi::new();
        let session = session_with_role(Some("user"));
        controller(&api, session.clone()).logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(api.calls().is_empty());
    }
}
