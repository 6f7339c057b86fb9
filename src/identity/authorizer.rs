use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::notify::Notifier;

use super::claims::decode;
use super::principal::{Claims, Role};
use super::session::SessionStore;

/// Client-side admin gate.
///
/// This only decides whether admin-only controls are offered and saves a round trip the
/// backend would reject anyway. The backend remains the authority on every call.
pub struct AdminGuard<'a> {
    session: &'a SessionStore,
}

impl<'a> AdminGuard<'a> {
    pub fn new(session: &'a SessionStore) -> Self { Self { session } }

    /// Claims of the current credential; `None` when absent or undecodable.
    pub fn claims(&self) -> Option<Claims> {
        let cred = self.session.credential()?;
        match decode(&cred.token) {
            Ok(c) => Some(c),
            Err(e) => {
                debug!(target: "riskbase::identity", "credential not decodable, treating as no role: {}", e);
                None
            }
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.claims().and_then(|c| c.role())
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role(), Some(Role::Admin))
    }

    /// Run `on_denied` and return false when the user is not an admin.
    pub fn require_admin<F: FnOnce()>(&self, on_denied: F) -> bool {
        if self.is_admin() {
            return true;
        }
        on_denied();
        false
    }

    /// Controller form of [`require_admin`](Self::require_admin): shows the
    /// permission-denied notice and returns the error.
    pub fn require_admin_or(&self, notifier: &dyn Notifier) -> AppResult<()> {
        if self.require_admin(|| notifier.notify(AppError::PermissionDenied.notice())) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}
