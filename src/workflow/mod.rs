//! Screen controllers.
//!
//! Each controller owns the state of one screen and talks to the backend through a
//! [`RiskApi`](crate::api::RiskApi) implementation. Failures are shown through the
//! [`Notifier`] and returned as [`AppError`]; nothing is retried.

use tracing::warn;

use crate::error::AppError;
use crate::notify::Notifier;

pub mod login;
pub mod matrices;
pub mod riskbase;
pub mod users;

#[cfg(test)]
pub(crate) mod fake_api;

pub use login::LoginController;
pub use matrices::{MatrixController, EDITABLE_COLUMNS, MATRIX_ID_FIELD};
pub use riskbase::{LoadedView, RiskBaseController, RiskBaseState, EXPORT_FILE_NAME};
pub use users::UserAdminController;

/// How a confirmable or diff-based save ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
    /// Nothing differed from the snapshot; nothing was sent.
    NoChanges,
}

/// Show `err` and hand it back for `?`/`Err(..)`.
pub(crate) fn surface(notifier: &dyn Notifier, err: AppError) -> AppError {
    warn!(target: "riskbase::workflow", "{} ({})", err, err.code_str());
    notifier.notify(err.notice());
    err
}
