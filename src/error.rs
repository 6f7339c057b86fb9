//! Unified application error model for the workflow controllers.
//! Every failure a controller can hit ends up as an [`AppError`], which knows its stable
//! code and the notice shown to the user. Nothing here is retried.

use thiserror::Error;

use crate::api::ApiError;
use crate::notify::Notice;

/// Backend operation a failure belongs to; selects the user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    Process,
    Consult,
    DataView,
    Export,
    SaveToDatabase,
    DeleteTempFile,
    LoadMatrices,
    SaveMatrices,
}

impl Operation {
    pub fn title(&self) -> &'static str {
        match self {
            Operation::Login => "Login failed",
            Operation::Register => "Error creating user",
            Operation::Process => "Error processing data",
            Operation::Consult => "Error querying risk base",
            Operation::DataView => "Error fetching processed data",
            Operation::Export => "Error exporting Excel",
            Operation::SaveToDatabase => "Error saving to database",
            Operation::DeleteTempFile => "Error deleting temporary file",
            Operation::LoadMatrices => "Error",
            Operation::SaveMatrices => "Error saving",
        }
    }

    fn default_text(&self) -> &'static str {
        match self {
            Operation::Login => "Network or server error, please try again.",
            Operation::Register => "The user could not be created.",
            Operation::Process => "An error occurred while processing the data. Try again or contact the administrator.",
            Operation::Consult => "An error occurred while querying the risk base. Try again or contact the administrator.",
            Operation::DataView => "An error occurred while fetching the processed data. Try again or contact the administrator.",
            Operation::Export => "An error occurred while exporting the data to Excel. Try again or contact the administrator.",
            Operation::SaveToDatabase => "An error occurred while saving to the database.",
            Operation::DeleteTempFile => "The temporary file could not be deleted.",
            Operation::LoadMatrices => "Could not load matrices.",
            Operation::SaveMatrices => "Some rows could not be saved.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// The backend rejected the current credential (401/403).
    #[error("session expired or not authorized")]
    AuthExpired,
    /// The client-side admin gate failed; no call was issued.
    #[error("permission denied")]
    PermissionDenied,
    #[error("{}: {detail}", .op.title())]
    OperationFailed { op: Operation, detail: String },
    #[error("no temporary file has been generated yet")]
    MissingTempFile,
    #[error("invalid period {month}/{year}")]
    InvalidPeriod { month: u32, year: i32 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("incorrect user or password")]
    InvalidLogin,
    #[error("token carries no role claim")]
    MissingRole,
    #[error("no row with id {0}")]
    UnknownRow(String),
    #[error("another operation is still in progress")]
    Busy,
    #[error("session storage error: {0}")]
    Session(String),
}

impl AppError {
    pub fn failed<S: Into<String>>(op: Operation, detail: S) -> Self {
        AppError::OperationFailed { op, detail: detail.into() }
    }

    /// Classify a transport-level failure: 401/403 are always `AuthExpired`,
    /// everything else (bad status, malformed payload, network) fails the operation.
    pub fn from_api(op: Operation, err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(_) => AppError::AuthExpired,
            ApiError::Status { detail: Some(d), .. } => AppError::failed(op, d),
            ApiError::Status { status, detail: None } => AppError::failed(op, format!("HTTP {}", status)),
            ApiError::Malformed(m) => AppError::failed(op, m),
            ApiError::Transport(m) => AppError::failed(op, m),
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::AuthExpired => "auth_expired",
            AppError::PermissionDenied => "permission_denied",
            AppError::OperationFailed { .. } => "operation_failed",
            AppError::MissingTempFile => "missing_temp_file",
            AppError::InvalidPeriod { .. } => "invalid_period",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidLogin => "invalid_login",
            AppError::MissingRole => "missing_role",
            AppError::UnknownRow(_) => "unknown_row",
            AppError::Busy => "busy",
            AppError::Session(_) => "session_error",
        }
    }

    /// The notice presented for this error.
    pub fn notice(&self) -> Notice {
        match self {
            AppError::AuthExpired => Notice::error(
                "Not authorized",
                "You are not authorized or your session has expired. Please log in again.",
            ),
            AppError::PermissionDenied => Notice::warning(
                "Permission denied",
                "You do not have permission to perform this action. If you think this is a mistake, contact the administrator.",
            ),
            AppError::OperationFailed { op, detail } => {
                let text = if detail.is_empty() { op.default_text().to_string() } else { format!("{} ({})", op.default_text(), detail) };
                Notice::error(op.title().to_string(), text)
            }
            AppError::MissingTempFile => Notice::error(
                "No Excel file generated",
                "Process the data and generate the Excel file first.",
            ),
            AppError::InvalidPeriod { .. } => Notice::error(
                "Invalid period",
                "Enter a month from 1-12 and a valid year.",
            ),
            AppError::InvalidInput(m) => Notice::error("Invalid input".to_string(), m.clone()),
            AppError::InvalidLogin => Notice::error("Oops...", "Incorrect user or password"),
            AppError::MissingRole => Notice::error(
                "Oops...",
                "The received token carries no role information. Contact the administrator.",
            ),
            AppError::UnknownRow(id) => Notice::error("Unknown row".to_string(), format!("No row with id {}", id)),
            AppError::Busy => Notice::info("Please wait", "Another operation is still in progress."),
            AppError::Session(m) => Notice::error("Session storage error".to_string(), m.clone()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
