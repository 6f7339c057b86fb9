use super::*;
use crate::notify::Level;

#[test]
fn unauthorized_statuses_map_to_auth_expired() {
    assert_eq!(AppError::from_api(Operation::Process, ApiError::Unauthorized(401)), AppError::AuthExpired);
    assert_eq!(AppError::from_api(Operation::SaveToDatabase, ApiError::Unauthorized(403)), AppError::AuthExpired);
}

#[test]
fn other_failures_map_to_operation_failed() {
    let e = AppError::from_api(Operation::Export, ApiError::Status { status: 500, detail: None });
    assert_eq!(e, AppError::failed(Operation::Export, "HTTP 500"));
    assert_eq!(e.code_str(), "operation_failed");

    let e = AppError::from_api(Operation::Consult, ApiError::Status { status: 404, detail: Some("no data".into()) });
    assert_eq!(e, AppError::failed(Operation::Consult, "no data"));

    let e = AppError::from_api(Operation::Process, ApiError::Malformed("missing excel_file".into()));
    assert_eq!(e.code_str(), "operation_failed");
}

#[test]
fn notices_distinguish_expired_from_failed() {
    let expired = AppError::AuthExpired.notice();
    assert_eq!(expired.level, Level::Error);
    assert_eq!(expired.title, "Not authorized");

    let failed = AppError::failed(Operation::Process, "").notice();
    assert_eq!(failed.title, "Error processing data");
    assert!(!failed.text.contains('('));

    let denied = AppError::PermissionDenied.notice();
    assert_eq!(denied.level, Level::Warning);
}
