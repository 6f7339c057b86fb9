//! Backend API seam.
//!
//! [`RiskApi`] lists every backend operation the console consumes. Controllers are generic
//! over it so the HTTP implementation ([`HttpRiskApi`]) can be swapped for an in-process
//! fake in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{CellValue, Row};

mod http;

pub use http::HttpRiskApi;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401 or 403: the credential was rejected.
    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),
    #[error("HTTP {status}{}", .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Server-issued name of the transient spreadsheet that ties process/consult,
/// data view, export and persist together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempFileHandle(String);

impl TempFileHandle {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for TempFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Month/year scope for process and consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    month: u32,
    year: i32,
}

impl Period {
    pub const MIN_YEAR: i32 = 2000;

    /// Month must be 1..=12 and year at least 2000 (the backend's lower bound).
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if !(1..=12).contains(&month) || year < Self::MIN_YEAR {
            return None;
        }
        Some(Self { month, year })
    }

    pub fn month(&self) -> u32 { self.month }
    pub fn year(&self) -> i32 { self.year }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Reply of the process and consult endpoints. Only `excel_file` is required by the
/// workflow; its absence is a failed operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub excel_file: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rows_processed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataView {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatricesView {
    #[serde(default)]
    pub matrices: Vec<Row>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatricesSaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rows_updated: Option<u64>,
    #[serde(default, rename = "errorRows")]
    pub error_rows: Vec<CellValue>,
}

/// One method per backend operation. Implementations attach the current bearer
/// credential themselves and classify 401/403 as [`ApiError::Unauthorized`].
#[allow(async_fn_in_trait)]
pub trait RiskApi {
    async fn login(&self, req: &LoginRequest) -> ApiResult<TokenResponse>;
    async fn register_user(&self, user: &NewUser) -> ApiResult<CreatedUser>;
    async fn process(&self, period: Option<Period>) -> ApiResult<ProcessResponse>;
    async fn consult(&self, period: Period) -> ApiResult<ProcessResponse>;
    async fn data_view(&self, handle: &TempFileHandle, page: PageRequest) -> ApiResult<DataView>;
    async fn export(&self, handle: &TempFileHandle) -> ApiResult<Vec<u8>>;
    async fn save_to_database(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse>;
    async fn delete_temp_file(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse>;
    async fn matrices(&self) -> ApiResult<MatricesView>;
    async fn save_matrices(&self, rows: &[Row]) -> ApiResult<MatricesSaveResponse>;
}
