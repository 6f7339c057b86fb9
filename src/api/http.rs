use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::dataset::Row;
use crate::identity::SessionStore;

use super::*;

/// reqwest-backed [`RiskApi`]. Reads the bearer credential from the session on every call,
/// so a login/logout through the same [`SessionStore`] is picked up immediately.
#[derive(Clone)]
pub struct HttpRiskApi {
    base: String,
    client: reqwest::Client,
    session: SessionStore,
}

impl HttpRiskApi {
    pub fn new(base: &str, session: SessionStore) -> anyhow::Result<Self> {
        // Validate early so a typo in the configured URL fails at startup.
        let parsed = reqwest::Url::parse(base).map_err(|e| anyhow::anyhow!("invalid API base URL '{}': {}", base, e))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("invalid API base URL '{}'", base);
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base: base.trim_end_matches('/').to_string(), client, session })
    }

    pub fn base(&self) -> &str { &self.base }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base, path);
        if !query.is_empty() {
            let qs: Vec<String> = query.iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&qs.join("&"));
        }
        url
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(cred) = self.session.credential() {
            match HeaderValue::from_str(&cred.authorization_header()) {
                Ok(v) => { headers.insert(AUTHORIZATION, v); }
                Err(_) => warn!(target: "riskbase::api", "stored credential is not a valid header value; sending without it"),
            }
        }
        headers
    }

    async fn send(&self, method: Method, url: String, body: Option<serde_json::Value>) -> ApiResult<reqwest::Response> {
        debug!(target: "riskbase::api", "{} {}", method, url);
        let mut req = self.client.request(method.clone(), &url).headers(self.auth_headers());
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        debug!(target: "riskbase::api", "{} {} -> {}", method, url, status.as_u16());
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let bytes = resp.bytes().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), detail: extract_detail(&bytes) });
        }
        Ok(resp)
    }

    async fn json<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
        let bytes = resp.bytes().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    fn period_query(period: Period) -> Vec<(&'static str, String)> {
        vec![("mes", period.month().to_string()), ("anio", period.year().to_string())]
    }
}

/// FastAPI puts the reason under `detail`, either a string or a list of validation errors.
fn extract_detail(bytes: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    match v.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl RiskApi for HttpRiskApi {
    async fn login(&self, req: &LoginRequest) -> ApiResult<TokenResponse> {
        let body = serde_json::to_value(req).map_err(|e| ApiError::Malformed(e.to_string()))?;
        // Login is unauthenticated; a 401 here means bad credentials, not an expired session.
        let resp = self.client.post(self.url("/auth/login", &[])).json(&body).send().await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let bytes = resp.bytes().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), detail: extract_detail(&bytes) });
        }
        Self::json(resp).await
    }

    async fn register_user(&self, user: &NewUser) -> ApiResult<CreatedUser> {
        let body = serde_json::to_value(user).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let resp = self.send(Method::POST, self.url("/auth/register", &[]), Some(body)).await?;
        Self::json(resp).await
    }

    async fn process(&self, period: Option<Period>) -> ApiResult<ProcessResponse> {
        let query = period.map(Self::period_query).unwrap_or_default();
        let resp = self.send(Method::POST, self.url("/risk/process", &query), None).await?;
        Self::json(resp).await
    }

    async fn consult(&self, period: Period) -> ApiResult<ProcessResponse> {
        let resp = self.send(Method::POST, self.url("/risk/consult-riskbase", &Self::period_query(period)), None).await?;
        Self::json(resp).await
    }

    async fn data_view(&self, handle: &TempFileHandle, page: PageRequest) -> ApiResult<DataView> {
        let query = [
            ("temp_file", handle.as_str().to_string()),
            ("limit", page.limit.to_string()),
            ("offset", page.offset.to_string()),
        ];
        let resp = self.send(Method::GET, self.url("/risk/data-view", &query), None).await?;
        Self::json(resp).await
    }

    async fn export(&self, handle: &TempFileHandle) -> ApiResult<Vec<u8>> {
        let resp = self.send(Method::GET, self.url("/risk/export-excel", &[("filename", handle.as_str().to_string())]), None).await?;
        let bytes = resp.bytes().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn save_to_database(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse> {
        let body = serde_json::json!({ "filename": handle.as_str() });
        let resp = self.send(Method::POST, self.url("/risk/save-to-db", &[]), Some(body)).await?;
        Self::json(resp).await
    }

    async fn delete_temp_file(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse> {
        let resp = self.send(Method::DELETE, self.url("/risk/delete-temp-file", &[("filename", handle.as_str().to_string())]), None).await?;
        Self::json(resp).await
    }

    async fn matrices(&self) -> ApiResult<MatricesView> {
        let resp = self.send(Method::GET, self.url("/risk/matrices-view", &[]), None).await?;
        Self::json(resp).await
    }

    async fn save_matrices(&self, rows: &[Row]) -> ApiResult<MatricesSaveResponse> {
        let body = serde_json::json!({ "rows": rows });
        let resp = self.send(Method::PUT, self.url("/risk/matrices-save", &[]), Some(body)).await?;
        Self::json(resp).await
    }
}
