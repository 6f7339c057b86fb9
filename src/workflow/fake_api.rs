//! Scripted in-process [`RiskApi`] used by the controller tests. Records every call.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::*;
use crate::dataset::{CellValue, Row};

pub struct Script {
    pub login: ApiResult<TokenResponse>,
    pub register: ApiResult<CreatedUser>,
    pub process: ApiResult<ProcessResponse>,
    pub consult: ApiResult<ProcessResponse>,
    pub data_view: ApiResult<DataView>,
    pub export: ApiResult<Vec<u8>>,
    pub save_to_database: ApiResult<SuccessResponse>,
    pub delete_temp_file: ApiResult<SuccessResponse>,
    pub matrices: ApiResult<MatricesView>,
    pub save_matrices: ApiResult<MatricesSaveResponse>,
    /// Yield to the executor once before answering, so concurrent callers interleave.
    pub yield_first: bool,
}

impl Default for Script {
    fn default() -> Self {
        let ok = || Ok(SuccessResponse { success: true, message: None });
        Script {
            login: Ok(TokenResponse { access_token: None, token_type: Some("bearer".into()) }),
            register: Ok(CreatedUser { username: "new".into(), email: None, role: None }),
            process: Ok(ProcessResponse { excel_file: Some("tmp123.xlsx".into()), ..Default::default() }),
            consult: Ok(ProcessResponse { excel_file: Some("consult_05_2024.xlsx".into()), ..Default::default() }),
            data_view: Ok(DataView {
                columns: vec!["a".into(), "b".into()],
                data: vec![Row::new().with("a", CellValue::int(1)).with("b", CellValue::int(2))],
                total: Some(1),
                limit: Some(25),
                offset: Some(0),
            }),
            export: Ok(b"PK\x03\x04xlsx".to_vec()),
            save_to_database: ok(),
            delete_temp_file: ok(),
            matrices: Ok(MatricesView::default()),
            save_matrices: Ok(MatricesSaveResponse { success: true, ..Default::default() }),
            yield_first: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeApi {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<String>>>,
    saved_rows: Arc<Mutex<Vec<Vec<Row>>>>,
}

impl FakeApi {
    pub fn new() -> Self { Self::default() }

    pub fn script<F: FnOnce(&mut Script)>(&self, f: F) -> &Self {
        f(&mut self.script.lock());
        self
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().clone() }

    /// Number of calls whose description starts with `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.split(' ').next() == Some(op)).count()
    }

    /// Row batches sent to `save_matrices`, one entry per call.
    pub fn saved_rows(&self) -> Vec<Vec<Row>> { self.saved_rows.lock().clone() }

    async fn answer<T, F>(&self, call: String, pick: F) -> ApiResult<T>
    where
        T: Clone,
        F: for<'a> Fn(&'a Script) -> &'a ApiResult<T>,
    {
        self.calls.lock().push(call);
        let yield_first = self.script.lock().yield_first;
        if yield_first {
            tokio::task::yield_now().await;
        }
        let script = self.script.lock();
        pick(&*script).clone()
    }
}

impl RiskApi for FakeApi {
    async fn login(&self, req: &LoginRequest) -> ApiResult<TokenResponse> {
        self.answer(format!("login {}", req.email), |s| &s.login).await
    }

    async fn register_user(&self, user: &NewUser) -> ApiResult<CreatedUser> {
        self.answer(format!("register {}", user.username), |s| &s.register).await
    }

    async fn process(&self, period: Option<Period>) -> ApiResult<ProcessResponse> {
        let call = match period {
            Some(p) => format!("process {} {}", p.month(), p.year()),
            None => "process".to_string(),
        };
        self.answer(call, |s| &s.process).await
    }

    async fn consult(&self, period: Period) -> ApiResult<ProcessResponse> {
        self.answer(format!("consult {} {}", period.month(), period.year()), |s| &s.consult).await
    }

    async fn data_view(&self, handle: &TempFileHandle, page: PageRequest) -> ApiResult<DataView> {
        self.answer(format!("data_view {} {} {}", handle, page.offset, page.limit), |s| &s.data_view).await
    }

    async fn export(&self, handle: &TempFileHandle) -> ApiResult<Vec<u8>> {
        self.answer(format!("export {}", handle), |s| &s.export).await
    }

    async fn save_to_database(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse> {
        self.answer(format!("save_to_database {}", handle), |s| &s.save_to_database).await
    }

    async fn delete_temp_file(&self, handle: &TempFileHandle) -> ApiResult<SuccessResponse> {
        self.answer(format!("delete_temp_file {}", handle), |s| &s.delete_temp_file).await
    }

    async fn matrices(&self) -> ApiResult<MatricesView> {
        self.answer("matrices".to_string(), |s| &s.matrices).await
    }

    async fn save_matrices(&self, rows: &[Row]) -> ApiResult<MatricesSaveResponse> {
        self.saved_rows.lock().push(rows.to_vec());
        self.answer(format!("save_matrices {}", rows.len()), |s| &s.save_matrices).await
    }
}

/// Session holding an unsigned token whose payload carries `role` (no role claim when `None`).
pub fn session_with_role(role: Option<&str>) -> crate::identity::SessionStore {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let payload = match role {
        Some(r) => format!(r#"{{"sub":"ana@example.com","role":"{}"}}"#, r),
        None => r#"{"sub":"ana@example.com"}"#.to_string(),
    };
    let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl", URL_SAFE_NO_PAD.encode(payload));
    let session = crate::identity::SessionStore::in_memory();
    session.set_credential(&token, "bearer").unwrap();
    session
}
