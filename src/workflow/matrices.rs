//! Matrix editor: admin-only grid of risk policies where two columns can be edited
//! and only the changed rows are sent back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::api::RiskApi;
use crate::dataset::{CellValue, EditableTable, Row};
use crate::error::{AppError, AppResult, Operation};
use crate::identity::SessionStore;
use crate::notify::{Notice, Notifier};
use crate::routes::{navigate, Navigation, Screen};

use super::{surface, SaveOutcome};

pub const MATRIX_ID_FIELD: &str = "id_politica_base_riesgo";

/// Columns the grid lets the user change. `factor_prov` is numeric, `clasificacion` free text.
pub const EDITABLE_COLUMNS: [&str; 2] = ["factor_prov", "clasificacion"];

pub struct MatrixController<A: RiskApi> {
    api: A,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    table: Mutex<EditableTable>,
    columns: Mutex<Vec<String>>,
    error_rows: Mutex<Vec<CellValue>>,
    saving: AtomicBool,
}

impl<A: RiskApi> MatrixController<A> {
    pub fn new(api: A, session: SessionStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            session,
            notifier,
            table: Mutex::new(EditableTable::new(MATRIX_ID_FIELD, Vec::new())),
            columns: Mutex::new(Vec::new()),
            error_rows: Mutex::new(Vec::new()),
            saving: AtomicBool::new(false),
        }
    }

    /// Check access and load the grid. Without a credential nothing is fetched.
    pub async fn mount(&self) -> AppResult<Navigation> {
        match navigate(&self.session, Screen::Matrices) {
            Navigation::RedirectToLogin => return Ok(Navigation::RedirectToLogin),
            Navigation::Denied => return Err(surface(self.notifier.as_ref(), AppError::PermissionDenied)),
            Navigation::Proceed(_) => {}
        }
        let view = self.api.matrices().await
            .map_err(|e| surface(self.notifier.as_ref(), AppError::from_api(Operation::LoadMatrices, e)))?;
        let columns = if view.columns.is_empty() {
            view.matrices.first().map(|r| r.columns().cloned().collect()).unwrap_or_default()
        } else {
            view.columns
        };
        info!(target: "riskbase::workflow", "loaded {} matrix rows", view.matrices.len());
        *self.table.lock() = EditableTable::new(MATRIX_ID_FIELD, view.matrices);
        *self.columns.lock() = columns;
        self.error_rows.lock().clear();
        Ok(Navigation::Proceed(Screen::Matrices))
    }

    pub fn columns(&self) -> Vec<String> { self.columns.lock().clone() }

    pub fn rows(&self) -> Vec<Row> { self.table.lock().rows().to_vec() }

    pub fn commit_row_edit(&self, updated: Row) -> AppResult<()> {
        self.table.lock().commit_row_edit(updated)
    }

    /// Edit one editable cell of the row with identifier `id`, parsing `raw` for the column.
    /// An empty value clears the cell.
    pub fn set_cell(&self, id: &str, column: &str, raw: &str) -> AppResult<()> {
        let result = self.build_edit(id, column, raw).and_then(|row| self.commit_row_edit(row));
        result.map_err(|e| surface(self.notifier.as_ref(), e))
    }

    fn build_edit(&self, id: &str, column: &str, raw: &str) -> AppResult<Row> {
        if !EDITABLE_COLUMNS.contains(&column) {
            return Err(AppError::InvalidInput(format!("column '{}' is not editable", column)));
        }
        let raw = raw.trim();
        let value = match column {
            "factor_prov" if raw.is_empty() => CellValue::Null,
            "factor_prov" => raw.parse::<f64>().ok()
                .and_then(CellValue::float)
                .ok_or_else(|| AppError::InvalidInput(format!("'{}' is not a number", raw)))?,
            _ => CellValue::text(raw),
        };
        let mut row = self.table.lock().find(id).cloned().ok_or_else(|| AppError::UnknownRow(id.to_string()))?;
        row.set(column, value);
        Ok(row)
    }

    pub fn diff_against_original(&self) -> Vec<Row> {
        self.table.lock().diff_against_original()
    }

    /// Send the changed rows. An empty diff sends nothing.
    pub async fn save(&self) -> AppResult<SaveOutcome> {
        let (diff, sent) = {
            let table = self.table.lock();
            (table.diff_against_original(), table.rows().to_vec())
        };
        if diff.is_empty() {
            self.notifier.notify(Notice::info("No changes", "There are no changes to save."));
            return Ok(SaveOutcome::NoChanges);
        }
        if self.saving.swap(true, Ordering::AcqRel) {
            return Err(surface(self.notifier.as_ref(), AppError::Busy));
        }
        debug!(target: "riskbase::workflow", "saving {} changed matrix rows", diff.len());
        let result = self.api.save_matrices(&diff).await;
        self.saving.store(false, Ordering::Release);

        match result {
            Ok(resp) if resp.success => {
                info!(target: "riskbase::workflow", "matrices saved, rows_updated={:?}", resp.rows_updated);
                self.error_rows.lock().clear();
                self.table.lock().replace_snapshot(sent);
                self.notifier.notify(Notice::success("Changes saved", "The changes were saved successfully."));
                Ok(SaveOutcome::Saved)
            }
            Ok(resp) => {
                *self.error_rows.lock() = resp.error_rows;
                let err = AppError::failed(Operation::SaveMatrices, resp.message.unwrap_or_default());
                Err(surface(self.notifier.as_ref(), err))
            }
            Err(e) => Err(surface(self.notifier.as_ref(), AppError::from_api(Operation::SaveMatrices, e))),
        }
    }

    /// Identifiers the backend reported as failed on the last save.
    pub fn error_rows(&self) -> Vec<CellValue> { self.error_rows.lock().clone() }

    pub fn is_error_row(&self, row: &Row) -> bool {
        let Some(id) = row.id_key(MATRIX_ID_FIELD) else { return false };
        self.error_rows.lock().iter().any(|e| e.to_string() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MatricesSaveResponse, MatricesView};
    use crate::notify::{Level, RecordingNotifier};
    use crate::workflow::fake_api::{session_with_role, FakeApi};

    fn policy(id: i64, factor: f64, class: &str) -> Row {
        Row::new()
            .with(MATRIX_ID_FIELD, CellValue::int(id))
            .with("concatenado", CellValue::text(format!("NATURA-{}", id)))
            .with("factor_prov", CellValue::float(factor).unwrap())
            .with("clasificacion", CellValue::text(class))
    }

    fn loaded(api: &FakeApi) -> FakeApi {
        api.script(|s| s.matrices = Ok(MatricesView {
            matrices: vec![policy(5, 0.1, "A"), policy(7, 0.5, "B"), policy(9, 1.0, "C")],
            columns: vec![],
            total: Some(3),
        }));
        api.clone()
    }

    async fn mounted(api: &FakeApi, n: Arc<RecordingNotifier>) -> MatrixController<FakeApi> {
        let c = MatrixController::new(loaded(api), session_with_role(Some("admin")), n);
        assert_eq!(c.mount().await.unwrap(), Navigation::Proceed(Screen::Matrices));
        c
    }

    #[tokio::test]
    async fn mount_is_gated() {
        let api = FakeApi::new();
        let anon = MatrixController::new(api.clone(), SessionStore::in_memory(), Arc::new(RecordingNotifier::default()));
        assert_eq!(anon.mount().await, Ok(Navigation::RedirectToLogin));

        let user = MatrixController::new(api.clone(), session_with_role(Some("user")), Arc::new(RecordingNotifier::default()));
        assert_eq!(user.mount().await, Err(AppError::PermissionDenied));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn mount_failure_leaves_grid_empty() {
        let api = FakeApi::new();
        api.script(|s| s.matrices = Err(ApiError::Status { status: 404, detail: Some("No se encontraron matrices".into()) }));
        let n = Arc::new(RecordingNotifier::default());
        let c = MatrixController::new(api.clone(), session_with_role(Some("admin")), n.clone());
        assert!(c.mount().await.is_err());
        assert!(c.rows().is_empty());
        assert_eq!(n.last().unwrap().text, "Could not load matrices. (No se encontraron matrices)");
    }

    #[tokio::test]
    async fn edit_of_row_seven_is_the_only_diff() {
        let api = FakeApi::new();
        let c = mounted(&api, Arc::new(RecordingNotifier::default())).await;
        assert_eq!(c.columns()[0], "clasificacion");

        c.set_cell("7", "factor_prov", "0.6").unwrap();
        let diff = c.diff_against_original();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].get(MATRIX_ID_FIELD), Some(&CellValue::int(7)));
        assert_eq!(diff[0].get("factor_prov").and_then(|v| v.as_f64()), Some(0.6));
        assert_eq!(c.diff_against_original(), diff);
    }

    #[tokio::test]
    async fn set_cell_rejects_bad_edits() {
        let api = FakeApi::new();
        let c = mounted(&api, Arc::new(RecordingNotifier::default())).await;
        assert!(matches!(c.set_cell("7", "concatenado", "x"), Err(AppError::InvalidInput(_))));
        assert!(matches!(c.set_cell("7", "factor_prov", "abc"), Err(AppError::InvalidInput(_))));
        assert_eq!(c.set_cell("70", "clasificacion", "B"), Err(AppError::UnknownRow("70".into())));
        assert!(c.diff_against_original().is_empty());
    }

    #[tokio::test]
    async fn empty_diff_sends_nothing() {
        let api = FakeApi::new();
        let n = Arc::new(RecordingNotifier::default());
        let c = mounted(&api, n.clone()).await;
        assert_eq!(c.save().await, Ok(SaveOutcome::NoChanges));
        assert_eq!(api.count("save_matrices"), 0);
        assert_eq!(n.last().unwrap().level, Level::Info);
    }

    #[tokio::test]
    async fn save_sends_exactly_the_diff_and_resets_snapshot() {
        let api = FakeApi::new();
        let c = mounted(&api, Arc::new(RecordingNotifier::default())).await;
        c.set_cell("9", "clasificacion", "D").unwrap();

        assert_eq!(c.save().await, Ok(SaveOutcome::Saved));
        let sent = api.saved_rows();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], c.rows().into_iter().filter(|r| r.id_key(MATRIX_ID_FIELD).as_deref() == Some("9")).collect::<Vec<_>>());
        assert!(c.diff_against_original().is_empty());
    }

    #[tokio::test]
    async fn partial_failure_keeps_error_rows_and_diff() {
        let api = FakeApi::new();
        let n = Arc::new(RecordingNotifier::default());
        let c = mounted(&api, n.clone()).await;
        api.script(|s| s.save_matrices = Ok(MatricesSaveResponse {
            success: false,
            message: Some("0 filas actualizadas. 1 errores.".into()),
            rows_updated: Some(0),
            error_rows: vec![CellValue::int(7)],
        }));
        c.set_cell("7", "factor_prov", "0.6").unwrap();

        assert!(matches!(c.save().await, Err(AppError::OperationFailed { op: Operation::SaveMatrices, .. })));
        assert_eq!(c.error_rows(), vec![CellValue::int(7)]);
        assert!(c.is_error_row(&c.rows()[1]));
        assert!(!c.is_error_row(&c.rows()[0]));
        assert_eq!(c.diff_against_original().len(), 1);
        assert_eq!(n.last().unwrap().title, "Error saving");
    }

    #[tokio::test]
    async fn rejected_credential_on_save_is_auth_expired() {
        let api = FakeApi::new();
        let c = mounted(&api, Arc::new(RecordingNotifier::default())).await;
        api.script(|s| s.save_matrices = Err(ApiError::Unauthorized(403)));
        c.set_cell("5", "factor_prov", "").unwrap();
        assert_eq!(c.save().await, Err(AppError::AuthExpired));
    }
}
