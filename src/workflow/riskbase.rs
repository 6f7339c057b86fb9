//! Risk-base screen: process or consult a period, browse the resulting temporary
//! spreadsheet page by page, export it, and persist it.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::api::{PageRequest, Period, ProcessResponse, RiskApi, ApiResult, TempFileHandle};
use crate::config::ClientConfig;
use crate::dataset::{Dataset, Row};
use crate::error::{AppError, AppResult, Operation};
use crate::identity::{AdminGuard, SessionStore};
use crate::notify::{Notice, Notifier};
use crate::routes::{navigate, Navigation, Screen};

use super::{surface, SaveOutcome};

/// Fixed name of the downloaded export.
pub const EXPORT_FILE_NAME: &str = "Análisis_BaseRiesgo_Final.xlsx";

/// One loaded page of the temporary spreadsheet and the handle it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedView {
    pub temp_file: TempFileHandle,
    pub dataset: Dataset,
    /// Rows available server-side, across all pages.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl LoadedView {
    pub fn columns(&self) -> &[String] { &self.dataset.columns }

    pub fn rows(&self) -> &[Row] { &self.dataset.rows }

    pub fn has_next(&self) -> bool { self.offset + self.limit < self.total }

    pub fn has_prev(&self) -> bool { self.offset > 0 }

    /// 1-based page number and page count.
    pub fn page(&self) -> (usize, usize) {
        let limit = self.limit.max(1);
        (self.offset / limit + 1, self.total.div_ceil(limit).max(1))
    }
}

/// Screen state. In-flight variants carry the view they will fall back to.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RiskBaseState {
    #[default]
    Idle,
    Processing,
    Extracting,
    DataLoaded(LoadedView),
    Paging(LoadedView),
    Exporting(LoadedView),
    Saving(LoadedView),
}

impl RiskBaseState {
    pub fn name(&self) -> &'static str {
        match self {
            RiskBaseState::Idle => "idle",
            RiskBaseState::Processing => "processing",
            RiskBaseState::Extracting => "extracting",
            RiskBaseState::DataLoaded(_) => "data_loaded",
            RiskBaseState::Paging(_) => "paging",
            RiskBaseState::Exporting(_) => "exporting",
            RiskBaseState::Saving(_) => "saving",
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self, RiskBaseState::Idle | RiskBaseState::DataLoaded(_))
    }

    pub fn view(&self) -> Option<&LoadedView> {
        match self {
            RiskBaseState::DataLoaded(v)
            | RiskBaseState::Paging(v)
            | RiskBaseState::Exporting(v)
            | RiskBaseState::Saving(v) => Some(v),
            RiskBaseState::Idle | RiskBaseState::Processing | RiskBaseState::Extracting => None,
        }
    }
}

pub struct RiskBaseController<A: RiskApi> {
    api: A,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    download_dir: PathBuf,
    page_size: usize,
    state: Mutex<RiskBaseState>,
    last_error: Mutex<Option<AppError>>,
}

impl<A: RiskApi> RiskBaseController<A> {
    pub fn new(api: A, session: SessionStore, notifier: Arc<dyn Notifier>, config: &ClientConfig) -> Self {
        Self {
            api,
            session,
            notifier,
            download_dir: config.download_dir.clone(),
            page_size: config.page_size.max(1),
            state: Mutex::new(RiskBaseState::Idle),
            last_error: Mutex::new(None),
        }
    }

    /// Entering the screen never fetches; it only checks that someone is logged in.
    pub fn mount(&self) -> Navigation {
        let nav = navigate(&self.session, Screen::RiskBase);
        debug!(target: "riskbase::workflow", "mount riskbase -> {:?}", nav);
        nav
    }

    pub fn state(&self) -> RiskBaseState { self.state.lock().clone() }

    pub fn view(&self) -> Option<LoadedView> { self.state.lock().view().cloned() }

    pub fn last_error(&self) -> Option<AppError> { self.last_error.lock().clone() }

    /// Run the full process, optionally scoped to a period, then load the first page.
    pub async fn process(&self, period: Option<Period>) -> AppResult<LoadedView> {
        self.enter(RiskBaseState::Processing)?;
        info!(target: "riskbase::workflow", "process start period={:?}", period);
        let resp = self.api.process(period).await;
        let view = self.load_from(Operation::Process, resp).await?;
        self.notifier.notify(Notice::success("Process finished", "The data was processed successfully."));
        Ok(view)
    }

    /// Extract the already-computed risk base for `month`/`year`, then load the first page.
    pub async fn consult_by_period(&self, month: u32, year: i32) -> AppResult<LoadedView> {
        let period = Period::new(month, year).ok_or(AppError::InvalidPeriod { month, year });
        let period = period.map_err(|e| self.fail(e))?;
        self.enter(RiskBaseState::Extracting)?;
        info!(target: "riskbase::workflow", "consult start {}/{}", month, year);
        let resp = self.api.consult(period).await;
        let view = self.load_from(Operation::Consult, resp).await?;
        self.notifier.notify(Notice::success("Query succeeded", "The risk base was queried successfully."));
        Ok(view)
    }

    pub async fn load_page(&self, offset: usize) -> AppResult<LoadedView> {
        let current = self.enter_with_view(RiskBaseState::Paging)?;
        if offset > 0 && offset >= current.total {
            self.restore(current);
            return Err(self.fail(AppError::InvalidInput(format!("offset {} is past the last row", offset))));
        }
        match self.fetch_view(current.temp_file.clone(), offset).await {
            Ok(view) => {
                *self.state.lock() = RiskBaseState::DataLoaded(view.clone());
                Ok(view)
            }
            Err(e) => {
                // The dataset was loaded already; keep the page we had.
                self.restore(current);
                Err(self.fail(e))
            }
        }
    }

    pub async fn next_page(&self) -> AppResult<LoadedView> {
        let current = self.current_view()?;
        if !current.has_next() {
            self.notifier.notify(Notice::info("Last page", "There are no more rows."));
            return Ok(current);
        }
        self.load_page(current.offset + current.limit).await
    }

    pub async fn prev_page(&self) -> AppResult<LoadedView> {
        let current = self.current_view()?;
        if !current.has_prev() {
            self.notifier.notify(Notice::info("First page", "Already at the first page."));
            return Ok(current);
        }
        self.load_page(current.offset.saturating_sub(current.limit)).await
    }

    /// Download the whole temporary spreadsheet into the download directory.
    /// The loaded page is left untouched.
    pub async fn export_current(&self) -> AppResult<PathBuf> {
        let view = self.enter_with_view(RiskBaseState::Exporting)?;
        info!(target: "riskbase::workflow", "export start file={}", view.temp_file);
        let result = async {
            let bytes = self.api.export(&view.temp_file).await.map_err(|e| AppError::from_api(Operation::Export, e))?;
            let write_failed = |e: std::io::Error| AppError::failed(Operation::Export, e.to_string());
            tokio::fs::create_dir_all(&self.download_dir).await.map_err(write_failed)?;
            let path = self.download_dir.join(EXPORT_FILE_NAME);
            tokio::fs::write(&path, &bytes).await.map_err(write_failed)?;
            debug!(target: "riskbase::workflow", "export wrote {} bytes to {}", bytes.len(), path.display());
            Ok::<PathBuf, AppError>(path)
        }.await;
        self.restore(view);
        match result {
            Ok(path) => {
                self.clear_error();
                self.notifier.notify(Notice::success("Export completed", "The Excel file was exported successfully."));
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Persist the temporary spreadsheet and delete it server-side. Admin only, and asks
    /// for confirmation first. On success the screen goes back to `Idle`.
    pub async fn save_to_database(&self) -> AppResult<SaveOutcome> {
        if let Err(e) = AdminGuard::new(&self.session).require_admin_or(self.notifier.as_ref()) {
            self.record(&e);
            return Err(e);
        }
        self.current_view()?;
        if !self.notifier.confirm(
            "Save to database?",
            "The processed data will be stored in the database and the temporary file deleted.",
        ) {
            info!(target: "riskbase::workflow", "save to database cancelled");
            return Ok(SaveOutcome::Cancelled);
        }
        let view = self.enter_with_view(RiskBaseState::Saving)?;
        info!(target: "riskbase::workflow", "save to database start file={}", view.temp_file);
        if let Err(e) = self.api.save_to_database(&view.temp_file).await {
            self.restore(view);
            return Err(self.fail(AppError::from_api(Operation::SaveToDatabase, e)));
        }

        // Persisted: the handle is spent whatever the delete does.
        *self.state.lock() = RiskBaseState::Idle;
        self.clear_error();
        if let Err(e) = self.api.delete_temp_file(&view.temp_file).await {
            let _ = self.fail(AppError::from_api(Operation::DeleteTempFile, e));
        }
        self.notifier.notify(Notice::success("Process finished", "The process completed successfully."));
        Ok(SaveOutcome::Saved)
    }

    async fn load_from(&self, op: Operation, resp: ApiResult<ProcessResponse>) -> AppResult<LoadedView> {
        let outcome = async {
            let resp = resp.map_err(|e| AppError::from_api(op, e))?;
            let name = resp.excel_file
                .filter(|f| !f.trim().is_empty())
                .ok_or_else(|| AppError::failed(op, "no file handle returned"))?;
            if let Some(msg) = resp.message.as_deref() {
                debug!(target: "riskbase::workflow", "{:?}: {}", op, msg);
            }
            self.fetch_view(TempFileHandle::new(name), 0).await
        }.await;
        match outcome {
            Ok(view) => {
                info!(target: "riskbase::workflow", "loaded {} of {} rows from {}", view.rows().len(), view.total, view.temp_file);
                *self.state.lock() = RiskBaseState::DataLoaded(view.clone());
                self.clear_error();
                Ok(view)
            }
            Err(e) => {
                *self.state.lock() = RiskBaseState::Idle;
                Err(self.fail(e))
            }
        }
    }

    async fn fetch_view(&self, handle: TempFileHandle, offset: usize) -> AppResult<LoadedView> {
        let page = PageRequest { offset, limit: self.page_size };
        let dv = self.api.data_view(&handle, page).await.map_err(|e| AppError::from_api(Operation::DataView, e))?;
        let columns = if dv.columns.is_empty() {
            dv.data.first().map(|r| r.columns().cloned().collect()).unwrap_or_default()
        } else {
            dv.columns
        };
        let total = dv.total.unwrap_or(offset + dv.data.len());
        Ok(LoadedView {
            temp_file: handle,
            dataset: Dataset::from_records(columns, dv.data),
            total,
            offset: dv.offset.unwrap_or(offset),
            limit: dv.limit.filter(|l| *l > 0).unwrap_or(self.page_size),
        })
    }

    /// Move into a loading state from `Idle` or `DataLoaded`. The loaded view, if any, is dropped.
    fn enter(&self, next: RiskBaseState) -> AppResult<()> {
        let mut st = self.state.lock();
        if st.is_busy() {
            drop(st);
            return Err(self.busy());
        }
        *st = next;
        Ok(())
    }

    /// Move from `DataLoaded` into a state wrapping the loaded view.
    fn enter_with_view(&self, wrap: fn(LoadedView) -> RiskBaseState) -> AppResult<LoadedView> {
        let mut st = self.state.lock();
        let view = match &*st {
            RiskBaseState::DataLoaded(v) => v.clone(),
            s if s.is_busy() => {
                drop(st);
                return Err(self.busy());
            }
            _ => {
                drop(st);
                return Err(self.fail(AppError::MissingTempFile));
            }
        };
        *st = wrap(view.clone());
        Ok(view)
    }

    fn current_view(&self) -> AppResult<LoadedView> {
        let st = self.state.lock().clone();
        match st {
            RiskBaseState::DataLoaded(v) => Ok(v),
            s if s.is_busy() => Err(self.busy()),
            _ => Err(self.fail(AppError::MissingTempFile)),
        }
    }

    fn restore(&self, view: LoadedView) {
        *self.state.lock() = RiskBaseState::DataLoaded(view);
    }

    fn busy(&self) -> AppError {
        debug!(target: "riskbase::workflow", "rejected: operation in flight ({})", self.state.lock().name());
        self.notifier.notify(AppError::Busy.notice());
        AppError::Busy
    }

    fn record(&self, err: &AppError) {
        *self.last_error.lock() = Some(err.clone());
    }

    fn clear_error(&self) {
        *self.last_error.lock() = None;
    }

    fn fail(&self, err: AppError) -> AppError {
        self.record(&err);
        surface(self.notifier.as_ref(), err)
    }
}

#[cfg(test)]
#[path = "riskbase_tests.rs"]
mod riskbase_tests;
