use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::api::{Period, RiskApi};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::identity::{AdminGuard, SessionStore};
use crate::notify::Notifier;
use crate::routes::{navigate, Navigation, Screen};
use crate::workflow::{
    LoginController, MatrixController, RiskBaseController, SaveOutcome, UserAdminController,
};

use super::commands::{Command, PageMove, HELP};
use super::table::{column_pages, print_table};

/// Interactive front end: one controller per screen, plus the screen the user is on.
pub struct Console<A: RiskApi + Clone> {
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    config: ClientConfig,
    login: LoginController<A>,
    riskbase: RiskBaseController<A>,
    matrices: MatrixController<A>,
    users: UserAdminController<A>,
    screen: Screen,
    column_page: usize,
}

impl<A: RiskApi + Clone> Console<A> {
    pub fn new(api: A, session: SessionStore, notifier: Arc<dyn Notifier>, config: ClientConfig) -> Self {
        let screen = if session.is_authenticated() { Screen::Home } else { Screen::Login };
        Self {
            login: LoginController::new(api.clone(), session.clone(), notifier.clone()),
            riskbase: RiskBaseController::new(api.clone(), session.clone(), notifier.clone(), &config),
            matrices: MatrixController::new(api.clone(), session.clone(), notifier.clone()),
            users: UserAdminController::new(api, session.clone(), notifier.clone()),
            session,
            notifier,
            config,
            screen,
            column_page: 0,
        }
    }

    pub fn screen(&self) -> Screen { self.screen }

    pub fn riskbase(&self) -> &RiskBaseController<A> { &self.riskbase }

    pub fn matrices(&self) -> &MatrixController<A> { &self.matrices }

    /// Run one command. Returns false when the console should exit.
    pub async fn execute(&mut self, cmd: Command) -> bool {
        debug!(target: "riskbase::cli", "execute {:?}", redacted(&cmd));
        match cmd {
            Command::Quit => return false,
            Command::Help => println!("{}", HELP),
            Command::Status => self.print_status(),
            Command::Login { email, password } => {
                // A token without a role is kept, but the console stays on the login screen.
                if self.login.login(&email, &password).await.is_ok() {
                    self.screen = Screen::Home;
                }
            }
            Command::Logout => {
                if self.login.logout().is_ok() {
                    self.screen = Screen::Login;
                    println!("logged out");
                }
            }
            Command::Process { period } => {
                if !self.open(Screen::RiskBase) { return true; }
                let period = match period {
                    None => None,
                    Some((month, year)) => match Period::new(month, year) {
                        Some(p) => Some(p),
                        None => {
                            self.notifier.notify(AppError::InvalidPeriod { month, year }.notice());
                            return true;
                        }
                    },
                };
                if self.riskbase.process(period).await.is_ok() {
                    self.column_page = 0;
                    self.show();
                }
            }
            Command::Consult { month, year } => {
                if !self.open(Screen::RiskBase) { return true; }
                if self.riskbase.consult_by_period(month, year).await.is_ok() {
                    self.column_page = 0;
                    self.show();
                }
            }
            Command::Page(mv) => {
                if !self.open(Screen::RiskBase) { return true; }
                let result = match mv {
                    PageMove::Next => self.riskbase.next_page().await,
                    PageMove::Prev => self.riskbase.prev_page().await,
                    PageMove::To(n) => {
                        let limit = self.riskbase.view().map(|v| v.limit).unwrap_or(self.config.page_size);
                        self.riskbase.load_page(n.saturating_sub(1) * limit).await
                    }
                };
                if result.is_ok() { self.show(); }
            }
            Command::Columns(mv) => {
                let pages = column_pages(self.current_columns().len());
                self.column_page = match mv {
                    PageMove::Next => (self.column_page + 1).min(pages - 1),
                    PageMove::Prev => self.column_page.saturating_sub(1),
                    PageMove::To(n) => n.saturating_sub(1).min(pages - 1),
                };
                self.show();
            }
            Command::Show => self.show(),
            Command::Export => {
                if !self.open(Screen::RiskBase) { return true; }
                if let Ok(path) = self.riskbase.export_current().await {
                    println!("saved {}", path.display());
                }
            }
            Command::SaveDb => {
                if !self.open(Screen::RiskBase) { return true; }
                match self.riskbase.save_to_database().await {
                    Ok(SaveOutcome::Saved) => println!("risk base saved; the temporary file is gone"),
                    Ok(_) => println!("cancelled"),
                    Err(_) => {}
                }
            }
            Command::Matrices => {
                if let Ok(Navigation::Proceed(screen)) = self.matrices.mount().await {
                    self.screen = screen;
                    self.column_page = 0;
                    self.show();
                } else if !self.session.is_authenticated() {
                    println!("not logged in; use 'login <email> <password>'");
                }
            }
            Command::MatrixSet { id, column, value } => {
                if self.matrices_loaded() && self.matrices.set_cell(&id, &column, &value).is_ok() {
                    println!("row {} updated ({} pending)", id, self.matrices.diff_against_original().len());
                }
            }
            Command::MatrixDiff => {
                if self.matrices_loaded() {
                    let diff = self.matrices.diff_against_original();
                    if diff.is_empty() {
                        println!("no pending changes");
                    } else {
                        print_table(&self.matrices.columns(), &diff, self.column_page, |_| false);
                    }
                }
            }
            Command::MatrixSave => {
                if self.matrices_loaded() {
                    let outcome = self.matrices.save().await;
                    if !self.matrices.error_rows().is_empty() {
                        self.show();
                    }
                    if let Ok(SaveOutcome::Saved) = outcome {
                        println!("matrices saved");
                    }
                }
            }
            Command::Register(form) => {
                if !self.open(Screen::CreateUser) { return true; }
                if let Ok(user) = self.users.register(form).await {
                    println!("created {} <{}> role={}", user.username, user.email.unwrap_or_default(), user.role.unwrap_or_default());
                }
            }
        }
        true
    }

    /// Switch to `target` if the navigation guard lets us.
    fn open(&mut self, target: Screen) -> bool {
        let nav = if target == Screen::RiskBase { self.riskbase.mount() } else { navigate(&self.session, target) };
        match nav {
            Navigation::Proceed(screen) => {
                if self.screen != screen {
                    self.screen = screen;
                    self.column_page = 0;
                }
                true
            }
            Navigation::RedirectToLogin => {
                self.screen = Screen::Login;
                println!("not logged in; use 'login <email> <password>'");
                false
            }
            Navigation::Denied => {
                self.notifier.notify(AppError::PermissionDenied.notice());
                false
            }
        }
    }

    fn matrices_loaded(&self) -> bool {
        if self.screen == Screen::Matrices {
            return true;
        }
        println!("load the matrices first with 'matrices'");
        false
    }

    fn current_columns(&self) -> Vec<String> {
        match self.screen {
            Screen::RiskBase => self.riskbase.view().map(|v| v.columns().to_vec()).unwrap_or_default(),
            Screen::Matrices => self.matrices.columns(),
            _ => Vec::new(),
        }
    }

    fn show(&self) {
        match self.screen {
            Screen::RiskBase => match self.riskbase.view() {
                Some(view) => {
                    print_table(view.columns(), view.rows(), self.column_page, |_| false);
                    let (page, pages) = view.page();
                    let last = (view.offset + view.rows().len()).min(view.total);
                    println!(
                        "file {}: rows {}-{} of {} (page {}/{})",
                        view.temp_file, (view.offset + 1).min(last), last, view.total, page, pages
                    );
                }
                None => println!("no data loaded; use 'process' or 'consult <month> <year>'"),
            },
            Screen::Matrices => {
                let rows = self.matrices.rows();
                print_table(&self.matrices.columns(), &rows, self.column_page, |r| self.matrices.is_error_row(r));
                if !self.matrices.error_rows().is_empty() {
                    println!("rows marked '!' were rejected by the server");
                }
            }
            _ => println!("nothing to show"),
        }
    }

    fn print_status(&self) {
        println!("api: {}", self.config.api_url);
        match self.session.credential() {
            None => println!("session: not logged in"),
            Some(cred) => {
                let claims = AdminGuard::new(&self.session).claims();
                let who = claims.as_ref().and_then(|c| c.sub.clone()).unwrap_or_else(|| "?".into());
                let role = claims.as_ref().and_then(|c| c.role.clone()).unwrap_or_else(|| "none".into());
                let expiry = match claims.as_ref().and_then(|c| c.expires_at()) {
                    Some(t) if t <= Utc::now() => format!(", expired {}", t.format("%Y-%m-%d %H:%M UTC")),
                    Some(t) => format!(", expires {}", t.format("%Y-%m-%d %H:%M UTC")),
                    None => String::new(),
                };
                println!("session: {} (role {}, {} token{})", who, role, cred.token_type, expiry);
            }
        }
        println!("screen: {}", self.screen.as_str());
        let state = self.riskbase.state();
        match state.view() {
            Some(v) => println!("riskbase: {} file={} rows={}", state.name(), v.temp_file, v.total),
            None => println!("riskbase: {}", state.name()),
        }
        if let Some(err) = self.riskbase.last_error() {
            println!("last error: {} ({})", err, err.code_str());
        }
        if self.screen == Screen::Matrices {
            println!("matrices: {} rows, {} pending", self.matrices.rows().len(), self.matrices.diff_against_original().len());
        }
    }
}

fn redacted(cmd: &Command) -> Command {
    match cmd {
        Command::Login { email, .. } => Command::Login { email: email.clone(), password: "***".into() },
        Command::Register(u) => {
            let mut u = u.clone();
            u.password = "***".into();
            Command::Register(u)
        }
        other => other.clone(),
    }
}
