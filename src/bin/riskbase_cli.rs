//!
//! riskbase console
//! ----------------
//! Terminal front end for the risk-base administration API. Logs in, runs the
//! process/consult workflow, pages through the result, exports or persists it, edits
//! the policy matrices and creates users. The credential is kept in a small JSON file
//! so it survives between runs.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use riskbase_admin::api::HttpRiskApi;
use riskbase_admin::cli::{parse_command, Console, ConsoleNotifier, HELP};
use riskbase_admin::config::ClientConfig;
use riskbase_admin::identity::SessionStore;
use riskbase_admin::storage::FileKvStore;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api-url <url>] [--session-file <path>] [--download-dir <dir>] [--page-size <n>]\n  {program} -c \"<command>\" [-y] [flags]\n\nFlags:\n  --api-url <url>          Backend base URL (env RISKBASE_API_URL, default http://localhost:8000)\n  --session-file <path>    Where the credential is kept (env RISKBASE_SESSION_FILE, default .riskbase/session.json)\n  --download-dir <dir>     Where exports are written (env RISKBASE_DOWNLOAD_DIR, default .)\n  --page-size <n>          Rows fetched per page (env RISKBASE_PAGE_SIZE, default 25)\n  -c, --command <cmd>      Run one command and exit\n  -y, --yes                Answer confirmations with yes\n  -h, --help               Show this help\n\n{HELP}\n\nLogging:\n  RUST_LOG=riskbase=debug {program}"
    );
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "riskbase_cli".to_string() } else { args.remove(0) };

    let mut config = ClientConfig::from_env().context("reading RISKBASE_* environment")?;
    let rest = match config.apply_flags(args) {
        Ok(rest) => rest,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let mut one_shot: Option<String> = None;
    let mut assume_yes = false;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "-c" | "--command" => {
                if i + 1 >= rest.len() { eprintln!("{} requires a value", rest[i]); print_usage(&program); std::process::exit(2); }
                one_shot = Some(rest[i + 1].clone());
                i += 2;
            }
            "-y" | "--yes" => { assume_yes = true; i += 1; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let session = SessionStore::new(Arc::new(FileKvStore::new(config.session_file.clone())));
    let api = HttpRiskApi::new(&config.api_url, session.clone())?;
    let notifier = Arc::new(ConsoleNotifier::new(assume_yes));
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let mut console = Console::new(api, session, notifier, config);

    if let Some(line) = one_shot {
        match parse_command(&line) {
            Ok(Some(cmd)) => { rt.block_on(console.execute(cmd)); }
            Ok(None) => {}
            Err(e) => { eprintln!("{}", e); std::process::exit(2); }
        }
        return Ok(());
    }
    run_repl(&rt, &mut console)
}

fn run_repl(rt: &tokio::runtime::Runtime, console: &mut Console<HttpRiskApi>) -> Result<()> {
    let mut rl = DefaultEditor::new().context("initializing line editor")?;
    println!("riskbase console. Type 'help' for commands.");
    loop {
        let line = match rl.readline("riskbase> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => { eprintln!("{}", e); continue; }
        };
        // Credentials typed on the line are not kept in history.
        if !matches!(cmd, riskbase_admin::cli::Command::Login { .. } | riskbase_admin::cli::Command::Register(_)) {
            let _ = rl.add_history_entry(line.as_str());
        }
        if !rt.block_on(console.execute(cmd)) {
            break;
        }
    }
    Ok(())
}
