//! Terminal front end: command parsing, table rendering and a stdout/stdin notifier.

use std::io::{self, BufRead, Write};

use crate::notify::{Level, Notice, Notifier};

pub mod commands;
pub mod console;
pub mod table;

pub use commands::{parse_command, Command, PageMove, HELP};
pub use console::Console;
pub use table::{print_table, render_table, COLUMNS_PER_PAGE};

/// Prints notices with an ANSI-coloured title and asks confirmations as `[y/N]` on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier {
    /// Answer every confirmation with yes (one-shot `-y` mode).
    pub assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self { Self { assume_yes } }
}

pub fn format_notice(notice: &Notice) -> String {
    let color = match notice.level {
        Level::Info => "36",
        Level::Success => "32",
        Level::Warning => "33",
        Level::Error => "31",
    };
    format!("\x1b[{}m{}\x1b[0m {}", color, notice.title, notice.text)
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            Level::Error | Level::Warning => eprintln!("{}", format_notice(&notice)),
            Level::Info | Level::Success => println!("{}", format_notice(&notice)),
        }
    }

    fn confirm(&self, title: &str, text: &str) -> bool {
        println!("\x1b[33m{}\x1b[0m {}", title, text);
        if self.assume_yes {
            println!("[y/N] y (assumed)");
            return true;
        }
        print!("[y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí")
    }
}
