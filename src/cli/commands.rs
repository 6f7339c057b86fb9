use crate::api::NewUser;

#[derive(Debug, Clone, PartialEq)]
pub enum PageMove {
    Next,
    Prev,
    /// 1-based page number.
    To(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    Status,
    Process { period: Option<(u32, i32)> },
    Consult { month: u32, year: i32 },
    Page(PageMove),
    Columns(PageMove),
    Show,
    Export,
    SaveDb,
    Matrices,
    MatrixSet { id: String, column: String, value: String },
    MatrixDiff,
    MatrixSave,
    Register(NewUser),
    Help,
    Quit,
}

pub const HELP: &str = "Commands:
  login <email> <password>                     log in and store the credential
  logout                                       forget the stored credential
  status                                       show session and screen state
  process [<month> <year>]                     run the risk-base process, optionally for a period
  consult <month> <year>                       load the risk base of a period
  page next|prev|<n>                           move through the loaded rows
  columns next|prev|<n>                        move through the column pages
  show                                         print the current table
  export                                       download the loaded spreadsheet
  save-db                                      persist the loaded spreadsheet (admin)
  matrices                                     load the policy matrices (admin)
  matrix set <id> <column> <value>             edit factor_prov or clasificacion of a matrix row
  matrix diff                                  list the edited matrix rows
  matrix save                                  send the edited matrix rows
  register <username> <email> <password> <role> create a user (admin)
  help                                         show this help
  quit | exit                                  leave the console";

fn usage(text: &str) -> String { format!("usage: {}", text) }

fn parse_period(month: &str, year: &str) -> Result<(u32, i32), String> {
    let m = month.parse::<u32>().map_err(|_| format!("'{}' is not a month", month))?;
    let y = year.parse::<i32>().map_err(|_| format!("'{}' is not a year", year))?;
    Ok((m, y))
}

fn parse_move(arg: Option<&str>, what: &str) -> Result<PageMove, String> {
    match arg {
        Some("next") | Some("n") => Ok(PageMove::Next),
        Some("prev") | Some("p") => Ok(PageMove::Prev),
        Some(n) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(PageMove::To(n)),
            _ => Err(usage(&format!("{} next|prev|<n>", what))),
        },
        None => Err(usage(&format!("{} next|prev|<n>", what))),
    }
}

/// Parse one console line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(head) = parts.first() else { return Ok(None) };
    let cmd = match (head.to_ascii_lowercase().as_str(), &parts[1..]) {
        ("login", [email, password]) => Command::Login { email: email.to_string(), password: password.to_string() },
        ("login", _) => return Err(usage("login <email> <password>")),
        ("logout", []) => Command::Logout,
        ("status", []) => Command::Status,
        ("process", []) => Command::Process { period: None },
        ("process", [m, y]) => Command::Process { period: Some(parse_period(m, y)?) },
        ("process", _) => return Err(usage("process [<month> <year>]")),
        ("consult", [m, y]) => {
            let (month, year) = parse_period(m, y)?;
            Command::Consult { month, year }
        }
        ("consult", _) => return Err(usage("consult <month> <year>")),
        ("page", args) if args.len() <= 1 => Command::Page(parse_move(args.first().copied(), "page")?),
        ("columns", args) if args.len() <= 1 => Command::Columns(parse_move(args.first().copied(), "columns")?),
        ("show", []) => Command::Show,
        ("export", []) => Command::Export,
        ("save-db", []) => Command::SaveDb,
        ("matrices", []) => Command::Matrices,
        ("matrix", ["set", id, column, value @ ..]) if !value.is_empty() => Command::MatrixSet {
            id: id.to_string(),
            column: column.to_string(),
            value: value.join(" "),
        },
        ("matrix", ["diff"]) => Command::MatrixDiff,
        ("matrix", ["save"]) => Command::MatrixSave,
        ("matrix", _) => return Err(usage("matrix set <id> <column> <value> | matrix diff | matrix save")),
        ("register", [username, email, password, role]) => Command::Register(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        }),
        ("register", _) => return Err(usage("register <username> <email> <password> <role>")),
        ("help", _) | ("?", _) => Command::Help,
        ("quit", _) | ("exit", _) => Command::Quit,
        (other, _) => return Err(format!("unknown command '{}'; type 'help'", other)),
    };
    Ok(Some(cmd))
}
