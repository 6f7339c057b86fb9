//! Client configuration: defaults, then `RISKBASE_*` environment variables, then flags.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SESSION_FILE: &str = ".riskbase/session.json";
/// Row page size the backend data view uses when no limit is given.
pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_file: PathBuf,
    pub download_dir: PathBuf,
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            download_dir: PathBuf::from("."),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for the `RISKBASE_*` keys.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("RISKBASE_API_URL").filter(|v| !v.trim().is_empty()) { cfg.api_url = v.trim().to_string(); }
        if let Some(v) = lookup("RISKBASE_SESSION_FILE").filter(|v| !v.trim().is_empty()) { cfg.session_file = PathBuf::from(v.trim()); }
        if let Some(v) = lookup("RISKBASE_DOWNLOAD_DIR").filter(|v| !v.trim().is_empty()) { cfg.download_dir = PathBuf::from(v.trim()); }
        if let Some(v) = lookup("RISKBASE_PAGE_SIZE").filter(|v| !v.trim().is_empty()) {
            cfg.page_size = parse_page_size(&v).map_err(|e| anyhow!("RISKBASE_PAGE_SIZE: {}", e))?;
        }
        Ok(cfg)
    }

    /// Consume the recognized `--flag value` pairs from `args`, returning the leftovers in order.
    pub fn apply_flags(&mut self, args: Vec<String>) -> Result<Vec<String>> {
        let mut rest = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--api-url" | "--session-file" | "--download-dir" | "--page-size" => {
                    if i + 1 >= args.len() { bail!("{} requires a value", flag); }
                    let v = args[i + 1].clone();
                    match flag {
                        "--api-url" => self.api_url = v,
                        "--session-file" => self.session_file = PathBuf::from(v),
                        "--download-dir" => self.download_dir = PathBuf::from(v),
                        _ => self.page_size = parse_page_size(&v).map_err(|e| anyhow!("--page-size: {}", e))?,
                    }
                    i += 2;
                }
                _ => { rest.push(args[i].clone()); i += 1; }
            }
        }
        Ok(rest)
    }
}

fn parse_page_size(v: &str) -> Result<usize> {
    let n: usize = v.trim().parse().map_err(|_| anyhow!("'{}' is not a number", v))?;
    if n == 0 { bail!("must be at least 1"); }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.session_file, PathBuf::from(".riskbase/session.json"));
    }

    #[test]
    fn environment_then_flags() {
        let mut cfg = ClientConfig::from_lookup(lookup(&[
            ("RISKBASE_API_URL", "http://api.internal:9000"),
            ("RISKBASE_PAGE_SIZE", "50"),
            ("RISKBASE_DOWNLOAD_DIR", "  "),
        ])).unwrap();
        assert_eq!(cfg.api_url, "http://api.internal:9000");
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.download_dir, PathBuf::from("."));

        let rest = cfg.apply_flags(vec![
            "-c".into(), "status".into(), "--page-size".into(), "10".into(), "--api-url".into(), "http://x".into(),
        ]).unwrap();
        assert_eq!(rest, vec!["-c".to_string(), "status".to_string()]);
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.api_url, "http://x");
    }

    #[test]
    fn bad_page_size_is_rejected() {
        assert!(ClientConfig::from_lookup(lookup(&[("RISKBASE_PAGE_SIZE", "zero")])).is_err());
        let mut cfg = ClientConfig::default();
        assert!(cfg.apply_flags(vec!["--page-size".into(), "0".into()]).is_err());
        assert!(cfg.apply_flags(vec!["--session-file".into()]).is_err());
    }
}
