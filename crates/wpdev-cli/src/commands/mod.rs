pub mod completions;
pub mod create;
pub mod destroy;
pub mod doctor;
pub mod exec;
pub mod info;
pub mod list;
pub mod man_pages;
pub mod rebuild;
pub mod start;
pub mod stop;
pub mod update;
pub mod validate_sql;
pub mod versions;

use crate::EnvSelector;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use wpdev_core::Environments;
use wpdev_remote::{ApiClient, ApiConfig};
use wpdev_runtime::{ContainerEngine, EnvStatus};
use wpdev_schema::{environment_name, Slug};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NOT_FOUND: u8 = 2;
pub const EXIT_VALIDATION: u8 = 3;

/// What every environment command needs from `main`.
pub struct Context {
    pub root: PathBuf,
    pub json: bool,
    pub engine: Box<dyn ContainerEngine>,
}

impl Context {
    pub fn environments(&self) -> Environments<'_> {
        Environments::new(&self.root, self.engine.as_ref())
    }
}

static ACTIVE_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_spinner() -> Option<ProgressBar> {
    ACTIVE_SPINNER.lock().ok().and_then(|guard| guard.clone())
}

fn set_active_spinner(pb: Option<ProgressBar>) {
    if let Ok(mut guard) = ACTIVE_SPINNER.lock() {
        *guard = pb;
    }
}

/// Stderr log writer that clears the running spinner before each line.
pub struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active_spinner() {
            Some(pb) => pb.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Runs `op` under a spinner unless JSON output was requested.
pub fn with_spinner<T>(
    json: bool,
    progress: &str,
    done: &str,
    op: impl FnOnce() -> Result<T, String>,
) -> Result<T, String> {
    if json {
        return op();
    }
    let pb = spinner(progress);
    set_active_spinner(Some(pb.clone()));
    let result = op();
    set_active_spinner(None);
    match result {
        Ok(value) => {
            spin_ok(&pb, done);
            Ok(value)
        }
        Err(e) => {
            spin_fail(&pb, progress.trim_end_matches("..."));
            Err(e)
        }
    }
}

pub fn colorize_status(status: EnvStatus) -> String {
    use console::Style;
    let text = status.to_string();
    match status {
        EnvStatus::Up => Style::new().green().bold().apply_to(text).to_string(),
        EnvStatus::Down => Style::new().dim().apply_to(text).to_string(),
    }
}

pub fn resolve_slug(selector: &EnvSelector) -> Result<Slug, String> {
    Slug::parse(environment_name(&selector.name_options())).map_err(|e| e.to_string())
}

pub fn api_client() -> Result<ApiClient, String> {
    let config = ApiConfig::load_default().map_err(|e| format!("API configuration: {e}"))?;
    Ok(ApiClient::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(slug: Option<&str>, app: Option<&str>, env: Option<&str>) -> EnvSelector {
        let mut args = vec!["wpdev".to_owned(), "info".to_owned()];
        for (flag, value) in [("--slug", slug), ("--app", app), ("--env", env)] {
            if let Some(v) = value {
                args.push(flag.to_owned());
                args.push(v.to_owned());
            }
        }
        use clap::Parser;
        match crate::Cli::try_parse_from(args).unwrap().command {
            crate::Commands::Info { selector } => selector,
            _ => unreachable!(),
        }
    }

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_status_keeps_text() {
        assert!(colorize_status(EnvStatus::Up).contains("UP"));
        assert!(colorize_status(EnvStatus::Down).contains("DOWN"));
    }

    #[test]
    fn slug_defaults_when_nothing_selected() {
        let slug = resolve_slug(&selector(None, None, None)).unwrap();
        assert_eq!(slug.as_str(), "vip-local");
    }

    #[test]
    fn slug_from_app_and_env() {
        let slug = resolve_slug(&selector(None, Some("blog"), Some("develop"))).unwrap();
        assert_eq!(slug.as_str(), "blog-develop");
    }

    #[test]
    fn explicit_slug_wins() {
        let slug = resolve_slug(&selector(Some("mine"), Some("blog"), None)).unwrap();
        assert_eq!(slug.as_str(), "mine");
    }

    #[test]
    fn invalid_slug_is_rejected() {
        let err = resolve_slug(&selector(Some("Not Valid"), None, None)).unwrap_err();
        assert!(err.contains("invalid environment slug"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_NOT_FOUND);
        assert_ne!(EXIT_NOT_FOUND, EXIT_VALIDATION);
    }

    #[test]
    fn spinner_lifecycle() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }

    #[test]
    fn with_spinner_passes_errors_through() {
        let err = with_spinner::<()>(true, "working...", "worked", || Err("nope".to_owned()))
            .unwrap_err();
        assert_eq!(err, "nope");
    }

    #[test]
    fn log_writer_sees_spinner_only_while_op_runs() {
        let seen = with_spinner(false, "working...", "worked", || {
            writeln!(LogWriter, "log line during spinner").map_err(|e| e.to_string())?;
            Ok(active_spinner().is_some())
        })
        .unwrap();
        assert!(seen);
        assert!(active_spinner().is_none());
        writeln!(LogWriter, "log line after spinner").unwrap();
    }
}
