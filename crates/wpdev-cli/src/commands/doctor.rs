use super::{Context, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use wpdev_core::{InstanceLock, InstanceStore};
use wpdev_remote::config::default_config_path;
use wpdev_remote::ApiConfig;
use wpdev_runtime::ContainerEngine;
use wpdev_schema::Slug;

pub fn run(ctx: &Context) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_engine(ctx.engine.as_ref(), &mut checks, &mut all_pass);
    check_config(&mut checks, &mut all_pass);

    if ctx.root.exists() {
        checks.push(Check::pass(
            "root_exists",
            &format!("Instance root {} exists", ctx.root.display()),
        ));
        check_root_writable(&ctx.root, &mut checks, &mut all_pass);
        check_instances(&InstanceStore::new(&ctx.root), &mut checks);
    } else {
        checks.push(Check::info(
            "root_exists",
            "Instance root not initialized (will be created on first create)",
        ));
    }

    print_results(&checks, all_pass, ctx.json)
}

fn check_engine(engine: &dyn ContainerEngine, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if engine.name() == "docker" {
        let missing = wpdev_runtime::check_docker_prereqs();
        if missing.is_empty() {
            checks.push(Check::pass("docker_prereqs", "Docker and Compose found"));
        } else {
            *all_pass = false;
            checks.push(Check::fail(
                "docker_prereqs",
                &format!(
                    "Missing prerequisites: {}",
                    wpdev_runtime::format_missing(&missing)
                ),
            ));
        }
    }

    if engine.available() {
        checks.push(Check::pass(
            "engine",
            &format!("Container engine '{}' is reachable", engine.name()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "engine",
            &format!("Container engine '{}' is not reachable", engine.name()),
        ));
    }
}

fn check_config(checks: &mut Vec<Check>, all_pass: &mut bool) {
    let path = match default_config_path() {
        Ok(path) => path,
        Err(e) => {
            checks.push(Check::warn("config", &format!("Cannot locate config: {e}")));
            return;
        }
    };
    if !path.exists() {
        checks.push(Check::info(
            "config",
            &format!("No config at {} (using defaults)", path.display()),
        ));
        return;
    }
    match ApiConfig::load(&path) {
        Ok(config) => {
            let auth = if config.auth_token.is_some() {
                "authenticated"
            } else {
                "anonymous"
            };
            checks.push(Check::pass(
                "config",
                &format!("Config OK ({}, {auth})", config.api_url),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("config", &format!("Config is invalid: {e}")));
        }
    }
}

fn check_root_writable(root: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match write_scratch_file(root) {
        Ok(()) => checks.push(Check::pass("root_writable", "Instance root is writable")),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "root_writable",
                &format!("Instance root is not writable: {e}"),
            ));
        }
    }
}

fn write_scratch_file(root: &Path) -> std::io::Result<()> {
    let scratch = root.join(".doctor-write-check");
    std::fs::write(&scratch, b"")?;
    std::fs::remove_file(&scratch)
}

fn check_instances(store: &InstanceStore, checks: &mut Vec<Check>) {
    let records = match store.list() {
        Ok(records) => records,
        Err(e) => {
            checks.push(Check::warn(
                "environments",
                &format!("Cannot list environments: {e}"),
            ));
            return;
        }
    };

    let mut busy = Vec::new();
    for record in &records {
        let Ok(slug) = Slug::parse(record.data.site_slug.clone()) else {
            continue;
        };
        if let Ok(None) = InstanceLock::try_acquire(&store.lock_path(&slug)) {
            busy.push(slug.to_string());
        }
    }

    checks.push(Check::info(
        "environments",
        &format!("{} environments", records.len()),
    ));
    if !busy.is_empty() {
        checks.push(Check::warn(
            "environment_locks",
            &format!("In use by another wpdev process: {}", busy.join(", ")),
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("wpdev doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdev_runtime::mock::MockEngine;

    #[test]
    fn mock_engine_passes_engine_check() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_engine(&MockEngine::new(), &mut checks, &mut all_pass);
        assert!(all_pass);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "engine");
    }

    #[test]
    fn writable_root_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_root_writable(dir.path(), &mut checks, &mut all_pass);
        assert!(all_pass);
        assert_eq!(checks[0].status, "pass");
        assert!(!dir.path().join(".doctor-write-check").exists());
    }

    #[test]
    fn empty_store_reports_zero_environments() {
        let dir = tempfile::tempdir().unwrap();
        let mut checks = Vec::new();
        check_instances(&InstanceStore::new(dir.path()), &mut checks);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].message.starts_with("0 environments"));
    }
}
