use super::{api_client, EXIT_SUCCESS};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use wpdev_core::{validate_lines, LineValidation, SiteTypeValidation, ValidationParams};

/// Checks a dump against the site type of the destination environment.
pub fn run(file: &Path, app: &str, env: Option<&str>) -> Result<u8, String> {
    let dump = File::open(file)
        .map_err(|e| format!("failed to open SQL dump {}: {e}", file.display()))?;
    let client = api_client()?;
    let params = ValidationParams {
        app_id: app.to_owned(),
        env_id: env.map(str::to_owned),
    };

    let mut site_type = SiteTypeValidation::new();
    let mut validations: [&mut dyn LineValidation; 1] = [&mut site_type];
    let lines = validate_lines(
        BufReader::new(dump),
        &mut validations,
        &params,
        &client,
        &client,
    )
    .map_err(|e| e.to_string())?;

    info!("validated {lines} lines of {}", file.display());
    println!(
        "✓ {} is compatible with {app}{} ({lines} lines checked)",
        file.display(),
        env.map(|e| format!(" ({e})")).unwrap_or_default()
    );
    Ok(EXIT_SUCCESS)
}
