use super::{resolve_slug, with_spinner, Context, EXIT_SUCCESS};
use crate::EnvSelector;

pub fn run(ctx: &Context, selector: &EnvSelector) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let envs = ctx.environments();
    with_spinner(
        ctx.json,
        &format!("stopping environment {slug}..."),
        &format!("stopped environment {slug}"),
        || envs.stop(&slug).map_err(|e| e.to_string()),
    )?;
    if ctx.json {
        println!("{}", serde_json::json!({ "slug": slug.as_str(), "status": "stopped" }));
    }
    Ok(EXIT_SUCCESS)
}
