use super::{resolve_slug, with_spinner, Context, EXIT_SUCCESS};
use crate::EnvSelector;

/// `soft` keeps the instance directory so the environment can be started again.
pub fn run(ctx: &Context, selector: &EnvSelector, soft: bool) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let envs = ctx.environments();
    with_spinner(
        ctx.json,
        &format!("destroying environment {slug}..."),
        &format!("destroyed environment {slug}"),
        || envs.destroy(&slug, !soft).map_err(|e| e.to_string()),
    )?;
    if ctx.json {
        let summary = serde_json::json!({
            "slug": slug.as_str(),
            "status": "destroyed",
            "filesRemoved": !soft,
        });
        println!("{summary}");
    }
    Ok(EXIT_SUCCESS)
}
