use super::{resolve_slug, Context, EXIT_SUCCESS};
use crate::EnvSelector;

pub fn run(
    ctx: &Context,
    selector: &EnvSelector,
    tool: &str,
    args: &[String],
) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    ctx.environments()
        .exec(&slug, tool, args)
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
