use super::{info::print_info, json_pretty, resolve_slug, with_spinner, Context, EXIT_SUCCESS};
use crate::EnvSelector;

pub fn run(ctx: &Context, selector: &EnvSelector) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let envs = ctx.environments();
    with_spinner(
        ctx.json,
        &format!("starting environment {slug}..."),
        &format!("started environment {slug}"),
        || envs.start(&slug).map_err(|e| e.to_string()),
    )?;

    let info = envs.info(&slug).map_err(|e| e.to_string())?;
    if ctx.json {
        println!("{}", json_pretty(&info)?);
    } else {
        println!();
        print_info(&info);
    }
    Ok(EXIT_SUCCESS)
}
