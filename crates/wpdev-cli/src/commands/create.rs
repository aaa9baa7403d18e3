use super::{api_client, json_pretty, resolve_slug, Context, EXIT_SUCCESS};
use crate::prompt::{is_interactive, prompter};
use crate::EnvSelector;
use tracing::debug;
use wpdev_core::prompt_for_arguments;
use wpdev_remote::{ApiClient, SiteMeta};
use wpdev_schema::defaults::PROMPT_INTRO;
use wpdev_schema::{environment_start_command, options_from_app_info, InstanceOptions};

/// Prompt defaults seeded from the hosted application, when one is named.
pub fn app_defaults(
    client: &ApiClient,
    selector: &EnvSelector,
) -> Result<InstanceOptions, String> {
    let names = selector.name_options();
    let Some(app) = names.app.as_deref().filter(|a| !a.is_empty()) else {
        return Ok(InstanceOptions::default());
    };
    let info = client
        .app_info(app, names.env.as_deref())
        .map_err(|e| format!("failed to fetch application '{app}': {e}"))?;
    debug!("application info {info:?}");
    Ok(options_from_app_info(&info))
}

pub fn run(
    ctx: &Context,
    selector: &EnvSelector,
    preselected: &InstanceOptions,
) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let start_command = environment_start_command(&selector.name_options());
    let envs = ctx.environments();
    if envs.exists(&slug) {
        return Err(format!(
            "Environment already exists.\n\n\nTo start the environment run:\n\n{start_command}\n"
        ));
    }

    let client = api_client()?;
    let defaults = app_defaults(&client, selector)?;

    if is_interactive() && !ctx.json {
        println!("{PROMPT_INTRO}");
    }
    let mut prompter = prompter();
    let data = prompt_for_arguments(prompter.as_mut(), &client, &slug, preselected, &defaults)
        .map_err(|e| e.to_string())?;
    let record = envs.create(&data).map_err(|e| e.to_string())?;

    if ctx.json {
        println!("{}", json_pretty(&record)?);
    } else {
        println!("created environment {slug}");
        println!("\nTo start it please run:\n\n{start_command}\n");
    }
    Ok(EXIT_SUCCESS)
}
