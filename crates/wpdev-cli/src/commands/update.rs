use super::{api_client, json_pretty, resolve_slug, Context, EXIT_SUCCESS};
use crate::prompt::prompter;
use crate::EnvSelector;
use wpdev_core::prompt_for_arguments;
use wpdev_schema::{environment_start_command, InstanceOptions};

/// Re-runs the prompts seeded with the stored configuration.
pub fn run(
    ctx: &Context,
    selector: &EnvSelector,
    preselected: &InstanceOptions,
) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let envs = ctx.environments();
    let current = envs.read(&slug).map_err(|e| e.to_string())?;
    let defaults = InstanceOptions::from_instance(&current.data);

    let client = api_client()?;
    let mut prompter = prompter();
    let data = prompt_for_arguments(prompter.as_mut(), &client, &slug, preselected, &defaults)
        .map_err(|e| e.to_string())?;
    let record = envs.update(&data).map_err(|e| e.to_string())?;

    if ctx.json {
        println!("{}", json_pretty(&record)?);
    } else {
        println!("updated environment {slug}");
        println!(
            "\nRestart it for the changes to take effect:\n\n{}\n",
            environment_start_command(&selector.name_options())
        );
    }
    Ok(EXIT_SUCCESS)
}
