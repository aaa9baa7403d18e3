use super::{colorize_status, json_pretty, resolve_slug, Context, EXIT_SUCCESS};
use crate::EnvSelector;
use wpdev_runtime::InstanceInfo;

pub fn print_info(info: &InstanceInfo) {
    println!("name:        {}", info.name);
    println!("status:      {}", colorize_status(info.status));
    println!("location:    {}", info.location);
    println!("services:    {}", info.services.join(", "));
    for (service, urls) in &info.urls {
        for url in urls {
            println!("  {service:<12} {url}");
        }
    }
    for (label, connection) in &info.extra_services {
        println!("  {label:<12} {connection}");
    }
}

pub fn run(ctx: &Context, selector: &EnvSelector) -> Result<u8, String> {
    let slug = resolve_slug(selector)?;
    let info = ctx.environments().info(&slug).map_err(|e| e.to_string())?;
    if ctx.json {
        println!("{}", json_pretty(&info)?);
    } else {
        print_info(&info);
    }
    Ok(EXIT_SUCCESS)
}
