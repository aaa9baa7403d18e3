use super::{colorize_status, json_pretty, Context, EXIT_SUCCESS};

pub fn run(ctx: &Context) -> Result<u8, String> {
    let envs = ctx.environments().list().map_err(|e| e.to_string())?;
    if ctx.json {
        println!("{}", json_pretty(&envs)?);
    } else if envs.is_empty() {
        println!("no environments found");
    } else {
        println!("{:<20} {:<24} {:<10} {:<6} WORDPRESS", "SLUG", "TITLE", "MULTISITE", "STATUS");
        for env in &envs {
            println!(
                "{:<20} {:<24} {:<10} {:<6} {}",
                env.slug,
                env.title,
                if env.multisite { "yes" } else { "no" },
                colorize_status(env.status),
                env.wordpress
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
