use super::{api_client, json_pretty, EXIT_SUCCESS};
use wpdev_remote::VersionSource;
use wpdev_schema::tag_choices_from;

pub fn run(json: bool) -> Result<u8, String> {
    let client = api_client()?;
    let versions = client
        .version_list()
        .map_err(|e| format!("failed to fetch the WordPress version list: {e}"))?;
    if json {
        println!("{}", json_pretty(&versions)?);
    } else if versions.is_empty() {
        println!("no WordPress versions published");
    } else {
        for choice in tag_choices_from(&versions) {
            println!("{}", choice.trim_end());
        }
    }
    Ok(EXIT_SUCCESS)
}
