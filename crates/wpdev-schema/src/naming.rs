use crate::defaults::{CLI_NAME, DEFAULT_SLUG};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentNameOptions {
    pub slug: Option<String>,
    pub app: Option<String>,
    pub env: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Lowercases an app or env name and maps anything outside `[a-z0-9-]` to `-`.
fn slug_part(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Slug wins, then `app[-env]`, then the fixed default.
///
/// An explicit slug is returned verbatim; names derived from `app`/`env` are
/// normalized so they form a valid slug.
pub fn environment_name(options: &EnvironmentNameOptions) -> String {
    if let Some(slug) = non_empty(options.slug.as_ref()) {
        return slug.to_owned();
    }

    if let Some(app) = non_empty(options.app.as_ref()) {
        return match non_empty(options.env.as_ref()) {
            Some(env) => format!("{}-{}", slug_part(app), slug_part(env)),
            None => slug_part(app),
        };
    }

    DEFAULT_SLUG.to_owned()
}

/// The command a user should run to start the named environment.
pub fn environment_start_command(options: &EnvironmentNameOptions) -> String {
    if let Some(slug) = non_empty(options.slug.as_ref()) {
        return format!("{CLI_NAME} start --slug {slug}");
    }

    if let Some(app) = non_empty(options.app.as_ref()) {
        return match non_empty(options.env.as_ref()) {
            Some(env) => format!("{CLI_NAME} start --app {app} --env {env}"),
            None => format!("{CLI_NAME} start --app {app}"),
        };
    }

    format!("{CLI_NAME} start")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(slug: Option<&str>, app: Option<&str>, env: Option<&str>) -> EnvironmentNameOptions {
        EnvironmentNameOptions {
            slug: slug.map(str::to_owned),
            app: app.map(str::to_owned),
            env: env.map(str::to_owned),
        }
    }

    #[test]
    fn slug_takes_precedence() {
        assert_eq!(environment_name(&opts(Some("x"), Some("a"), Some("e"))), "x");
    }

    #[test]
    fn app_and_env_are_joined() {
        assert_eq!(environment_name(&opts(None, Some("a"), Some("e"))), "a-e");
        assert_eq!(environment_name(&opts(None, Some("a"), None)), "a");
    }

    #[test]
    fn app_derived_names_are_normalized() {
        assert_eq!(
            environment_name(&opts(None, Some("My_App"), Some("Develop"))),
            "my-app-develop"
        );
        assert_eq!(environment_name(&opts(None, Some("Blog.v2"), None)), "blog-v2");
        assert!(crate::Slug::parse(environment_name(&opts(None, Some("My_App"), None))).is_ok());
    }

    #[test]
    fn explicit_slug_is_not_normalized() {
        assert_eq!(environment_name(&opts(Some("My_Site"), None, None)), "My_Site");
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(environment_name(&EnvironmentNameOptions::default()), "vip-local");
    }

    #[test]
    fn empty_strings_count_as_absent() {
        assert_eq!(environment_name(&opts(Some(""), Some("a"), Some(""))), "a");
    }

    #[test]
    fn start_command_variants() {
        assert_eq!(
            environment_start_command(&opts(Some("x"), None, None)),
            "wpdev start --slug x"
        );
        assert_eq!(
            environment_start_command(&opts(None, Some("a"), Some("e"))),
            "wpdev start --app a --env e"
        );
        assert_eq!(
            environment_start_command(&EnvironmentNameOptions::default()),
            "wpdev start"
        );
    }
}
