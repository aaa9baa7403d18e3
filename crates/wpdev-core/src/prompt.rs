//! Interactive resolution of an `InstanceData`.
//!
//! Values come from three places in order of precedence: preselected flags,
//! answers to prompts (seeded from defaults), and built-in defaults.

use crate::CoreError;
use tracing::debug;
use wpdev_remote::VersionSource;
use wpdev_schema::component::is_usable_local_dir;
use wpdev_schema::defaults::{
    DEFAULT_ELASTICSEARCH_VERSION, DEFAULT_MARIADB_VERSION, DEFAULT_MULTISITE, DEFAULT_TITLE,
};
use wpdev_schema::{
    default_tag_index, extract_tag, process_component_option_input, resolve_path,
    tag_choices_from, Component, ComponentConfig, InstanceData, InstanceOptions, Slug,
};

/// The three kinds of question the flow asks.
pub trait Prompter {
    fn prompt_text(&mut self, message: &str, initial: &str) -> Result<String, CoreError>;

    fn prompt_boolean(&mut self, message: &str, initial: bool) -> Result<bool, CoreError>;

    /// Returns the index of the chosen entry.
    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        initial: usize,
    ) -> Result<usize, CoreError>;

    fn warn(&mut self, message: &str) {
        eprintln!("Warning: {message}");
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn component_option(options: &InstanceOptions, component: Component) -> &str {
    let value = match component {
        Component::Wordpress => &options.wordpress,
        Component::MuPlugins => &options.mu_plugins,
        Component::ClientCode => &options.client_code,
    };
    non_empty(value.as_ref()).unwrap_or("")
}

/// Version choices for the WordPress select, falling back to a static list.
pub fn tag_choices(source: &dyn VersionSource) -> Vec<String> {
    let versions = source.version_list().unwrap_or_else(|e| {
        debug!("could not fetch the WordPress version list: {e}");
        Vec::new()
    });
    tag_choices_from(&versions)
}

pub fn prompt_for_arguments(
    prompter: &mut dyn Prompter,
    versions: &dyn VersionSource,
    slug: &Slug,
    preselected: &InstanceOptions,
    defaults: &InstanceOptions,
) -> Result<InstanceData, CoreError> {
    debug!("provided preselected {preselected:?} and default {defaults:?}");

    let default_title = non_empty(defaults.title.as_ref());
    let wp_title = match non_empty(preselected.title.as_ref()) {
        Some(title) => title.to_owned(),
        None => prompter
            .prompt_text(
                "WordPress site title",
                default_title.unwrap_or(DEFAULT_TITLE),
            )?
            .trim()
            .to_owned(),
    };

    let multisite = match preselected.multisite {
        Some(multisite) => multisite,
        None => {
            let (message, initial) = match default_title {
                Some(title) => {
                    let is = defaults.multisite.unwrap_or(false);
                    let verdict = if is { "IS" } else { "is NOT" };
                    (format!("Multisite ({title} {verdict} multisite)"), is)
                }
                None => ("Multisite".to_owned(), DEFAULT_MULTISITE),
            };
            prompter.prompt_boolean(&message, initial)?
        }
    };

    let mut media_redirect_domain = non_empty(preselected.media_redirect_domain.as_ref())
        .unwrap_or("")
        .to_owned();
    if media_redirect_domain.is_empty() {
        if let Some(domain) = non_empty(defaults.media_redirect_domain.as_ref()) {
            let message =
                format!("Would you like to redirect to {domain} for missing media files?");
            if prompter.prompt_boolean(&message, true)? {
                media_redirect_domain = domain.to_owned();
            }
        }
    }

    let mut data = InstanceData {
        site_slug: slug.to_string(),
        wp_title,
        multisite,
        wordpress: ComponentConfig::image(),
        mu_plugins: ComponentConfig::image(),
        client_code: ComponentConfig::image(),
        statsd: preselected.statsd.or(defaults.statsd).unwrap_or(false),
        phpmyadmin: preselected.phpmyadmin.or(defaults.phpmyadmin).unwrap_or(false),
        xdebug: preselected.xdebug.or(defaults.xdebug).unwrap_or(false),
        elasticsearch: non_empty(preselected.elasticsearch.as_ref())
            .or(non_empty(defaults.elasticsearch.as_ref()))
            .unwrap_or(DEFAULT_ELASTICSEARCH_VERSION)
            .to_owned(),
        mariadb: non_empty(preselected.mariadb.as_ref())
            .or(non_empty(defaults.mariadb.as_ref()))
            .unwrap_or(DEFAULT_MARIADB_VERSION)
            .to_owned(),
        media_redirect_domain,
    };

    for component in Component::ALL {
        let resolved = process_component(
            prompter,
            versions,
            component,
            component_option(preselected, component),
            component_option(defaults, component),
        )?;
        *data.component_mut(component) = resolved;
    }

    debug!("instance data after prompts {data:?}");
    Ok(data)
}

/// Resolve one component, re-prompting until a local path is usable.
pub fn process_component(
    prompter: &mut dyn Prompter,
    versions: &dyn VersionSource,
    component: Component,
    preselected: &str,
    default: &str,
) -> Result<ComponentConfig, CoreError> {
    debug!("processing component {component} with preselected/default {preselected}/{default}");
    let allow_local = component.allows_local();
    let default_object =
        (!default.is_empty()).then(|| process_component_option_input(default, allow_local));

    let mut result = if preselected.is_empty() {
        prompt_for_component(prompter, versions, component, default_object.as_ref())?
    } else {
        process_component_option_input(preselected, allow_local)
    };

    while let ComponentConfig::Local { dir } = &result {
        let resolved = resolve_path(dir);
        if is_usable_local_dir(&resolved) {
            result = ComponentConfig::Local {
                dir: resolved.display().to_string(),
            };
            break;
        }
        prompter.warn(&format!(
            "Provided path \"{}\" does not point to a valid or existing directory.",
            resolved.display()
        ));
        result = prompt_for_component(prompter, versions, component, default_object.as_ref())?;
    }

    Ok(result)
}

pub fn prompt_for_component(
    prompter: &mut dyn Prompter,
    versions: &dyn VersionSource,
    component: Component,
    default_object: Option<&ComponentConfig>,
) -> Result<ComponentConfig, CoreError> {
    debug!("prompting for {component} with default {default_object:?}");
    let display = component.display_name();

    let mut modes = Vec::new();
    let mut labels = Vec::new();
    if component.allows_local() {
        modes.push("local");
        labels.push(format!(
            "local folder - where you already have {display} code"
        ));
    }
    modes.push("image");
    labels.push("image - that gets automatically fetched".to_owned());

    let initial_mode = match default_object {
        Some(config) => config.mode(),
        None if component == Component::ClientCode => "local",
        None => "image",
    };

    let select_mode = modes.len() > 1;
    let mode = if select_mode {
        let initial = modes.iter().position(|m| *m == initial_mode).unwrap_or(0);
        let chosen = prompter.prompt_select(
            &format!("How would you like to source {display}"),
            &labels,
            initial,
        )?;
        *modes
            .get(chosen)
            .ok_or_else(|| CoreError::Prompt(format!("no source mode at index {chosen}")))?
    } else {
        "image"
    };

    let prefix = if select_mode {
        "\t".to_owned()
    } else {
        format!("{display} - ")
    };

    if mode == "local" {
        let dir = prompter.prompt_text(
            &format!("{prefix}What is a path to your local {display}"),
            default_object.and_then(ComponentConfig::dir).unwrap_or(""),
        )?;
        return Ok(ComponentConfig::Local { dir });
    }

    if component == Component::Wordpress {
        // Choices carry padding; the prior tag is matched against trimmed text.
        let choices: Vec<String> = tag_choices(versions)
            .iter()
            .map(|c| c.trim().to_owned())
            .collect();
        let initial = default_tag_index(&choices, default_object.and_then(ComponentConfig::tag));
        let chosen = prompter.prompt_select(
            &format!("{prefix}Which version would you like"),
            &choices,
            initial,
        )?;
        let option = choices
            .get(chosen)
            .ok_or_else(|| CoreError::Prompt(format!("no version at index {chosen}")))?;
        let tag = extract_tag(option)?;
        return Ok(ComponentConfig::Image { tag: Some(tag) });
    }

    Ok(ComponentConfig::image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use wpdev_remote::RemoteError;
    use wpdev_schema::VersionRecord;

    #[derive(Debug)]
    enum Answer {
        Text(&'static str),
        Bool(bool),
        Select(usize),
        /// Accept whatever the prompt preselected.
        Default,
    }

    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<Answer>,
        asked: Vec<String>,
        initials: Vec<String>,
        warnings: Vec<String>,
    }

    impl Scripted {
        fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: answers.into(),
                ..Self::default()
            }
        }

        fn next(&mut self, message: &str, initial: String) -> Result<Answer, CoreError> {
            self.asked.push(message.to_owned());
            self.initials.push(initial);
            self.answers
                .pop_front()
                .ok_or_else(|| CoreError::Prompt(format!("unexpected prompt: {message}")))
        }
    }

    impl Prompter for Scripted {
        fn prompt_text(&mut self, message: &str, initial: &str) -> Result<String, CoreError> {
            match self.next(message, initial.to_owned())? {
                Answer::Text(t) => Ok(t.to_owned()),
                Answer::Default => Ok(initial.to_owned()),
                other => Err(CoreError::Prompt(format!("expected text, got {other:?}"))),
            }
        }

        fn prompt_boolean(&mut self, message: &str, initial: bool) -> Result<bool, CoreError> {
            match self.next(message, initial.to_string())? {
                Answer::Bool(b) => Ok(b),
                Answer::Default => Ok(initial),
                other => Err(CoreError::Prompt(format!("expected bool, got {other:?}"))),
            }
        }

        fn prompt_select(
            &mut self,
            message: &str,
            choices: &[String],
            initial: usize,
        ) -> Result<usize, CoreError> {
            let shown = choices.get(initial).cloned().unwrap_or_default();
            match self.next(message, shown)? {
                Answer::Select(i) => Ok(i),
                Answer::Default => Ok(initial),
                other => Err(CoreError::Prompt(format!("expected select, got {other:?}"))),
            }
        }

        fn warn(&mut self, message: &str) {
            self.warnings.push(message.to_owned());
        }
    }

    struct Versions(Vec<VersionRecord>);

    impl VersionSource for Versions {
        fn version_list(&self) -> Result<Vec<VersionRecord>, RemoteError> {
            Ok(self.0.clone())
        }
    }

    struct Offline;

    impl VersionSource for Offline {
        fn version_list(&self) -> Result<Vec<VersionRecord>, RemoteError> {
            Err(RemoteError::Http("connection refused".to_owned()))
        }
    }

    fn record(tag: &str, git_ref: &str, prerelease: bool) -> VersionRecord {
        VersionRecord {
            tag: tag.to_owned(),
            git_ref: git_ref.to_owned(),
            prerelease,
            locked: false,
            cacheable: true,
        }
    }

    fn slug() -> Slug {
        Slug::parse("site").unwrap()
    }

    fn fully_preselected() -> InstanceOptions {
        InstanceOptions {
            title: Some("Preset".to_owned()),
            multisite: Some(true),
            wordpress: Some("6.4".to_owned()),
            mu_plugins: Some("latest".to_owned()),
            client_code: Some("latest".to_owned()),
            statsd: Some(true),
            ..InstanceOptions::default()
        }
    }

    #[test]
    fn preselected_options_skip_every_prompt() {
        let mut prompter = Scripted::new(Vec::new());
        let data = prompt_for_arguments(
            &mut prompter,
            &Offline,
            &slug(),
            &fully_preselected(),
            &InstanceOptions::default(),
        )
        .unwrap();

        assert!(prompter.asked.is_empty());
        assert_eq!(data.site_slug, "site");
        assert_eq!(data.wp_title, "Preset");
        assert!(data.multisite);
        assert_eq!(data.wordpress.tag(), Some("6.4"));
        assert_eq!(data.mu_plugins.tag(), Some("latest"));
        assert!(data.statsd);
        assert!(!data.phpmyadmin);
        assert_eq!(data.elasticsearch, DEFAULT_ELASTICSEARCH_VERSION);
        assert_eq!(data.mariadb, DEFAULT_MARIADB_VERSION);
        assert_eq!(data.media_redirect_domain, "");
    }

    #[test]
    fn defaults_seed_prompts_and_services() {
        let preselected = InstanceOptions {
            wordpress: Some("6.4".to_owned()),
            mu_plugins: Some("latest".to_owned()),
            client_code: Some("latest".to_owned()),
            ..InstanceOptions::default()
        };
        let defaults = InstanceOptions {
            title: Some("Blog Production".to_owned()),
            multisite: Some(true),
            media_redirect_domain: Some("blog.example.com".to_owned()),
            phpmyadmin: Some(true),
            mariadb: Some("10.6".to_owned()),
            ..InstanceOptions::default()
        };
        let mut prompter =
            Scripted::new(vec![Answer::Default, Answer::Default, Answer::Bool(true)]);

        let data =
            prompt_for_arguments(&mut prompter, &Offline, &slug(), &preselected, &defaults)
                .unwrap();

        assert_eq!(prompter.initials[0], "Blog Production");
        assert_eq!(prompter.asked[1], "Multisite (Blog Production IS multisite)");
        assert!(data.multisite);
        assert_eq!(data.media_redirect_domain, "blog.example.com");
        assert!(data.phpmyadmin);
        assert_eq!(data.mariadb, "10.6");
    }

    #[test]
    fn declined_media_redirect_stays_empty() {
        let preselected = InstanceOptions {
            media_redirect_domain: None,
            ..fully_preselected()
        };
        let defaults = InstanceOptions {
            media_redirect_domain: Some("blog.example.com".to_owned()),
            ..InstanceOptions::default()
        };
        let mut prompter = Scripted::new(vec![Answer::Bool(false)]);
        let data =
            prompt_for_arguments(&mut prompter, &Offline, &slug(), &preselected, &defaults)
                .unwrap();
        assert_eq!(data.media_redirect_domain, "");
    }

    #[test]
    fn wordpress_select_defaults_to_first_stable() {
        let versions = Versions(vec![
            record("6.4", "6.4.3", false),
            record("6.5", "6.5-RC1", true),
        ]);
        let mut prompter = Scripted::new(vec![Answer::Default]);
        let config =
            prompt_for_component(&mut prompter, &versions, Component::Wordpress, None).unwrap();

        assert_eq!(prompter.asked[0], "WordPress - Which version would you like");
        assert_eq!(prompter.initials[0], "6.4   →  6.4.3");
        assert_eq!(config.tag(), Some("6.4"));
    }

    #[test]
    fn wordpress_falls_back_when_offline() {
        let mut prompter = Scripted::new(vec![Answer::Select(2)]);
        let config =
            prompt_for_component(&mut prompter, &Offline, Component::Wordpress, None).unwrap();
        assert_eq!(config.tag(), Some("5.7"));
    }

    #[test]
    fn prior_tag_is_preselected() {
        let mut prompter = Scripted::new(vec![Answer::Default]);
        let default = ComponentConfig::Image {
            tag: Some("5.6".to_owned()),
        };
        let config =
            prompt_for_component(&mut prompter, &Offline, Component::Wordpress, Some(&default))
                .unwrap();
        assert_eq!(config.tag(), Some("5.6"));
    }

    #[test]
    fn unparseable_version_choice_fails() {
        let versions = Versions(vec![record("trunk", "trunk", false)]);
        let mut prompter = Scripted::new(vec![Answer::Default]);
        let err = prompt_for_component(&mut prompter, &versions, Component::Wordpress, None)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid WordPress selection"));
    }

    #[test]
    fn client_code_defaults_to_local_mode() {
        let mut prompter = Scripted::new(vec![Answer::Default, Answer::Text("./site")]);
        let config =
            prompt_for_component(&mut prompter, &Offline, Component::ClientCode, None).unwrap();

        assert_eq!(prompter.asked[0], "How would you like to source site-code");
        assert!(prompter.initials[0].starts_with("local folder"));
        assert_eq!(prompter.asked[1], "\tWhat is a path to your local site-code");
        assert_eq!(config.dir(), Some("./site"));
    }

    #[test]
    fn mu_plugins_image_mode_has_no_tag() {
        let mut prompter = Scripted::new(vec![Answer::Default]);
        let config =
            prompt_for_component(&mut prompter, &Offline, Component::MuPlugins, None).unwrap();
        assert_eq!(config, ComponentConfig::image());
    }

    #[test]
    fn invalid_local_path_reprompts() {
        let mut prompter = Scripted::new(vec![Answer::Select(1)]);
        let config = process_component(
            &mut prompter,
            &Offline,
            Component::ClientCode,
            "/definitely/not/here",
            "",
        )
        .unwrap();

        assert_eq!(prompter.warnings.len(), 1);
        assert!(prompter.warnings[0].contains("/definitely/not/here"));
        assert_eq!(config, ComponentConfig::image());
    }

    #[test]
    fn empty_local_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();
        let mut prompter = Scripted::new(vec![Answer::Select(1)]);
        process_component(&mut prompter, &Offline, Component::MuPlugins, &path, "").unwrap();
        assert_eq!(prompter.warnings.len(), 1);
    }

    #[test]
    fn usable_local_dir_is_accepted_and_resolved() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plugin.php"), "<?php\n").unwrap();
        let input = format!("{}/./", dir.path().display());

        let mut prompter = Scripted::new(Vec::new());
        let config =
            process_component(&mut prompter, &Offline, Component::MuPlugins, &input, "").unwrap();

        assert!(prompter.warnings.is_empty());
        assert_eq!(config.dir(), Some(dir.path().display().to_string().as_str()));
    }

    #[test]
    fn wordpress_never_goes_local() {
        let mut prompter = Scripted::new(Vec::new());
        let config =
            process_component(&mut prompter, &Offline, Component::Wordpress, "/tmp/wp", "")
                .unwrap();
        assert_eq!(config.tag(), Some("/tmp/wp"));
    }
}
