use serde::{Deserialize, Serialize};

/// Where a component's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ComponentConfig {
    Local {
        dir: String,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    },
}

impl ComponentConfig {
    pub fn image() -> Self {
        ComponentConfig::Image { tag: None }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ComponentConfig::Local { .. })
    }

    pub fn mode(&self) -> &'static str {
        match self {
            ComponentConfig::Local { .. } => "local",
            ComponentConfig::Image { .. } => "image",
        }
    }

    pub fn dir(&self) -> Option<&str> {
        match self {
            ComponentConfig::Local { dir } => Some(dir),
            ComponentConfig::Image { .. } => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ComponentConfig::Image { tag } => tag.as_deref(),
            ComponentConfig::Local { .. } => None,
        }
    }
}

/// Options collected from CLI flags, or used as prompt defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multisite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wordpress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu_plugins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statsd: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phpmyadmin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xdebug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mariadb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_redirect_domain: Option<String>,
}

impl InstanceOptions {
    /// Options equivalent to an already-resolved record, used as defaults on update.
    pub fn from_instance(data: &InstanceData) -> Self {
        let component = |c: &ComponentConfig| match c {
            ComponentConfig::Local { dir } => Some(dir.clone()),
            ComponentConfig::Image { tag } => tag.clone(),
        };
        Self {
            title: Some(data.wp_title.clone()),
            multisite: Some(data.multisite),
            wordpress: component(&data.wordpress),
            mu_plugins: component(&data.mu_plugins),
            client_code: component(&data.client_code),
            statsd: Some(data.statsd),
            phpmyadmin: Some(data.phpmyadmin),
            xdebug: Some(data.xdebug),
            elasticsearch: Some(data.elasticsearch.clone()),
            mariadb: Some(data.mariadb.clone()),
            media_redirect_domain: Some(data.media_redirect_domain.clone())
                .filter(|d| !d.is_empty()),
        }
    }
}

/// The resolved configuration of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceData {
    pub site_slug: String,
    pub wp_title: String,
    pub multisite: bool,
    pub wordpress: ComponentConfig,
    pub mu_plugins: ComponentConfig,
    pub client_code: ComponentConfig,
    pub statsd: bool,
    pub phpmyadmin: bool,
    pub xdebug: bool,
    pub elasticsearch: String,
    pub mariadb: String,
    #[serde(default)]
    pub media_redirect_domain: String,
}

impl InstanceData {
    pub fn component(&self, component: crate::Component) -> &ComponentConfig {
        match component {
            crate::Component::Wordpress => &self.wordpress,
            crate::Component::MuPlugins => &self.mu_plugins,
            crate::Component::ClientCode => &self.client_code,
        }
    }

    pub fn component_mut(&mut self, component: crate::Component) -> &mut ComponentConfig {
        match component {
            crate::Component::Wordpress => &mut self.wordpress,
            crate::Component::MuPlugins => &mut self.mu_plugins,
            crate::Component::ClientCode => &mut self.client_code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEnvironment {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub env_type: Option<String>,
    #[serde(default)]
    pub primary_domain: Option<String>,
    #[serde(default)]
    pub is_multisite: bool,
}

/// Application record as returned by the hosting API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub environment: Option<AppEnvironment>,
}

/// Prompt defaults derived from a remote application.
pub fn options_from_app_info(app: &AppInfo) -> InstanceOptions {
    let env = app.environment.as_ref();
    let title = env
        .and_then(|e| e.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| app.name.clone())
        .unwrap_or_default();
    InstanceOptions {
        title: Some(title),
        multisite: Some(env.is_some_and(|e| e.is_multisite)),
        media_redirect_domain: env.and_then(|e| e.primary_domain.clone()),
        ..InstanceOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InstanceData {
        InstanceData {
            site_slug: "vip-local".to_owned(),
            wp_title: "Dev".to_owned(),
            multisite: true,
            wordpress: ComponentConfig::Image {
                tag: Some("6.4".to_owned()),
            },
            mu_plugins: ComponentConfig::image(),
            client_code: ComponentConfig::Local {
                dir: "/srv/code".to_owned(),
            },
            statsd: false,
            phpmyadmin: true,
            xdebug: false,
            elasticsearch: "7.10.1".to_owned(),
            mariadb: "10.3".to_owned(),
            media_redirect_domain: String::new(),
        }
    }

    #[test]
    fn component_config_wire_format() {
        let local = serde_json::to_value(ComponentConfig::Local {
            dir: "/x".to_owned(),
        })
        .unwrap();
        assert_eq!(local, serde_json::json!({"mode": "local", "dir": "/x"}));

        let bare = serde_json::to_value(ComponentConfig::image()).unwrap();
        assert_eq!(bare, serde_json::json!({"mode": "image"}));

        let parsed: ComponentConfig =
            serde_json::from_str(r#"{"mode":"image","tag":"5.9"}"#).unwrap();
        assert_eq!(parsed.tag(), Some("5.9"));
        assert_eq!(parsed.dir(), None);
    }

    #[test]
    fn instance_data_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["siteSlug"], "vip-local");
        assert_eq!(json["wpTitle"], "Dev");
        assert_eq!(json["muPlugins"]["mode"], "image");
        assert_eq!(json["clientCode"]["dir"], "/srv/code");
    }

    #[test]
    fn options_from_instance_preserves_components() {
        let opts = InstanceOptions::from_instance(&sample());
        assert_eq!(opts.wordpress.as_deref(), Some("6.4"));
        assert_eq!(opts.mu_plugins, None);
        assert_eq!(opts.client_code.as_deref(), Some("/srv/code"));
        assert_eq!(opts.media_redirect_domain, None);
        assert_eq!(opts.phpmyadmin, Some(true));
    }

    #[test]
    fn app_info_prefers_environment_name() {
        let app = AppInfo {
            id: Some(1),
            name: Some("app".to_owned()),
            environment: Some(AppEnvironment {
                name: Some("Production".to_owned()),
                is_multisite: true,
                primary_domain: Some("example.com".to_owned()),
                ..AppEnvironment::default()
            }),
        };
        let opts = options_from_app_info(&app);
        assert_eq!(opts.title.as_deref(), Some("Production"));
        assert_eq!(opts.multisite, Some(true));
        assert_eq!(opts.media_redirect_domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn app_info_without_environment() {
        let app = AppInfo {
            name: Some("app".to_owned()),
            ..AppInfo::default()
        };
        let opts = options_from_app_info(&app);
        assert_eq!(opts.title.as_deref(), Some("app"));
        assert_eq!(opts.multisite, Some(false));
        assert_eq!(opts.media_redirect_domain, None);
    }
}
