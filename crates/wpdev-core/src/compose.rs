//! Docker Compose file and app definition for one instance.
//!
//! Every instance gets its own compose project. Web-facing services join the
//! shared proxy network and carry Traefik router labels for
//! `<slug>.wpdev.localhost`; the rest stay on the project's default network.

use crate::CoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use wpdev_runtime::{AppDefinition, EngineConfig, ServiceInfo, Tool};
use wpdev_schema::{ComponentConfig, InstanceData, Slug};

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const DOMAIN_SUFFIX: &str = "wpdev.localhost";

const IMAGE_REGISTRY: &str = "ghcr.io/automattic/vip-container-images";
const PHP_IMAGE_TAG: &str = "8.0";
const MU_PLUGINS_IMAGE_TAG: &str = "0.1";
const CLIENT_CODE_IMAGE_TAG: &str = "latest";
const WP_ROOT: &str = "/wp";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, NamedVolume>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Network>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamedVolume {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Network {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Healthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

impl Healthcheck {
    fn shell(command: &str) -> Self {
        Self {
            test: vec!["CMD-SHELL".to_owned(), command.to_owned()],
            interval: "5s".to_owned(),
            timeout: "5s".to_owned(),
            retries: 12,
        }
    }
}

fn image(name: &str, tag: &str) -> String {
    format!("{IMAGE_REGISTRY}/{name}:{tag}")
}

fn site_host(slug: &Slug) -> String {
    format!("{slug}.{DOMAIN_SUFFIX}")
}

fn pma_host(slug: &Slug) -> String {
    format!("{slug}-pma.{DOMAIN_SUFFIX}")
}

/// Traefik labels routing `rule` to `port` of the labelled container.
fn router_labels(router: &str, rule: String, port: u16, network: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("traefik.enable".to_owned(), "true".to_owned()),
        ("traefik.docker.network".to_owned(), network.to_owned()),
        (format!("traefik.http.routers.{router}.rule"), rule),
        (
            format!("traefik.http.routers.{router}.entrypoints"),
            "web".to_owned(),
        ),
        (
            format!("traefik.http.services.{router}.loadbalancer.server.port"),
            port.to_string(),
        ),
    ])
}

/// Mounts shared by every container that sees the WordPress tree.
fn code_mounts(data: &InstanceData) -> Vec<String> {
    let mut mounts = vec![format!("wordpress:{WP_ROOT}")];
    match &data.mu_plugins {
        ComponentConfig::Local { dir } => {
            mounts.push(format!("{dir}:{WP_ROOT}/wp-content/mu-plugins"));
        }
        ComponentConfig::Image { .. } => {
            mounts.push(format!("mu-plugins:{WP_ROOT}/wp-content/mu-plugins"));
        }
    }
    match &data.client_code {
        ComponentConfig::Local { dir } => {
            for sub in ["client-mu-plugins", "images", "languages", "plugins", "themes"] {
                mounts.push(format!("{dir}/{sub}:{WP_ROOT}/wp-content/{sub}"));
            }
        }
        ComponentConfig::Image { .. } => {
            mounts.push(format!("client-code:{WP_ROOT}/wp-content/client-code"));
        }
    }
    mounts
}

/// Build the compose file for one instance.
pub fn compose_file(data: &InstanceData, engine: &EngineConfig) -> Result<ComposeFile, CoreError> {
    let slug = Slug::parse(data.site_slug.as_str())?;
    let proxy = engine.proxy_network.as_str();
    let mounts = code_mounts(data);
    let mut services = BTreeMap::new();
    let mut volumes = BTreeMap::from([
        ("wordpress".to_owned(), NamedVolume::default()),
        ("database_data".to_owned(), NamedVolume::default()),
    ]);

    services.insert(
        "database".to_owned(),
        ComposeService {
            image: format!("mariadb:{}", data.mariadb),
            environment: BTreeMap::from([
                ("MYSQL_ALLOW_EMPTY_PASSWORD".to_owned(), "yes".to_owned()),
                ("MYSQL_DATABASE".to_owned(), "wordpress".to_owned()),
                ("MYSQL_USER".to_owned(), "wordpress".to_owned()),
                ("MYSQL_PASSWORD".to_owned(), "wordpress".to_owned()),
            ]),
            volumes: vec!["database_data:/var/lib/mysql".to_owned()],
            ports: vec!["127.0.0.1::3306".to_owned()],
            healthcheck: Some(Healthcheck::shell("mysqladmin ping -h 127.0.0.1 --silent")),
            ..ComposeService::default()
        },
    );

    let wp_tag = data.wordpress.tag().unwrap_or("latest");
    services.insert(
        "wordpress".to_owned(),
        ComposeService {
            image: image("wordpress", wp_tag),
            volumes: vec![format!("wordpress:{WP_ROOT}")],
            ..ComposeService::default()
        },
    );

    if let ComponentConfig::Image { .. } = &data.mu_plugins {
        volumes.insert("mu-plugins".to_owned(), NamedVolume::default());
        services.insert(
            "mu-plugins".to_owned(),
            ComposeService {
                image: image("mu-plugins", MU_PLUGINS_IMAGE_TAG),
                volumes: vec!["mu-plugins:/shared".to_owned()],
                ..ComposeService::default()
            },
        );
    }

    if let ComponentConfig::Image { .. } = &data.client_code {
        volumes.insert("client-code".to_owned(), NamedVolume::default());
        services.insert(
            "client-code".to_owned(),
            ComposeService {
                image: image("skeleton", CLIENT_CODE_IMAGE_TAG),
                volumes: vec!["client-code:/clientcode".to_owned()],
                ..ComposeService::default()
            },
        );
    }

    let mut php_env = BTreeMap::from([
        ("WORDPRESS_DB_HOST".to_owned(), "database".to_owned()),
        ("WORDPRESS_DB_NAME".to_owned(), "wordpress".to_owned()),
        ("WORDPRESS_DB_USER".to_owned(), "wordpress".to_owned()),
        ("WORDPRESS_DB_PASSWORD".to_owned(), "wordpress".to_owned()),
        ("WP_TITLE".to_owned(), data.wp_title.clone()),
        ("WP_MULTISITE".to_owned(), data.multisite.to_string()),
        ("WP_HOME".to_owned(), format!("http://{}", site_host(&slug))),
        (
            "XDEBUG".to_owned(),
            if data.xdebug { "enable" } else { "disable" }.to_owned(),
        ),
    ]);
    if data.statsd {
        php_env.insert("STATSD_HOST".to_owned(), "statsd".to_owned());
    }
    php_env.insert(
        "ES_HOST".to_owned(),
        "http://elasticsearch:9200".to_owned(),
    );

    let mut php_depends = vec!["database".to_owned(), "wordpress".to_owned()];
    if data.statsd {
        php_depends.push("statsd".to_owned());
    }

    let php_image = image("php-fpm", PHP_IMAGE_TAG);
    services.insert(
        "php".to_owned(),
        ComposeService {
            image: php_image.clone(),
            environment: php_env.clone(),
            volumes: mounts.clone(),
            depends_on: php_depends,
            ..ComposeService::default()
        },
    );

    services.insert(
        "cli".to_owned(),
        ComposeService {
            image: php_image,
            command: Some(vec!["sleep".to_owned(), "infinity".to_owned()]),
            user: Some("www-data".to_owned()),
            environment: php_env,
            volumes: mounts.clone(),
            depends_on: vec!["database".to_owned()],
            ..ComposeService::default()
        },
    );

    let host = site_host(&slug);
    let rule = if data.multisite {
        format!("Host(`{host}`) || HostRegexp(`{{subdomain:[a-z0-9-]+}}.{host}`)")
    } else {
        format!("Host(`{host}`)")
    };
    let mut nginx_env = BTreeMap::new();
    if !data.media_redirect_domain.is_empty() {
        nginx_env.insert(
            "MEDIA_REDIRECT_URL".to_owned(),
            format!("https://{}", data.media_redirect_domain),
        );
    }
    services.insert(
        "nginx".to_owned(),
        ComposeService {
            image: image("nginx", "latest"),
            environment: nginx_env,
            volumes: mounts,
            depends_on: vec!["php".to_owned()],
            networks: vec!["default".to_owned(), proxy.to_owned()],
            labels: router_labels(&slug.project_name(), rule, 80, proxy),
            ..ComposeService::default()
        },
    );

    if data.statsd {
        services.insert(
            "statsd".to_owned(),
            ComposeService {
                image: image("statsd", "0.1"),
                ..ComposeService::default()
            },
        );
    }

    if data.phpmyadmin {
        services.insert(
            "phpmyadmin".to_owned(),
            ComposeService {
                image: "phpmyadmin:5".to_owned(),
                environment: BTreeMap::from([
                    ("PMA_HOST".to_owned(), "database".to_owned()),
                    ("PMA_USER".to_owned(), "root".to_owned()),
                ]),
                depends_on: vec!["database".to_owned()],
                networks: vec!["default".to_owned(), proxy.to_owned()],
                labels: router_labels(
                    &format!("{}-pma", slug.project_name()),
                    format!("Host(`{}`)", pma_host(&slug)),
                    80,
                    proxy,
                ),
                ..ComposeService::default()
            },
        );
    }

    volumes.insert("search_data".to_owned(), NamedVolume::default());
    services.insert(
        "elasticsearch".to_owned(),
        ComposeService {
            image: format!("elasticsearch:{}", data.elasticsearch),
            environment: BTreeMap::from([
                ("discovery.type".to_owned(), "single-node".to_owned()),
                ("ES_JAVA_OPTS".to_owned(), "-Xms512m -Xmx512m".to_owned()),
                ("xpack.security.enabled".to_owned(), "false".to_owned()),
            ]),
            volumes: vec!["search_data:/usr/share/elasticsearch/data".to_owned()],
            ports: vec!["127.0.0.1::9200".to_owned()],
            healthcheck: Some(Healthcheck::shell(
                "curl --silent --fail localhost:9200/_cluster/health || exit 1",
            )),
            ..ComposeService::default()
        },
    );

    let networks = BTreeMap::from([(
        proxy.to_owned(),
        Network {
            external: true,
            name: Some(proxy.to_owned()),
        },
    )]);

    Ok(ComposeFile {
        services,
        volumes,
        networks,
    })
}

/// The engine-facing description of an instance: URLs and tooling.
pub fn app_definition(data: &InstanceData) -> Result<AppDefinition, CoreError> {
    let slug = Slug::parse(data.site_slug.as_str())?;
    let host = site_host(&slug);

    let mut services = vec![
        ServiceInfo {
            service: "nginx".to_owned(),
            urls: vec![format!("http://{host}"), format!("http://{host}/wp-admin/")],
        },
        ServiceInfo {
            service: "php".to_owned(),
            urls: Vec::new(),
        },
        ServiceInfo {
            service: "database".to_owned(),
            urls: Vec::new(),
        },
    ];
    if data.phpmyadmin {
        services.push(ServiceInfo {
            service: "phpmyadmin".to_owned(),
            urls: vec![format!("http://{}", pma_host(&slug))],
        });
    }
    if data.statsd {
        services.push(ServiceInfo {
            service: "statsd".to_owned(),
            urls: Vec::new(),
        });
    }
    services.push(ServiceInfo {
        service: "elasticsearch".to_owned(),
        urls: Vec::new(),
    });

    let tooling = BTreeMap::from([
        (
            "wp".to_owned(),
            Tool {
                service: "cli".to_owned(),
                command: vec!["wp".to_owned()],
                user: Some("www-data".to_owned()),
                description: Some("Run WP-CLI commands".to_owned()),
            },
        ),
        (
            "db".to_owned(),
            Tool {
                service: "database".to_owned(),
                command: vec![
                    "mysql".to_owned(),
                    "-uroot".to_owned(),
                    "wordpress".to_owned(),
                ],
                user: None,
                description: Some("Open a MySQL shell".to_owned()),
            },
        ),
        (
            "shell".to_owned(),
            Tool {
                service: "php".to_owned(),
                command: vec!["bash".to_owned()],
                user: Some("www-data".to_owned()),
                description: Some("Open a shell in the PHP container".to_owned()),
            },
        ),
    ]);

    Ok(AppDefinition {
        name: slug.to_string(),
        project: slug.project_name(),
        compose_file: COMPOSE_FILE.to_owned(),
        services,
        tooling,
    })
}

/// Write `docker-compose.yml` and the app definition into `dir`.
pub fn write_instance_files(
    dir: &Path,
    data: &InstanceData,
    engine: &EngineConfig,
) -> Result<(), CoreError> {
    let compose = compose_file(data, engine)?;
    let yaml = serde_yaml::to_string(&compose)?;
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(COMPOSE_FILE), yaml)?;
    app_definition(data)?.write(dir)?;
    tracing::debug!("wrote compose project into {}", dir.display());
    Ok(())
}
