use crate::instance::ComponentConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component as PathComponent, Path, PathBuf};

/// A pluggable source of code mounted into the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Wordpress,
    MuPlugins,
    ClientCode,
}

impl Component {
    /// Resolution order used by the prompt flow.
    pub const ALL: [Component; 3] = [
        Component::Wordpress,
        Component::MuPlugins,
        Component::ClientCode,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Component::Wordpress => "WordPress",
            Component::MuPlugins => "mu-plugins",
            Component::ClientCode => "site-code",
        }
    }

    /// WordPress core always comes from an image.
    pub fn allows_local(self) -> bool {
        !matches!(self, Component::Wordpress)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Wordpress => f.write_str("wordpress"),
            Component::MuPlugins => f.write_str("mu-plugins"),
            Component::ClientCode => f.write_str("client-code"),
        }
    }
}

/// Interpret a raw `--wordpress`/`--mu-plugins`/`--client-code` value.
///
/// Anything containing a path separator is a local directory when local
/// sourcing is allowed. Otherwise the value is an image tag, which only
/// WordPress honors: components that may be local run a fixed image.
pub fn process_component_option_input(value: &str, allow_local: bool) -> ComponentConfig {
    if !allow_local {
        return ComponentConfig::Image {
            tag: Some(value.to_owned()),
        };
    }

    if value.contains('/') {
        ComponentConfig::Local {
            dir: value.to_owned(),
        }
    } else {
        ComponentConfig::image()
    }
}

/// Expand a leading `~` and make the path absolute against the current directory.
pub fn resolve_path(input: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    resolve_path_from(input, home.as_deref(), &cwd)
}

pub fn resolve_path_from(input: &str, home: Option<&Path>, cwd: &Path) -> PathBuf {
    let expanded = match (input.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(input),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    normalize(&absolute)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A local component directory must exist, be a directory, and hold at least one entry.
pub fn is_usable_local_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
