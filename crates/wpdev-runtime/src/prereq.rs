use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn succeeds(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check everything the Docker engine binding shells out to.
/// An empty list means all prerequisites are met.
pub fn check_docker_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !succeeds("docker", &["--version"]) {
        missing.push(MissingPrereq {
            name: "docker",
            purpose: "running environment containers",
            install_hint: "https://docs.docker.com/engine/install/ or Docker Desktop",
        });
        return missing;
    }

    if !succeeds("docker", &["compose", "version"]) {
        missing.push(MissingPrereq {
            name: "docker compose",
            purpose: "managing multi-container environments",
            install_hint: "install the Compose v2 plugin (docker-compose-plugin)",
        });
    }

    if !succeeds("docker", &["info", "--format", "{{.ServerVersion}}"]) {
        missing.push(MissingPrereq {
            name: "docker daemon",
            purpose: "container lifecycle",
            install_hint: "start the Docker service or Docker Desktop",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nwpdev requires these tools to run local WordPress environments.");
    msg
}
