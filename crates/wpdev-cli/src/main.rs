mod commands;
mod prompt;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::{Context, EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_VALIDATION};
use std::path::PathBuf;
use std::process::ExitCode;
use wpdev_core::ValidationError;
use wpdev_runtime::EngineConfig;
use wpdev_schema::defaults::{CLI_NAME, ENVIRONMENT_NOT_FOUND};
use wpdev_schema::{EnvironmentNameOptions, InstanceOptions};

const ENGINE_VAR: &str = "WPDEV_ENGINE";
const SKIP_PREREQS_VAR: &str = "WPDEV_SKIP_PREREQS";

#[derive(Debug, Parser)]
#[command(
    name = "wpdev",
    version,
    about = "Local WordPress development environments on Docker Compose"
)]
struct Cli {
    /// Directory holding environment instances.
    #[arg(long, default_value = "~/.local/share/wpdev", global = true)]
    root: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which environment a command acts on.
#[derive(Debug, Clone, Default, Args)]
pub struct EnvSelector {
    /// Custom name of the dev environment.
    #[arg(long)]
    slug: Option<String>,
    /// Application the environment mirrors.
    #[arg(long)]
    app: Option<String>,
    /// Environment of the application.
    #[arg(long)]
    env: Option<String>,
}

impl EnvSelector {
    pub fn name_options(&self) -> EnvironmentNameOptions {
        EnvironmentNameOptions {
            slug: self.slug.clone(),
            app: self.app.clone(),
            env: self.env.clone(),
        }
    }
}

/// Anything but `false` turns a service on.
#[allow(clippy::unnecessary_wraps)]
fn parse_enabled(value: &str) -> Result<bool, String> {
    Ok(!value.trim().eq_ignore_ascii_case("false"))
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigFlags {
    /// Title for the WordPress site.
    #[arg(long)]
    title: Option<String>,
    /// Enable multisite install.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_enabled)]
    multisite: Option<bool>,
    /// WordPress image tag to use.
    #[arg(long)]
    wordpress: Option<String>,
    /// MU plugins: `image` or a path to a local folder.
    #[arg(short = 'u', long)]
    mu_plugins: Option<String>,
    /// Client code: `image` or a path to a local folder.
    #[arg(long)]
    client_code: Option<String>,
    /// Enable the StatsD service.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_enabled)]
    statsd: Option<bool>,
    /// Enable the phpMyAdmin service.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_enabled)]
    phpmyadmin: Option<bool>,
    /// Enable XDebug.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_enabled)]
    xdebug: Option<bool>,
    /// Elasticsearch version.
    #[arg(long)]
    elasticsearch: Option<String>,
    /// MariaDB version.
    #[arg(long)]
    mariadb: Option<String>,
    /// Domain to redirect to for missing media files.
    #[arg(short = 'r', long)]
    media_redirect_domain: Option<String>,
}

impl ConfigFlags {
    pub fn to_options(&self) -> InstanceOptions {
        InstanceOptions {
            title: self.title.clone(),
            multisite: self.multisite,
            wordpress: self.wordpress.clone(),
            mu_plugins: self.mu_plugins.clone(),
            client_code: self.client_code.clone(),
            statsd: self.statsd,
            phpmyadmin: self.phpmyadmin,
            xdebug: self.xdebug,
            elasticsearch: self.elasticsearch.clone(),
            mariadb: self.mariadb.clone(),
            media_redirect_domain: self.media_redirect_domain.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new local environment.
    Create {
        #[command(flatten)]
        selector: EnvSelector,
        #[command(flatten)]
        config: ConfigFlags,
    },
    /// Change the configuration of an existing environment.
    Update {
        #[command(flatten)]
        selector: EnvSelector,
        #[command(flatten)]
        config: ConfigFlags,
    },
    /// Start an environment and wait for its services.
    Start {
        #[command(flatten)]
        selector: EnvSelector,
    },
    /// Stop a running environment.
    Stop {
        #[command(flatten)]
        selector: EnvSelector,
    },
    /// Rebuild an environment's containers.
    Rebuild {
        #[command(flatten)]
        selector: EnvSelector,
    },
    /// Destroy an environment.
    Destroy {
        #[command(flatten)]
        selector: EnvSelector,
        /// Keep the instance files on disk.
        #[arg(long, default_value_t = false)]
        soft: bool,
    },
    /// Show services, URLs and status of an environment.
    Info {
        #[command(flatten)]
        selector: EnvSelector,
    },
    /// List all local environments.
    List,
    /// Run a tool inside an environment (pass arguments after --).
    Exec {
        #[command(flatten)]
        selector: EnvSelector,
        /// Tool name, e.g. `wp` or `db`.
        tool: String,
        /// Arguments handed to the tool.
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Check a SQL dump against the destination site type.
    ValidateSql {
        /// Path to the SQL dump.
        file: PathBuf,
        /// Destination application.
        #[arg(long)]
        app: String,
        /// Destination environment.
        #[arg(long)]
        env: Option<String>,
    },
    /// List available WordPress versions.
    Versions,
    /// Run diagnostic checks on the system and instance root.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();
    let debug = debug_enabled();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose || debug {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WPDEV_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(|| commands::LogWriter)
        .with_target(false)
        .without_time()
        .init();

    let engine_name = std::env::var(ENGINE_VAR).unwrap_or_else(|_| "docker".to_owned());
    let needs_engine = matches!(
        cli.command,
        Commands::Start { .. }
            | Commands::Stop { .. }
            | Commands::Rebuild { .. }
            | Commands::Destroy { .. }
            | Commands::Exec { .. }
    );
    if needs_engine
        && engine_name == "docker"
        && std::env::var(SKIP_PREREQS_VAR).as_deref() != Ok("1")
    {
        let missing = wpdev_runtime::check_docker_prereqs();
        if !missing.is_empty() {
            eprintln!("error: {}", wpdev_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let engine = match wpdev_runtime::select_engine(&engine_name, EngineConfig::from_env()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let ctx = Context {
        root: expand_tilde(&cli.root),
        json: cli.json,
        engine,
    };

    let result = match cli.command {
        Commands::Create { selector, config } => {
            commands::create::run(&ctx, &selector, &config.to_options())
        }
        Commands::Update { selector, config } => {
            commands::update::run(&ctx, &selector, &config.to_options())
        }
        Commands::Start { selector } => commands::start::run(&ctx, &selector),
        Commands::Stop { selector } => commands::stop::run(&ctx, &selector),
        Commands::Rebuild { selector } => commands::rebuild::run(&ctx, &selector),
        Commands::Destroy { selector, soft } => commands::destroy::run(&ctx, &selector, soft),
        Commands::Info { selector } => commands::info::run(&ctx, &selector),
        Commands::List => commands::list::run(&ctx),
        Commands::Exec {
            selector,
            tool,
            args,
        } => commands::exec::run(&ctx, &selector, &tool, &args),
        Commands::ValidateSql { file, app, env } => {
            commands::validate_sql::run(&file, &app, env.as_deref())
        }
        Commands::Versions => commands::versions::run(ctx.json),
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("{}", format_cli_error(&msg, debug));
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn debug_enabled() -> bool {
    std::env::var(EngineConfig::DEBUG_VAR).is_ok_and(|v| !v.is_empty())
}

fn exit_code_for(msg: &str) -> u8 {
    if msg == ENVIRONMENT_NOT_FOUND {
        EXIT_NOT_FOUND
    } else if msg == ValidationError::MultisiteDumpForSingleSite.to_string()
        || msg == ValidationError::SingleSiteDumpForMultisite.to_string()
    {
        EXIT_VALIDATION
    } else {
        EXIT_FAILURE
    }
}

/// User-facing rendering of a command failure.
fn format_cli_error(msg: &str, debug: bool) -> String {
    let label = console::style("Error:").red().bold();
    if msg == ENVIRONMENT_NOT_FOUND {
        return format!(
            "{label} Environment doesn't exist.\n\n\nTo create a new environment run:\n\n{CLI_NAME} create\n"
        );
    }

    let message = msg.replace("ERROR: ", "");
    let mut out = format!("{label} {message}");
    if !debug {
        out.push_str(&format!(
            "\n\nPlease re-run the command with \"{var}=1\" prepended to it and provide the output on the support ticket.\n\nExample:\n\n{var}=1 {CLI_NAME} create\n",
            var = EngineConfig::DEBUG_VAR,
        ));
    }
    out
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
