use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use gallery::config::{self, Config, ConfigOverrides};
use gallery::{AppState, routes};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let config_file = config::resolve_config_file(cli.common.config.as_deref())?;
    debug!("config file: {}", config_file.display());

    match cli.command.unwrap_or_else(|| Command::Serve(ServeCommand::default())) {
        Command::Serve(cmd) => {
            let config = Config::load(&config_file, &cmd.overrides())?;
            async_serve(config)
        }
        Command::Config { command } => handle_config(&config_file, command),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Gallery - image gallery server for a category/item directory tree.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    /// Defaults to `serve`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Disable logging
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve(ServeCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Default, Args)]
struct ServeCommand {
    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Catalog root; its subdirectories are categories
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Directory served under /static
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,
    /// Directory with index.html, category.html and item.html overrides
    #[arg(long, value_name = "DIR")]
    templates_dir: Option<PathBuf>,
}

impl ServeCommand {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            port: self.port,
            root: self.root.clone(),
            static_dir: self.static_dir.clone(),
            templates_dir: self.templates_dir.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

impl CommonOpts {
    /// Default filter level for the crate and tower-http.
    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn init_logging(common: &CommonOpts) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = common.log_level();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gallery={level},tower_http={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        let disable_color = env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(!disable_color),
            )
            .try_init()
            .ok();
    }
}

fn handle_config(config_file: &std::path::Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = Config::load(config_file, &ConfigOverrides::default())?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Path => {
            println!("{}", config_file.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn async_serve(config: Config) -> Result<()> {
    let root = &config.catalog.root;
    if !root.exists() {
        bail!("Catalog root does not exist: {}", root.display());
    }
    if !root.is_dir() {
        bail!("Catalog root is not a directory: {}", root.display());
    }
    if !config.server.static_dir.is_dir() {
        warn!(
            "Static directory {} not found; /static will return 404",
            config.server.static_dir.display()
        );
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(config).context("initializing application state")?;

    info!("Serving catalog from: {}", state.catalog.root().display());
    info!("Catalog files linked under {}", state.media.base_url);

    let app = routes::build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
