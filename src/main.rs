use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mwsite::{config::Config, server, Cache, Mode, SiteContext};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mwsite")]
#[command(author, version, about = "Documentation site server with live middleware pages")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "MWSITE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Serve options used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Runtime mode (development, production)
    #[arg(short, long, env = "SITE_ENV")]
    mode: Option<Mode>,

    /// Directory holding static assets and markdown pages
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = dir;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the site server (default)
    Serve(ServeArgs),

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the on-disk response cache
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)?;

    match cli.command.unwrap_or(Commands::Serve(cli.serve)) {
        Commands::Serve(args) => {
            args.apply(&mut config);

            let ctx = Arc::new(SiteContext::from_config(config)?);
            server::serve(ctx).await?;
            Ok(())
        }
        Commands::Config { init, path } => handle_config(&config_path, init, path),
        Commands::ClearCache => {
            match config.effective_cache_dir() {
                Some(dir) => {
                    Cache::with_dir(&dir).clear().await?;
                    println!("Cache cleared: {}", dir.display());
                }
                None => println!("Disk cache is disabled; nothing to clear."),
            }
            Ok(())
        }
    }
}

fn handle_config(config_path: &std::path::Path, init: bool, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save_to(config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'mwsite config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
