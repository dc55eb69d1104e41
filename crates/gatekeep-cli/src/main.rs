use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gatekeep")]
#[command(about = "Gatekeep CLI - session bootstrap and sign-in against an identity API", long_about = None)]
struct Cli {
    /// Identity domain from config.toml (defaults to `default_domain`)
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Keep tokens in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the stored session and print its state
    Status,
    /// Sign in (password from GATEKEEP_PASSWORD, else read from stdin where it is echoed)
    Login {
        #[arg(long)]
        account: String,
    },
    /// Sign out and clear stored tokens
    Logout,
    /// Print the signed-in user's profile as fetched by bootstrap
    Whoami,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Print where the route guard would send you from PATH
    Route { path: String },
    /// Manage config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config.toml
    Init,
    /// Print the effective configuration
    Show,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let target = commands::Target {
        domain: cli.domain,
        ephemeral: cli.ephemeral,
    };

    match cli.command {
        Commands::Status => commands::session::status(&target).await?,
        Commands::Login { account } => commands::session::login(&target, account).await?,
        Commands::Logout => commands::session::logout(&target).await?,
        Commands::Whoami => commands::session::whoami(&target).await?,
        Commands::Refresh => commands::session::refresh(&target).await?,
        Commands::Route { path } => commands::route::run(&target, &path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config::init()?,
            ConfigAction::Show => commands::config::show(&target)?,
        },
    }

    Ok(())
}
