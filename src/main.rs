//! Binary entry point for lifeline.
//!
//! This binary provides the CLI interface for emergency fan-out and the
//! conversation store behind it.

// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use lifeline::cli::{self, FanoutArgs, OutputFormat};
use lifeline::config::LifelineConfig;
use lifeline::models::FanoutMode;
use lifeline::observability;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Lifeline - emergency alert fan-out for personal-safety messaging.
#[derive(Parser)]
#[command(name = "lifeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "LIFELINE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Output format for read commands: table or json.
    #[arg(short, long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Send the emergency alert and location link to every target.
    Alert(LocationArgs),

    /// Send only the location link to every target.
    ShareLocation(LocationArgs),

    /// List emergency contacts that have no conversation yet.
    Uncontacted {
        /// The user's identity.
        user: String,
    },

    /// Show the chat list for a user.
    Chats {
        /// The user's identity.
        user: String,

        /// Contacts listed first, as NAME=IDENTITY (repeatable).
        #[arg(long = "predefined")]
        predefined: Vec<String>,
    },

    /// Show the messages between two identities.
    Messages {
        /// One participant.
        a: String,
        /// The other participant.
        b: String,
    },

    /// Manage emergency contacts.
    Contact {
        /// Contact subcommand.
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Manage display names.
    Profile {
        /// Profile subcommand.
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Arguments for fan-out commands.
#[derive(clap::Args)]
struct LocationArgs {
    /// The sending user's identity.
    user: String,

    /// Latitude of the current position.
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Longitude of the current position.
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Print fan-out lifecycle events to stderr.
    #[arg(long)]
    events: bool,
}

/// Contact subcommands.
#[derive(Subcommand)]
enum ContactAction {
    /// Add an emergency contact.
    Add {
        /// Owner identity.
        owner: String,
        /// Contact identity.
        contact: String,
        /// Contact display name.
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List emergency contacts.
    List {
        /// Owner identity.
        owner: String,
    },
}

/// Profile subcommands.
#[derive(Subcommand)]
enum ProfileAction {
    /// Set a display name.
    Set {
        /// Identity to name.
        identity: String,
        /// Display name.
        name: String,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command and returns the process exit code.
async fn run_command(cli: Cli, config: LifelineConfig) -> anyhow::Result<u8> {
    let format = OutputFormat::parse(&cli.format);

    match cli.command {
        Commands::Alert(args) => cmd_fanout(&config, args, format, FanoutMode::EmergencyAlert).await,
        Commands::ShareLocation(args) => {
            cmd_fanout(&config, args, format, FanoutMode::ShareLocation).await
        },
        Commands::Uncontacted { user } => {
            let store = cli::open_store(&config)?;
            cli::cmd_uncontacted(&config, &store, &user, format).await?;
            Ok(0)
        },
        Commands::Chats { user, predefined } => {
            let store = cli::open_store(&config)?;
            let predefined = cli::parse_predefined(&predefined)?;
            cli::cmd_chats(&store, &user, &predefined, format)?;
            Ok(0)
        },
        Commands::Messages { a, b } => {
            let store = cli::open_store(&config)?;
            cli::cmd_messages(&store, &a, &b, format)?;
            Ok(0)
        },
        Commands::Contact { action } => {
            let store = cli::open_store(&config)?;
            match action {
                ContactAction::Add {
                    owner,
                    contact,
                    name,
                } => cli::cmd_contact_add(&store, &owner, &contact, name)?,
                ContactAction::List { owner } => cli::cmd_contact_list(&store, &owner, format)?,
            }
            Ok(0)
        },
        Commands::Profile {
            action: ProfileAction::Set { identity, name },
        } => {
            let store = cli::open_store(&config)?;
            cli::cmd_profile_set(&store, &identity, &name)?;
            Ok(0)
        },
        Commands::Config { show } => {
            cli::cmd_config(&config, show);
            Ok(0)
        },
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "lifeline",
                &mut std::io::stdout(),
            );
            Ok(0)
        },
    }
}

/// Fan-out command; the exit code reflects the outcome.
async fn cmd_fanout(
    config: &LifelineConfig,
    args: LocationArgs,
    format: OutputFormat,
    mode: FanoutMode,
) -> anyhow::Result<u8> {
    let store = cli::open_store(config)?;
    let args = FanoutArgs {
        user: args.user,
        latitude: args.latitude,
        longitude: args.longitude,
        format,
        events: args.events,
    };
    let outcome = cli::cmd_fanout(config, &store, &args, mode).await?;
    Ok(cli::exit_code(outcome))
}

/// Loads configuration.
///
/// An explicit path (flag or `LIFELINE_CONFIG_PATH`) must exist; otherwise
/// the default location is tried. Environment overrides apply last.
fn load_config(path: Option<&Path>) -> lifeline::Result<LifelineConfig> {
    let config = match path {
        Some(path) => LifelineConfig::load_from_file(path)?,
        None => LifelineConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}
