pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "kitchen")]
#[command(about = "Kitchen CLI - Command-line client for the kindergarten kitchen inventory API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in, sign out and session status")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Products, units and deliveries")]
    Products {
        #[command(subcommand)]
        cmd: commands::products::ProductCommands,
    },

    #[command(about = "Meals and their recipes")]
    Meals {
        #[command(subcommand)]
        cmd: commands::meals::MealCommands,
    },

    #[command(about = "Serve meals and review serving history")]
    Servings {
        #[command(subcommand)]
        cmd: commands::servings::ServingCommands,
    },

    #[command(about = "User and role administration")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Notifications and audit trail")]
    Notifications {
        #[command(subcommand)]
        cmd: commands::notifications::NotificationCommands,
    },

    #[command(about = "Monthly reports and consumption charts")]
    Reports {
        #[command(subcommand)]
        cmd: commands::reports::ReportCommands,
    },

    #[command(about = "Overview for the signed-in role")]
    Dashboard,

    #[command(about = "Follow live updates from the backend")]
    Watch {
        #[arg(long, help = "Exit after this many messages")]
        count: Option<usize>,
        #[arg(long, help = "Send a ping once connected")]
        ping: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Products { cmd } => commands::products::handle(cmd, output_format).await,
        Commands::Meals { cmd } => commands::meals::handle(cmd, output_format).await,
        Commands::Servings { cmd } => commands::servings::handle(cmd, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, output_format).await,
        Commands::Notifications { cmd } => commands::notifications::handle(cmd, output_format).await,
        Commands::Reports { cmd } => commands::reports::handle(cmd, output_format).await,
        Commands::Dashboard => commands::dashboard::handle(output_format).await,
        Commands::Watch { count, ping } => commands::watch::handle(count, ping, output_format).await,
    }
}
