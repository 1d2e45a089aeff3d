//! Fleet Dashboard CLI
//!
//! A command-line tool for browsing the container fleet, running
//! confirm-gated lifecycle actions and managing accounts and registries.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{actions, admin, containers};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_USER: &str = "admin";

/// Fleet Dashboard CLI
#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about = "CLI for the Fleet Dashboard", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FLEET_API_URL env var)
    #[arg(long, env = "FLEET_API_URL")]
    pub api_url: Option<String>,

    /// User to act as (can also be set via FLEET_USER env var)
    #[arg(long, short, env = "FLEET_USER")]
    pub user: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List containers
    #[command(visible_alias = "list")]
    Ls {
        /// Case-insensitive match on name or image
        #[arg(long, short)]
        search: Option<String>,

        /// Filter by status (running, stopped, exited, error)
        #[arg(long)]
        status: Option<String>,

        /// Sort by name, cpu, memory or uptime
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Show a container's configuration and recent logs
    Inspect {
        /// Container ID, ID prefix or name
        container: String,

        /// Number of log lines to show
        #[arg(long, default_value_t = 20)]
        logs: usize,
    },

    /// Request a lifecycle action (start, stop, restart, delete)
    Action {
        /// Container ID, ID prefix or name
        container: String,

        /// Action to request
        action: String,

        /// Confirm immediately instead of leaving the action pending
        #[arg(long, short)]
        yes: bool,
    },

    /// Confirm the pending action
    Confirm,

    /// Cancel the pending action
    Cancel,

    /// Deploy a new container
    Deploy {
        /// Container name (letters, digits and hyphens)
        name: String,

        /// Image reference, e.g. nginx:1.25
        image: String,

        /// Port mapping, e.g. 8080:80
        #[arg(long, short)]
        port: Option<String>,

        /// CPU limit in percent
        #[arg(long)]
        cpu_limit: Option<f64>,

        /// Memory limit in MB
        #[arg(long)]
        memory_limit: Option<f64>,

        /// Environment variable as KEY=VALUE (repeatable)
        #[arg(long, short)]
        env: Vec<String>,

        /// Restart policy (no, always, on-failure, unless-stopped)
        #[arg(long)]
        restart: Option<String>,
    },

    /// Show the system telemetry window
    Metrics,

    /// Ask for a diagnosis of a container's recent logs
    Analyze {
        /// Container ID, ID prefix or name
        container: String,
    },

    /// Refresh dashboard data
    Refresh,

    /// Show active notifications
    Notifications,

    /// Show the audit trail of initiated actions
    Audit,

    /// Check credentials and remember the user
    Login {
        username: String,

        #[arg(long, short)]
        password: String,
    },

    /// Manage user accounts
    #[command(subcommand)]
    Users(UserCommands),

    /// Manage images
    #[command(subcommand)]
    Images(ImageCommands),

    /// Manage volumes
    #[command(subcommand)]
    Volumes(VolumeCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    Ls,

    /// Create a user
    Add {
        username: String,

        #[arg(long, short)]
        password: String,

        /// Role (admin or viewer)
        #[arg(long, default_value = "viewer")]
        role: String,
    },

    /// Request deletion of a user
    Rm {
        /// User ID
        id: String,

        /// Confirm immediately
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ImageCommands {
    /// List images
    Ls,

    /// Pull an image
    Pull {
        /// Image reference, e.g. redis:7
        reference: String,
    },

    /// Delete an image
    Rm {
        /// Image ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum VolumeCommands {
    /// List volumes
    Ls,

    /// Remove a volume
    Rm { name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let user = cli
        .user
        .or(config.user)
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    let format = match cli.format {
        Some(format) => format,
        None => config
            .default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default(),
    };

    let client = client::ApiClient::new(&api_url, &user)?;

    match cli.command {
        Commands::Ls {
            search,
            status,
            sort,
            desc,
        } => containers::list(&client, search, status, sort, desc, format).await?,
        Commands::Inspect { container, logs } => {
            containers::inspect(&client, &container, logs, format).await?
        }
        Commands::Action {
            container,
            action,
            yes,
        } => actions::request(&client, &container, &action, yes, format).await?,
        Commands::Confirm => actions::confirm(&client, format).await?,
        Commands::Cancel => actions::cancel(&client, format).await?,
        Commands::Deploy {
            name,
            image,
            port,
            cpu_limit,
            memory_limit,
            env,
            restart,
        } => {
            let request = client::DeployRequest {
                name,
                image,
                port,
                cpu_limit,
                memory_limit,
                env_vars: containers::parse_env(&env)?,
                restart_policy: restart,
            };
            containers::deploy(&client, request, format).await?
        }
        Commands::Metrics => containers::metrics(&client, format).await?,
        Commands::Analyze { container } => containers::analyze(&client, &container, format).await?,
        Commands::Refresh => containers::refresh(&client, format).await?,
        Commands::Notifications => actions::notifications(&client, format).await?,
        Commands::Audit => actions::audit(&client, format).await?,
        Commands::Login { username, password } => {
            admin::login(&client, &username, &password, format).await?
        }
        Commands::Users(cmd) => match cmd {
            UserCommands::Ls => admin::list_users(&client, format).await?,
            UserCommands::Add {
                username,
                password,
                role,
            } => {
                let new_user = client::NewUser {
                    username,
                    password,
                    role: role.to_lowercase(),
                };
                admin::add_user(&client, new_user, format).await?
            }
            UserCommands::Rm { id, yes } => {
                actions::request_user_deletion(&client, &id, yes, format).await?
            }
        },
        Commands::Images(cmd) => match cmd {
            ImageCommands::Ls => admin::list_images(&client, format).await?,
            ImageCommands::Pull { reference } => {
                admin::pull_image(&client, &reference, format).await?
            }
            ImageCommands::Rm { id } => admin::delete_image(&client, &id, format).await?,
        },
        Commands::Volumes(cmd) => match cmd {
            VolumeCommands::Ls => admin::list_volumes(&client, format).await?,
            VolumeCommands::Rm { name } => admin::delete_volume(&client, &name, format).await?,
        },
    }

    Ok(())
}
