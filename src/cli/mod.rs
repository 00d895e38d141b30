use clap::{Parser, Subcommand};

pub mod application;
pub mod comment;
pub mod config;
pub mod context;
pub mod init;
pub mod member;
pub mod results;
pub mod status;
pub mod version;
pub mod vote;

#[derive(Parser)]
#[command(name = "grantvote")]
#[command(author = "Grantvote Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for grant application committee voting", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/grantvote/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file and create the database
    Init {
        /// Database path (default: next to the config file)
        #[arg(long)]
        database: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add a voting member
    AddMember {
        #[arg(long)]
        name: String,

        /// Committee position (e.g. "WG1 Leader")
        #[arg(long)]
        position: String,

        #[arg(long)]
        email: String,
    },

    /// List voting members
    ListMembers {
        /// Only members who receive tokens for new applications
        #[arg(long)]
        active: bool,
    },

    /// Change a member's details
    UpdateMember {
        /// Member id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Set the active flag (true/false)
        #[arg(long)]
        active: Option<bool>,
    },

    /// Deactivate a member (issued tokens stay valid)
    DeactivateMember {
        /// Member id
        id: i64,
    },

    /// Create a grant application and send voting invitations
    CreateApplication {
        /// Name of the person submitting on the candidate's behalf
        #[arg(long)]
        submitter: String,

        #[arg(long)]
        candidate: String,

        /// stsm, dissemination-conference, itc-conference or yri-conference
        #[arg(long)]
        grant_type: String,

        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long)]
        place: String,

        #[arg(long)]
        amount: String,

        /// ISO currency code (default EUR)
        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Voting deadline, UTC (YYYY-MM-DD HH:MM)
        #[arg(long)]
        deadline: String,
    },

    /// Show an application with its vote summary
    ShowApplication {
        /// Application id or reference code
        application: String,

        #[arg(long)]
        json: bool,
    },

    /// List applications, newest first
    ListApplications {
        /// Include closed applications
        #[arg(long)]
        all: bool,
    },

    /// Close an application (hides it from listings)
    CloseApplication {
        /// Application id or reference code
        application: String,
    },

    /// Show what a token holder is voting on
    Ballot {
        token: String,
    },

    /// Cast a vote with a token
    Vote {
        token: String,

        /// accept or reject
        decision: String,

        /// Justification (required when rejecting)
        #[arg(long)]
        reason: Option<String>,
    },

    /// Comment on an application with a token
    Comment {
        token: String,

        content: String,

        /// support, oppose or neutral
        #[arg(long, default_value = "neutral")]
        stance: String,

        /// Id of the comment being replied to
        #[arg(long)]
        reply_to: Option<i64>,
    },

    /// List comments on an application, newest first
    Comments {
        /// Application id or reference code
        application: String,

        #[arg(long)]
        json: bool,
    },

    /// Show vote results for an application
    Results {
        /// Application id or reference code
        application: String,

        #[arg(long)]
        json: bool,
    },

    /// Check database health and show counts
    Status,

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config;
    match cli.command {
        Commands::Init { database, force } => init::execute(config, database, force).await,
        Commands::AddMember {
            name,
            position,
            email,
        } => member::add(config, name, position, email).await,
        Commands::ListMembers { active } => member::list(config, active).await,
        Commands::UpdateMember {
            id,
            name,
            position,
            email,
            active,
        } => member::update(config, id, name, position, email, active).await,
        Commands::DeactivateMember { id } => member::deactivate(config, id).await,
        Commands::CreateApplication {
            submitter,
            candidate,
            grant_type,
            date,
            place,
            amount,
            currency,
            description,
            deadline,
        } => {
            application::create(
                config,
                application::CreateArgs {
                    submitter,
                    candidate,
                    grant_type,
                    date,
                    place,
                    amount,
                    currency,
                    description,
                    deadline,
                },
            )
            .await
        }
        Commands::ShowApplication { application, json } => {
            application::show(config, application, json).await
        }
        Commands::ListApplications { all } => application::list(config, all).await,
        Commands::CloseApplication { application } => application::close(config, application).await,
        Commands::Ballot { token } => vote::ballot(config, token).await,
        Commands::Vote {
            token,
            decision,
            reason,
        } => vote::execute(config, token, decision, reason).await,
        Commands::Comment {
            token,
            content,
            stance,
            reply_to,
        } => comment::add(config, token, content, stance, reply_to).await,
        Commands::Comments { application, json } => comment::list(config, application, json).await,
        Commands::Results { application, json } => results::execute(config, application, json).await,
        Commands::Status => status::execute(config).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
