// CLI interface
pub mod commands;
mod prompt;

use crate::error::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "adfs-aws")]
#[command(about = "Sign in to ADFS and fetch temporary AWS credentials", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// ADFS server, e.g. https://sts.example.com
    #[arg(long, global = true, env = "ADFS_DIRECTORY_DOMAIN")]
    pub directory_domain: Option<String>,

    /// Windows domain prepended to the user name
    #[arg(long, global = true, env = "ADFS_DOMAIN")]
    pub domain: Option<String>,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Connection settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct ServerArgs {
    pub directory_domain: Option<String>,
    pub domain: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store credentials for one account
    Login {
        /// ADFS user name (prompted if missing)
        #[arg(short, long, env = "ADFS_USERNAME")]
        username: Option<String>,

        /// Account to use: ARN, account id, display name, role name or label
        #[arg(short, long)]
        account: Option<String>,

        /// Profile written to ~/.aws/credentials
        #[arg(short, long)]
        profile: Option<String>,

        /// Print shell export lines instead of writing ~/.aws/credentials
        #[arg(long, conflicts_with = "profile")]
        export: bool,
    },

    /// Sign in and list the accounts that could be assumed
    List {
        /// ADFS user name (prompted if missing)
        #[arg(short, long, env = "ADFS_USERNAME")]
        username: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(adfs-aws completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(adfs-aws completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   adfs-aws completions fish > ~/.config/fish/completions/adfs-aws.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Write a commented sample config file
    Init,
    /// Show where the config file lives and whether it is valid
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

pub async fn execute(args: Cli) -> Result<()> {
    let server = ServerArgs {
        directory_domain: args.directory_domain,
        domain: args.domain,
    };

    match args.command {
        Commands::Login {
            username,
            account,
            profile,
            export,
        } => commands::login::execute(server, username, account, profile, export).await,
        Commands::List { username, format } => {
            commands::list::execute(server, username, format).await
        }
        Commands::Config { command } => commands::config::execute(command),
        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            Ok(())
        }
    }
}
