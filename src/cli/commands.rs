use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// `onebot` - annotates URLs posted in chat with titles and metadata.
#[derive(Parser, Debug)]
#[command(name = "onebot")]
#[command(version)]
#[command(about = "Annotate URLs in chat messages.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.onebot/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the URLs in a message and print the reply line
    Resolve {
        /// Message text
        message: String,

        /// Channel the message was sent to; applies the channel and nick filters
        #[arg(long)]
        target: Option<String>,

        /// Nick of the sender (only used with --target)
        #[arg(long, default_value = "")]
        sender: String,
    },

    /// Print the effective configuration with credentials masked
    Config,

    /// Manage the persisted cookie store
    Cookies {
        #[command(subcommand)]
        cookie_command: CookieCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CookieCommands {
    /// Post login forms and save the cookies they set
    Login {
        /// JSON file mapping each login URL to its form fields
        #[arg(long)]
        sites: PathBuf,

        /// Cookie store to write (default: urlinfo.cookie_file)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
