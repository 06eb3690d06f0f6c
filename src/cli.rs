use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dripcoin")]
#[command(author, version, about = "DripCoinQuest onboarding bot with referral rewards", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot
    Run {
        /// Use webhook mode (requires SERVER_URL) instead of long polling
        #[arg(long)]
        webhook: bool,

        /// Keep user records in memory instead of the SQLite database
        #[arg(long)]
        in_memory: bool,
    },

    /// Print a stored user record as JSON
    User {
        /// Telegram user id
        user_id: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
