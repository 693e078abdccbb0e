use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cq", about = "CineQuiz: cinema trivia, points and prizes", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record a sign-in and show the account
    Signin(SigninArgs),
    /// Show a user's points balance
    Balance(UserArgs),
    /// Add points to a user
    Credit(AmountArgs),
    /// Remove points from a user
    Debit(AmountArgs),
    /// List the prize catalog
    Prizes(PrizesArgs),
    /// Redeem a prize
    Redeem(RedeemArgs),
    /// Show a user's redemption history
    History(UserArgs),
    /// Show the friends leaderboard
    Friends(UserArgs),
    /// Play a quiz session and bank the points
    Quiz(QuizArgs),
    /// Find the cinemas closest to a position
    Nearest(NearestArgs),
    /// Check or create the configured buckets
    Bucket(BucketArgs),
    /// Upload content to the store
    Seed(SeedArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct UserArgs {
    /// User identifier issued by the identity provider
    #[arg(short, long)]
    pub user: String,
}

#[derive(Args)]
pub struct SigninArgs {
    #[arg(short, long)]
    pub user: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub photo_url: Option<String>,
}

#[derive(Args)]
pub struct AmountArgs {
    #[arg(short, long)]
    pub user: String,
    pub amount: u64,
}

#[derive(Args)]
pub struct PrizesArgs {
    /// Only show prizes this user can afford
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct RedeemArgs {
    #[arg(short, long)]
    pub user: String,
    pub prize: String,
}

#[derive(Args)]
pub struct QuizArgs {
    #[arg(short, long)]
    pub user: String,
    /// Answers as comma-separated option numbers (1-4), in question order.
    /// Prompts on stdin when omitted.
    #[arg(long, value_delimiter = ',')]
    pub answers: Vec<usize>,
}

#[derive(Args)]
pub struct NearestArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
    #[arg(short = 'k', long, default_value = "3")]
    pub count: usize,
}

#[derive(Args)]
pub struct BucketArgs {
    #[command(subcommand)]
    pub action: BucketAction,
}

#[derive(Subcommand)]
pub enum BucketAction {
    /// Report whether each bucket exists and is reachable
    Verify,
    /// Create missing buckets
    Ensure,
}

#[derive(Args)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub what: SeedTarget,
}

#[derive(Subcommand)]
pub enum SeedTarget {
    /// Upload the sample question pool
    Questions {
        /// Overwrite an existing pool
        #[arg(long)]
        force: bool,
    },
    /// Upload the cinema catalog
    Cinemas {
        /// Plain-text listing to import instead of the built-in list
        #[arg(long)]
        listing: Option<PathBuf>,
    },
}
