use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "boardmove")]
#[command(about = "Migrate exported boards into a browser-rendered board application", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/boardmove/config.toml)
    #[arg(long, global = true, value_name = "FILE", env = "BOARDMOVE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate an export file and show its statistics
    Inspect(InputArgs),
    /// Show the columns and cards a migration would create
    Plan(InputArgs),
    /// Extract a board from a source page into an export file
    Extract(ExtractArgs),
    /// Recreate an exported board on the destination
    Migrate(MigrateArgs),
    /// Configuration operations
    Config(ConfigCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct InputArgs {
    /// Export file produced by `extract` or the source application
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Clone, Default)]
pub struct BrowserArgs {
    /// Attach to a running browser's DevTools endpoint instead of launching one
    #[arg(long, value_name = "URL", env = "BOARDMOVE_CONNECT")]
    pub connect: Option<String>,
    /// Show the launched browser window
    #[arg(long)]
    pub headful: bool,
    /// Browser executable to launch
    #[arg(long, value_name = "PATH")]
    pub chrome: Option<PathBuf>,
    /// Browser profile directory to launch with
    #[arg(long, value_name = "DIR")]
    pub profile_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Saved source page
    #[arg(long, value_name = "FILE", conflicts_with = "url", required_unless_present = "url")]
    pub html: Option<PathBuf>,
    /// Live source page, loaded in the browser
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
    /// Where to write the export (prints it inside the response otherwise)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Export file to migrate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Destination board page
    #[arg(long, value_name = "URL", required_unless_present = "dry_run")]
    pub url: Option<String>,
    /// Migrate into an in-memory board instead of a browser
    #[arg(long)]
    pub dry_run: bool,
    /// Print every action performed on the destination to stderr
    #[arg(long)]
    pub trace_actions: bool,
    /// Suppress progress lines on stderr
    #[arg(long, short)]
    pub quiet: bool,
    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the default config file location
    Path,
    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
