use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use campus_engine::{ClientSettings, PollSettings, DEFAULT_API_BASE};
use campus_logging::LogDestination;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// Command-line arguments for campus
#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(about = "Course catalog console: sign in and run bulk CSV import/export jobs")]
#[command(version)]
pub struct Args {
    /// API origin every request is sent to
    #[arg(long, env = "CAMPUS_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Directory holding the saved session
    #[arg(long, env = "CAMPUS_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// Milliseconds between job status queries
    #[arg(long, env = "CAMPUS_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Stop polling after this many queries (default: poll until the job ends)
    #[arg(long, env = "CAMPUS_POLL_MAX_ATTEMPTS")]
    pub poll_max_attempts: Option<u32>,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log file used by `--log file` and `--log both`
    #[arg(long, default_value = "campus.log")]
    pub log_file: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and save the access token
    Login {
        #[arg(short, long)]
        username: String,
        /// Prompted for when omitted
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the saved access token
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Export courses to CSV and download the result
    Export {
        /// Only courses whose code contains this text
        #[arg(long)]
        code: Option<String>,
        /// Only courses whose title contains this text
        #[arg(long)]
        title: Option<String>,
        /// Directory the CSV is saved to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Import courses from a CSV file or URL
    Import {
        /// Local CSV file (header: id,code,title,description,credits)
        #[arg(required_unless_present = "file_url", conflicts_with = "file_url")]
        file: Option<PathBuf>,
        /// CSV reachable by the server
        #[arg(long)]
        file_url: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Have the usernames tied to an email address mailed to it
    ForgotUsername { email: String },
    /// Have a password reset link mailed to an email address
    ForgotPassword { email: String },
    /// Set a new password with the uid and token from a reset link
    ResetPassword {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        token: String,
        #[arg(long, env = "CAMPUS_NEW_PASSWORD", hide_env_values = true)]
        new: Option<String>,
    },
    /// Check a password against the password policy without sending it
    CheckPassword {
        /// Prompted for when omitted
        password: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Change the signed-in account's password
    ChangePassword {
        #[arg(long, env = "CAMPUS_OLD_PASSWORD", hide_env_values = true)]
        old: Option<String>,
        #[arg(long, env = "CAMPUS_NEW_PASSWORD", hide_env_values = true)]
        new: Option<String>,
    },
}

impl Args {
    pub fn client_settings(&self) -> Result<ClientSettings> {
        let parsed = url::Url::parse(&self.api_base)
            .with_context(|| format!("invalid API base {:?}", self.api_base))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("API base must be an http(s) URL, got {}", self.api_base);
        }
        Ok(ClientSettings {
            api_base: self.api_base.trim_end_matches('/').to_string(),
            ..ClientSettings::default()
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_attempts: self.poll_max_attempts,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log {
            LogTarget::File => LogDestination::File(self.log_file.clone()),
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both(self.log_file.clone()),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
