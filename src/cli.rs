// CLI module for handling command-line interface

use crate::config::Overrides;
use crate::dists::Classifier;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "distshare")]
#[command(version)]
#[command(
    about = "Share one downloaded Gradle distribution across every wrapper version in the cache"
)]
pub struct Cli {
    /// TOML config file (also read from DISTSHARE_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Gradle user home holding wrapper/dists (defaults to GRADLE_USER_HOME, then ~/.gradle)
    #[arg(long, global = true, value_name = "DIR")]
    pub gradle_user_home: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RemoteArgs {
    /// Base URL serving versions/current and versions/all
    #[arg(long, value_name = "URL")]
    pub services_url: Option<String>,

    /// Base URL the wrapper downloads distributions from
    #[arg(long, value_name = "URL")]
    pub distributions_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the current version and link every other release to it
    Sync {
        /// Number of concurrent link workers
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        jobs: Option<u16>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Show which release distributions are present in the cache
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Print cache paths for a version without touching the network
    Locate {
        version: String,

        #[arg(long, default_value = "bin", value_parser = parse_classifier)]
        classifier: Classifier,

        /// Base URL the wrapper downloads distributions from
        #[arg(long, value_name = "URL")]
        distributions_url: Option<String>,
    },
}

impl Cli {
    /// Settings overrides carried by the flags of this invocation
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            config: self.config.clone(),
            gradle_user_home: self.gradle_user_home.clone(),
            ..Default::default()
        };

        match &self.command {
            Commands::Sync { jobs, remote } => {
                overrides.jobs = jobs.map(usize::from);
                overrides.services_url = remote.services_url.clone();
                overrides.distributions_url = remote.distributions_url.clone();
            }
            Commands::Status { remote, .. } => {
                overrides.services_url = remote.services_url.clone();
                overrides.distributions_url = remote.distributions_url.clone();
            }
            Commands::Locate {
                distributions_url, ..
            } => {
                overrides.distributions_url = distributions_url.clone();
            }
        }

        overrides
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn parse_classifier(value: &str) -> Result<Classifier, String> {
    Classifier::parse(value).ok_or_else(|| format!("unknown classifier '{}', expected bin or all", value))
}
