use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// prreview - 本地 AI 代码评审
#[derive(Parser, Debug)]
#[command(name = "prreview", version)]
#[command(about = "Review what a branch adds with a locally running Ollama model")]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Endpoint overrides shared by commands that talk to Ollama
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// Ollama generate endpoint URL
    #[arg(long)]
    pub url: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Review the changes a branch adds on top of a target branch
    #[command(alias = "rv")]
    Review {
        /// Repository path
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
        /// Branch carrying the changes
        #[arg(short, long, default_value = "HEAD")]
        source: String,
        /// Branch the changes would merge into (default: first of main, master, develop)
        #[arg(short, long)]
        target: Option<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Skip the streaming transfer and wait for the complete response
        #[arg(long)]
        no_stream: bool,
    },
    /// List local branches
    Branches {
        /// Repository path
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },
    /// Test the connection to Ollama and the configured model
    Check {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Write a commented configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_defaults() {
        let args = Args::try_parse_from(["prreview", "review"]).unwrap();
        match args.command {
            Command::Review {
                repo,
                source,
                target,
                endpoint,
                no_stream,
            } => {
                assert_eq!(repo, PathBuf::from("."));
                assert_eq!(source, "HEAD");
                assert!(target.is_none());
                assert!(endpoint.url.is_none());
                assert!(!no_stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_review_with_overrides() {
        let args = Args::try_parse_from([
            "prreview",
            "-vv",
            "rv",
            "--repo",
            "/tmp/project",
            "--target",
            "develop",
            "--model",
            "mistral",
            "--no-stream",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Review {
                target,
                endpoint,
                no_stream,
                ..
            } => {
                assert_eq!(target.as_deref(), Some("develop"));
                assert_eq!(endpoint.model.as_deref(), Some("mistral"));
                assert!(no_stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["prreview", "-q", "-v", "check"]).is_err());
        let args = Args::try_parse_from(["prreview", "init", "--force"]).unwrap();
        assert!(matches!(args.command, Command::Init { force: true }));
    }
}
