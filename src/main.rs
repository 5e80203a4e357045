use clap::Parser;
use prreview::{
    args::{Args, Command},
    config::{AppConfig, ConfigLoader},
    errors::AppError,
    handlers::{
        branches::handle_branches,
        check::handle_check,
        init::handle_init,
        review::{handle_review, ReviewArgs},
    },
    logging::{init_logging, LoggingConfig},
    types::ReviewOutcome,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(LoggingConfig::from_verbosity(args.verbose, args.quiet)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, AppError> {
    let loader = ConfigLoader::new();

    // init must work even when the existing file does not parse
    if let Command::Init { force } = args.command {
        handle_init(&loader, force)?;
        return Ok(true);
    }

    let config: AppConfig = loader.load_config()?;

    match args.command {
        Command::Review {
            repo,
            source,
            target,
            endpoint,
            no_stream,
        } => {
            let review_args = ReviewArgs {
                repo,
                source,
                target,
                url: endpoint.url,
                model: endpoint.model,
                no_stream,
            };
            let outcome = handle_review(config, review_args).await?;
            Ok(!matches!(outcome, ReviewOutcome::Failed { .. }))
        }
        Command::Branches { repo } => {
            handle_branches(&config, &repo)?;
            Ok(true)
        }
        Command::Check { endpoint } => {
            let config = config.with_overrides(endpoint.url, endpoint.model);
            Ok(handle_check(&config).await)
        }
        Command::Init { .. } => Ok(true),
    }
}
