use crate::{
    config::AppConfig,
    errors::AppError,
    git::{default_target_branch, list_local_branches},
    review::{CancellationToken, Orchestrator, ReviewEvent, ReviewWorker},
    types::{review::has_git_metadata, ReviewOutcome, ReviewRequest, ReviewTimings, TransferMode},
};
use colored::Colorize;
use std::{
    future::Future,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Parsed `review` command line
#[derive(Debug, Clone)]
pub struct ReviewArgs {
    pub repo: PathBuf,
    pub source: String,
    pub target: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub no_stream: bool,
}

/// Runs one review on the worker thread and renders its progress.
///
/// Ctrl-C asks the worker to stop; later presses are ignored until it does.
/// Only the final feedback is written to stdout.
pub async fn handle_review(config: AppConfig, args: ReviewArgs) -> Result<ReviewOutcome, AppError> {
    let mut config = config.with_overrides(args.url.clone(), args.model.clone());
    if args.no_stream {
        config.ollama.stream = false;
    }

    let request = build_request(&config, &args);
    eprintln!(
        "{} {} ({} → {}) with {}",
        "🔍 Reviewing".bold(),
        request.repository_name(),
        request.source_ref,
        if request.target_ref.is_empty() {
            "?"
        } else {
            request.target_ref.as_str()
        },
        request.model_name
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    let mut handle = ReviewWorker::spawn(orchestrator, request.clone())?;
    let cancel = handle.cancel_token();

    let mut renderer = EventRenderer::default();
    pump_events(
        &mut handle.events,
        tokio::signal::ctrl_c(),
        &cancel,
        &mut renderer,
    )
    .await;

    let outcome = handle.wait().await;
    renderer.end_stream_line();
    report_outcome(
        &outcome,
        &request,
        renderer.streamed(),
        std::io::stdout().is_terminal(),
    );
    Ok(outcome)
}

/// Renders events until the worker closes the channel.
///
/// `stop` is created once and polled across iterations, so a signal that
/// lands while an event is being rendered is still seen.
async fn pump_events<S>(
    events: &mut UnboundedReceiver<ReviewEvent>,
    stop: S,
    cancel: &CancellationToken,
    renderer: &mut EventRenderer,
) where
    S: Future<Output = std::io::Result<()>>,
{
    let mut stop = std::pin::pin!(stop);
    let mut stop_requested = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => renderer.render(event),
                None => break,
            },
            signal = &mut stop, if !stop_requested => {
                if let Err(e) = signal {
                    tracing::warn!("Unable to listen for Ctrl-C: {}", e);
                }
                stop_requested = true;
                cancel.cancel();
                renderer.end_stream_line();
                eprintln!("{}", "Stopping after the current step...".yellow());
            }
        }
    }
}

fn build_request(config: &AppConfig, args: &ReviewArgs) -> ReviewRequest {
    let target_ref = match &args.target {
        Some(target) => target.clone(),
        None => pick_target(&args.repo, &config.review.preferred_target_branches),
    };

    ReviewRequest {
        repository_path: args.repo.clone(),
        source_ref: args.source.clone(),
        target_ref,
        endpoint_url: config.ollama.api_url.clone(),
        model_name: config.ollama.model_name.clone(),
    }
}

/// Default target branch, or an empty string that validation reports as unselected.
fn pick_target(repo: &Path, preferred: &[String]) -> String {
    if !has_git_metadata(repo) {
        return String::new();
    }
    match list_local_branches(repo) {
        Ok(branches) => default_target_branch(&branches, preferred).unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Could not list branches: {}", e);
            String::new()
        }
    }
}

/// Echoes events on stderr as they arrive and keeps the streamed text.
#[derive(Debug, Default)]
struct EventRenderer {
    percent: u8,
    streamed: String,
    mid_line: bool,
}

impl EventRenderer {
    fn render(&mut self, event: ReviewEvent) {
        match event {
            ReviewEvent::Status(text) => {
                self.end_stream_line();
                eprintln!("{} {}", format!("[{:>3}%]", self.percent).dimmed(), text);
            }
            ReviewEvent::Progress(percent) => self.percent = percent,
            ReviewEvent::Fragment(text) => {
                if self.streamed.is_empty() {
                    print_feedback_header();
                }
                self.streamed.push_str(&text);
                eprint!("{}", text);
                let _ = std::io::stderr().flush();
                self.mid_line = !text.ends_with('\n');
            }
            ReviewEvent::Throughput { chunks, elapsed } => {
                tracing::debug!(
                    "{} chunks in {:.1}s ({:.1} chunks/s)",
                    chunks,
                    elapsed.as_secs_f64(),
                    chunks as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
            ReviewEvent::FallbackToBlocking(reason) => {
                self.end_stream_line();
                eprintln!(
                    "{} {}",
                    "Streaming failed, retrying without streaming:".yellow(),
                    reason
                );
                self.streamed.clear();
            }
        }
    }

    fn end_stream_line(&mut self) {
        if self.mid_line {
            eprintln!();
            self.mid_line = false;
        }
    }

    fn streamed(&self) -> &str {
        &self.streamed
    }
}

fn print_feedback_header() {
    eprintln!("\n{}", "AI Code Review Feedback".bold().green());
    eprintln!("{}", "=======================".green());
}

/// Whether the feedback still has to be written to stdout.
///
/// Streamed text is echoed on stderr, so it only stands in for stdout when
/// both end up on the same terminal and it matches the final feedback.
fn needs_stdout_copy(streamed: &str, feedback: &str, stdout_is_terminal: bool) -> bool {
    !stdout_is_terminal || streamed.trim() != feedback.trim()
}

fn report_outcome(
    outcome: &ReviewOutcome,
    request: &ReviewRequest,
    streamed: &str,
    stdout_is_terminal: bool,
) {
    match outcome {
        ReviewOutcome::Completed {
            feedback,
            transfer,
            timings,
        } => {
            if needs_stdout_copy(streamed, feedback, stdout_is_terminal) {
                if stdout_is_terminal || streamed.is_empty() {
                    print_feedback_header();
                }
                println!("{}", feedback);
                let _ = std::io::stdout().flush();
            }
            eprintln!(
                "\n{}",
                format_summary(timings, &request.model_name, *transfer, feedback)
            );
            eprintln!("{} {}", "✨".green(), outcome.status_label().green());
        }
        ReviewOutcome::NoDiff => {
            eprintln!(
                "No changes found between '{}' and '{}'.",
                request.target_ref, request.source_ref
            );
            eprintln!("{}", outcome.status_label());
        }
        ReviewOutcome::Cancelled => {
            eprintln!("{}", outcome.status_label().yellow());
        }
        ReviewOutcome::Failed {
            description,
            remediation,
        } => {
            eprintln!("{} {}", "Error:".red().bold(), description);
            if let Some(hint) = remediation {
                eprintln!("\n{}\n{}", "Troubleshooting:".bold(), hint);
            }
            eprintln!("{}", outcome.status_label().red());
        }
    }
}

/// Performance summary printed after a completed review.
pub fn format_summary(
    timings: &ReviewTimings,
    model: &str,
    transfer: TransferMode,
    feedback: &str,
) -> String {
    let ai_secs = timings.ai.as_secs_f64();
    let words = feedback.split_whitespace().count();
    let rate = if ai_secs > 0.0 {
        words as f64 / ai_secs
    } else {
        0.0
    };

    format!(
        "Performance Summary\n\
         Total time: {:.2}s\n\
         Diff generation: {:.2}s\n\
         AI processing: {:.2}s\n\
         Model: {} ({})\n\
         Estimated speed: {:.1} tokens/s",
        timings.total.as_secs_f64(),
        timings.diff.as_secs_f64(),
        ai_secs,
        model,
        transfer,
        rate
    )
}
