use crate::config::{AppConfig, OllamaConfig};
use crate::errors::AIError;
use crate::review::{streaming_percent, CancellationToken, ProgressSink, ReviewEvent};
use crate::types::TransferMode;
use futures_util::StreamExt;
use std::future::Future;
use std::time::{Duration, Instant};

use super::client::OllamaClient;
use super::prompt::build_prompt;
use super::stream::{LineDecoder, StreamChunk};

/// How often a stalled stream re-checks the cancellation flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(250);
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const PROGRESS_EVERY_CHUNKS: u64 = 10;
const THROUGHPUT_EVERY_CHUNKS: u64 = 20;

/// Successful result of [`ReviewInvoker::review`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewReply {
    Feedback { text: String, transfer: TransferMode },
    Cancelled,
}

enum StreamOutcome {
    Finished(String),
    Cancelled,
}

/// Requests a review of a diff from an Ollama endpoint.
///
/// Streams first (unless disabled) and falls back to one blocking request if
/// the stream fails for any reason. There is no retry after that.
#[derive(Debug, Clone)]
pub struct ReviewInvoker {
    template: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    stream: bool,
}

impl ReviewInvoker {
    pub fn new(config: &OllamaConfig, template: impl Into<String>) -> Self {
        ReviewInvoker {
            template: template.into(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            stream: config.stream,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(&config.ollama, config.review_prompt.clone())
    }

    pub async fn review(
        &self,
        diff_text: &str,
        endpoint_url: &str,
        model_name: &str,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<ReviewReply, AIError> {
        if cancel.is_cancelled() {
            return Ok(ReviewReply::Cancelled);
        }

        let client = OllamaClient::with_timeouts(
            endpoint_url,
            model_name,
            self.connect_timeout,
            self.request_timeout,
        )?;
        let prompt = build_prompt(&self.template, diff_text);

        if self.stream {
            match self.stream_review(&client, &prompt, cancel, progress).await {
                Ok(StreamOutcome::Finished(text)) => {
                    return finish(text, TransferMode::Streaming);
                }
                Ok(StreamOutcome::Cancelled) => {
                    tracing::info!("Streaming review cancelled");
                    return Ok(ReviewReply::Cancelled);
                }
                Err(err) => {
                    tracing::warn!("Streaming failed, falling back to a blocking request: {}", err);
                    progress.send(ReviewEvent::FallbackToBlocking(err.to_string()));
                }
            }

            if cancel.is_cancelled() {
                return Ok(ReviewReply::Cancelled);
            }
        }

        progress.status("Waiting for the complete AI response...");
        let text = client.generate_blocking(&prompt).await?;
        finish(text, TransferMode::Blocking)
    }

    async fn stream_review(
        &self,
        client: &OllamaClient,
        prompt: &str,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<StreamOutcome, AIError> {
        let Some(response) = until_cancelled(client.open_stream(prompt), cancel).await else {
            return Ok(StreamOutcome::Cancelled);
        };
        let mut body = std::pin::pin!(response?.bytes_stream());

        let mut decoder = LineDecoder::new();
        let mut state = StreamState::new(progress);

        loop {
            let Some(next) = until_cancelled(body.next(), cancel).await else {
                return Ok(StreamOutcome::Cancelled);
            };

            let (lines, ended) = match next {
                Some(Ok(bytes)) => (decoder.push(&bytes), false),
                Some(Err(e)) => return Err(client.classify(e)),
                None => (decoder.finish().into_iter().collect(), true),
            };

            for line in lines {
                if cancel.is_cancelled() {
                    return Ok(StreamOutcome::Cancelled);
                }
                let chunk = StreamChunk::parse(&line)?;
                state.accept(chunk.response);
                if chunk.done {
                    return Ok(StreamOutcome::Finished(state.finish()));
                }
            }

            if ended {
                tracing::debug!("Stream closed before the final chunk");
                return Ok(StreamOutcome::Finished(state.finish()));
            }
        }
    }
}

/// Accumulated text and progress bookkeeping for one streaming transfer.
struct StreamState<'a> {
    progress: &'a ProgressSink,
    text: String,
    chunks: u64,
    started: Instant,
    last_progress: Instant,
}

impl<'a> StreamState<'a> {
    fn new(progress: &'a ProgressSink) -> Self {
        let now = Instant::now();
        StreamState {
            progress,
            text: String::new(),
            chunks: 0,
            started: now,
            last_progress: now,
        }
    }

    fn accept(&mut self, fragment: String) {
        if fragment.is_empty() {
            return;
        }
        self.chunks += 1;
        self.text.push_str(&fragment);
        self.progress.send(ReviewEvent::Fragment(fragment));

        if self.chunks % PROGRESS_EVERY_CHUNKS == 0
            || self.last_progress.elapsed() >= PROGRESS_INTERVAL
        {
            self.progress.progress(streaming_percent(self.chunks));
            self.last_progress = Instant::now();
        }
        if self.chunks % THROUGHPUT_EVERY_CHUNKS == 0 {
            self.report_throughput();
        }
    }

    fn report_throughput(&self) {
        self.progress.send(ReviewEvent::Throughput {
            chunks: self.chunks,
            elapsed: self.started.elapsed(),
        });
    }

    fn finish(self) -> String {
        self.report_throughput();
        tracing::debug!(
            "Stream finished: {} chunks in {:.1}s",
            self.chunks,
            self.started.elapsed().as_secs_f64()
        );
        self.text
    }
}

/// Awaits `fut`, giving up with `None` once `cancel` is seen set.
async fn until_cancelled<F: Future>(fut: F, cancel: &CancellationToken) -> Option<F::Output> {
    let mut fut = std::pin::pin!(fut);
    loop {
        tokio::select! {
            output = &mut fut => return Some(output),
            _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                if cancel.is_cancelled() {
                    return None;
                }
            }
        }
    }
}

fn finish(text: String, transfer: TransferMode) -> Result<ReviewReply, AIError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AIError::EmptyResponse);
    }
    Ok(ReviewReply::Feedback {
        text: text.to_string(),
        transfer,
    })
}
