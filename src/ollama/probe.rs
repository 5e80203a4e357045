use crate::config::OllamaConfig;
use crate::errors::AIError;
use futures_util::StreamExt;
use std::time::{Duration, Instant};

use super::client::OllamaClient;
use super::stream::{LineDecoder, StreamChunk};

const SERVER_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const SERVER_TIMEOUT: Duration = Duration::from_secs(5);
const MODEL_TIMEOUT: Duration = Duration::from_secs(15);
const PERFORMANCE_TIMEOUT: Duration = Duration::from_secs(20);

const MODEL_PROMPT: &str = "Test";
const PERFORMANCE_PROMPT: &str = "Hello, respond with just 'Hi'";
const SAMPLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Server,
    Model,
    Performance,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Server => write!(f, "Ollama server"),
            ProbeKind::Model => write!(f, "Model"),
            ProbeKind::Performance => write!(f, "Performance"),
        }
    }
}

#[derive(Debug)]
pub enum ProbeStatus {
    Passed(String),
    Failed(AIError),
}

#[derive(Debug)]
pub struct ProbeResult {
    pub kind: ProbeKind,
    pub elapsed: Duration,
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn passed(&self) -> bool {
        matches!(self.status, ProbeStatus::Passed(_))
    }
}

/// Results of `check_connection`, in the order the probes ran.
#[derive(Debug, Default)]
pub struct ConnectionReport {
    pub results: Vec<ProbeResult>,
}

impl ConnectionReport {
    pub fn is_healthy(&self) -> bool {
        self.results.len() == 3 && self.results.iter().all(ProbeResult::passed)
    }

    /// The failed probe, if any. Probes after a failure are not run.
    pub fn failure(&self) -> Option<&ProbeResult> {
        self.results.iter().find(|result| !result.passed())
    }
}

/// Checks the server, then the model, then streaming speed, stopping at the first failure.
pub async fn check_connection(config: &OllamaConfig) -> ConnectionReport {
    let mut report = ConnectionReport::default();

    let probes = [ProbeKind::Server, ProbeKind::Model, ProbeKind::Performance];
    for kind in probes {
        let started = Instant::now();
        let status = match run_probe(kind, config).await {
            Ok(detail) => ProbeStatus::Passed(detail),
            Err(err) => ProbeStatus::Failed(err),
        };
        let result = ProbeResult {
            kind,
            elapsed: started.elapsed(),
            status,
        };
        tracing::info!("{} probe finished in {:.2}s", kind, result.elapsed.as_secs_f64());

        let failed = !result.passed();
        report.results.push(result);
        if failed {
            break;
        }
    }

    report
}

async fn run_probe(kind: ProbeKind, config: &OllamaConfig) -> Result<String, AIError> {
    match kind {
        ProbeKind::Server => {
            let client = OllamaClient::with_timeouts(
                &config.api_url,
                &config.model_name,
                SERVER_CONNECT_TIMEOUT,
                SERVER_TIMEOUT,
            )?;
            let version = client.server_version().await?;
            Ok(format!("running (version {version})"))
        }
        ProbeKind::Model => {
            let client = OllamaClient::with_timeouts(
                &config.api_url,
                &config.model_name,
                config.connect_timeout(),
                MODEL_TIMEOUT,
            )?;
            let sample = client.generate_blocking(MODEL_PROMPT).await?;
            let sample: String = sample.trim().chars().take(SAMPLE_CHARS).collect();
            Ok(format!("'{}' responded: {}", client.model(), sample))
        }
        ProbeKind::Performance => {
            let client = OllamaClient::with_timeouts(
                &config.api_url,
                &config.model_name,
                config.connect_timeout(),
                PERFORMANCE_TIMEOUT,
            )?;
            measure_streaming(&client).await
        }
    }
}

async fn measure_streaming(client: &OllamaClient) -> Result<String, AIError> {
    let started = Instant::now();
    let response = client.open_stream(PERFORMANCE_PROMPT).await?;
    let mut body = std::pin::pin!(response.bytes_stream());

    let mut decoder = LineDecoder::new();
    let mut first_token: Option<Duration> = None;
    let mut chunks: u64 = 0;

    'read: while let Some(bytes) = body.next().await {
        let bytes = bytes.map_err(|e| client.classify(e))?;
        for line in decoder.push(&bytes) {
            let chunk = StreamChunk::parse(&line)?;
            if !chunk.response.is_empty() {
                chunks += 1;
                first_token.get_or_insert_with(|| started.elapsed());
            }
            if chunk.done {
                break 'read;
            }
        }
    }

    let Some(first_token) = first_token else {
        return Err(AIError::EmptyResponse);
    };
    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        chunks as f64 / elapsed
    } else {
        0.0
    };
    Ok(format!(
        "first token after {:.2}s, {:.1} chunks/s",
        first_token.as_secs_f64(),
        rate
    ))
}
