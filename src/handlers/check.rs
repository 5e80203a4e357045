use crate::{
    config::AppConfig,
    ollama::{check_connection, ProbeStatus},
};
use colored::Colorize;

/// Runs the connection probes and prints one line per probe. Returns whether all passed.
pub async fn handle_check(config: &AppConfig) -> bool {
    let ollama = &config.ollama;
    eprintln!(
        "Testing connection to {} with model {}...",
        ollama.api_url, ollama.model_name
    );

    let report = check_connection(ollama).await;
    for result in &report.results {
        let elapsed = format!("({:.2}s)", result.elapsed.as_secs_f64()).dimmed();
        match &result.status {
            ProbeStatus::Passed(detail) => {
                println!("{} {}: {} {}", "✓".green(), result.kind, detail, elapsed);
            }
            ProbeStatus::Failed(err) => {
                println!("{} {}: {} {}", "✗".red(), result.kind, err, elapsed);
                if let Some(hint) = err.remediation(&ollama.api_url, &ollama.model_name) {
                    println!("\n{}\n{}", "Troubleshooting:".bold(), hint);
                }
            }
        }
    }

    let healthy = report.is_healthy();
    if healthy {
        println!("{}", "Connection test successful.".green());
    }
    healthy
}
