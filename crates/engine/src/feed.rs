// In crates/engine/src/feed.rs

use core_types::TokenCandidate;
use futures::Stream;
use std::path::PathBuf;
use std::time::Duration;
use async_stream::stream;

/// Parses a JSON-lines document of candidates. Blank lines and lines starting
/// with `#` are ignored; malformed lines are logged and skipped.
pub fn parse_candidates(raw: &str) -> Vec<TokenCandidate> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(number, line)| match serde_json::from_str::<TokenCandidate>(line) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                tracing::warn!(line = number + 1, error = %e, "Skipping malformed candidate.");
                None
            }
        })
        .collect()
}

/// A candidate source backed by a JSON-lines file that an external discovery
/// process keeps rewriting.
#[derive(Debug, Clone)]
pub struct CandidateFeed {
    path: PathBuf,
    every: Duration,
}

impl CandidateFeed {
    pub fn new(path: impl Into<PathBuf>, every: Duration) -> Self {
        Self { path: path.into(), every }
    }

    /// Re-reads the file on every tick and yields each candidate in order.
    /// The stream never ends; an unreadable file is retried on the next tick.
    pub fn subscribe(&self) -> impl Stream<Item = TokenCandidate> {
        let path = self.path.clone();
        let every = self.every;

        stream! {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match tokio::fs::read_to_string(&path).await {
                    Ok(raw) => {
                        let candidates = parse_candidates(&raw);
                        tracing::info!(path = %path.display(), count = candidates.len(), "Loaded candidate batch.");
                        for candidate in candidates {
                            yield candidate;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to read candidate feed.");
                    }
                }
            }
        }
    }
}
