//! Background-generation monitor.
//!
//! Ultra artifacts may be produced after the generation request returns. The
//! monitor re-reads the session history on a fixed interval until the artifact
//! shows up, the job reports failure, the deadline passes or the caller
//! cancels. It stops on the first terminal observation, so the artifact is
//! delivered at most once.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::StudyApiClient;
use crate::models::{HistoryEntry, JobStatus, UltraArtifact, UltraKind};
use crate::Result;

/// Estimated minutes of work per remaining section.
pub const MINUTES_PER_SECTION: u32 = 3;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Where the monitor reads session history from.
pub trait HistorySource: Send + Sync {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send;
}

impl HistorySource for StudyApiClient {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send {
        self.history()
    }
}

/// Section counter reported while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UltraProgress {
    pub kind: UltraKind,
    pub current: u32,
    pub total: u32,
    pub eta_minutes: u32,
}

impl UltraProgress {
    pub fn new(kind: UltraKind, current: u32, total: u32) -> Self {
        Self {
            kind,
            current,
            total,
            eta_minutes: total.saturating_sub(current) * MINUTES_PER_SECTION,
        }
    }
}

/// How a monitored job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UltraOutcome {
    Completed(UltraArtifact),
    Failed(String),
    TimedOut,
    Cancelled,
}

enum Observation {
    Ready(UltraArtifact),
    Failed(String),
    Progress(UltraProgress),
    Waiting,
}

fn inspect(entries: &[HistoryEntry], session_id: &str, kind: UltraKind) -> Observation {
    let Some(entry) = entries.iter().find(|entry| entry.id == session_id) else {
        return Observation::Waiting;
    };

    if let Some(artifact) = entry
        .results
        .as_ref()
        .and_then(|results| UltraArtifact::from_results(results, kind))
    {
        return Observation::Ready(artifact);
    }

    match entry.processing_metadata.status(kind) {
        JobStatus::Failed(reason) => Observation::Failed(
            reason.unwrap_or_else(|| format!("The {} could not be generated", kind.label())),
        ),
        JobStatus::InProgress => match entry.processing_metadata.sections(kind) {
            Some((current, total)) => Observation::Progress(UltraProgress::new(kind, current, total)),
            None => Observation::Waiting,
        },
        JobStatus::Completed | JobStatus::Unknown => Observation::Waiting,
    }
}

/// Polls history for one `(session, kind)` job.
pub struct UltraMonitor<S> {
    source: S,
    session_id: String,
    kind: UltraKind,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl<S: HistorySource> UltraMonitor<S> {
    pub fn new(source: S, session_id: impl Into<String>, kind: UltraKind) -> Self {
        Self {
            source,
            session_id: session_id.into(),
            kind,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the poll interval and deadline. A zero interval is raised to
    /// one millisecond.
    pub fn with_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self.timeout = timeout;
        self
    }

    /// Token that stops this monitor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Poll until a terminal outcome, reporting in-progress counters.
    pub async fn run<F>(self, mut on_progress: F) -> UltraOutcome
    where
        F: FnMut(UltraProgress) + Send,
    {
        let deadline = Instant::now() + self.timeout;
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            session_id = %self.session_id,
            kind = ?self.kind,
            interval_secs = self.interval.as_secs(),
            "Polling for background generation"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return UltraOutcome::Cancelled,
                _ = time::sleep_until(deadline) => {
                    warn!(session_id = %self.session_id, kind = ?self.kind, "Background generation polling timed out");
                    return UltraOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return UltraOutcome::Cancelled,
                _ = time::sleep_until(deadline) => return UltraOutcome::TimedOut,
                fetched = self.source.fetch_history() => fetched,
            };

            let entries = match fetched {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "History poll failed");
                    continue;
                }
            };

            match inspect(&entries, &self.session_id, self.kind) {
                Observation::Ready(artifact) => {
                    info!(session_id = %self.session_id, kind = ?self.kind, "Background generation completed");
                    return UltraOutcome::Completed(artifact);
                }
                Observation::Failed(reason) => {
                    warn!(session_id = %self.session_id, kind = ?self.kind, reason = %reason, "Background generation failed");
                    return UltraOutcome::Failed(reason);
                }
                Observation::Progress(progress) => on_progress(progress),
                Observation::Waiting => {}
            }
        }
    }
}

impl<S: HistorySource + 'static> UltraMonitor<S> {
    /// Run on a background task. Progress is sent on `progress`; dropping the
    /// handle cancels the task.
    pub fn spawn(self, progress: mpsc::UnboundedSender<UltraProgress>) -> MonitorHandle {
        let cancel = self.cancellation_token();
        let task = tokio::spawn(self.run(move |update| {
            let _ = progress.send(update);
        }));

        MonitorHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Owner of a spawned monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<UltraOutcome>>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the monitor to finish.
    pub async fn outcome(mut self) -> UltraOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(UltraOutcome::Cancelled),
            None => UltraOutcome::Cancelled,
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
