//! Job poller: waits for an ingestion job to finish.
//!
//! Behaviour:
//! - Query the job status once per tick.
//! - `COMPLETE` or `FAILED` ends polling immediately.
//! - Any other status (or a failed query) is reported, then the poller sleeps
//!   for the configured interval.
//! - After `ceil(timeout / interval)` ticks the job is declared timed out.
//! - A failed query still consumes its tick, so polling is always bounded.

use std::future::Future;

use serde::Serialize;

use crate::config::PollConfig;
use crate::error::ChatbotError;
use crate::notice::Notices;
use crate::remote::{IngestionControl, IngestionJobId, JobStatus};

/// Terminal state of a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollOutcome {
    /// The job completed.
    Complete,
    /// The job failed.
    Failed,
    /// The ceiling was reached first.
    TimedOut,
    /// Polling was abandoned by the caller.
    Cancelled,
}

impl PollOutcome {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Result of a poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollReport {
    /// How polling ended.
    pub outcome: PollOutcome,
    /// Status queries that returned, successfully or not.
    pub queries: u32,
    /// Last status actually observed.
    pub last_status: Option<JobStatus>,
}

/// Polls one ingestion job.
pub struct IngestionPoller<'a> {
    control: &'a dyn IngestionControl,
    knowledge_base_id: &'a str,
    data_source_id: &'a str,
    settings: PollConfig,
}

impl<'a> IngestionPoller<'a> {
    /// Create a poller for jobs of `data_source_id` in `knowledge_base_id`.
    #[must_use]
    pub const fn new(
        control: &'a dyn IngestionControl,
        knowledge_base_id: &'a str,
        data_source_id: &'a str,
        settings: PollConfig,
    ) -> Self {
        Self {
            control,
            knowledge_base_id,
            data_source_id,
            settings,
        }
    }

    /// Poll until the job is terminal or the ceiling is reached.
    pub async fn wait_for_completion(
        &self,
        job_id: &IngestionJobId,
        notices: &mut Notices,
    ) -> PollReport {
        self.wait_for_completion_until(job_id, notices, std::future::pending())
            .await
    }

    /// Like [`IngestionPoller::wait_for_completion`], but gives up with
    /// [`PollOutcome::Cancelled`] as soon as `cancel` resolves.
    pub async fn wait_for_completion_until<F>(
        &self,
        job_id: &IngestionJobId,
        notices: &mut Notices,
        cancel: F,
    ) -> PollReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        let max_ticks = self.settings.max_ticks();
        let mut report = PollReport {
            outcome: PollOutcome::TimedOut,
            queries: 0,
            last_status: None,
        };

        for tick in 1..=max_ticks {
            let observed = tokio::select! {
                biased;
                () = &mut cancel => return cancelled(report, notices),
                result = self.control.ingestion_job_status(
                    self.knowledge_base_id,
                    self.data_source_id,
                    job_id,
                ) => result,
            };
            report.queries += 1;

            match observed {
                Ok(status) if status.is_terminal() => {
                    report.outcome = if status == JobStatus::Complete {
                        notices.success("Ingestion job completed successfully!");
                        PollOutcome::Complete
                    } else {
                        notices.error("Ingestion job failed.");
                        PollOutcome::Failed
                    };
                    report.last_status = Some(status);
                    return report;
                }
                Ok(status) => {
                    notices.info(format!("Ingestion job status: {status}. Waiting..."));
                    report.last_status = Some(status);
                }
                Err(e) => {
                    notices.error(format!("Error retrieving ingestion job status: {e}"));
                    notices.info("Ingestion job status: unknown. Waiting...");
                }
            }

            if tick < max_ticks {
                tokio::select! {
                    biased;
                    () = &mut cancel => return cancelled(report, notices),
                    () = tokio::time::sleep(self.settings.interval) => {}
                }
            }
        }

        notices.warning(ChatbotError::Timeout { checks: report.queries }.to_string());
        report
    }
}

fn cancelled(mut report: PollReport, notices: &mut Notices) -> PollReport {
    notices.warning("Stopped waiting for the ingestion job.");
    report.outcome = PollOutcome::Cancelled;
    report
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::notice::NoticeLevel;
    use crate::remote::fake::FakeIngestion;

    fn settings(interval: u64, timeout: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }

    async fn poll(control: &FakeIngestion, config: PollConfig) -> (PollReport, Notices) {
        let poller = IngestionPoller::new(control, "KB123", "DS456", config);
        let mut notices = Notices::new();
        let report = poller
            .wait_for_completion(&IngestionJobId::new("job-1"), &mut notices)
            .await;
        (report, notices)
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_two_waits() {
        let control = FakeIngestion::with_statuses(&["RUNNING", "RUNNING", "COMPLETE"]);
        let started = Instant::now();

        let (report, notices) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::Complete);
        assert_eq!(control.query_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(20));
        let last = notices.as_slice().last().map(|n| n.level);
        assert_eq!(last, Some(NoticeLevel::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_complete_wins_regardless_of_history() {
        let control = FakeIngestion::with_statuses(&["STARTING", "STOPPING", "COMPLETE", "FAILED"]);

        let (report, _) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::Complete);
        assert_eq!(report.queries, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stops_immediately() {
        let control = FakeIngestion::with_statuses(&["STARTING", "FAILED", "COMPLETE"]);

        let (report, notices) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::Failed);
        assert_eq!(control.query_count(), 2);
        assert!(notices.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_thirty_queries() {
        let control = FakeIngestion::with_statuses(&["IN_PROGRESS"]);
        let started = Instant::now();

        let (report, notices) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(control.query_count(), 30);
        assert_eq!(report.last_status, Some(JobStatus::InProgress));
        assert!(started.elapsed() <= Duration::from_secs(300));
        let last = notices.as_slice().last().map(|n| n.level);
        assert_eq!(last, Some(NoticeLevel::Warning));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_errors_consume_ticks() {
        let control = FakeIngestion::scripted(vec![None]);

        let (report, _) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(control.query_count(), 30);
        assert_eq!(report.last_status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_then_complete() {
        let control = FakeIngestion::scripted(vec![None, Some(JobStatus::Complete)]);

        let (report, notices) = poll(&control, settings(10, 300)).await;

        assert_eq!(report.outcome, PollOutcome::Complete);
        assert_eq!(report.queries, 2);
        assert!(notices.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_ceiling_rounds_up() {
        let control = FakeIngestion::with_statuses(&["IN_PROGRESS"]);

        let (report, _) = poll(&control, settings(7, 30)).await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.queries, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let control = FakeIngestion::with_statuses(&["IN_PROGRESS"]);
        let poller = IngestionPoller::new(&control, "KB123", "DS456", settings(10, 300));
        let mut notices = Notices::new();

        let report = poller
            .wait_for_completion_until(
                &IngestionJobId::new("job-1"),
                &mut notices,
                tokio::time::sleep(Duration::from_secs(25)),
            )
            .await;

        assert_eq!(report.outcome, PollOutcome::Cancelled);
        assert_eq!(report.queries, 3);
    }
}
