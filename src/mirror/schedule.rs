//! Cron-driven repetition of the mirror job

use super::{JobScope, Mirror};
use crate::{ConsoleError, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;

/// Parse a cron expression (seconds field included)
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression).map_err(|e| {
        ConsoleError::config(format!("Invalid mirror schedule '{}': {}", expression, e))
    })
}

/// Next time the schedule fires after now
pub fn next_run(schedule: &Schedule) -> Option<DateTime<Utc>> {
    schedule.upcoming(Utc).next()
}

/// Run the job on every tick of `schedule` until `shutdown` resolves
///
/// A failed run is logged and the loop waits for the next tick.
pub async fn watch<F>(mirror: &Mirror, schedule: &Schedule, scope: JobScope, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let Some(next) = next_run(schedule) else {
            tracing::info!("Mirror schedule has no upcoming runs");
            return Ok(());
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::info!(next = %next.to_rfc3339(), "Waiting for next mirror run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                match mirror.run_job(scope).await {
                    Ok(report) if report.is_success() => {}
                    Ok(report) => {
                        tracing::warn!(failed = report.failed.len(), "Mirror run finished with failures");
                    }
                    Err(e) => tracing::error!(error = %e, "Mirror run failed"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Mirror watch stopped");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{SourceHost, UpstreamTag};
    use crate::testing::VersionFixture;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait]
    impl SourceHost for EmptySource {
        async fn list_tags(&self) -> Result<Vec<UpstreamTag>> {
            Ok(Vec::new())
        }

        async fn download(&self, url: &str) -> Result<Bytes> {
            Err(ConsoleError::upstream(format!("unreachable: {}", url)))
        }

        fn branch_archive_url(&self, branch: &str) -> String {
            format!("http://localhost/zipball/{}", branch)
        }
    }

    #[test]
    fn test_parse_schedule() {
        let schedule = parse_schedule("0 0 3 * * *").unwrap();
        let next = next_run(&schedule).unwrap();
        assert!(next > Utc::now());

        assert!(matches!(
            parse_schedule("every night"),
            Err(ConsoleError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_stops_on_shutdown() {
        let fixture = VersionFixture::new().unwrap();
        let mirror = Mirror::new(fixture.layout().clone(), Arc::new(EmptySource));
        let schedule = parse_schedule("0 0 3 * * *").unwrap();

        watch(&mirror, &schedule, JobScope::All, async {})
            .await
            .unwrap();
        assert!(!fixture.layout().record_path().exists());
    }
}
