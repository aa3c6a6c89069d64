//! Periodic lifecycle sweep scheduler.
//!
//! Runs the archival and disposal-scheduling sweeps on a fixed interval in
//! a background thread, and on demand via a broadcast trigger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast;

use super::sweep::SweepReport;
use crate::engine::LifecycleEngine;

/// Periodic sweep scheduler driving a [`LifecycleEngine`].
pub struct SweepScheduler {
    engine: Arc<LifecycleEngine>,
    interval: Duration,
    run_on_start: bool,
    shutdown: Arc<AtomicBool>,
}

impl SweepScheduler {
    /// Creates a new sweep scheduler.
    pub fn new(engine: Arc<LifecycleEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            run_on_start: false,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs one sweep as soon as the loop starts instead of waiting a full interval.
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// Start the sweep loop in a background thread.
    /// Accepts a trigger receiver for manual sweep requests.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let run_on_start = self.run_on_start;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to start sweep scheduler runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                if !run_on_start {
                    interval_timer.tick().await; // skip immediate first tick
                }

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            log::info!("Manual lifecycle sweep triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    let today = Local::now().date_naive();
                    match engine.run_sweep(today) {
                        Ok(report) => log_sweep_report(&report),
                        Err(e) => log::error!("Lifecycle sweep failed: {}", e),
                    }
                }
            });
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn log_sweep_report(report: &SweepReport) {
    for (level, line) in summarize(report) {
        log::log!(level, "{}", line);
    }
}

/// Log lines for a finished sweep. Transitions and failures are reported
/// independently of each other.
fn summarize(report: &SweepReport) -> Vec<(log::Level, String)> {
    let mut lines = Vec::new();
    if !report.transitioned.is_empty() {
        lines.push((
            log::Level::Info,
            format!(
                "Lifecycle sweep: {} record(s) transitioned",
                report.transitioned.len()
            ),
        ));
    }
    if !report.failed.is_empty() {
        lines.push((
            log::Level::Warn,
            format!("Lifecycle sweep: {} record(s) failed", report.failed.len()),
        ));
        for failure in &report.failed {
            lines.push((
                log::Level::Warn,
                format!("  record {}: {}", failure.record_id, failure.message),
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::engine::EngineSettings;
    use crate::lifecycle::SweepFailure;

    #[test]
    fn test_summary_reports_failures_alongside_transitions() {
        let report = SweepReport {
            examined: 3,
            transitioned: vec![1, 3],
            skipped: vec![],
            failed: vec![SweepFailure {
                record_id: 2,
                message: "Persistence failure: SQLite error: disk I/O error".to_string(),
            }],
        };

        let lines = summarize(&report);
        let levels: Vec<log::Level> = lines.iter().map(|(level, _)| *level).collect();
        assert_eq!(
            levels,
            vec![log::Level::Info, log::Level::Warn, log::Level::Warn]
        );
        assert_eq!(lines[0].1, "Lifecycle sweep: 2 record(s) transitioned");
        assert_eq!(lines[1].1, "Lifecycle sweep: 1 record(s) failed");
        assert!(lines[2].1.contains("record 2"));

        assert!(summarize(&SweepReport::default()).is_empty());
    }

    #[test]
    fn test_scheduler_shutdown() {
        let db = Database::open_in_memory().unwrap();
        let engine = Arc::new(LifecycleEngine::new(db, EngineSettings::default()));

        let scheduler = SweepScheduler::new(engine, Duration::from_millis(50));

        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        // Let it run briefly then stop
        std::thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        // Send a trigger to wake up the select loop so it sees the shutdown
        let _ = trigger_tx.send(());

        handle.join().expect("scheduler thread panicked");
    }

    #[test]
    fn test_manual_trigger_runs_sweep() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO offices (id, name) VALUES (1, 'Registry');
                 INSERT INTO classifications (id, code, title) VALUES (1, 'ADM-01', 'Memos');
                 INSERT INTO records (id, title, classification_id, office_id, period_from,
                     period_to, active_years, storage_years, total_years, time_value, status,
                     created_by, created_at, updated_at)
                     VALUES (1, 'Memo', 1, 1, '2000-01-01', '2001-01-01', 1, 1, 2,
                             'Temporary', 'Inactive', 0, 'now', 'now');",
            )?;
            Ok(())
        })
        .unwrap();
        let engine = Arc::new(LifecycleEngine::new(db, EngineSettings::default()));

        let scheduler = SweepScheduler::new(Arc::clone(&engine), Duration::from_secs(3600));
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        std::thread::sleep(Duration::from_millis(50));
        trigger_tx.send(()).unwrap();

        let mut archived = false;
        for _ in 0..50 {
            std::thread::sleep(Duration::from_millis(20));
            let status = engine
                .db()
                .with_conn(|conn| crate::db::record_repo::find_by_id(conn, 1))
                .unwrap()
                .map(|r| r.status);
            if status == Some(crate::lifecycle::RecordStatus::Archived) {
                archived = true;
                break;
            }
        }

        scheduler.stop();
        let _ = trigger_tx.send(());
        handle.join().expect("scheduler thread panicked");
        assert!(archived, "manual trigger should archive the overdue record");
    }
}
