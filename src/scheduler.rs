//! Drives observation cycles at a fixed interval.
//!
//! Each tick asks the source for windows, builds the current snapshot,
//! diffs it against the previous one and appends the new tabs through one
//! insert statement that lives as long as the scheduler. The previous
//! snapshot is replaced after every tick that got a window list, whether
//! or not the inserts succeeded.
//!
//! Ticks never overlap: `tick` is synchronous and the loop only polls the
//! ticker again once it returns. Ticks missed while a slow cycle ran are
//! skipped rather than fired in a burst.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::snapshot::diff::diff;
use crate::snapshot::{Item, Snapshot, Stamp};
use crate::source::TabSource;
use crate::store::schema::{self, INSERT_ITEM};
use crate::store::{DbError, Statement, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Stopped,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Distinct urls seen this pass.
    pub observed: usize,
    /// Urls not present in the previous pass.
    pub pending: usize,
    pub inserted: usize,
    pub failed: usize,
    /// The source could not be read; nothing else happened.
    pub skipped: bool,
}

pub struct Scheduler<'s> {
    store: &'s Store,
    source: Box<dyn TabSource>,
    interval: Duration,
    insert: Option<Statement<'s>>,
    bootstrapped: bool,
    previous: Snapshot,
    state: State,
    cycles: u64,
}

impl<'s> Scheduler<'s> {
    pub fn new(store: &'s Store, source: Box<dyn TabSource>, interval: Duration) -> Self {
        Scheduler {
            store,
            source,
            interval,
            insert: None,
            bootstrapped: false,
            previous: Snapshot::new(),
            state: State::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of ticks run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Run one cycle stamped with the current local time.
    pub fn tick(&mut self) -> TickReport {
        self.tick_at(&Stamp::now())
    }

    pub fn tick_at(&mut self, stamp: &Stamp) -> TickReport {
        self.state = State::Running;
        self.cycles += 1;

        let report = self.cycle(stamp);

        if report.inserted > 0 {
            info!(
                inserted = report.inserted,
                observed = report.observed,
                failed = report.failed,
                "recorded new tabs"
            );
        } else {
            debug!(observed = report.observed, failed = report.failed, skipped = report.skipped, "tick done");
        }
        if let Some(usage) = memory_stats::memory_stats() {
            debug!(physical_bytes = usage.physical_mem, "memory after tick");
        }

        self.state = State::Idle;
        report
    }

    fn cycle(&mut self, stamp: &Stamp) -> TickReport {
        let windows = match self.source.windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "could not list windows, skipping tick");
                return TickReport {
                    skipped: true,
                    ..TickReport::default()
                };
            }
        };

        let current = Snapshot::from_windows(&windows, stamp);

        if !self.bootstrapped {
            // one attempt only; a failed bootstrap leaves no insert path
            self.bootstrapped = true;
            self.insert = self.bootstrap();
        }

        let pending = diff(&current, &self.previous);
        let mut report = TickReport {
            observed: current.len(),
            pending: pending.len(),
            ..TickReport::default()
        };

        match self.insert.as_mut() {
            Some(insert) => {
                for item in &pending {
                    match persist(insert, item) {
                        Ok(()) => report.inserted += 1,
                        Err(e) => {
                            report.failed += 1;
                            warn!(url = %item.url, code = e.code(), error = %e.message(), "failed to record tab");
                        }
                    }
                }
            }
            None if !pending.is_empty() => {
                report.failed = pending.len();
                warn!(pending = pending.len(), "no insert statement, new tabs not recorded");
            }
            None => {}
        }

        self.previous = current;
        report
    }

    fn bootstrap(&self) -> Option<Statement<'s>> {
        if let Err(e) = schema::ensure_table(self.store) {
            error!(code = e.code(), error = %e.message(), "could not create table");
            return None;
        }

        match Statement::prepare(self.store, INSERT_ITEM) {
            Ok(insert) => Some(insert),
            Err(e) => {
                error!(code = e.code(), error = %e.message(), "could not prepare insert");
                None
            }
        }
    }

    /// Tick every interval until `shutdown` resolves. The first tick fires
    /// one interval after the call.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            interval = ?self.interval,
            store = %self.store.target(),
            source = self.source.name(),
            "tracking tabs"
        );
        if !self.source.available() {
            warn!(source = self.source.name(), "source is not available yet, ticks will be skipped");
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        self.state = State::Stopped;
        info!(cycles = self.cycles, "stopped");
    }

    /// Destroy the insert statement. The store can be closed afterwards.
    pub fn finish(mut self) -> Result<(), DbError> {
        self.state = State::Stopped;
        match self.insert.take() {
            Some(insert) => insert.destroy(),
            None => Ok(()),
        }
    }
}

/// Bind and insert one item. Bindings are cleared whatever happens to it.
fn persist(insert: &mut Statement<'_>, item: &Item) -> Result<(), DbError> {
    let result = insert.bind(item.row()).and_then(|()| insert.execute());
    let cleared = insert.reset_bindings();
    result?;
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Mode;
    use crate::source::{SourceError, Tab, Window};
    use crate::store::{Row, Target};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Hands out one prepared response per call, then empty window lists.
    struct ScriptedSource {
        responses: VecDeque<Result<Vec<Window>, SourceError>>,
    }

    impl ScriptedSource {
        fn boxed(responses: Vec<Result<Vec<Window>, SourceError>>) -> Box<dyn TabSource> {
            Box::new(ScriptedSource {
                responses: responses.into(),
            })
        }
    }

    impl TabSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn available(&self) -> bool {
            true
        }

        fn windows(&mut self) -> Result<Vec<Window>, SourceError> {
            self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    type CallLog = Arc<Mutex<Vec<(Instant, Instant)>>>;

    /// Blocks the thread inside `windows()` like a browser that is slow to
    /// answer, and records when each call started and ended.
    struct SlowSource {
        first: Duration,
        rest: Duration,
        busy: Arc<AtomicBool>,
        calls: CallLog,
    }

    impl SlowSource {
        fn boxed(first: Duration, rest: Duration) -> (Box<dyn TabSource>, CallLog) {
            let calls = CallLog::default();
            let source = SlowSource {
                first,
                rest,
                busy: Arc::new(AtomicBool::new(false)),
                calls: Arc::clone(&calls),
            };
            (Box::new(source), calls)
        }
    }

    impl TabSource for SlowSource {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn available(&self) -> bool {
            true
        }

        fn windows(&mut self) -> Result<Vec<Window>, SourceError> {
            assert!(!self.busy.swap(true, Ordering::SeqCst), "windows() entered while a call was in flight");
            let mut calls = self.calls.lock().unwrap();
            let delay = if calls.is_empty() { self.first } else { self.rest };

            let started = Instant::now();
            std::thread::sleep(delay);
            calls.push((started, Instant::now()));

            self.busy.store(false, Ordering::SeqCst);
            Ok(vec![window("normal", &[("A", "u1")])])
        }
    }

    fn window(mode: &str, tabs: &[(&str, &str)]) -> Window {
        Window {
            mode: mode.to_string(),
            tabs: tabs
                .iter()
                .map(|(title, url)| Tab {
                    title: title.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        }
    }

    fn stamp() -> Stamp {
        Stamp {
            time: "9:00".to_string(),
            date: "1-1-2024".to_string(),
        }
    }

    fn failure() -> SourceError {
        SourceError::Failed {
            source_name: "scripted",
            message: "browser went away".to_string(),
        }
    }

    fn logged(store: &Store) -> Vec<Row> {
        let mut select = store.prepare("SELECT * FROM data ORDER BY rowid").unwrap();
        select.fetch_all().unwrap()
    }

    fn urls(rows: &[Row]) -> Vec<String> {
        let mut urls: Vec<String> = rows.iter().map(|r| r[0].as_str().unwrap().to_string()).collect();
        urls.sort();
        urls
    }

    #[test]
    fn first_tick_records_everything() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![Ok(vec![window("normal", &[("A", "u1")])])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        let report = scheduler.tick_at(&stamp());
        assert_eq!(report.inserted, 1);
        assert_eq!(scheduler.previous().len(), 1);
        assert!(scheduler.previous().contains_url("u1"));
        assert_eq!(scheduler.state(), State::Idle);

        let rows = logged(&store);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row[0].as_str(), Some("u1"));
        assert_eq!(row[1].as_str(), Some("A"));
        assert_eq!(row[2].as_i64(), Some(0));
        assert_eq!(row[3].as_str(), Some("9:00"));
        assert_eq!(row[4].as_str(), Some("1-1-2024"));
    }

    #[test]
    fn later_ticks_record_only_new_urls() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![
            Ok(vec![window("normal", &[("A", "u1")])]),
            Ok(vec![window("normal", &[("A", "u1"), ("B", "u2")])]),
        ]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        scheduler.tick_at(&stamp());
        let report = scheduler.tick_at(&stamp());
        assert_eq!(report.observed, 2);
        assert_eq!(report.pending, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(urls(&logged(&store)), vec!["u1", "u2"]);
    }

    #[test]
    fn title_change_is_not_logged_again() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![
            Ok(vec![window("normal", &[("Old Title", "u1")])]),
            Ok(vec![window("incognito", &[("New Title", "u1")])]),
        ]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        scheduler.tick_at(&stamp());
        let report = scheduler.tick_at(&stamp());
        assert_eq!(report.pending, 0);
        assert_eq!(logged(&store).len(), 1);
        // previous now holds the newer observation
        assert_eq!(scheduler.previous().get("u1").unwrap().title, "New Title");
    }

    #[test]
    fn incognito_flag_is_stored_as_one() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![Ok(vec![window("INCOGNITO", &[("S", "secret")])])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        scheduler.tick_at(&stamp());
        assert_eq!(logged(&store)[0][2].as_i64(), Some(Mode::Incognito.as_flag()));
    }

    #[test]
    fn source_failure_skips_tick_and_keeps_previous() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![
            Ok(vec![window("normal", &[("A", "u1")])]),
            Err(failure()),
            Ok(vec![window("normal", &[("A", "u1"), ("B", "u2")])]),
        ]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        scheduler.tick_at(&stamp());
        let skipped = scheduler.tick_at(&stamp());
        assert!(skipped.skipped);
        assert!(scheduler.previous().contains_url("u1"));

        let report = scheduler.tick_at(&stamp());
        assert_eq!(report.inserted, 1);
        assert_eq!(urls(&logged(&store)), vec!["u1", "u2"]);
        assert_eq!(scheduler.cycles(), 3);
    }

    #[test]
    fn one_failed_insert_does_not_stop_the_batch() {
        let store = Store::open(&Target::InMemory).unwrap();
        store.execute_batch(schema::CREATE_TABLE).unwrap();
        store
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON data WHEN NEW.url = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let source = ScriptedSource::boxed(vec![Ok(vec![window(
            "normal",
            &[("A", "u1"), ("Bad", "bad"), ("C", "u3")],
        )])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        let report = scheduler.tick_at(&stamp());
        assert_eq!(report.pending, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(urls(&logged(&store)), vec!["u1", "u3"]);
        // the failed url still counts as seen
        assert!(scheduler.previous().contains_url("bad"));
    }

    #[test]
    fn failed_bootstrap_leaves_no_insert_path_but_rotates_snapshots() {
        let store = Store::open(&Target::InMemory).unwrap();
        store.execute_batch("PRAGMA query_only = ON").unwrap();

        let source = ScriptedSource::boxed(vec![
            Ok(vec![window("normal", &[("A", "u1")])]),
            Ok(vec![window("normal", &[("A", "u1"), ("B", "u2")])]),
        ]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        let first = scheduler.tick_at(&stamp());
        assert_eq!(first.inserted, 0);
        assert_eq!(first.failed, 1);

        let second = scheduler.tick_at(&stamp());
        assert_eq!(second.pending, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(scheduler.previous().len(), 2);
    }

    #[test]
    fn existing_table_is_reused() {
        let store = Store::open(&Target::InMemory).unwrap();
        store.execute_batch(schema::CREATE_TABLE).unwrap();
        store
            .execute_batch("INSERT INTO data VALUES ('old', 'Old', 0, '1:1', '1-1-2020')")
            .unwrap();

        let source = ScriptedSource::boxed(vec![Ok(vec![window("normal", &[("A", "u1")])])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));
        assert_eq!(scheduler.tick_at(&stamp()).inserted, 1);
        assert_eq!(urls(&logged(&store)), vec!["old", "u1"]);
    }

    #[test]
    fn finish_then_close() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![Ok(vec![window("normal", &[("A", "u1")])])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));
        scheduler.tick_at(&stamp());
        scheduler.finish().unwrap();
        store.close().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_each_interval_until_shutdown() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![
            Ok(vec![window("normal", &[("A", "u1")])]),
            Ok(vec![window("normal", &[("A", "u1"), ("B", "u2")])]),
            Ok(vec![window("normal", &[("C", "u3")])]),
        ]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(1));

        scheduler.run(time::sleep(Duration::from_millis(3500))).await;

        assert_eq!(scheduler.cycles(), 3);
        assert_eq!(scheduler.state(), State::Stopped);
        assert_eq!(urls(&logged(&store)), vec!["u1", "u2", "u3"]);
        scheduler.finish().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_interval_runs_nothing() {
        let store = Store::open(&Target::InMemory).unwrap();
        let source = ScriptedSource::boxed(vec![Ok(vec![window("normal", &[("A", "u1")])])]);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_secs(5));

        scheduler.run(time::sleep(Duration::from_secs(1))).await;

        assert_eq!(scheduler.cycles(), 0);
        assert_eq!(scheduler.state(), State::Stopped);
    }

    #[tokio::test]
    async fn slow_ticks_run_back_to_back_without_overlap() {
        let store = Store::open(&Target::InMemory).unwrap();
        let tick_cost = Duration::from_millis(250);
        let (source, calls) = SlowSource::boxed(tick_cost, tick_cost);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_millis(100));

        let started = Instant::now();
        scheduler.run(time::sleep(Duration::from_millis(1200))).await;
        let elapsed = started.elapsed();

        // each tick holds the thread for tick_cost, so queued ticks would
        // show up as more cycles than the elapsed time allows
        let cycles = scheduler.cycles();
        let bound = (elapsed.as_millis() / tick_cost.as_millis()) as u64 + 1;
        assert!(cycles >= 2, "only {cycles} cycles in {elapsed:?}");
        assert!(cycles <= bound, "{cycles} cycles in {elapsed:?}, expected at most {bound}");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len() as u64, cycles);
        for pair in calls.windows(2) {
            assert!(pair[1].0 >= pair[0].1, "ticks overlapped");
        }
        drop(calls);
        scheduler.finish().unwrap();
    }

    #[tokio::test]
    async fn ticks_missed_during_a_slow_cycle_are_not_replayed() {
        let store = Store::open(&Target::InMemory).unwrap();
        // the first cycle spans the 600ms and 900ms grid points
        let (source, calls) = SlowSource::boxed(Duration::from_millis(650), Duration::ZERO);
        let mut scheduler = Scheduler::new(&store, source, Duration::from_millis(300));

        scheduler.run(time::sleep(Duration::from_millis(1100))).await;

        let calls = calls.lock().unwrap();
        assert!(!calls.is_empty());
        let (_, slow_end) = calls[0];
        let catch_up = calls[1..]
            .iter()
            .filter(|(start, _)| start.duration_since(slow_end) < Duration::from_millis(100))
            .count();
        assert!(catch_up <= 1, "{catch_up} ticks fired right after the slow cycle");
        drop(calls);
        scheduler.finish().unwrap();
    }
}
