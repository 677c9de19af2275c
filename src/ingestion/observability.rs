use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::InsightError;
use crate::types::DatasetKind;

use super::records::IngestionStats;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Rejected caller input (bad id, bad query, oversized result).
    Warning,
    /// A dataset could not be loaded.
    Error,
}

/// Facade operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Query,
    List,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Query => "query",
            Self::List => "list",
        }
    }
}

/// Context about one facade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub operation: Operation,
    /// Dataset identifier, when the call names or resolves one.
    pub id: Option<String>,
    /// Dataset kind, for adds.
    pub kind: Option<DatasetKind>,
}

impl OperationContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            id: None,
            kind: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: DatasetKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op={}", self.operation.as_str())?;
        if let Some(id) = &self.id {
            write!(f, " id={id}")?;
        }
        if let Some(kind) = self.kind {
            write!(f, " kind={kind}")?;
        }
        Ok(())
    }
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Rows loaded (add), removed (remove), returned (query) or datasets listed (list).
    pub rows: usize,
    /// Records dropped while parsing (add only).
    pub rows_dropped: usize,
    /// Archive files skipped while parsing (add only).
    pub files_skipped: usize,
}

impl OperationStats {
    pub fn rows(rows: usize) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }
}

impl From<IngestionStats> for OperationStats {
    fn from(stats: IngestionStats) -> Self {
        Self {
            rows: stats.rows,
            rows_dropped: stats.rows_dropped,
            files_skipped: stats.files_skipped,
        }
    }
}

/// Observer interface for facade outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait DatasetObserver: Send + Sync {
    /// Called when an operation succeeds.
    fn on_success(&self, _ctx: &OperationContext, _stats: OperationStats) {}

    /// Called when an operation fails.
    fn on_failure(&self, _ctx: &OperationContext, _severity: Severity, _error: &InsightError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn DatasetObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn DatasetObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl DatasetObserver for CompositeObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl StdErrObserver {
    fn success_line(ctx: &OperationContext, stats: OperationStats) -> String {
        format!(
            "[insight][ok] {ctx} rows={} dropped={} skipped_files={}",
            stats.rows, stats.rows_dropped, stats.files_skipped
        )
    }

    fn failure_line(ctx: &OperationContext, severity: Severity, error: &InsightError) -> String {
        format!("[insight][{severity:?}] {ctx} err={error}")
    }

    fn alert_line(ctx: &OperationContext, severity: Severity, error: &InsightError) -> String {
        format!("[ALERT][insight][{severity:?}] {ctx} err={error}")
    }
}

impl DatasetObserver for StdErrObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        eprintln!("{}", Self::success_line(ctx, stats));
    }

    fn on_failure(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        eprintln!("{}", Self::failure_line(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        eprintln!("{}", Self::alert_line(ctx, severity, error));
    }
}

/// Appends events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl DatasetObserver for FileObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        self.append_line(&format!(
            "{} ok {ctx} rows={} dropped={} skipped_files={}",
            unix_ts(),
            stats.rows,
            stats.rows_dropped,
            stats.files_skipped
        ));
    }

    fn on_failure(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} {ctx} err={error}",
            unix_ts()
        ));
    }

    fn on_alert(&self, ctx: &OperationContext, severity: Severity, error: &InsightError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} {ctx} err={error}",
            unix_ts()
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{
        CompositeObserver, DatasetObserver, FileObserver, Operation, OperationContext,
        OperationStats, Severity, StdErrObserver,
    };
    use crate::error::InsightError;
    use crate::types::DatasetKind;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl DatasetObserver for Recording {
        fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
            self.events
                .lock()
                .unwrap()
                .push(format!("ok {ctx} {}", stats.rows));
        }

        fn on_failure(&self, ctx: &OperationContext, severity: Severity, _error: &InsightError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("fail {ctx} {severity:?}"));
        }
    }

    #[test]
    fn context_display_lists_known_parts() {
        let ctx = OperationContext::new(Operation::Add)
            .with_id("courses")
            .with_kind(DatasetKind::Courses);
        assert_eq!(ctx.to_string(), "op=add id=courses kind=courses");
        assert_eq!(OperationContext::new(Operation::Query).to_string(), "op=query");
    }

    #[test]
    fn composite_fans_out_and_default_alert_forwards_to_failure() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let composite = CompositeObserver::new(vec![
            a.clone() as Arc<dyn DatasetObserver>,
            b.clone() as Arc<dyn DatasetObserver>,
        ]);

        let ctx = OperationContext::new(Operation::Remove).with_id("rooms");
        composite.on_success(&ctx, OperationStats::rows(3));
        composite.on_alert(
            &ctx,
            Severity::Warning,
            &InsightError::NotFound {
                id: "rooms".to_string(),
            },
        );

        for rec in [a, b] {
            assert_eq!(
                *rec.events.lock().unwrap(),
                vec![
                    "ok op=remove id=rooms 3".to_string(),
                    "fail op=remove id=rooms Warning".to_string()
                ]
            );
        }
    }

    #[test]
    fn file_observer_appends_lines() {
        let path = std::env::temp_dir().join(format!(
            "insight-engine-observer-{}-{:?}.log",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_file(&path);

        let obs = FileObserver::new(&path);
        let ctx = OperationContext::new(Operation::Query).with_id("courses");
        obs.on_success(&ctx, OperationStats::rows(2));
        obs.on_failure(&ctx, Severity::Warning, &InsightError::invalid_query("bad"));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("ok op=query id=courses rows=2 dropped=0 skipped_files=0"));
        assert!(lines[1].contains("fail severity=Warning op=query id=courses"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn severity_orders_for_thresholds() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn stderr_observer_formats_each_event() {
        let ctx = OperationContext::new(Operation::Add)
            .with_id("rooms")
            .with_kind(DatasetKind::Rooms);
        let stats = OperationStats {
            rows: 364,
            rows_dropped: 2,
            files_skipped: 1,
        };
        let err = InsightError::DuplicateId {
            id: "rooms".to_string(),
        };

        assert_eq!(
            StdErrObserver::success_line(&ctx, stats),
            "[insight][ok] op=add id=rooms kind=rooms rows=364 dropped=2 skipped_files=1"
        );
        assert_eq!(
            StdErrObserver::failure_line(&ctx, Severity::Warning, &err),
            format!("[insight][Warning] op=add id=rooms kind=rooms err={err}")
        );
        assert_eq!(
            StdErrObserver::alert_line(&ctx, Severity::Error, &err),
            format!("[ALERT][insight][Error] op=add id=rooms kind=rooms err={err}")
        );

        // Every callback writes without panicking, directly and behind a composite.
        let composite = CompositeObserver::new(vec![
            Arc::new(StdErrObserver) as Arc<dyn DatasetObserver>,
            Arc::new(StdErrObserver) as Arc<dyn DatasetObserver>,
        ]);
        for observer in [&StdErrObserver as &dyn DatasetObserver, &composite] {
            observer.on_success(&ctx, stats);
            observer.on_failure(&ctx, Severity::Info, &err);
            observer.on_alert(&ctx, Severity::Error, &err);
        }
    }
}
