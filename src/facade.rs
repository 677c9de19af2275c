//! Public facade: add, remove, query and list, with boundary translation to response codes.
//!
//! Every `*_dataset`/`perform_*` method returns an [`InsightResponse`] and never panics on bad
//! input. The `try_*` methods return the underlying [`InsightResult`] for callers that want the
//! error value itself.
//!
//! When an observer is configured in [`FacadeOptions`], every call reports:
//!
//! - `on_success` on success, with row stats
//! - `on_failure` on failure, with a computed [`Severity`]
//! - `on_alert` on failure when that severity is >= `alert_at_or_above`

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;

use crate::error::{InsightError, InsightResult};
use crate::ingestion::{
    ArchiveDecoder, DatasetObserver, IngestionStats, JsonBundleDecoder, Operation,
    OperationContext, OperationStats, Severity, parse_dataset,
};
use crate::processing::{ResultRow, evaluate};
use crate::query::parse_query;
use crate::store::{DatasetStore, validate_id};
use crate::types::{DatasetKind, DatasetSummary, Table};

/// Default result-size ceiling.
pub const MAX_RESULT_ROWS: usize = 5000;

/// Options controlling facade behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct FacadeOptions {
    /// Queries returning more rows (or groups) than this fail with
    /// [`InsightError::ResultTooLarge`].
    pub max_result_rows: usize,
    /// Turns archive bytes into file entries.
    pub decoder: Arc<dyn ArchiveDecoder>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn DatasetObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for FacadeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeOptions")
            .field("max_result_rows", &self.max_result_rows)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish_non_exhaustive()
    }
}

impl Default for FacadeOptions {
    fn default() -> Self {
        Self {
            max_result_rows: MAX_RESULT_ROWS,
            decoder: Arc::new(JsonBundleDecoder),
            observer: None,
            alert_at_or_above: Severity::Error,
        }
    }
}

/// Response payload. Serializes to the bare JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Sorted identifiers of every loaded dataset.
    Ids { result: Vec<String> },
    /// Query result rows.
    Rows { result: Vec<ResultRow> },
    /// Dataset listing.
    Datasets { result: Vec<DatasetSummary> },
    Error { error: String },
    Empty,
}

/// A status code paired with its body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightResponse {
    pub code: u16,
    pub body: ResponseBody,
}

impl InsightResponse {
    fn ok(code: u16, body: ResponseBody) -> Self {
        Self { code, body }
    }

    fn from_error(error: &InsightError) -> Self {
        Self {
            code: error.status_code(),
            body: ResponseBody::Error {
                error: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Error message, for failed responses.
    pub fn error(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Entry point owning a [`DatasetStore`] and the collaborators configured in [`FacadeOptions`].
///
/// ```rust
/// use insight_engine::{DatasetKind, InsightFacade};
/// use serde_json::json;
///
/// let facade = InsightFacade::new();
/// let archive = json!({"courses/CPSC310": {"result": [{
///     "Subject": "cpsc", "Course": "310", "Avg": 84.5, "Professor": "holmes",
///     "Title": "softw eng", "Pass": 120, "Fail": 3, "Audit": 0, "id": 1234,
///     "Year": "2015", "Section": "001"
/// }]}});
///
/// let added = facade.add_dataset("courses", archive.to_string().as_bytes(), DatasetKind::Courses);
/// assert_eq!(added.code, 204);
///
/// let response = facade.perform_query(&json!({
///     "WHERE": {"GT": {"courses_avg": 80}},
///     "OPTIONS": {"COLUMNS": ["courses_dept", "courses_avg"]}
/// }));
/// assert_eq!(response.code, 200);
/// assert_eq!(
///     serde_json::to_value(&response.body).unwrap(),
///     json!({"result": [{"courses_dept": "cpsc", "courses_avg": 84.5}]})
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct InsightFacade {
    store: Arc<DatasetStore>,
    options: FacadeOptions,
}

impl InsightFacade {
    /// Facade over a fresh, empty store with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FacadeOptions) -> Self {
        Self::with_store(Arc::new(DatasetStore::new()), options)
    }

    /// Facade over an existing store, which may be shared with other facades.
    pub fn with_store(store: Arc<DatasetStore>, options: FacadeOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    pub fn options(&self) -> &FacadeOptions {
        &self.options
    }

    /// Decode, parse and insert a dataset, returning the sorted identifiers now loaded.
    pub fn try_add_dataset(
        &self,
        id: &str,
        content: &[u8],
        kind: DatasetKind,
    ) -> InsightResult<Vec<String>> {
        let ctx = OperationContext::new(Operation::Add)
            .with_id(id)
            .with_kind(kind);
        let result = self.load(id, content, kind);
        self.report(&ctx, &result, |(_, stats)| OperationStats::from(*stats));
        result.map(|(ids, _)| ids)
    }

    fn load(
        &self,
        id: &str,
        content: &[u8],
        kind: DatasetKind,
    ) -> InsightResult<(Vec<String>, IngestionStats)> {
        validate_id(id)?;
        // Fail fast before decoding; the insert below re-checks under the write lock.
        if self.store.contains(id) {
            return Err(InsightError::DuplicateId { id: id.to_string() });
        }

        let entries = self.options.decoder.decode(content)?;
        let parsed = parse_dataset(&entries, kind)?;
        self.store.insert(Table::new(id, kind, parsed.rows)?)?;
        Ok((self.store.list_ids(), parsed.stats))
    }

    /// `204` with the sorted loaded identifiers, or `400` with the error.
    pub fn add_dataset(&self, id: &str, content: &[u8], kind: DatasetKind) -> InsightResponse {
        match self.try_add_dataset(id, content, kind) {
            Ok(ids) => InsightResponse::ok(204, ResponseBody::Ids { result: ids }),
            Err(e) => InsightResponse::from_error(&e),
        }
    }

    /// Remove the dataset loaded under `id`.
    ///
    /// An absent or blank `id` is accepted as a no-op and yields `Ok(None)`.
    pub fn try_remove_dataset(&self, id: Option<&str>) -> InsightResult<Option<DatasetSummary>> {
        let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
            return Ok(None);
        };
        let ctx = OperationContext::new(Operation::Remove).with_id(id);
        let result = self.store.remove(id).map(|table| table.summary());
        self.report(&ctx, &result, |summary| OperationStats::rows(summary.num_rows));
        result.map(Some)
    }

    /// `204` with an empty body, or `404` when nothing is loaded under `id`.
    pub fn remove_dataset(&self, id: Option<&str>) -> InsightResponse {
        match self.try_remove_dataset(id) {
            Ok(_) => InsightResponse::ok(204, ResponseBody::Empty),
            Err(e) => InsightResponse::from_error(&e),
        }
    }

    /// Validate and run `query` against the datasets loaded right now.
    pub fn try_query(&self, query: &Json) -> InsightResult<Vec<ResultRow>> {
        let mut ctx = OperationContext::new(Operation::Query);
        let result = parse_query(query, &self.store).and_then(|plan| {
            ctx.id = Some(plan.table().id().to_string());
            evaluate(&plan, self.options.max_result_rows)
        });
        self.report(&ctx, &result, |rows| OperationStats::rows(rows.len()));
        result
    }

    /// `200` with the result rows, or `400` with the error.
    pub fn perform_query(&self, query: &Json) -> InsightResponse {
        match self.try_query(query) {
            Ok(rows) => InsightResponse::ok(200, ResponseBody::Rows { result: rows }),
            Err(e) => InsightResponse::from_error(&e),
        }
    }

    /// [`Self::perform_query`] on a query given as JSON text.
    pub fn perform_query_text(&self, query: &str) -> InsightResponse {
        match serde_json::from_str::<Json>(query) {
            Ok(query) => self.perform_query(&query),
            Err(e) => {
                let err = InsightError::invalid_query(format!("query is not valid json: {e}"));
                self.report::<()>(&OperationContext::new(Operation::Query), &Err(err.clone()), |_| {
                    OperationStats::default()
                });
                InsightResponse::from_error(&err)
            }
        }
    }

    /// `200` with the identifier, kind and row count of every loaded dataset, sorted by id.
    pub fn list_datasets(&self) -> InsightResponse {
        let summaries = self.store.summaries();
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_success(
                &OperationContext::new(Operation::List),
                OperationStats::rows(summaries.len()),
            );
        }
        InsightResponse::ok(200, ResponseBody::Datasets { result: summaries })
    }

    fn report<T>(
        &self,
        ctx: &OperationContext,
        result: &InsightResult<T>,
        stats: impl FnOnce(&T) -> OperationStats,
    ) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        match result {
            Ok(value) => obs.on_success(ctx, stats(value)),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= self.options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
}

fn severity_for_error(e: &InsightError) -> Severity {
    match e {
        InsightError::MalformedDataset { .. } => Severity::Error,
        InsightError::DuplicateId { .. }
        | InsightError::NotFound { .. }
        | InsightError::InvalidId { .. }
        | InsightError::InvalidQuery { .. }
        | InsightError::ResultTooLarge { .. } => Severity::Warning,
    }
}
