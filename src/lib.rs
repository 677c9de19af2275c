//! `insight-engine` is an in-memory dataset service: it loads archives of academic course
//! sections or campus rooms into typed tables under caller-chosen identifiers and answers
//! structured JSON queries against them.
//!
//! The primary entrypoint is [`InsightFacade`], which exposes the service operations and turns
//! every outcome into an [`InsightResponse`] (status code + JSON body).
//!
//! ## What you can load
//!
//! Two record families ([`DatasetKind`]), each with a fixed field table in [`schema`]:
//!
//! - **courses**: `dept, id, avg, instructor, title, pass, fail, audit, uuid, year`
//! - **rooms**: `fullname, shortname, number, name, address, lat, lon, seats, type, furniture,
//!   href`
//!
//! Archive bytes go through an [`ingestion::ArchiveDecoder`] (the bundled
//! [`ingestion::JsonBundleDecoder`] reads a JSON object of path → file document); each file is a
//! JSON `{"result": [...]}` document or a bare array of records. Malformed records are dropped;
//! an archive with no valid record at all is rejected.
//!
//! ## Quick example: add, query, remove
//!
//! ```rust
//! use insight_engine::{DatasetKind, InsightFacade};
//! use serde_json::json;
//!
//! let facade = InsightFacade::new();
//! let archive = json!({
//!     "courses/CPSC310": {"result": [
//!         {"Subject": "cpsc", "Course": "310", "Avg": 80, "Professor": "holmes",
//!          "Title": "softw eng", "Pass": 100, "Fail": 2, "Audit": 0, "id": 1, "Year": "2015"},
//!         {"Subject": "cpsc", "Course": "310", "Avg": 90, "Professor": "holmes",
//!          "Title": "softw eng", "Pass": 90, "Fail": 1, "Audit": 0, "id": 2, "Year": "2016"},
//!         {"Subject": "cpsc", "Course": "310", "Avg": 70, "Professor": "baniassad",
//!          "Title": "softw eng", "Pass": 70, "Fail": 9, "Audit": 1, "id": 3, "Year": "2016"}
//!     ]}
//! });
//! let res = facade.add_dataset("courses", archive.to_string().as_bytes(), DatasetKind::Courses);
//! assert_eq!(res.code, 204);
//!
//! let res = facade.perform_query(&json!({
//!     "WHERE": {"GT": {"courses_avg": 75}},
//!     "OPTIONS": {"COLUMNS": ["courses_avg"], "ORDER": "courses_avg"}
//! }));
//! assert_eq!(
//!     serde_json::to_value(&res.body).unwrap(),
//!     json!({"result": [{"courses_avg": 80}, {"courses_avg": 90}]})
//! );
//!
//! assert_eq!(facade.remove_dataset(Some("courses")).code, 204);
//! assert_eq!(facade.remove_dataset(Some("courses")).code, 404);
//! ```
//!
//! ## Query language
//!
//! ```json
//! {
//!   "WHERE": {"AND": [{"IS": {"courses_dept": "cp*"}}, {"NOT": {"LT": {"courses_avg": 60}}}]},
//!   "OPTIONS": {
//!     "COLUMNS": ["courses_title", "overallAvg"],
//!     "ORDER": {"dir": "DOWN", "keys": ["overallAvg"]}
//!   },
//!   "TRANSFORMATIONS": {
//!     "GROUP": ["courses_title"],
//!     "APPLY": [{"overallAvg": {"AVG": "courses_avg"}}]
//!   }
//! }
//! ```
//!
//! - Filters: `AND`, `OR`, `NOT`, numeric `LT`/`GT`/`EQ`, string `IS` with `*` wildcards at
//!   either end
//! - Aggregations: `MAX`, `MIN`, `AVG`, `SUM` (numeric, two-decimal rounding for `AVG`/`SUM`) and
//!   `COUNT` (distinct values of any field)
//! - Results larger than [`facade::MAX_RESULT_ROWS`] rows (configurable through
//!   [`FacadeOptions`]) fail instead of being truncated
//!
//! ## Modules
//!
//! - [`facade`]: [`InsightFacade`], options and responses
//! - [`store`]: the shared [`store::DatasetStore`]
//! - [`ingestion`]: archive decoding, record parsing, observers for logging/alerts
//! - [`query`]: query validation into a [`query::QueryPlan`]
//! - [`processing`]: plan evaluation (filter, group, aggregate, project, order)
//! - [`schema`] and [`types`]: field tables and the in-memory data model
//! - [`error`]: [`InsightError`] and its status codes

pub mod error;
pub mod facade;
pub mod ingestion;
pub mod processing;
pub mod query;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{InsightError, InsightResult};
pub use facade::{FacadeOptions, InsightFacade, InsightResponse, ResponseBody};
pub use types::DatasetKind;
