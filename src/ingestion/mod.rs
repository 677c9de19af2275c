//! Ingestion: archive bytes → typed rows, plus the observer hooks used for logging.
//!
//! - [`archive`]: the [`ArchiveDecoder`] seam to the (external) decompression step and the
//!   bundled [`JsonBundleDecoder`]
//! - [`records`]: the per-kind record parser, [`parse_dataset`]
//! - [`observability`]: [`DatasetObserver`] and the stock stderr/file/composite observers

pub mod archive;
pub mod observability;
pub mod records;

pub use archive::{ArchiveDecoder, ArchiveEntry, JsonBundleDecoder};
pub use observability::{
    CompositeObserver, DatasetObserver, FileObserver, Operation, OperationContext, OperationStats,
    Severity, StdErrObserver,
};
pub use records::{IngestionStats, ParsedDataset, parse_dataset};
