pub mod archive;
pub mod catalog;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod scheduler;
pub mod speed;
pub mod transfer;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::archive::{ArchiveBuilder, BuiltArchive};
    pub use crate::catalog::{CatalogClient, ClipFilter, FilterError};
    pub use crate::models::{ClipRef, FailureRecord, Selection};
    pub use crate::orchestrator::{ExportError, ExportOrchestrator, ExportReport};
    pub use crate::progress::{ProgressState, Stage};
    pub use crate::speed::{format_eta, SpeedEstimator};
}
