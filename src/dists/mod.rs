// Wrapper distribution cache: resolution, download, extraction and linking

pub mod catalog;
pub mod distribution;
pub mod error;
pub mod extract;
pub mod hash;
pub mod http;
pub mod links;
pub mod materialize;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Version, VersionCatalog};
pub use distribution::{CachePathResolver, Classifier, DistributionTarget};
pub use error::Error;
pub use extract::ZipExtractor;
pub use http::{DownloadReporter, HttpTransport};
pub use materialize::{MaterializeResult, Materializer, is_satisfied};
pub use orchestrator::{Orchestrator, RunSummary};
