//! Job execution
//!
//! [`runner`] drives one job through discovery and download, [`pipeline`]
//! is the sequential resolve-and-fetch stage, and [`http`] the streaming
//! fetch client both the pipeline and the resolver share.

pub mod http;
pub mod pipeline;
pub mod runner;

pub use http::{FetchError, HttpClient};
pub use pipeline::{DownloadPipeline, PipelineError};
pub use runner::{JobError, JobPlan, JobRunner};
