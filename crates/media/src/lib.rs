//! Conversion pipeline: validate, build the fetcher invocation, execute,
//! resolve the produced file, and clean it up afterwards.

pub mod artifact;
pub mod cleanup;
pub mod command;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod mime;
pub mod resolver;
pub mod spec;

pub use {
    artifact::{ArtifactHandle, RETRIEVAL_PREFIX, is_safe_file_name},
    command::{CommandBuilder, FetchCommand},
    error::{Error, Result},
    fetcher::{FetchOutput, MediaFetcher, ProcessFetcher},
    job::{ConversionJob, ConversionPipeline, JobStatus},
    spec::{JobSpecification, TargetFormat},
};
