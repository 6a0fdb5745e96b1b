//! vidops Video Operation Library
//!
//! Builds immutable, validated video operation requests, runs them against a
//! native media toolkit with bounded concurrency and delivers exactly one
//! outcome per request.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidops::{CompletionOutcome, Engine, EngineConfig, RequestBuilder};
//! use vidops::adapters::FfmpegToolkitAdapter;
//! use vidops::domain::model::{AssetRef, OutputTarget};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let engine = Engine::new(config.clone(), Arc::new(FfmpegToolkitAdapter::new(&config)));
//!
//! let request = engine
//!     .concat_builder()
//!     .asset(AssetRef::resolve("a.mp4")?)
//!     .asset(AssetRef::resolve("b.mp4")?)
//!     .output(OutputTarget::new("joined.mp4")?)
//!     .build()?;
//!
//! match engine.execute(request).await {
//!     CompletionOutcome::Success(result) => println!("{:?}", result),
//!     CompletionOutcome::Cancelled => println!("cancelled"),
//!     CompletionOutcome::Failure { kind, message } => eprintln!("{}: {}", kind, message),
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{Completion, Engine, InteractiveEditSession, RequestBuilder};
pub use config::EngineConfig;
pub use domain::errors::{DomainError, ErrorKind};
pub use domain::model::{
    CompletionOutcome, OperationKind, OperationRequest, OperationResult, RequestId, RequestRecord,
    RequestStatus,
};
pub use error::{VidopsError, VidopsResult};
pub use ports::MediaToolkitPort;
