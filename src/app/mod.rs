// Application layer - Builders, executor and session around the toolkit port

pub mod container;
pub mod edit_session;
pub mod executor;
pub mod metadata_reader;
pub mod request_builder;
pub mod request_registry;

pub use container::Engine;
pub use edit_session::InteractiveEditSession;
pub use executor::{Completion, RequestExecutor};
pub use metadata_reader::MetadataReader;
pub use request_registry::RequestRegistry;
pub use request_builder::{
    CompareBuilder, ConcatBuilder, DenoiseBuilder, EditBuilder, InfoBuilder, MergeBuilder,
    RequestBuilder, ThumbnailBuilder,
};
