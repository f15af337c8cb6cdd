pub mod document;
pub mod query_window;

pub use document::{DocumentRef, IndexDocument, ProcessSummary, RepositoryDescriptor};
pub use query_window::QueryWindow;
