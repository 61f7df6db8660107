/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The file name codec (codec.rs)
/// - The in-memory index and its aggregates (library.rs)
/// - Filtering, sorting and similarity (query.rs)
/// - Undo/redo of the view (history.rs)
/// - Incremental grid rendering (scheduler.rs)
/// - Directory scanning and edits on disk (scan.rs, edit.rs)
/// - The controller tying it all together (catalog.rs)
pub mod catalog;
pub mod codec;
pub mod data;
pub mod edit;
pub mod history;
pub mod library;
pub mod query;
pub mod scan;
pub mod scheduler;
