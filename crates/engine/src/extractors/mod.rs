// ABOUTME: Extraction pipeline: selector cache, JSON paths, field queries and row transformation.
// ABOUTME: Everything here is synchronous and pure over an already-fetched body.

pub mod compiled;
pub mod field;
pub mod json_path;
pub mod row;
