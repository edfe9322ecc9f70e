//! Graph-level logic over the package forest.
//!
//! The validation pipeline runs left to right, all before any mutation:
//!
//! 1. [`sanitize`]: reduce a raw link batch to one effective link per child
//! 2. [`chain`]: reconstruct the linear chains the batch forms and reject
//!    batch-confined loops
//! 3. [`validate`]: hold the chains up against the stored forest (ancestry,
//!    depth, locations)
//! 4. [`construct`]: apply the accepted batch atomically
//!
//! [`forest`] supplies the typed graph queries (ancestors, subtrees, depth,
//! contents) the pipeline reads from the store.

pub mod chain;
pub mod construct;
pub mod forest;
pub mod sanitize;
pub mod validate;
