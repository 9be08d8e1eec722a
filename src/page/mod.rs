//! Page identity model
//!
//! This module defines how pages are identified and merged during a run.
//!
//! # Components
//!
//! - `PageReference`: a page known by id, alias or lookup key, at one of three
//!   completeness levels (`ReferenceStatus`)
//! - `Page`: a fully fetched page with its lazily rendered fields
//! - `PageIndex`: the run-wide key -> best reference map

mod index;
#[allow(clippy::module_inception)]
mod page;
mod reference;

// Re-export main types
pub use index::PageIndex;
pub use page::{Crumb, Page};
pub use reference::{pick_best, PageIdentity, PageReference, PartialPage, ReferenceStatus};

pub(crate) use page::truncate;
pub(crate) use reference::scalar_string;
