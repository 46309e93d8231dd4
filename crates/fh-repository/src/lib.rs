// SPDX-License-Identifier: MIT OR Apache-2.0
//! The in-memory feature repository: a keyed store of [`FeatureStateHolder`]
//! nodes, updated by incremental `notify()` events from an edge service.

#![deny(unsafe_code)]

mod holder;
mod repository;

pub use holder::FeatureStateHolder;
pub use repository::{FeatureHubRepository, FeatureRepository, RepositoryHandle};

pub(crate) use repository::RepositoryInner;
