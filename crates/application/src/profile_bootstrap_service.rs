use std::sync::Arc;

use crate::{ProfileRecord, ProfileStore};

/// Result of one bootstrap attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A new profile was created.
    Created(ProfileRecord),
    /// A profile for the subject was already there.
    AlreadyExists,
    /// The event carried no usable principal.
    MissingPrincipal,
}

/// Creates a minimal profile the first time a subject logs in.
#[derive(Clone)]
pub struct ProfileBootstrapService {
    profile_store: Arc<dyn ProfileStore>,
}

impl ProfileBootstrapService {
    /// Creates a bootstrap service over a profile store.
    #[must_use]
    pub fn new(profile_store: Arc<dyn ProfileStore>) -> Self {
        Self { profile_store }
    }
}

mod bootstrap;
