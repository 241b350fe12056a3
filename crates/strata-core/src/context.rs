//! Application context: environment and project identity.

use serde::{Deserialize, Serialize};

/// Identifies which application and environment a process belongs to.
///
/// The cache layer folds both tags into every key namespace, so two
/// environments (or two projects) sharing one Redis instance never see
/// each other's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppContext {
    env: String,
    project: String,
}

impl AppContext {
    /// Creates a context for the given environment and project tags.
    pub fn new(env: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            project: project.into(),
        }
    }

    /// Environment tag, e.g. `dev`, `test`, `prod`.
    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Project tag.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn is_prod(&self) -> bool {
        self.env == "prod"
    }

    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }

    #[must_use]
    pub fn is_test(&self) -> bool {
        self.env == "test"
    }

    /// Debug behavior is enabled everywhere except production.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        !self.is_prod()
    }
}
