//! Operation volume for the concurrent stress suites.
//!
//! Local runs use the small defaults chosen by each test; CI can raise the
//! volume to the full stress scenario through `TSUKIJI_STRESS_OPS` and
//! `TSUKIJI_STRESS_DOCS`.

use super::env_override::{parse_positive, read_env_or_default};

/// Environment variable overriding the number of mutations to drive.
pub const TSUKIJI_STRESS_OPS_ENV_KEY: &str = "TSUKIJI_STRESS_OPS";
/// Environment variable overriding the document id space.
pub const TSUKIJI_STRESS_DOCS_ENV_KEY: &str = "TSUKIJI_STRESS_DOCS";

/// Runtime profile for stress execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StressRunProfile {
    operations: usize,
    documents: u32,
}

impl StressRunProfile {
    /// Load a profile from environment variables with provided defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsukiji_test_support::ci::stress_profile::StressRunProfile;
    ///
    /// let profile = StressRunProfile::load(2_000, 500);
    /// assert!(profile.operations() > 0);
    /// assert!(profile.documents() > 0);
    /// ```
    #[must_use]
    pub fn load(default_operations: usize, default_documents: u32) -> Self {
        let operations =
            read_env_or_default(TSUKIJI_STRESS_OPS_ENV_KEY, default_operations, parse_positive);
        let documents =
            read_env_or_default(TSUKIJI_STRESS_DOCS_ENV_KEY, default_documents, parse_positive);
        Self {
            operations,
            documents,
        }
    }

    /// Number of add/update/remove operations to submit.
    #[must_use]
    pub const fn operations(&self) -> usize {
        self.operations
    }

    /// Size of the document id space operations are drawn from.
    #[must_use]
    pub const fn documents(&self) -> u32 {
        self.documents
    }
}
