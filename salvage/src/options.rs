//! Per-pipeline processing options.

use salvage_core::config::DEFAULT_HEAL_RETRIES;

/// Options controlling how a [`Pipeline`](crate::Pipeline) handles failures.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Maximum correction calls issued after a validation failure. The
    /// initial provider call is not counted, so the total number of logical
    /// provider requests per run is at most `max_heal_retries + 1`.
    pub max_heal_retries: u32,
    /// Whether unparseable completions may fall back to heuristic free-text
    /// parsing. Disabled, they terminate in an error record instead.
    pub heuristic_fallback: bool,
    /// Titles of already-persisted records, for duplicate detection.
    pub known_titles: Vec<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_heal_retries: DEFAULT_HEAL_RETRIES,
            heuristic_fallback: true,
            known_titles: Vec::new(),
        }
    }
}

impl ProcessOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the self-heal retry budget.
    #[must_use]
    pub fn with_max_heal_retries(mut self, retries: u32) -> Self {
        self.max_heal_retries = retries;
        self
    }

    /// Enable or disable heuristic fallback parsing.
    #[must_use]
    pub fn with_heuristic_fallback(mut self, enabled: bool) -> Self {
        self.heuristic_fallback = enabled;
        self
    }

    /// Provide a corpus of known titles for duplicate detection.
    #[must_use]
    pub fn with_known_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_titles = titles.into_iter().map(Into::into).collect();
        self
    }
}
