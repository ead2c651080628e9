//! Configuration types for controlling generation, shrinking and the check loop.

use std::time::Duration;

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid number of tries (must be > 0)
    #[error("Invalid tries count: {0} (must be > 0)")]
    InvalidTries(usize),
    /// Invalid shrinking step bound (must be > 0)
    #[error("Invalid shrinking bound: {0} steps (must be > 0)")]
    InvalidShrinkingBound(usize),
    /// Invalid timeout (must be > 0)
    #[error("Invalid timeout (must be > 0)")]
    InvalidTimeout,
    /// Invalid exhaustive sample budget (must be > 0)
    #[error("Invalid maximum of exhaustive samples: {0} (must be > 0)")]
    InvalidExhaustiveBudget(u64),
}

/// How parameter tuples are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GenerationMode {
    /// Exhaustive when the whole space fits into the tries, randomized otherwise
    #[default]
    Auto,
    Randomized,
    Exhaustive,
    /// Iterate an externally supplied table of tuples
    DataDriven,
}

/// How edge cases are mixed into randomized generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeCasesMode {
    /// Never generate edge cases
    None,
    /// Generate all edge case combinations before any random sample
    First,
    /// Interleave edge cases with random samples
    #[default]
    Mixin,
}

impl EdgeCasesMode {
    pub fn activated(&self) -> bool {
        !matches!(self, EdgeCasesMode::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShrinkingMode {
    /// Report the original failing sample
    Off,
    /// Shrink until a full pass leaves the sample unchanged
    Full,
    /// Shrink with a step and time budget
    #[default]
    Bounded,
}

/// What to do when a record of a previous failure is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AfterFailureMode {
    /// Run the recreated failing sample first, then continue with fresh samples
    #[default]
    SampleFirst,
    /// Run only the recreated failing sample
    SampleOnly,
    /// Re-run with the seed that produced the failure
    PreviousSeed,
    /// Ignore the record
    RandomSeed,
}

/// Configuration for checking one property
#[derive(Debug, Clone)]
pub struct PropertyConfig {
    /// Name of the kind of check, used in reports
    pub stereotype: String,
    /// Number of trials to run
    pub tries: usize,
    /// Tolerated ratio of discarded to checked trials
    pub max_discard_ratio: usize,
    /// Optional seed for reproducible runs
    pub seed: Option<u64>,
    pub generation_mode: GenerationMode,
    pub edge_cases_mode: EdgeCasesMode,
    pub shrinking_mode: ShrinkingMode,
    /// Step budget in bounded shrinking mode
    pub shrinking_bound_steps: usize,
    /// Time budget in bounded shrinking mode
    pub shrink_timeout: Duration,
    pub after_failure: AfterFailureMode,
    /// Upper bound on the size of an exhaustively enumerated space
    pub max_exhaustive_samples: u64,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            stereotype: "Property".to_string(),
            tries: 1000,
            max_discard_ratio: 5,
            seed: None,
            generation_mode: GenerationMode::default(),
            edge_cases_mode: EdgeCasesMode::default(),
            shrinking_mode: ShrinkingMode::default(),
            shrinking_bound_steps: 1000,
            shrink_timeout: Duration::from_secs(10),
            after_failure: AfterFailureMode::default(),
            max_exhaustive_samples: i32::MAX as u64,
        }
    }
}

impl PropertyConfig {
    /// Create a new property configuration with validation
    pub fn new(tries: usize, seed: Option<u64>) -> Result<Self, ConfigError> {
        let config = Self {
            tries,
            seed,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the property configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tries == 0 {
            return Err(ConfigError::InvalidTries(self.tries));
        }
        if self.shrinking_bound_steps == 0 {
            return Err(ConfigError::InvalidShrinkingBound(
                self.shrinking_bound_steps,
            ));
        }
        if self.shrink_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.max_exhaustive_samples == 0 {
            return Err(ConfigError::InvalidExhaustiveBudget(
                self.max_exhaustive_samples,
            ));
        }
        Ok(())
    }

    pub fn with_tries(mut self, tries: usize) -> Self {
        self.tries = tries;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_discard_ratio(mut self, ratio: usize) -> Self {
        self.max_discard_ratio = ratio;
        self
    }

    pub fn with_generation_mode(mut self, mode: GenerationMode) -> Self {
        self.generation_mode = mode;
        self
    }

    pub fn with_edge_cases_mode(mut self, mode: EdgeCasesMode) -> Self {
        self.edge_cases_mode = mode;
        self
    }

    pub fn with_shrinking_mode(mut self, mode: ShrinkingMode) -> Self {
        self.shrinking_mode = mode;
        self
    }

    pub fn with_after_failure(mut self, mode: AfterFailureMode) -> Self {
        self.after_failure = mode;
        self
    }

    pub fn with_max_exhaustive_samples(mut self, max: u64) -> Self {
        self.max_exhaustive_samples = max;
        self
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = stereotype.into();
        self
    }

    /// Size hint handed to arbitraries. Tracks the number of tries.
    pub fn gen_size(&self) -> usize {
        self.tries
    }

    /// Merge this configuration with a global configuration, with this config taking precedence.
    ///
    /// A mode left at its default is taken from `global`.
    pub fn merge_with_global(self, global: &GlobalConfig) -> Self {
        Self {
            seed: self.seed.or(global.default_seed),
            edge_cases_mode: if self.edge_cases_mode != EdgeCasesMode::default() {
                self.edge_cases_mode
            } else {
                global.default_edge_cases_mode
            },
            shrinking_mode: if self.shrinking_mode != ShrinkingMode::default() {
                self.shrinking_mode
            } else {
                global.default_shrinking_mode
            },
            ..self
        }
    }

    /// Create a property configuration from global defaults with optional overrides
    pub fn from_global_with_overrides(
        global: &GlobalConfig,
        tries: Option<usize>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            tries: tries.unwrap_or(global.default_tries),
            seed: seed.or(global.default_seed),
            edge_cases_mode: global.default_edge_cases_mode,
            shrinking_mode: global.default_shrinking_mode,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Global configuration for default check behavior
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub default_tries: usize,
    pub default_seed: Option<u64>,
    pub default_edge_cases_mode: EdgeCasesMode,
    pub default_shrinking_mode: ShrinkingMode,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_tries: 1000,
            default_seed: None,
            default_edge_cases_mode: EdgeCasesMode::default(),
            default_shrinking_mode: ShrinkingMode::default(),
        }
    }
}

impl GlobalConfig {
    /// Create a new global configuration with validation
    pub fn new(default_tries: usize, default_seed: Option<u64>) -> Result<Self, ConfigError> {
        if default_tries == 0 {
            return Err(ConfigError::InvalidTries(default_tries));
        }
        Ok(Self {
            default_tries,
            default_seed,
            ..Self::default()
        })
    }
}
