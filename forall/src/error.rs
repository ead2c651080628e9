//! Error types for generation, trial execution and configuration.

use std::any::Any;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while producing parameter tuples.
///
/// These are usage or configuration errors: they are reported immediately,
/// never retried, and abort the check of the property that raised them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The resolver returned no arbitrary for a declared parameter
    #[error("Cannot find an arbitrary for parameter [{parameter}]")]
    CannotFindArbitrary { parameter: String },

    /// An arbitrary cannot enumerate its values exhaustively
    #[error("Exhaustive generation unavailable for parameter [{parameter}]")]
    ExhaustiveUnavailable { parameter: String },

    /// The exhaustive product is larger than the configured sample budget
    #[error("Exhaustive generation would need more than {max} samples")]
    TooManyCombinations { max: u64 },

    /// Data-driven generation was requested without a table
    #[error("Data-driven generation requires a data table")]
    MissingData,

    /// A data table tuple does not fit the declared parameters
    #[error("Data tuple {tuple} is not compatible with parameters {parameters}")]
    IncompatibleData { tuple: String, parameters: String },

    /// The strategy cannot introduce parameters at runtime
    #[error("{strategy} generation does not support dynamic parameter [{name}]")]
    DynamicParametersUnsupported { strategy: String, name: String },

    /// A dynamic parameter was registered with nothing to enumerate
    #[error("Dynamic parameter [{name}] has no values to generate")]
    EmptyDynamicDimension { name: String },

    /// A recreated trial asked for a dynamic parameter the record does not know
    #[error("Dynamic not known: {name}")]
    UnknownDynamicParameter { name: String },

    /// Edge case replay was requested from a strategy without edge cases
    #[error("Edge cases are not supported when replaying dynamic parameter [{name}]")]
    EdgeCasesUnsupported { name: String },

    /// The strategy could not hand out a value for a newly registered parameter
    #[error("No value available for dynamic parameter [{name}]")]
    DynamicValueUnavailable { name: String },

    /// A recorded generation index lies beyond what the strategy produces
    #[error("Cannot reproduce sample at generation index {index}")]
    NotReproducible { index: u64 },

    /// `next` was called on a generator that has nothing left
    #[error("No more parameter tuples to generate")]
    Exhausted,

    /// `dynamic::parameter` was called outside a running trial
    #[error("Dynamic parameters can only be requested from within a running trial")]
    MissingDynamicContext,

    /// An arbitrary panicked while generating a value
    #[error("Generation panicked: {message}")]
    Panicked { message: String },
}

/// Error type surfaced by trials and by the property check loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// The property body rejected its input
    #[error("Property failed: {message}{}", context_suffix(.context))]
    PropertyFailed {
        message: String,
        context: Option<String>,
    },

    /// The input did not meet the property's assumptions; the trial is discarded
    #[error("Assumption violated: {message}")]
    AssumptionViolated { message: String },

    /// Parameters could not be generated
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A panic escaped the trial executor
    #[error("Trial panicked: {message}")]
    TrialPanicked { message: String },

    /// Internal error in the engine
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PropertyError {
    /// Create a simple property failed error
    pub fn property_failed(message: impl Into<String>) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: None,
        }
    }

    /// Create a property failed error with context
    pub fn property_failed_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an assumption violation, which turns a trial into an INVALID one
    pub fn assumption_violated(message: impl Into<String>) -> Self {
        Self::AssumptionViolated {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_assumption_violation(&self) -> bool {
        matches!(self, Self::AssumptionViolated { .. })
    }

    pub fn is_generation_error(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" (context: {})", c))
        .unwrap_or_default()
}

/// Discard the current trial unless `condition` holds.
///
/// ```
/// use forall::{assume, PropertyError};
///
/// fn body(n: i64) -> Result<bool, PropertyError> {
///     assume(n != 0)?;
///     Ok(10 / n <= 10)
/// }
/// assert!(body(0).unwrap_err().is_assumption_violation());
/// ```
pub fn assume(condition: bool) -> Result<(), PropertyError> {
    if condition {
        Ok(())
    } else {
        Err(PropertyError::assumption_violated("assumption not met"))
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_data_message_names_tuple() {
        let error = GenerationError::IncompatibleData {
            tuple: "[Null]".to_string(),
            parameters: "[Int]".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Data tuple [Null] is not compatible with parameters [Int]"
        );
    }

    #[test]
    fn test_property_failed_display_includes_context() {
        let error = PropertyError::property_failed_with_context("too big", "n = 12");
        assert_eq!(error.to_string(), "Property failed: too big (context: n = 12)");
        assert_eq!(
            PropertyError::property_failed("too big").to_string(),
            "Property failed: too big"
        );
    }

    #[test]
    fn test_generation_errors_convert() {
        let error: PropertyError = GenerationError::MissingDynamicContext.into();
        assert!(error.is_generation_error());
        assert!(!error.is_assumption_violation());
    }

    #[test]
    fn test_assume() {
        assert!(assume(true).is_ok());
        assert!(assume(false).unwrap_err().is_assumption_violation());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
