//! Trial results and the executors that produce them.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::dynamic::DynamicContext;
use crate::error::{panic_message, PropertyError};
use crate::parameters::ParameterSet;
use crate::value::Value;

/// Outcome of a single trial.
///
/// The ordinals are part of the replay record format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Satisfied,
    Falsified,
    /// The sample did not meet the property's preconditions
    Invalid,
}

impl Status {
    pub fn ordinal(self) -> u8 {
        match self {
            Status::Satisfied => 0,
            Status::Falsified => 1,
            Status::Invalid => 2,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Status::Satisfied),
            1 => Some(Status::Falsified),
            2 => Some(Status::Invalid),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Satisfied => "SATISFIED",
            Status::Falsified => "FALSIFIED",
            Status::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}

/// Result of executing the property once
#[derive(Debug, Clone, PartialEq)]
pub struct TryExecutionResult {
    status: Status,
    error: Option<PropertyError>,
    footnotes: Vec<String>,
    finish_early: bool,
}

impl TryExecutionResult {
    fn new(status: Status, error: Option<PropertyError>) -> Self {
        Self {
            status,
            error,
            footnotes: Vec::new(),
            finish_early: false,
        }
    }

    pub fn satisfied() -> Self {
        Self::new(Status::Satisfied, None)
    }

    /// Satisfied, and no further trials are needed
    pub fn satisfied_finish_early() -> Self {
        Self {
            finish_early: true,
            ..Self::satisfied()
        }
    }

    pub fn falsified(error: Option<PropertyError>) -> Self {
        Self::new(Status::Falsified, error)
    }

    pub fn invalid() -> Self {
        Self::new(Status::Invalid, None)
    }

    pub fn invalid_with(error: PropertyError) -> Self {
        Self::new(Status::Invalid, Some(error))
    }

    pub fn with_footnotes(mut self, footnotes: Vec<String>) -> Self {
        self.footnotes = footnotes;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&PropertyError> {
        self.error.as_ref()
    }

    pub fn footnotes(&self) -> &[String] {
        &self.footnotes
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == Status::Satisfied
    }

    pub fn is_falsified(&self) -> bool {
        self.status == Status::Falsified
    }

    pub fn is_invalid(&self) -> bool {
        self.status == Status::Invalid
    }

    pub fn should_finish_early(&self) -> bool {
        self.finish_early
    }
}

/// Runs the property body for one parameter tuple.
///
/// Implementations should turn every failure of the body into a result.
/// A panic that escapes `execute` stops the whole check.
pub trait TryExecutor {
    fn execute(&self, parameters: &ParameterSet<Value>, context: &DynamicContext) -> TryExecutionResult;
}

impl<F> TryExecutor for F
where
    F: Fn(&ParameterSet<Value>, &DynamicContext) -> TryExecutionResult,
{
    fn execute(&self, parameters: &ParameterSet<Value>, context: &DynamicContext) -> TryExecutionResult {
        self(parameters, context)
    }
}

/// Adapts a boolean property body.
///
/// `Ok(true)` satisfies the property, `Ok(false)` falsifies it. A failed
/// [`crate::assume`] makes the trial invalid; any other error or a panic
/// falsifies it.
pub struct CheckedFunction<F> {
    function: F,
}

impl<F> CheckedFunction<F>
where
    F: Fn(&ParameterSet<Value>, &DynamicContext) -> Result<bool, PropertyError>,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> TryExecutor for CheckedFunction<F>
where
    F: Fn(&ParameterSet<Value>, &DynamicContext) -> Result<bool, PropertyError>,
{
    fn execute(&self, parameters: &ParameterSet<Value>, context: &DynamicContext) -> TryExecutionResult {
        match catch_unwind(AssertUnwindSafe(|| (self.function)(parameters, context))) {
            Ok(Ok(true)) => TryExecutionResult::satisfied(),
            Ok(Ok(false)) => TryExecutionResult::falsified(None),
            Ok(Err(error)) if error.is_assumption_violation() => TryExecutionResult::invalid_with(error),
            Ok(Err(error)) => TryExecutionResult::falsified(Some(error)),
            Err(payload) => {
                let message = panic_message(&*payload);
                TryExecutionResult::falsified(Some(PropertyError::property_failed_with_context(
                    message,
                    "property panicked",
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::assume;

    fn run<E: TryExecutor>(executor: &E, n: i64) -> TryExecutionResult {
        let parameters = ParameterSet::direct(vec![Value::Int(n)]);
        executor.execute(&parameters, &DynamicContext::fixed(ParameterSet::empty()))
    }

    fn first(parameters: &ParameterSet<Value>) -> i64 {
        parameters.get(0).and_then(Value::as_int).unwrap_or_default()
    }

    #[test]
    fn test_status_ordinals_round_trip() {
        for status in [Status::Satisfied, Status::Falsified, Status::Invalid] {
            assert_eq!(Status::from_ordinal(status.ordinal()), Some(status));
        }
        assert_eq!(Status::from_ordinal(3), None);
    }

    #[test]
    fn test_checked_function_maps_outcomes() {
        let checked = CheckedFunction::new(|parameters: &ParameterSet<Value>, _: &DynamicContext| {
            let n = first(parameters);
            assume(n >= 0)?;
            Ok(n < 10)
        });

        assert!(run(&checked, 3).is_satisfied());
        assert!(run(&checked, 12).is_falsified());
        assert!(run(&checked, -1).is_invalid());
    }

    #[test]
    fn test_checked_function_catches_panics() {
        let checked = CheckedFunction::new(|parameters: &ParameterSet<Value>, _: &DynamicContext| {
            if first(parameters) == 0 {
                panic!("division by zero");
            }
            Ok(true)
        });

        let result = run(&checked, 0);
        assert!(result.is_falsified());
        let message = result.error().map(ToString::to_string).unwrap_or_default();
        assert!(message.contains("division by zero"));
    }

    #[test]
    fn test_errors_falsify_with_cause() {
        let checked = CheckedFunction::new(|_: &ParameterSet<Value>, _: &DynamicContext| {
            Err(PropertyError::property_failed("broken invariant"))
        });
        let result = run(&checked, 1);
        assert!(result.is_falsified());
        assert_eq!(
            result.error(),
            Some(&PropertyError::property_failed("broken invariant"))
        );
    }

    #[test]
    fn test_closures_are_executors() {
        let executor = |parameters: &ParameterSet<Value>, _: &DynamicContext| {
            if first(parameters) > 5 {
                TryExecutionResult::falsified(None)
            } else {
                TryExecutionResult::satisfied_finish_early()
            }
        };
        assert!(run(&executor, 6).is_falsified());
        assert!(run(&executor, 1).should_finish_early());
    }
}
