//! Shrinking functionality for minimizing falsified samples.
//!
//! [`PropertyShrinker`] runs the fixed-point [`algorithm`] over the three
//! [`strategies`] and records the status of every trial it executes. The
//! recorded bytes are what [`recreator::ShrunkSampleRecreator`] needs to
//! reach the same shrunk sample again without running the property.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crate::config::{PropertyConfig, ShrinkingMode};
use crate::parameters::ParameterSet;
use crate::property::Status;
use crate::reporting::Reporter;
use crate::sample::{FalsifiedSample, ShrunkFalsifiedSample};
use crate::value::Value;

pub(crate) mod algorithm;
pub mod recreator;
pub(crate) mod sample_shrinker;
pub(crate) mod strategies;

use algorithm::ShrinkingAlgorithm;
pub use recreator::ShrunkSampleRecreator;
pub use sample_shrinker::{Falsification, Falsifier, MAX_FILTERED_RESULTS};
use sample_shrinker::ShrinkListener;

/// Default number of shrink attempts in [`ShrinkingMode::Bounded`].
pub const BOUNDED_SHRINK_STEPS: usize = 1000;

/// Result of a shrinking operation
#[derive(Debug, Clone)]
pub struct ShrinkingResult {
    /// Smallest falsifying sample found, the original one if nothing smaller falsified
    pub shrunk: ShrunkFalsifiedSample,
    /// Status ordinals of every executed trial, up to the last falsifying one
    pub sequence: Vec<u8>,
    /// Number of candidates considered
    pub attempts: usize,
    /// Time spent shrinking
    pub shrink_duration: Duration,
    /// Whether shrinking ran to a fixed point
    pub completed: bool,
}

impl ShrinkingResult {
    /// Create a shrink result for when no shrinking was performed
    pub fn no_shrinking(sample: FalsifiedSample) -> Self {
        Self {
            shrunk: ShrunkFalsifiedSample::unshrunk(sample),
            sequence: Vec::new(),
            attempts: 0,
            shrink_duration: Duration::ZERO,
            completed: true,
        }
    }
}

/// Shrinking engine for one falsified sample
pub struct PropertyShrinker<'r> {
    mode: ShrinkingMode,
    bound_steps: usize,
    timeout: Duration,
    reporter: Option<&'r dyn Reporter>,
}

impl<'r> PropertyShrinker<'r> {
    /// Create a shrinker for `mode` with the default step bound and a 10 second timeout
    pub fn new(mode: ShrinkingMode) -> Self {
        Self {
            mode,
            bound_steps: BOUNDED_SHRINK_STEPS,
            timeout: Duration::from_secs(10),
            reporter: None,
        }
    }

    /// Create a shrinker with the shrinking settings of a property
    pub fn from_config(config: &PropertyConfig) -> Self {
        Self {
            mode: config.shrinking_mode,
            bound_steps: config.shrinking_bound_steps,
            timeout: config.shrink_timeout,
            reporter: None,
        }
    }

    pub fn with_bound_steps(mut self, bound_steps: usize) -> Self {
        self.bound_steps = bound_steps;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish shrink telemetry to `reporter`
    pub fn with_reporter(mut self, reporter: &'r dyn Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Shrink `sample`, re-running the property through `falsifier`.
    pub fn shrink<F>(&self, sample: FalsifiedSample, falsifier: F) -> ShrinkingResult
    where
        F: Falsifier,
    {
        if self.mode == ShrinkingMode::Off {
            return ShrinkingResult::no_shrinking(sample);
        }

        let start_time = Instant::now();
        let mut recording = RecordingFalsifier {
            inner: falsifier,
            sequence: Vec::new(),
        };
        let mut listener = BoundedListener {
            bounded: self.mode == ShrinkingMode::Bounded,
            bound_steps: self.bound_steps,
            timeout: self.timeout,
            start_time,
            attempts: 0,
            steps: 0,
            stopped: None,
        };

        let (shrunk, completed) = {
            let mut algorithm = ShrinkingAlgorithm::new(&mut recording, &mut listener);
            match algorithm.shrink(sample) {
                Ok(shrunk) => (shrunk, true),
                Err(interrupted) => (interrupted.best, false),
            }
        };

        match listener.stopped {
            Some(Stop::Bound) => self.report(
                "shrinking bound reached",
                format!(
                    "after {} steps. You can switch on full shrinking with ShrinkingMode::Full",
                    listener.attempts
                ),
            ),
            Some(Stop::Timeout) => self.report(
                "shrinking timeout reached",
                format!("after {:?} and {} steps", start_time.elapsed(), listener.attempts),
            ),
            None => {}
        }

        let mut sequence = recording.sequence;
        let last_falsified = sequence
            .iter()
            .rposition(|&ordinal| ordinal == Status::Falsified.ordinal());
        sequence.truncate(last_falsified.map_or(0, |index| index + 1));

        tracing::debug!(
            steps = listener.steps,
            attempts = listener.attempts,
            completed,
            "Shrinking finished"
        );

        ShrinkingResult {
            shrunk: ShrunkFalsifiedSample::new(shrunk, listener.steps),
            sequence,
            attempts: listener.attempts,
            shrink_duration: start_time.elapsed(),
            completed,
        }
    }

    fn report(&self, key: &str, value: String) {
        tracing::warn!("{} {}", key, value);
        if let Some(reporter) = self.reporter {
            reporter.publish(key, &value);
        }
    }
}

/// Remembers the status of every trial the inner falsifier executes.
struct RecordingFalsifier<F> {
    inner: F,
    sequence: Vec<u8>,
}

impl<F: Falsifier> Falsifier for RecordingFalsifier<F> {
    fn falsify(&mut self, parameters: &ParameterSet<Value>) -> Falsification {
        let falsification = self.inner.falsify(parameters);
        if let Falsification::Result(result) = &falsification {
            self.sequence.push(result.status().ordinal());
        }
        falsification
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Bound,
    Timeout,
}

struct BoundedListener {
    bounded: bool,
    bound_steps: usize,
    timeout: Duration,
    start_time: Instant,
    attempts: usize,
    steps: usize,
    stopped: Option<Stop>,
}

impl ShrinkListener for BoundedListener {
    fn on_attempt(&mut self) -> ControlFlow<()> {
        if self.bounded {
            if self.attempts >= self.bound_steps {
                self.stopped = Some(Stop::Bound);
                return ControlFlow::Break(());
            }
            if self.start_time.elapsed() >= self.timeout {
                self.stopped = Some(Stop::Timeout);
                return ControlFlow::Break(());
            }
        }
        self.attempts += 1;
        ControlFlow::Continue(())
    }

    fn on_shrunk(&mut self, sample: &FalsifiedSample) {
        self.steps += 1;
        tracing::debug!(step = self.steps, sample = %sample.parameters(), "Shrunk sample");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ShrinkableInteger, ShrinkableList};
    use crate::property::TryExecutionResult;
    use crate::reporting::RecordingReporter;
    use crate::shrinkable::BoxedShrinkable;
    use std::sync::Arc;

    fn integer(value: i64) -> BoxedShrinkable {
        Arc::new(ShrinkableInteger::new(value, 0, 1000, 0))
    }

    fn at_least(threshold: i64) -> impl FnMut(&ParameterSet<Value>) -> Falsification {
        move |parameters: &ParameterSet<Value>| {
            let n = parameters.get(0).and_then(Value::as_int).unwrap_or_default();
            if n >= threshold {
                TryExecutionResult::falsified(None).into()
            } else {
                TryExecutionResult::satisfied().into()
            }
        }
    }

    fn single(value: i64) -> FalsifiedSample {
        FalsifiedSample::new(ParameterSet::direct(vec![integer(value)]), None, Vec::new())
    }

    #[test]
    fn test_off_returns_original() {
        let result = PropertyShrinker::new(ShrinkingMode::Off).shrink(single(500), at_least(10));
        assert_eq!(result.shrunk.parameters().direct_values(), &[Value::Int(500)]);
        assert_eq!(result.shrunk.count_shrinking_steps(), 0);
        assert!(result.sequence.is_empty());
        assert!(result.completed);
    }

    #[test]
    fn test_full_shrinks_to_threshold() {
        let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(single(500), at_least(10));
        assert_eq!(result.shrunk.parameters().direct_values(), &[Value::Int(10)]);
        assert!(result.shrunk.count_shrinking_steps() > 0);
        assert!(result.completed);
        assert_eq!(result.sequence.last(), Some(&Status::Falsified.ordinal()));
    }

    #[test]
    fn test_bounded_stops_and_reports() {
        let reporter = RecordingReporter::new();
        let result = PropertyShrinker::new(ShrinkingMode::Bounded)
            .with_bound_steps(3)
            .with_reporter(&reporter)
            .shrink(single(500), at_least(10));

        assert!(!result.completed);
        assert_eq!(result.attempts, 3);
        let entries = reporter.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "shrinking bound reached");
        assert!(entries[0].value.starts_with("after 3 steps"));
    }

    #[test]
    fn test_zero_timeout_interrupts_immediately() {
        let result = PropertyShrinker::new(ShrinkingMode::Bounded)
            .with_timeout(Duration::ZERO)
            .shrink(single(500), at_least(10));
        assert!(!result.completed);
        assert_eq!(result.shrunk.parameters().direct_values(), &[Value::Int(500)]);
    }

    #[test]
    fn test_recorded_sequence_recreates_shrunk_sample() {
        let element = |n| Arc::new(ShrinkableInteger::new(n, 0, 10, 0)) as BoxedShrinkable;
        let list = ShrinkableList::new(vec![element(7), element(9), element(3), element(8)], 4, 4);
        let original = ParameterSet::direct(vec![Arc::new(list) as BoxedShrinkable]);
        let sample = FalsifiedSample::new(original.clone(), None, Vec::new());

        let sum_at_least_five = |parameters: &ParameterSet<Value>| {
            let sum: i64 = match parameters.get(0) {
                Some(Value::List(items)) => items.iter().filter_map(Value::as_int).sum(),
                _ => 0,
            };
            Falsification::from(if sum >= 5 {
                TryExecutionResult::falsified(None)
            } else {
                TryExecutionResult::satisfied()
            })
        };

        let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(sample, sum_at_least_five);
        let recreated = ShrunkSampleRecreator::new(original)
            .recreate_from(&result.sequence)
            .map(|shrinkables| shrinkables.map(|s| s.value()));
        assert_eq!(recreated.as_ref(), Some(result.shrunk.parameters()));
    }
}
