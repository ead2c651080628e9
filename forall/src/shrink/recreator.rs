//! Replays a recorded shrink session without running the property.

use crate::parameters::ParameterSet;
use crate::property::{Status, TryExecutionResult};
use crate::sample::FalsifiedSample;
use crate::shrinkable::BoxedShrinkable;
use crate::value::Value;

use super::algorithm::ShrinkingAlgorithm;
use super::sample_shrinker::{Falsification, Falsifier, SilentListener};

/// Answers falsification requests from a recorded list of status ordinals.
struct ScriptedFalsifier<'s> {
    script: &'s [u8],
    position: usize,
}

impl ScriptedFalsifier<'_> {
    fn fully_consumed(&self) -> bool {
        self.position == self.script.len()
    }
}

impl Falsifier for ScriptedFalsifier<'_> {
    fn falsify(&mut self, _parameters: &ParameterSet<Value>) -> Falsification {
        let Some(status) = self
            .script
            .get(self.position)
            .and_then(|&ordinal| Status::from_ordinal(ordinal))
        else {
            return Falsification::Done;
        };
        self.position += 1;
        let result = match status {
            Status::Satisfied => TryExecutionResult::satisfied(),
            Status::Falsified => TryExecutionResult::falsified(None),
            Status::Invalid => TryExecutionResult::invalid(),
        };
        Falsification::Result(result)
    }
}

/// Recreates the outcome of one shrink session from the statuses it observed.
pub struct ShrunkSampleRecreator {
    shrinkables: ParameterSet<BoxedShrinkable>,
}

impl ShrunkSampleRecreator {
    pub fn new(shrinkables: ParameterSet<BoxedShrinkable>) -> Self {
        Self { shrinkables }
    }

    /// Run the shrinking algorithm with every trial answered from `sequence`.
    ///
    /// Returns `None` unless the whole sequence was consumed, which means the
    /// arbitraries no longer shrink the way they did when it was recorded.
    pub fn recreate_from(self, sequence: &[u8]) -> Option<ParameterSet<BoxedShrinkable>> {
        let original = FalsifiedSample::new(self.shrinkables, None, Vec::new());
        let mut falsifier = ScriptedFalsifier {
            script: sequence,
            position: 0,
        };
        let mut listener = SilentListener;

        let shrunk = {
            let mut algorithm = ShrinkingAlgorithm::new(&mut falsifier, &mut listener);
            match algorithm.shrink(original) {
                Ok(sample) => sample,
                Err(interrupted) => interrupted.best,
            }
        };

        if falsifier.fully_consumed() {
            Some(shrunk.shrinkables().clone())
        } else {
            tracing::debug!(
                consumed = falsifier.position,
                recorded = sequence.len(),
                "Shrinking sequence could not be replayed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::ShrinkableInteger;
    use std::sync::Arc;

    fn sample(value: i64) -> ParameterSet<BoxedShrinkable> {
        ParameterSet::direct(vec![Arc::new(ShrinkableInteger::new(value, 0, 100, 0)) as BoxedShrinkable])
    }

    fn value_of(shrinkables: &ParameterSet<BoxedShrinkable>) -> Option<i64> {
        shrinkables.get(0).and_then(|s| s.value().as_int())
    }

    #[test]
    fn test_script_drives_the_search() {
        // 40 -> candidates 0, 20, ...: SATISFIED for 0, FALSIFIED for 20.
        let recreated = ShrunkSampleRecreator::new(sample(40)).recreate_from(&[0, 1]);
        assert_eq!(recreated.as_ref().and_then(value_of), Some(20));
    }

    #[test]
    fn test_empty_script_keeps_the_sample() {
        let recreated = ShrunkSampleRecreator::new(sample(40)).recreate_from(&[]);
        assert_eq!(recreated.as_ref().and_then(value_of), Some(40));
    }

    #[test]
    fn test_leftover_script_fails() {
        // An unshrinkable sample never asks for a single status.
        let unshrinkable = ParameterSet::direct(vec![crate::shrinkable::unshrinkable(3)]);
        assert!(ShrunkSampleRecreator::new(unshrinkable).recreate_from(&[1]).is_none());
    }

    #[test]
    fn test_unknown_ordinal_fails() {
        assert!(ShrunkSampleRecreator::new(sample(40)).recreate_from(&[0, 7]).is_none());
    }
}
