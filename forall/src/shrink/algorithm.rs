//! Runs the strategies until a full pass changes nothing.

use crate::sample::FalsifiedSample;

use super::sample_shrinker::{Falsifier, SampleShrinker, SearchResult, ShrinkListener};
use super::strategies::{shrink_and_grow, shrink_one_after_the_other, shrink_pairwise};

type Strategy = fn(&mut SampleShrinker<'_>, FalsifiedSample) -> SearchResult;

const STRATEGIES: [Strategy; 3] = [shrink_one_after_the_other, shrink_pairwise, shrink_and_grow];

/// One shrink run. All strategies share the falsification cache of the run.
pub(crate) struct ShrinkingAlgorithm<'a> {
    shrinker: SampleShrinker<'a>,
}

impl<'a> ShrinkingAlgorithm<'a> {
    pub(crate) fn new(falsifier: &'a mut dyn Falsifier, listener: &'a mut dyn ShrinkListener) -> Self {
        Self {
            shrinker: SampleShrinker::new(falsifier, listener),
        }
    }

    /// A later strategy only runs when the earlier ones left the sample
    /// unchanged; any change restarts the pass from the first strategy.
    pub(crate) fn shrink(&mut self, original: FalsifiedSample) -> SearchResult {
        let mut current = original;
        'pass: loop {
            for strategy in STRATEGIES {
                let before = current.parameters().clone();
                current = strategy(&mut self.shrinker, current)?;
                if current.parameters() != &before {
                    continue 'pass;
                }
            }
            return Ok(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterSet;
    use crate::primitives::{lists, ShrinkableInteger};
    use crate::property::TryExecutionResult;
    use crate::rng::create_seeded_rng;
    use crate::shrink::sample_shrinker::{Falsification, SilentListener};
    use crate::shrinkable::BoxedShrinkable;
    use crate::value::Value;
    use std::sync::Arc;

    fn shrink_with<F>(sample: FalsifiedSample, mut falsifier: F) -> FalsifiedSample
    where
        F: FnMut(&ParameterSet<Value>) -> Falsification,
    {
        let mut listener = SilentListener;
        let mut algorithm = ShrinkingAlgorithm::new(&mut falsifier, &mut listener);
        algorithm.shrink(sample).unwrap()
    }

    #[test]
    fn test_fixed_point_combines_strategies() {
        let integer = |n| Arc::new(ShrinkableInteger::new(n, 0, 100, 0)) as BoxedShrinkable;
        let sample = FalsifiedSample::new(
            ParameterSet::direct(vec![integer(60), integer(60), integer(33)]),
            None,
            Vec::new(),
        );
        let shrunk = shrink_with(sample, |parameters: &ParameterSet<Value>| {
            let values: Vec<i64> = parameters.all().into_iter().filter_map(Value::as_int).collect();
            if values[0] == values[1] && values[0] > 5 {
                TryExecutionResult::falsified(None).into()
            } else {
                TryExecutionResult::satisfied().into()
            }
        });
        assert_eq!(
            shrunk.parameters().direct_values(),
            &[Value::Int(6), Value::Int(6), Value::Int(0)]
        );
    }

    #[test]
    fn test_already_minimal_sample_is_unchanged() {
        let mut random = create_seeded_rng(1);
        let empty = lists(crate::primitives::integers(0, 10), 0, 0).generate(&mut random, 10);
        let sample = FalsifiedSample::new(ParameterSet::direct(vec![empty]), None, Vec::new());

        let shrunk = shrink_with(sample.clone(), |_: &ParameterSet<Value>| {
            TryExecutionResult::falsified(None).into()
        });
        assert_eq!(shrunk.parameters(), sample.parameters());
    }
}
