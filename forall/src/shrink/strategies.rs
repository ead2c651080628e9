//! The three ways candidates are derived from a falsified sample.
//!
//! Every strategy visits parameters in [`ParameterSet::references`] order:
//! direct parameters by index, then dynamic ones by name.

use crate::combinatorics::distinct_pairs;
use crate::parameters::{ParameterReference, ParameterSet};
use crate::sample::FalsifiedSample;
use crate::shrinkable::BoxedShrinkable;

use super::sample_shrinker::{Candidates, SampleShrinker, SearchResult};

fn no_candidates() -> Candidates {
    Box::new(std::iter::empty())
}

/// Shrink each parameter on its own, one after the other.
pub(crate) fn shrink_one_after_the_other(
    shrinker: &mut SampleShrinker<'_>,
    sample: FalsifiedSample,
) -> SearchResult {
    let references = sample.shrinkables().references();
    let mut current = sample;
    for reference in references {
        current = shrinker.search(current, |base| single_parameter(base, &reference))?;
    }
    Ok(current)
}

fn single_parameter(base: &ParameterSet<BoxedShrinkable>, reference: &ParameterReference) -> Candidates {
    let Some(shrinkable) = base.get_by(reference) else {
        return no_candidates();
    };
    let base = base.clone();
    let reference = reference.clone();
    Box::new(
        shrinkable
            .shrink()
            .map(move |shrunk| base.with(&reference, shrunk)),
    )
}

/// Shrink two parameters in lockstep, for every distinct pair.
pub(crate) fn shrink_pairwise(shrinker: &mut SampleShrinker<'_>, sample: FalsifiedSample) -> SearchResult {
    let pairs = distinct_pairs(&sample.shrinkables().references());
    let mut current = sample;
    for (first, second) in pairs {
        current = shrinker.search(current, |base| zipped_pair(base, &first, &second))?;
    }
    Ok(current)
}

fn zipped_pair(
    base: &ParameterSet<BoxedShrinkable>,
    first: &ParameterReference,
    second: &ParameterReference,
) -> Candidates {
    let (Some(left), Some(right)) = (base.get_by(first), base.get_by(second)) else {
        return no_candidates();
    };
    let base = base.clone();
    let (first, second) = (first.clone(), second.clone());
    Box::new(left.shrink().zip(right.shrink()).map(move |(left, right)| {
        let mut candidate = base.copy();
        first.update(&mut candidate, left);
        second.update(&mut candidate, right);
        candidate
    }))
}

/// Shrink the first parameter of every distinct pair and let the second one
/// grow to compensate.
pub(crate) fn shrink_and_grow(shrinker: &mut SampleShrinker<'_>, sample: FalsifiedSample) -> SearchResult {
    let pairs = distinct_pairs(&sample.shrinkables().references());
    let mut current = sample;
    for (shrinking, growing) in pairs {
        current = shrinker.search(current, |base| shrunk_and_grown(base, &shrinking, &growing))?;
    }
    Ok(current)
}

fn shrunk_and_grown(
    base: &ParameterSet<BoxedShrinkable>,
    shrinking: &ParameterReference,
    growing: &ParameterReference,
) -> Candidates {
    let (Some(before), Some(other)) = (base.get_by(shrinking), base.get_by(growing)) else {
        return no_candidates();
    };
    let (before, other) = (before.clone(), other.clone());
    let base = base.clone();
    let (shrinking, growing) = (shrinking.clone(), growing.clone());
    Box::new(before.shrink().filter_map(move |after| {
        let grown = other.grow(before.as_ref(), after.as_ref())?;
        let mut candidate = base.copy();
        candidate.set_by(&shrinking, after);
        candidate.set_by(&growing, grown);
        Some(candidate)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::TryExecutionResult;
    use crate::shrink::sample_shrinker::{Falsification, SilentListener};
    use crate::primitives::ShrinkableInteger;
    use crate::value::Value;
    use std::sync::Arc;

    fn integer(value: i64) -> BoxedShrinkable {
        Arc::new(ShrinkableInteger::new(value, 0, 20, 0))
    }

    fn ints(sample: &FalsifiedSample) -> Vec<i64> {
        sample
            .parameters()
            .all()
            .into_iter()
            .filter_map(Value::as_int)
            .collect()
    }

    fn falsified_when<P>(predicate: P) -> impl FnMut(&ParameterSet<Value>) -> Falsification
    where
        P: Fn(&[i64]) -> bool,
    {
        move |parameters: &ParameterSet<Value>| {
            let values: Vec<i64> = parameters.all().into_iter().filter_map(Value::as_int).collect();
            if predicate(&values) {
                TryExecutionResult::falsified(None).into()
            } else {
                TryExecutionResult::satisfied().into()
            }
        }
    }

    #[test]
    fn test_one_after_the_other_covers_dynamic_parameters() {
        let mut shrinkables = ParameterSet::direct(vec![integer(9)]);
        shrinkables.set_dynamic("extra", integer(12));
        let sample = FalsifiedSample::new(shrinkables, None, Vec::new());

        let mut falsifier = falsified_when(|values| values[0] >= 3 && values[1] >= 4);
        let mut listener = SilentListener;
        let mut shrinker = SampleShrinker::new(&mut falsifier, &mut listener);

        let shrunk = shrink_one_after_the_other(&mut shrinker, sample).unwrap();
        assert_eq!(ints(&shrunk), vec![3, 4]);
    }

    #[test]
    fn test_pairwise_moves_equal_parameters_together() {
        // Only samples with both values equal falsify, so neither can shrink alone.
        let sample = FalsifiedSample::new(
            ParameterSet::direct(vec![integer(10), integer(10)]),
            None,
            Vec::new(),
        );
        let mut falsifier = falsified_when(|values| values[0] == values[1] && values[0] >= 7);
        let mut listener = SilentListener;
        let mut shrinker = SampleShrinker::new(&mut falsifier, &mut listener);

        let alone = shrink_one_after_the_other(&mut shrinker, sample.clone()).unwrap();
        assert_eq!(ints(&alone), vec![10, 10]);

        let shrunk = shrink_pairwise(&mut shrinker, sample).unwrap();
        assert_eq!(ints(&shrunk), vec![7, 7]);
    }

    #[test]
    fn test_shrink_and_grow_keeps_sum() {
        let sample = FalsifiedSample::new(
            ParameterSet::direct(vec![integer(6), integer(4)]),
            None,
            Vec::new(),
        );
        let mut falsifier = falsified_when(|values| values.iter().sum::<i64>() == 10);
        let mut listener = SilentListener;
        let mut shrinker = SampleShrinker::new(&mut falsifier, &mut listener);

        let shrunk = shrink_and_grow(&mut shrinker, sample).unwrap();
        assert_eq!(ints(&shrunk), vec![0, 10]);
    }
}
