//! The search for a smaller falsifying sample, shared by all strategies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::ControlFlow;

use crate::parameters::ParameterSet;
use crate::property::TryExecutionResult;
use crate::sample::FalsifiedSample;
use crate::shrinkable::{BoxedShrinkable, ShrinkingDistance};
use crate::value::Value;

/// Maximum number of INVALID candidates kept as fallback search bases.
pub const MAX_FILTERED_RESULTS: usize = 100;

/// Answer of a [`Falsifier`] for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Falsification {
    Result(TryExecutionResult),
    /// No more answers; the search stops and keeps the best sample so far.
    Done,
}

impl From<TryExecutionResult> for Falsification {
    fn from(result: TryExecutionResult) -> Self {
        Falsification::Result(result)
    }
}

/// Re-runs the property for a candidate tuple.
pub trait Falsifier {
    fn falsify(&mut self, parameters: &ParameterSet<Value>) -> Falsification;
}

impl<F> Falsifier for F
where
    F: FnMut(&ParameterSet<Value>) -> Falsification,
{
    fn falsify(&mut self, parameters: &ParameterSet<Value>) -> Falsification {
        self(parameters)
    }
}

/// Hooks into a running shrink.
pub(crate) trait ShrinkListener {
    /// Called before every candidate. `Break` stops shrinking.
    fn on_attempt(&mut self) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called whenever a smaller falsifying sample is accepted.
    fn on_shrunk(&mut self, _sample: &FalsifiedSample) {}
}

pub(crate) struct SilentListener;

impl ShrinkListener for SilentListener {}

/// Shrinking stopped before reaching a fixed point; carries the best sample found.
#[derive(Debug)]
pub(crate) struct Interrupted {
    pub(crate) best: FalsifiedSample,
}

pub(crate) type SearchResult = Result<FalsifiedSample, Interrupted>;

/// Candidate tuples derived from the current search base.
pub(crate) type Candidates = Box<dyn Iterator<Item = ParameterSet<BoxedShrinkable>>>;

pub(crate) fn distance_of(shrinkables: &ParameterSet<BoxedShrinkable>) -> ShrinkingDistance {
    ShrinkingDistance::for_collection(shrinkables.all())
}

/// Runs candidate searches against one falsifier, caching every result by
/// the materialized tuple for the lifetime of the shrinker.
pub(crate) struct SampleShrinker<'a> {
    falsifier: &'a mut dyn Falsifier,
    listener: &'a mut dyn ShrinkListener,
    cache: HashMap<ParameterSet<Value>, TryExecutionResult>,
}

impl<'a> SampleShrinker<'a> {
    pub(crate) fn new(falsifier: &'a mut dyn Falsifier, listener: &'a mut dyn ShrinkListener) -> Self {
        Self {
            falsifier,
            listener,
            cache: HashMap::new(),
        }
    }

    /// `None` when the falsifier is done.
    fn falsify(&mut self, parameters: &ParameterSet<Value>) -> Option<TryExecutionResult> {
        if let Some(cached) = self.cache.get(parameters) {
            return Some(cached.clone());
        }
        match self.falsifier.falsify(parameters) {
            Falsification::Result(result) => {
                self.cache.insert(parameters.clone(), result.clone());
                Some(result)
            }
            Falsification::Done => None,
        }
    }

    /// Move `sample` towards smaller falsifying tuples using the candidates
    /// `supply` derives from the current base, until no candidate helps.
    pub(crate) fn search<S>(&mut self, sample: FalsifiedSample, supply: S) -> SearchResult
    where
        S: Fn(&ParameterSet<BoxedShrinkable>) -> Candidates,
    {
        let mut base = sample.shrinkables().clone();
        let mut best: Option<FalsifiedSample> = None;
        let mut filtered = FilteredResults::default();

        loop {
            let distance = distance_of(&base);
            let base_values = base.map(|shrinkable| shrinkable.value());
            let mut falsified = None;

            for candidate in supply(&base) {
                if self.listener.on_attempt().is_break() {
                    return Err(Interrupted {
                        best: best.unwrap_or(sample),
                    });
                }
                let candidate_distance = distance_of(&candidate);
                if candidate_distance > distance {
                    continue;
                }
                let parameters = candidate.map(|shrinkable| shrinkable.value());
                if parameters == base_values {
                    continue;
                }
                let Some(result) = self.falsify(&parameters) else {
                    return Err(Interrupted {
                        best: best.unwrap_or(sample),
                    });
                };
                if result.is_invalid() && candidate_distance < distance {
                    filtered.push(candidate_distance, parameters, candidate);
                } else if result.is_falsified() {
                    falsified = Some((candidate, result));
                    break;
                }
            }

            match falsified {
                Some((shrinkables, result)) => {
                    let shrunk = FalsifiedSample::new(
                        shrinkables.clone(),
                        result.error().cloned(),
                        result.footnotes().to_vec(),
                    );
                    self.listener.on_shrunk(&shrunk);
                    best = Some(shrunk);
                    base = shrinkables;
                    filtered.clear();
                }
                None => match filtered.pop() {
                    Some(next_base) => base = next_base,
                    None => break,
                },
            }
        }

        Ok(best.unwrap_or(sample))
    }
}

/// INVALID candidates ordered by distance, nearest first. When full the
/// farthest entry is dropped. Popped tuples are never queued again until
/// the next accepted shrink clears the queue.
#[derive(Default)]
struct FilteredResults {
    queue: BTreeMap<(ShrinkingDistance, u64), (ParameterSet<Value>, ParameterSet<BoxedShrinkable>)>,
    queued: HashSet<ParameterSet<Value>>,
    removed: HashSet<ParameterSet<Value>>,
    sequence: u64,
}

impl FilteredResults {
    fn push(
        &mut self,
        distance: ShrinkingDistance,
        parameters: ParameterSet<Value>,
        shrinkables: ParameterSet<BoxedShrinkable>,
    ) {
        if self.removed.contains(&parameters) || self.queued.contains(&parameters) {
            return;
        }
        self.sequence += 1;
        self.queued.insert(parameters.clone());
        self.queue
            .insert((distance, self.sequence), (parameters, shrinkables));

        if self.queue.len() > MAX_FILTERED_RESULTS {
            if let Some((_, (farthest, _))) = self.queue.pop_last() {
                self.queued.remove(&farthest);
            }
        }
    }

    fn pop(&mut self) -> Option<ParameterSet<BoxedShrinkable>> {
        let (_, (parameters, shrinkables)) = self.queue.pop_first()?;
        self.queued.remove(&parameters);
        self.removed.insert(parameters);
        Some(shrinkables)
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
        self.removed.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.queue.len()
    }
}
