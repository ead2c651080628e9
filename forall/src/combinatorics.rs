//! Restartable sources and the combinatorial odometer over them.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;

use crate::error::GenerationError;
use crate::parameters::{ParameterReference, ParameterSet};

type SourceFactory<T> = dyn Fn() -> Box<dyn Iterator<Item = T>> + Send + Sync;

/// A factory producing a fresh finite iteration every time it is asked.
///
/// The odometer re-primes dimensions many times, so it never reuses a
/// single-pass iterator across resets.
pub struct Source<T> {
    factory: Arc<SourceFactory<T>>,
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Source")
    }
}

impl<T: 'static> Source<T> {
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Iterator<Item = T>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = T>> {
        (self.factory)()
    }

    /// All values of `sources`, one after the other.
    pub fn concat(sources: Vec<Source<T>>) -> Self {
        Self::from_fn(move || {
            let fresh: Vec<Box<dyn Iterator<Item = T>>> =
                sources.iter().map(Source::iter).collect();
            Box::new(fresh.into_iter().flatten())
        })
    }

    pub fn map<U, F>(self, f: F) -> Source<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Source::from_fn(move || {
            let f = Arc::clone(&f);
            Box::new(self.iter().map(move |value| f(value)))
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> {
    pub fn from_values(values: Vec<T>) -> Self {
        let values = Arc::new(values);
        Self::from_fn(move || {
            let values = Arc::clone(&values);
            Box::new((0..values.len()).map(move |i| values[i].clone()))
        })
    }
}

/// Every unordered pair `(items[i], items[j])` with `i < j`, in order.
pub fn distinct_pairs<T: Clone>(items: &[T]) -> Vec<(T, T)> {
    let mut pairs = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            pairs.push((items[i].clone(), items[j].clone()));
        }
    }
    pairs
}

/// Odometer over the Cartesian product of one source per parameter.
///
/// Enumeration is equivalent to nested loops with the last dimension varying
/// fastest. When a dimension runs out, the nearest slower dimension that still
/// has values advances once and every dimension to its right restarts from a
/// fresh iteration of its source. Dynamic dimensions can be appended after
/// iteration has begun; they become the new fastest-varying dimension.
///
/// ```
/// use forall::combinatorics::{CombinedParameterIterator, Source};
/// use forall::ParameterSet;
///
/// let sources = ParameterSet::direct(vec![
///     Source::from_values(vec![1, 2]),
///     Source::from_values(vec![3, 4]),
/// ]);
/// let tuples: Vec<Vec<i32>> = CombinedParameterIterator::new(sources)
///     .map(|set| set.direct_values().to_vec())
///     .collect();
/// assert_eq!(tuples, vec![vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4]]);
/// ```
pub struct CombinedParameterIterator<T> {
    references: Vec<ParameterReference>,
    direct_count: usize,
    sources: ParameterSet<Source<T>>,
    iterators: ParameterSet<Peekable<Box<dyn Iterator<Item = T>>>>,
    elements: ParameterSet<Option<T>>,
    started: bool,
    publish_first_empty: bool,
    published_empty: bool,
    is_empty: bool,
    direct_iteration: i64,
    dynamic_iterations: BTreeMap<String, i64>,
}

impl<T: Clone + 'static> CombinedParameterIterator<T> {
    pub fn new(sources: ParameterSet<Source<T>>) -> Self {
        let references = sources.references();
        let direct_count = sources.direct_values().len();
        let mut iterators = sources.map(|source| source.iter().peekable());
        let elements = sources.map(|_| None);
        let dynamic_iterations = sources
            .dynamic_values()
            .keys()
            .map(|name| (name.clone(), -1))
            .collect();
        let publish_first_empty = references.is_empty();
        let is_empty = iterators.all_mut().any(|iterator| iterator.peek().is_none());

        Self {
            references,
            direct_count,
            sources,
            iterators,
            elements,
            started: false,
            publish_first_empty,
            published_empty: false,
            is_empty,
            direct_iteration: -1,
            dynamic_iterations,
        }
    }

    pub fn has_next(&mut self) -> bool {
        if self.publish_first_empty {
            return true;
        }
        if self.is_empty {
            return false;
        }
        if !self.started {
            return true;
        }
        self.next_available_position(self.references.len()).is_some()
    }

    /// Index of the current direct combination, `-1` before the first one.
    pub fn direct_iteration(&self) -> i64 {
        self.direct_iteration
    }

    /// Values drawn per dynamic dimension, minus one.
    pub fn dynamic_iterations(&self) -> &BTreeMap<String, i64> {
        &self.dynamic_iterations
    }

    /// Append a dynamic dimension.
    ///
    /// When `active`, the caller is the one introducing the parameter right
    /// now: the dimension is advanced immediately and its first value returned.
    /// Otherwise the value is left to regular iteration and `None` returned.
    pub fn push_dynamic(
        &mut self,
        name: &str,
        source: Source<T>,
        active: bool,
    ) -> Result<Option<T>, GenerationError> {
        let reference = ParameterReference::Dynamic(name.to_string());
        if self.references.contains(&reference) {
            return Ok(self.elements.get_dynamic(name).cloned().flatten());
        }

        let mut iterator = source.iter().peekable();
        if iterator.peek().is_none() {
            return Err(GenerationError::EmptyDynamicDimension {
                name: name.to_string(),
            });
        }

        if self.references.is_empty() {
            self.publish_first_empty = false;
            self.is_empty = false;
        }
        self.references.push(reference.clone());
        self.sources.set_dynamic(name, source);
        self.iterators.set_dynamic(name, iterator);
        self.elements.set_dynamic(name, None);
        self.dynamic_iterations.insert(name.to_string(), -1);

        if !self.started {
            if active && self.published_empty {
                self.reset_values_from(0);
                return Ok(self.elements.get_dynamic(name).cloned().flatten());
            }
            return Ok(None);
        }
        if !active {
            return Ok(None);
        }
        Ok(self.advance(&reference))
    }

    fn next_available_position(&mut self, below: usize) -> Option<usize> {
        (0..below).rev().find(|&position| {
            let reference = &self.references[position];
            self.iterators
                .get_by_mut(reference)
                .is_some_and(|iterator| iterator.peek().is_some())
        })
    }

    fn advance(&mut self, reference: &ParameterReference) -> Option<T> {
        let value = self
            .iterators
            .get_by_mut(reference)
            .and_then(|iterator| iterator.next());
        self.elements.set_by(reference, value.clone());
        if let ParameterReference::Dynamic(name) = reference {
            *self.dynamic_iterations.entry(name.clone()).or_insert(-1) += 1;
        }
        value
    }

    fn reset_values_from(&mut self, start: usize) {
        let initial_reset = !self.started;
        for position in start..self.references.len() {
            let reference = self.references[position].clone();
            if !initial_reset {
                if let Some(source) = self.sources.get_by(&reference) {
                    let fresh = source.iter().peekable();
                    self.iterators.set_by(&reference, fresh);
                }
            }
            self.advance(&reference);
        }
        self.started = true;
    }

    fn current(&self) -> Option<ParameterSet<T>> {
        let direct = self
            .elements
            .direct_values()
            .iter()
            .cloned()
            .collect::<Option<Vec<T>>>()?;
        let dynamic = self
            .elements
            .dynamic_values()
            .iter()
            .filter_map(|(name, value)| value.clone().map(|value| (name.clone(), value)))
            .collect();
        Some(ParameterSet::new(direct, dynamic))
    }
}

impl<T: Clone + 'static> Iterator for CombinedParameterIterator<T> {
    type Item = ParameterSet<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.publish_first_empty {
            self.publish_first_empty = false;
            self.published_empty = true;
            self.direct_iteration = 0;
            return Some(ParameterSet::empty());
        }
        if self.is_empty {
            return None;
        }

        let changed_from = if !self.started {
            self.reset_values_from(0);
            0
        } else {
            let last = self.references.len().checked_sub(1)?;
            let position = self.next_available_position(last + 1)?;
            let reference = self.references[position].clone();
            self.advance(&reference);
            if position < last {
                self.reset_values_from(position + 1);
            }
            position
        };
        if changed_from < self.direct_count {
            self.direct_iteration += 1;
        }
        self.current()
    }
}
