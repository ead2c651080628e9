//! Built-in arbitraries and the shrinkables they produce.

use std::sync::Arc;

use num_traits::PrimInt;
use rand::{Rng, RngCore};

use crate::arbitrary::{Arbitrary, BoxedArbitrary, ExhaustiveGenerator};
use crate::combinatorics::distinct_pairs;
use crate::shrinkable::{
    BoxedShrinkable, EdgeCases, Shrinkable, ShrinkableStream, ShrinkingDistance, unshrinkable,
};
use crate::value::Value;

/// Integers in `[min, max]`, shrinking towards zero (or the bound closest to it).
pub fn integers<T: PrimInt>(min: T, max: T) -> BoxedArbitrary {
    let (min, max) = (saturating_i64(min), saturating_i64(max));
    Arc::new(IntegerArbitrary::new(min.min(max), min.max(max)))
}

pub fn booleans() -> BoxedArbitrary {
    Arc::new(BooleanArbitrary)
}

/// Always the same value.
pub fn just(value: impl Into<Value>) -> BoxedArbitrary {
    Arc::new(JustArbitrary {
        value: value.into(),
    })
}

/// One of `values`, shrinking towards the first.
pub fn of<V: Into<Value>>(values: Vec<V>) -> BoxedArbitrary {
    Arc::new(ChoiceArbitrary {
        values: Arc::new(values.into_iter().map(Into::into).collect()),
    })
}

/// Lists of `element` values with a size in `[min_size, max_size]`.
pub fn lists(element: BoxedArbitrary, min_size: usize, max_size: usize) -> BoxedArbitrary {
    Arc::new(ListArbitrary {
        element,
        min_size: min_size.min(max_size),
        max_size: max_size.max(min_size),
    })
}

fn saturating_i64<T: PrimInt>(n: T) -> i64 {
    n.to_i64()
        .unwrap_or(if n < T::zero() { i64::MIN } else { i64::MAX })
}

#[derive(Debug, Clone)]
pub struct IntegerArbitrary {
    min: i64,
    max: i64,
}

impl IntegerArbitrary {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn target(&self) -> i64 {
        0i64.clamp(self.min, self.max)
    }

    fn shrinkable(&self, value: i64) -> BoxedShrinkable {
        Arc::new(ShrinkableInteger::new(value, self.min, self.max, self.target()))
    }
}

impl Arbitrary for IntegerArbitrary {
    fn generate(&self, random: &mut dyn RngCore, _gen_size: usize) -> BoxedShrinkable {
        self.shrinkable(random.gen_range(self.min..=self.max))
    }

    fn edge_cases(&self, max_edge_cases: usize) -> EdgeCases {
        let mut values = vec![
            self.min,
            self.min.saturating_add(1),
            self.target(),
            self.max.saturating_sub(1),
            self.max,
        ];
        values.retain(|v| (self.min..=self.max).contains(v));
        let mut distinct: Vec<i64> = Vec::with_capacity(values.len());
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        EdgeCases::from_shrinkables(distinct.into_iter().map(|v| self.shrinkable(v)).collect())
            .limit(max_edge_cases)
    }

    fn exhaustive(&self, max_samples: u64) -> Option<ExhaustiveGenerator> {
        let count = (self.max as i128 - self.min as i128 + 1) as u128;
        if count > max_samples as u128 {
            return None;
        }
        let (min, max) = (self.min, self.max);
        Some(ExhaustiveGenerator::from_fn(count as u64, move || {
            Box::new((min..=max).map(Value::Int))
        }))
    }
}

/// An integer within a range that shrinks towards `target`.
///
/// Candidates move by the full distance first, then by halves of it, down to a
/// single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkableInteger {
    value: i64,
    min: i64,
    max: i64,
    target: i64,
}

impl ShrinkableInteger {
    pub fn new(value: i64, min: i64, max: i64, target: i64) -> Self {
        Self {
            value,
            min,
            max,
            target,
        }
    }

    fn distance_to_target(&self) -> u64 {
        (self.value as i128 - self.target as i128).unsigned_abs() as u64
    }

    fn towards_target(&self, amount: u64) -> i64 {
        if self.value >= self.target {
            (self.value as i128 - amount as i128) as i64
        } else {
            (self.value as i128 + amount as i128) as i64
        }
    }

    fn away_from_target(&self, amount: u64) -> Option<i64> {
        let grown = if self.value >= self.target {
            self.value as i128 + amount as i128
        } else {
            self.value as i128 - amount as i128
        };
        if (self.min as i128..=self.max as i128).contains(&grown) {
            Some(grown as i64)
        } else {
            None
        }
    }
}

impl Shrinkable for ShrinkableInteger {
    fn value(&self) -> Value {
        Value::Int(self.value)
    }

    fn distance(&self) -> ShrinkingDistance {
        ShrinkingDistance::single(self.distance_to_target())
    }

    fn shrink(&self) -> ShrinkableStream {
        let distance = self.distance_to_target();
        let mut candidates: Vec<i64> = Vec::new();
        let mut amount = distance;
        while amount > 0 {
            let candidate = self.towards_target(amount);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
            amount /= 2;
        }
        let (min, max, target) = (self.min, self.max, self.target);
        Box::new(candidates.into_iter().map(move |value| {
            Arc::new(ShrinkableInteger::new(value, min, max, target)) as BoxedShrinkable
        }))
    }

    fn grow(&self, before: &dyn Shrinkable, after: &dyn Shrinkable) -> Option<BoxedShrinkable> {
        if before.value().as_int().is_none() || after.value().as_int().is_none() {
            return None;
        }
        let before_distance = before.distance().dimensions().first().copied().unwrap_or(0);
        let after_distance = after.distance().dimensions().first().copied().unwrap_or(0);
        let diff = before_distance.checked_sub(after_distance).filter(|d| *d > 0)?;
        let grown = self.away_from_target(diff)?;
        Some(Arc::new(ShrinkableInteger::new(
            grown,
            self.min,
            self.max,
            self.target,
        )))
    }
}

#[derive(Debug, Clone)]
pub struct BooleanArbitrary;

#[derive(Debug, Clone)]
struct ShrinkableBoolean(bool);

impl Shrinkable for ShrinkableBoolean {
    fn value(&self) -> Value {
        Value::Bool(self.0)
    }

    fn distance(&self) -> ShrinkingDistance {
        ShrinkingDistance::single(self.0 as u64)
    }

    fn shrink(&self) -> ShrinkableStream {
        if self.0 {
            Box::new(std::iter::once(
                Arc::new(ShrinkableBoolean(false)) as BoxedShrinkable
            ))
        } else {
            Box::new(std::iter::empty())
        }
    }
}

impl Arbitrary for BooleanArbitrary {
    fn generate(&self, random: &mut dyn RngCore, _gen_size: usize) -> BoxedShrinkable {
        Arc::new(ShrinkableBoolean(random.gen_bool(0.5)))
    }

    fn edge_cases(&self, max_edge_cases: usize) -> EdgeCases {
        EdgeCases::from_shrinkables(vec![
            Arc::new(ShrinkableBoolean(false)),
            Arc::new(ShrinkableBoolean(true)),
        ])
        .limit(max_edge_cases)
    }

    fn exhaustive(&self, max_samples: u64) -> Option<ExhaustiveGenerator> {
        (max_samples >= 2)
            .then(|| ExhaustiveGenerator::from_values(vec![false.into(), true.into()]))
    }
}

#[derive(Debug, Clone)]
pub struct JustArbitrary {
    value: Value,
}

impl Arbitrary for JustArbitrary {
    fn generate(&self, _random: &mut dyn RngCore, _gen_size: usize) -> BoxedShrinkable {
        unshrinkable(self.value.clone())
    }

    fn edge_cases(&self, max_edge_cases: usize) -> EdgeCases {
        EdgeCases::from_shrinkables(vec![unshrinkable(self.value.clone())]).limit(max_edge_cases)
    }

    fn exhaustive(&self, max_samples: u64) -> Option<ExhaustiveGenerator> {
        (max_samples >= 1).then(|| ExhaustiveGenerator::from_values(vec![self.value.clone()]))
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceArbitrary {
    values: Arc<Vec<Value>>,
}

#[derive(Debug, Clone)]
struct ShrinkableChoice {
    values: Arc<Vec<Value>>,
    index: usize,
}

impl Shrinkable for ShrinkableChoice {
    fn value(&self) -> Value {
        self.values.get(self.index).cloned().unwrap_or(Value::Null)
    }

    fn distance(&self) -> ShrinkingDistance {
        ShrinkingDistance::single(self.index as u64)
    }

    fn shrink(&self) -> ShrinkableStream {
        let values = Arc::clone(&self.values);
        Box::new((0..self.index).map(move |index| {
            Arc::new(ShrinkableChoice {
                values: Arc::clone(&values),
                index,
            }) as BoxedShrinkable
        }))
    }
}

impl ChoiceArbitrary {
    fn choice(&self, index: usize) -> BoxedShrinkable {
        Arc::new(ShrinkableChoice {
            values: Arc::clone(&self.values),
            index,
        })
    }
}

impl Arbitrary for ChoiceArbitrary {
    fn generate(&self, random: &mut dyn RngCore, _gen_size: usize) -> BoxedShrinkable {
        if self.values.is_empty() {
            return unshrinkable(Value::Null);
        }
        self.choice(random.gen_range(0..self.values.len()))
    }

    fn edge_cases(&self, max_edge_cases: usize) -> EdgeCases {
        let mut indices = Vec::new();
        if !self.values.is_empty() {
            indices.push(0);
            if self.values.len() > 1 {
                indices.push(self.values.len() - 1);
            }
        }
        EdgeCases::from_shrinkables(indices.into_iter().map(|i| self.choice(i)).collect())
            .limit(max_edge_cases)
    }

    fn exhaustive(&self, max_samples: u64) -> Option<ExhaustiveGenerator> {
        if self.values.len() as u64 > max_samples {
            return None;
        }
        Some(ExhaustiveGenerator::from_values(self.values.as_ref().clone()))
    }
}

#[derive(Debug, Clone)]
pub struct ListArbitrary {
    element: BoxedArbitrary,
    min_size: usize,
    max_size: usize,
}

impl Arbitrary for ListArbitrary {
    fn generate(&self, random: &mut dyn RngCore, gen_size: usize) -> BoxedShrinkable {
        let size = random.gen_range(self.min_size..=self.max_size);
        let elements = (0..size)
            .map(|_| self.element.generate(random, gen_size))
            .collect();
        Arc::new(ShrinkableList::new(elements, self.min_size, self.max_size))
    }

    fn edge_cases(&self, max_edge_cases: usize) -> EdgeCases {
        let mut lists: Vec<BoxedShrinkable> = Vec::new();
        if self.min_size == 0 {
            lists.push(Arc::new(ShrinkableList::new(
                Vec::new(),
                self.min_size,
                self.max_size,
            )));
        }
        if self.min_size <= 1 && self.max_size >= 1 {
            for element in self.element.edge_cases(max_edge_cases).iter() {
                lists.push(Arc::new(ShrinkableList::new(
                    vec![element],
                    self.min_size,
                    self.max_size,
                )));
            }
        }
        EdgeCases::from_shrinkables(lists).limit(max_edge_cases)
    }
}

/// A list of element shrinkables with size bounds.
///
/// Shrinking tries, in order: dropping to the minimal size, removing single
/// elements, shrinking one element, shrinking pairs of elements in lockstep,
/// and shrinking one element while growing a later one.
#[derive(Debug, Clone)]
pub struct ShrinkableList {
    elements: Arc<Vec<BoxedShrinkable>>,
    min_size: usize,
    max_size: usize,
}

impl ShrinkableList {
    pub fn new(elements: Vec<BoxedShrinkable>, min_size: usize, max_size: usize) -> Self {
        Self {
            elements: Arc::new(elements),
            min_size,
            max_size,
        }
    }

    pub fn elements(&self) -> &[BoxedShrinkable] {
        &self.elements
    }

    fn with_elements(&self, elements: Vec<BoxedShrinkable>) -> BoxedShrinkable {
        Arc::new(ShrinkableList::new(elements, self.min_size, self.max_size))
    }

    fn shrink_size(&self) -> Vec<Vec<BoxedShrinkable>> {
        let len = self.elements.len();
        if len <= self.min_size {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        if self.min_size + 1 < len {
            candidates.push(self.elements[..self.min_size].to_vec());
        }
        for removed in 0..len {
            let mut elements = self.elements.as_ref().clone();
            elements.remove(removed);
            candidates.push(elements);
        }
        candidates
    }
}

impl Shrinkable for ShrinkableList {
    fn value(&self) -> Value {
        Value::List(self.elements.iter().map(|e| e.value()).collect())
    }

    fn distance(&self) -> ShrinkingDistance {
        ShrinkingDistance::for_collection(self.elements.iter())
    }

    fn shrink(&self) -> ShrinkableStream {
        let this = self.clone();
        let sized = self.shrink_size().into_iter();

        let elements = Arc::clone(&self.elements);
        let one_after_the_other = (0..elements.len()).flat_map(move |index| {
            let elements = Arc::clone(&elements);
            elements[index].shrink().map(move |shrunk| {
                let mut candidate = elements.as_ref().clone();
                candidate[index] = shrunk;
                candidate
            })
        });

        let elements = Arc::clone(&self.elements);
        let pairs = distinct_pairs(&(0..elements.len()).collect::<Vec<_>>());
        let pairwise = pairs.clone().into_iter().flat_map(move |(i, j)| {
            let elements = Arc::clone(&elements);
            elements[i]
                .shrink()
                .zip(elements[j].shrink())
                .map(move |(first, second)| {
                    let mut candidate = elements.as_ref().clone();
                    candidate[i] = first;
                    candidate[j] = second;
                    candidate
                })
        });

        let elements = Arc::clone(&self.elements);
        let shrink_and_grow = pairs.into_iter().flat_map(move |(i, j)| {
            let elements = Arc::clone(&elements);
            elements[i].shrink().filter_map(move |shrunk| {
                let grown = elements[j].grow(elements[i].as_ref(), shrunk.as_ref())?;
                let mut candidate = elements.as_ref().clone();
                candidate[i] = shrunk;
                candidate[j] = grown;
                Some(candidate)
            })
        });

        Box::new(
            sized
                .chain(one_after_the_other)
                .chain(pairwise)
                .chain(shrink_and_grow)
                .map(move |elements| this.with_elements(elements)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_seeded_rng;

    fn ints(values: impl Iterator<Item = BoxedShrinkable>) -> Vec<i64> {
        values.map(|s| s.value().as_int().unwrap()).collect()
    }

    #[test]
    fn test_integers_stay_in_range() {
        let arbitrary = integers(-5, 5);
        let mut random = create_seeded_rng(42);
        for _ in 0..200 {
            let value = arbitrary.generate(&mut random, 100).value().as_int().unwrap();
            assert!((-5..=5).contains(&value));
        }
    }

    #[test]
    fn test_integers_accept_other_primitive_types() {
        let arbitrary = integers(1u8, 3u8);
        let exhaustive = arbitrary.exhaustive(10).unwrap();
        assert_eq!(exhaustive.iter().collect::<Vec<_>>(), vec![1.into(), 2.into(), 3.into()]);
        assert!(integers(0u64, u64::MAX).exhaustive(1000).is_none());
    }

    #[test]
    fn test_integer_shrinks_towards_target() {
        let shrinkable = ShrinkableInteger::new(10, -100, 100, 0);
        assert_eq!(ints(shrinkable.shrink()), vec![0, 5, 8, 9]);

        let negative = ShrinkableInteger::new(-4, -100, 100, 0);
        assert_eq!(ints(negative.shrink()), vec![0, -2, -3]);

        let at_target = ShrinkableInteger::new(3, 3, 10, 3);
        assert_eq!(at_target.shrink().count(), 0);
        assert_eq!(at_target.distance(), ShrinkingDistance::MIN);
    }

    #[test]
    fn test_integer_grow_compensates_within_range() {
        let before = ShrinkableInteger::new(5, 0, 10, 0);
        let after = ShrinkableInteger::new(3, 0, 10, 0);

        let growing = ShrinkableInteger::new(7, 0, 10, 0);
        let grown = growing.grow(&before, &after).unwrap();
        assert_eq!(grown.value(), Value::Int(9));

        let near_max = ShrinkableInteger::new(9, 0, 10, 0);
        assert!(near_max.grow(&before, &after).is_none());
    }

    #[test]
    fn test_integer_edge_cases() {
        let values = ints(integers(-10, 10).edge_cases(10).iter());
        assert_eq!(values, vec![-10, -9, 0, 9, 10]);

        let values = ints(integers(3, 4).edge_cases(10).iter());
        assert_eq!(values, vec![3, 4]);

        assert_eq!(integers(-10, 10).edge_cases(2).len(), 2);
    }

    #[test]
    fn test_choice_shrinks_towards_first() {
        let arbitrary = of(vec!["a", "b", "c"]);
        let exhaustive = arbitrary.exhaustive(3).unwrap();
        assert_eq!(exhaustive.max_count(), 3);

        let shrinkable = ShrinkableChoice {
            values: Arc::new(vec!["a".into(), "b".into(), "c".into()]),
            index: 2,
        };
        let shrunk: Vec<Value> = shrinkable.shrink().map(|s| s.value()).collect();
        assert_eq!(shrunk, vec!["a".into(), "b".into()]);
    }

    #[test]
    fn test_list_shrink_starts_with_smaller_sizes() {
        let elements: Vec<BoxedShrinkable> = (1..=3)
            .map(|v| Arc::new(ShrinkableInteger::new(v, 0, 10, 0)) as BoxedShrinkable)
            .collect();
        let list = ShrinkableList::new(elements, 0, 5);
        let candidates: Vec<Value> = list.shrink().take(4).map(|s| s.value()).collect();
        assert_eq!(
            candidates,
            vec![
                Value::from(Vec::<i64>::new()),
                Value::from(vec![2i64, 3]),
                Value::from(vec![1i64, 3]),
                Value::from(vec![1i64, 2]),
            ]
        );
        for candidate in list.shrink() {
            assert!(candidate.distance() <= list.distance());
        }
    }

    #[test]
    fn test_list_respects_min_size() {
        let elements: Vec<BoxedShrinkable> = vec![unshrinkable(1), unshrinkable(2)];
        let list = ShrinkableList::new(elements, 2, 2);
        assert_eq!(list.shrink().count(), 0);
    }

    #[test]
    fn test_list_edge_cases_include_empty_list() {
        let arbitrary = lists(integers(0, 5), 0, 3);
        let edge_cases: Vec<Value> = arbitrary.edge_cases(10).iter().map(|s| s.value()).collect();
        assert_eq!(edge_cases[0], Value::List(vec![]));
        assert!(edge_cases.contains(&Value::from(vec![5i64])));
    }
}
