//! Generated values that know how to become smaller.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Shared handle to a shrinkable value.
pub type BoxedShrinkable = Arc<dyn Shrinkable>;

/// Lazy, finite sequence of smaller candidates.
pub type ShrinkableStream = Box<dyn Iterator<Item = BoxedShrinkable>>;

/// A generated value together with its shrinking behaviour.
///
/// `shrink` must only yield candidates whose distance is not larger than
/// `self.distance()`, and the sequence must be finite. Implementations are
/// immutable, so one instance can appear in many parameter sets at once.
pub trait Shrinkable: fmt::Debug + Send + Sync {
    fn value(&self) -> Value;

    fn distance(&self) -> ShrinkingDistance;

    fn shrink(&self) -> ShrinkableStream;

    /// Produce a candidate that compensates for another parameter having
    /// moved from `before` to `after`, e.g. to keep a sum constant.
    fn grow(&self, _before: &dyn Shrinkable, _after: &dyn Shrinkable) -> Option<BoxedShrinkable> {
        None
    }
}

/// Wrap a value that never shrinks.
pub fn unshrinkable(value: impl Into<Value>) -> BoxedShrinkable {
    Arc::new(Unshrinkable {
        value: value.into(),
    })
}

/// A value with distance zero and no smaller candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unshrinkable {
    value: Value,
}

impl Unshrinkable {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Shrinkable for Unshrinkable {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn distance(&self) -> ShrinkingDistance {
        ShrinkingDistance::MIN
    }

    fn shrink(&self) -> ShrinkableStream {
        Box::new(std::iter::empty())
    }
}

/// Ordering proxy for "how far from minimal" a value is.
///
/// Distances compare lexicographically component by component; a missing
/// trailing component counts as zero.
#[derive(Debug, Clone, Default)]
pub struct ShrinkingDistance {
    distances: Vec<u64>,
}

impl ShrinkingDistance {
    pub const MIN: ShrinkingDistance = ShrinkingDistance {
        distances: Vec::new(),
    };

    pub fn of(distances: &[u64]) -> Self {
        Self {
            distances: distances.to_vec(),
        }
    }

    pub fn single(distance: u64) -> Self {
        Self {
            distances: vec![distance],
        }
    }

    /// `[number of elements, sum of element distances...]`
    pub fn for_collection<'a, I>(elements: I) -> Self
    where
        I: IntoIterator<Item = &'a BoxedShrinkable>,
    {
        let mut size = 0u64;
        let sum = elements.into_iter().fold(Self::MIN, |sum, element| {
            size += 1;
            sum.plus(&element.distance())
        });
        Self::single(size).append(&sum)
    }

    /// Component-wise sum, saturating at `u64::MAX`.
    pub fn plus(&self, other: &ShrinkingDistance) -> ShrinkingDistance {
        let len = self.distances.len().max(other.distances.len());
        let distances = (0..len)
            .map(|i| {
                let left = self.distances.get(i).copied().unwrap_or(0);
                let right = other.distances.get(i).copied().unwrap_or(0);
                left.saturating_add(right)
            })
            .collect();
        Self { distances }
    }

    pub fn append(&self, other: &ShrinkingDistance) -> ShrinkingDistance {
        let mut distances = self.distances.clone();
        distances.extend_from_slice(&other.distances);
        Self { distances }
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.distances
    }
}

impl PartialEq for ShrinkingDistance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ShrinkingDistance {}

impl PartialOrd for ShrinkingDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShrinkingDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.distances.len().max(other.distances.len());
        for i in 0..len {
            let left = self.distances.get(i).copied().unwrap_or(0);
            let right = other.distances.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ShrinkingDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.distances)
    }
}

/// Finite catalog of boundary values for one arbitrary.
#[derive(Debug, Clone, Default)]
pub struct EdgeCases {
    suppliers: Vec<BoxedShrinkable>,
}

impl EdgeCases {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_shrinkables(suppliers: Vec<BoxedShrinkable>) -> Self {
        Self { suppliers }
    }

    /// Keep at most `max` entries.
    pub fn limit(mut self, max: usize) -> Self {
        self.suppliers.truncate(max);
        self
    }

    /// Concatenate several catalogs, keeping at most `max` entries overall.
    pub fn concat(catalogs: Vec<EdgeCases>, max: usize) -> Self {
        let suppliers = catalogs
            .into_iter()
            .flat_map(|catalog| catalog.suppliers)
            .take(max)
            .collect();
        Self { suppliers }
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<BoxedShrinkable> {
        self.suppliers.get(index).cloned()
    }

    /// Supply every edge case in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = BoxedShrinkable> + '_ {
        self.suppliers.iter().cloned()
    }

    pub fn into_vec(self) -> Vec<BoxedShrinkable> {
        self.suppliers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_compares_lexicographically() {
        assert!(ShrinkingDistance::of(&[1, 100]) < ShrinkingDistance::of(&[2, 0]));
        assert!(ShrinkingDistance::of(&[2, 1]) > ShrinkingDistance::of(&[2, 0]));
        assert_eq!(ShrinkingDistance::of(&[3]), ShrinkingDistance::of(&[3, 0]));
        assert!(ShrinkingDistance::of(&[3]) < ShrinkingDistance::of(&[3, 1]));
        assert_eq!(ShrinkingDistance::MIN, ShrinkingDistance::single(0));
    }

    #[test]
    fn test_distance_plus_pads_and_saturates() {
        let sum = ShrinkingDistance::of(&[1, 2]).plus(&ShrinkingDistance::of(&[3]));
        assert_eq!(sum.dimensions(), &[4, 2]);

        let saturated = ShrinkingDistance::single(u64::MAX).plus(&ShrinkingDistance::single(1));
        assert_eq!(saturated.dimensions(), &[u64::MAX]);
    }

    #[test]
    fn test_distance_for_collection() {
        let elements: Vec<BoxedShrinkable> = vec![unshrinkable(1), unshrinkable(2)];
        let distance = ShrinkingDistance::for_collection(&elements);
        assert_eq!(distance, ShrinkingDistance::of(&[2, 0]));
        assert_eq!(
            ShrinkingDistance::for_collection(&Vec::<BoxedShrinkable>::new()),
            ShrinkingDistance::MIN
        );
    }

    #[test]
    fn test_unshrinkable() {
        let value = unshrinkable("abc");
        assert_eq!(value.value(), Value::from("abc"));
        assert_eq!(value.distance(), ShrinkingDistance::MIN);
        assert_eq!(value.shrink().count(), 0);
        assert!(value.grow(value.as_ref(), value.as_ref()).is_none());
    }

    #[test]
    fn test_edge_cases_concat_respects_limit() {
        let first = EdgeCases::from_shrinkables(vec![unshrinkable(1), unshrinkable(2)]);
        let second = EdgeCases::from_shrinkables(vec![unshrinkable(3)]);

        let all = EdgeCases::concat(vec![first.clone(), second.clone()], 10);
        let values: Vec<Value> = all.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![1.into(), 2.into(), 3.into()]);

        assert_eq!(EdgeCases::concat(vec![first, second], 2).len(), 2);
        assert!(EdgeCases::none().is_empty());
    }
}
