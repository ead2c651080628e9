//! Enumeration of edge case combinations.

use std::collections::BTreeMap;

use crate::combinatorics::{CombinedParameterIterator, Source};
use crate::error::GenerationError;
use crate::parameters::ParameterSet;
use crate::shrinkable::{BoxedShrinkable, EdgeCases};

/// `clamp(gen_size / edge_cases_total, 5, 20)`: how many base samples are
/// drawn, on average, per mixed-in edge case.
pub fn calculate_base_to_edge_case_ratio(gen_size: usize, edge_cases_total: u64) -> usize {
    let total = edge_cases_total.max(1);
    let ratio = (gen_size as u64 / total) as usize;
    ratio.clamp(5, 20)
}

/// Share of `max_edge_cases` left for the next parameter when the current one
/// contributes `base_cases_size` edge cases. Rounds up.
pub fn calculate_next_param_max_edge_cases(max_edge_cases: usize, base_cases_size: usize) -> usize {
    let base_cases_size = base_cases_size.max(1);
    let mut max_derived = (max_edge_cases / base_cases_size).max(1);
    if max_edge_cases % base_cases_size > 0 {
        max_derived += 1;
    }
    max_derived
}

fn to_source(edge_cases: &EdgeCases) -> Source<BoxedShrinkable> {
    Source::from_values(edge_cases.clone().into_vec())
}

/// Odometer over the edge case catalogs of all parameters.
///
/// One empty catalog empties the whole combination: the generator then stays
/// disabled, including for dynamic parameters pushed later.
pub struct EdgeCasesGenerator {
    iterator: Option<CombinedParameterIterator<BoxedShrinkable>>,
    disabled: bool,
}

impl EdgeCasesGenerator {
    pub fn new(edge_cases: &ParameterSet<EdgeCases>) -> Self {
        let disabled = edge_cases.all().iter().any(|catalog| catalog.is_empty());
        let iterator = if disabled || edge_cases.is_empty() {
            None
        } else {
            Some(CombinedParameterIterator::new(edge_cases.map(to_source)))
        };
        Self { iterator, disabled }
    }

    pub fn disabled() -> Self {
        Self {
            iterator: None,
            disabled: true,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn has_next(&mut self) -> bool {
        match self.iterator.as_mut() {
            Some(iterator) if !self.disabled => iterator.has_next(),
            _ => false,
        }
    }

    pub fn next(&mut self) -> Option<ParameterSet<BoxedShrinkable>> {
        if self.disabled {
            return None;
        }
        self.iterator.as_mut()?.next()
    }

    pub fn direct_iteration(&self) -> i64 {
        self.iterator
            .as_ref()
            .map_or(-1, |iterator| iterator.direct_iteration())
    }

    pub fn dynamic_iterations(&self) -> BTreeMap<String, i64> {
        self.iterator
            .as_ref()
            .map(|iterator| iterator.dynamic_iterations().clone())
            .unwrap_or_default()
    }

    /// Splice a dynamic parameter's edge cases into the run.
    ///
    /// An empty catalog disables edge case generation from here on.
    pub fn push_dynamic(
        &mut self,
        name: &str,
        edge_cases: &EdgeCases,
        active: bool,
    ) -> Result<Option<BoxedShrinkable>, GenerationError> {
        if self.disabled {
            return Ok(None);
        }
        if edge_cases.is_empty() {
            self.disabled = true;
            return Ok(None);
        }
        let iterator = self
            .iterator
            .get_or_insert_with(|| CombinedParameterIterator::new(ParameterSet::empty()));
        iterator.push_dynamic(name, to_source(edge_cases), active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shrinkable::unshrinkable;
    use crate::value::Value;

    fn catalog(values: &[i64]) -> EdgeCases {
        EdgeCases::from_shrinkables(values.iter().map(|v| unshrinkable(*v)).collect())
    }

    fn values(set: &ParameterSet<BoxedShrinkable>) -> Vec<Value> {
        set.all().iter().map(|s| s.value()).collect()
    }

    #[test]
    fn test_ratio_is_clamped() {
        assert_eq!(calculate_base_to_edge_case_ratio(1000, 10), 20);
        assert_eq!(calculate_base_to_edge_case_ratio(100, 10), 10);
        assert_eq!(calculate_base_to_edge_case_ratio(10, 10), 5);
        assert_eq!(calculate_base_to_edge_case_ratio(1000, 0), 20);
    }

    #[test]
    fn test_next_param_max_edge_cases_rounds_up() {
        assert_eq!(calculate_next_param_max_edge_cases(100, 10), 10);
        assert_eq!(calculate_next_param_max_edge_cases(100, 30), 4);
        assert_eq!(calculate_next_param_max_edge_cases(5, 10), 2);
    }

    #[test]
    fn test_combines_all_catalogs() {
        let edge_cases = ParameterSet::direct(vec![catalog(&[1, 2]), catalog(&[3, 4])]);
        let mut generator = EdgeCasesGenerator::new(&edge_cases);

        let mut all = Vec::new();
        while generator.has_next() {
            all.push(values(&generator.next().unwrap()));
        }
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(all[3], vec![Value::Int(2), Value::Int(4)]);
        assert_eq!(generator.direct_iteration(), 3);
    }

    #[test]
    fn test_one_empty_catalog_empties_everything() {
        let edge_cases = ParameterSet::direct(vec![catalog(&[1, 2]), EdgeCases::none()]);
        let mut generator = EdgeCasesGenerator::new(&edge_cases);
        assert!(!generator.has_next());
        assert!(generator.is_disabled());

        let pushed = generator.push_dynamic("x", &catalog(&[9]), false).unwrap();
        assert!(pushed.is_none());
        assert!(!generator.has_next());
    }

    #[test]
    fn test_dynamic_edge_cases_are_spliced_in() {
        let edge_cases = ParameterSet::direct(vec![catalog(&[1, 2])]);
        let mut generator = EdgeCasesGenerator::new(&edge_cases);
        generator.next().unwrap();

        let pushed = generator.push_dynamic("x", &catalog(&[7, 8]), true).unwrap();
        assert_eq!(pushed.map(|s| s.value()), Some(Value::Int(7)));

        let next = generator.next().unwrap();
        assert_eq!(next.get_dynamic("x").map(|s| s.value()), Some(Value::Int(8)));
        assert_eq!(generator.dynamic_iterations().get("x"), Some(&1));
    }

    #[test]
    fn test_empty_dynamic_catalog_disables_generator() {
        let edge_cases = ParameterSet::direct(vec![catalog(&[1, 2])]);
        let mut generator = EdgeCasesGenerator::new(&edge_cases);
        generator.next().unwrap();

        let pushed = generator.push_dynamic("x", &EdgeCases::none(), true).unwrap();
        assert!(pushed.is_none());
        assert!(!generator.has_next());
    }

    #[test]
    fn test_dynamic_only_edge_run() {
        let mut generator = EdgeCasesGenerator::new(&ParameterSet::empty());
        assert!(!generator.has_next());

        generator.push_dynamic("x", &catalog(&[1, 2]), false).unwrap();
        assert!(generator.has_next());
        let first = generator.next().unwrap();
        assert_eq!(first.get_dynamic("x").map(|s| s.value()), Some(Value::Int(1)));
        assert_eq!(generator.direct_iteration(), -1);
    }
}
