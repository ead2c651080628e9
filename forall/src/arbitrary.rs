//! Arbitraries and the protocol for resolving them per declared parameter.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::combinatorics::Source;
use crate::shrinkable::{BoxedShrinkable, EdgeCases};
use crate::value::{ParameterType, Value};

/// Shared handle to an arbitrary.
pub type BoxedArbitrary = Arc<dyn Arbitrary>;

/// Describes how to produce values of some type.
///
/// `generate` must be a deterministic function of the random stream it is
/// given: replaying a failure re-runs generation from recorded seeds.
pub trait Arbitrary: fmt::Debug + Send + Sync {
    fn generate(&self, random: &mut dyn RngCore, gen_size: usize) -> BoxedShrinkable;

    /// At most `max_edge_cases` boundary values.
    fn edge_cases(&self, _max_edge_cases: usize) -> EdgeCases {
        EdgeCases::none()
    }

    /// Every value in a fixed order, or `None` if there are more than
    /// `max_samples` or the values cannot be enumerated.
    fn exhaustive(&self, _max_samples: u64) -> Option<ExhaustiveGenerator> {
        None
    }
}

/// Restartable, finite enumeration of all values of an arbitrary.
#[derive(Clone)]
pub struct ExhaustiveGenerator {
    max_count: u64,
    values: Source<Value>,
}

impl ExhaustiveGenerator {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            max_count: values.len() as u64,
            values: Source::from_values(values),
        }
    }

    /// `factory` must yield exactly `max_count` values each time it is called.
    pub fn from_fn<F>(max_count: u64, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Iterator<Item = Value>> + Send + Sync + 'static,
    {
        Self {
            max_count,
            values: Source::from_fn(factory),
        }
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Value>> {
        self.values.iter()
    }

    pub fn source(&self) -> Source<Value> {
        self.values.clone()
    }
}

impl fmt::Debug for ExhaustiveGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExhaustiveGenerator")
            .field("max_count", &self.max_count)
            .finish()
    }
}

/// A parameter declared by a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForAllParameter {
    pub name: String,
    pub parameter_type: ParameterType,
}

impl ForAllParameter {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
        }
    }
}

impl fmt::Display for ForAllParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.parameter_type)
    }
}

/// Supplies candidate arbitraries for a declared parameter.
pub trait ArbitraryResolver {
    fn for_parameter(&self, parameter: &ForAllParameter) -> Vec<BoxedArbitrary>;
}

impl<F> ArbitraryResolver for F
where
    F: Fn(&ForAllParameter) -> Vec<BoxedArbitrary>,
{
    fn for_parameter(&self, parameter: &ForAllParameter) -> Vec<BoxedArbitrary> {
        self(parameter)
    }
}

/// Resolver backed by arbitraries registered per parameter name.
#[derive(Debug, Clone, Default)]
pub struct ArbitraryRegistry {
    by_name: HashMap<String, Vec<BoxedArbitrary>>,
}

impl ArbitraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate arbitrary for parameter `name`. Registering several
    /// makes generation choose among them.
    pub fn register(&mut self, name: impl Into<String>, arbitrary: BoxedArbitrary) {
        self.by_name.entry(name.into()).or_default().push(arbitrary);
    }
}

impl ArbitraryResolver for ArbitraryRegistry {
    fn for_parameter(&self, parameter: &ForAllParameter) -> Vec<BoxedArbitrary> {
        self.by_name
            .get(&parameter.name)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::integers;

    #[test]
    fn test_exhaustive_generator_restarts() {
        let generator = ExhaustiveGenerator::from_values(vec![1.into(), 2.into()]);
        assert_eq!(generator.max_count(), 2);
        assert_eq!(generator.iter().count(), 2);
        assert_eq!(generator.iter().collect::<Vec<_>>(), vec![1.into(), 2.into()]);
    }

    #[test]
    fn test_registry_resolves_by_name() {
        let mut registry = ArbitraryRegistry::new();
        registry.register("n", integers(0, 10));
        registry.register("n", integers(20, 30));

        let n = ForAllParameter::new("n", ParameterType::Int);
        let m = ForAllParameter::new("m", ParameterType::Int);
        assert_eq!(registry.for_parameter(&n).len(), 2);
        assert!(registry.for_parameter(&m).is_empty());
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |_: &ForAllParameter| vec![integers(1, 2)];
        let n = ForAllParameter::new("n", ParameterType::Int);
        assert_eq!(resolver.for_parameter(&n).len(), 1);
    }
}
