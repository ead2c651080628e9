//! Enumeration of every combination of every parameter's values.

use std::collections::BTreeMap;

use super::{resolve_arbitraries, ForAllParametersGenerator};
use crate::arbitrary::{ArbitraryResolver, BoxedArbitrary, ExhaustiveGenerator, ForAllParameter};
use crate::combinatorics::{CombinedParameterIterator, Source};
use crate::error::GenerationError;
use crate::generation_info::{DynamicInfo, GenerationInfo};
use crate::parameters::ParameterSet;
use crate::shrinkable::{unshrinkable, BoxedShrinkable};

fn exhaustive_for(
    name: &str,
    arbitrary: &BoxedArbitrary,
    max_samples: u64,
) -> Result<ExhaustiveGenerator, GenerationError> {
    arbitrary
        .exhaustive(max_samples)
        .ok_or_else(|| GenerationError::ExhaustiveUnavailable {
            parameter: name.to_string(),
        })
}

fn unshrinkable_source(generators: &[ExhaustiveGenerator]) -> Source<BoxedShrinkable> {
    Source::concat(generators.iter().map(ExhaustiveGenerator::source).collect())
        .map(|value| unshrinkable(value))
}

/// Walks the Cartesian product of all exhaustive generators, last
/// parameter varying fastest. Generated values do not shrink.
pub struct ExhaustiveShrinkablesGenerator {
    direct_sources: ParameterSet<Source<BoxedShrinkable>>,
    iterator: CombinedParameterIterator<BoxedShrinkable>,
    max_count: u64,
    max_samples: u64,
    has_generated: bool,
}

impl ExhaustiveShrinkablesGenerator {
    pub fn new(
        parameters: &[ForAllParameter],
        resolver: &dyn ArbitraryResolver,
        max_samples: u64,
    ) -> Result<Self, GenerationError> {
        let arbitraries = resolve_arbitraries(parameters, resolver)?;
        let too_many = GenerationError::TooManyCombinations { max: max_samples };

        let mut max_count: u64 = 1;
        let mut sources = Vec::with_capacity(parameters.len());
        for (parameter, parameter_arbitraries) in parameters.iter().zip(&arbitraries) {
            let generators = parameter_arbitraries
                .iter()
                .map(|arbitrary| exhaustive_for(&parameter.name, arbitrary, max_samples))
                .collect::<Result<Vec<_>, _>>()?;
            let count = generators
                .iter()
                .try_fold(0u64, |sum, generator| sum.checked_add(generator.max_count()))
                .ok_or_else(|| too_many.clone())?;
            max_count = max_count
                .checked_mul(count)
                .filter(|total| *total <= max_samples)
                .ok_or_else(|| too_many.clone())?;
            sources.push(unshrinkable_source(&generators));
        }

        let direct_sources = ParameterSet::direct(sources);
        Ok(Self {
            iterator: CombinedParameterIterator::new(direct_sources.clone()),
            direct_sources,
            max_count,
            max_samples,
            has_generated: false,
        })
    }

    /// Number of tuples the enumeration produces.
    pub fn max_count(&self) -> u64 {
        self.max_count
    }
}

impl ForAllParametersGenerator for ExhaustiveShrinkablesGenerator {
    fn has_next(&mut self) -> bool {
        self.iterator.has_next()
    }

    fn next(&mut self) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let sample = self.iterator.next().ok_or(GenerationError::Exhausted)?;
        self.has_generated = true;
        Ok(sample)
    }

    fn peek(&self, info: &GenerationInfo) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let index = info.base_generation_index();
        let mut iterator = CombinedParameterIterator::new(self.direct_sources.clone());
        let mut sample = None;
        for _ in 0..=index {
            sample = iterator.next();
            if sample.is_none() {
                break;
            }
        }
        sample.ok_or(GenerationError::NotReproducible { index })
    }

    fn base_generation_index(&self) -> u64 {
        self.iterator.direct_iteration().max(0) as u64
    }

    fn dynamic_progress(&self) -> BTreeMap<String, (u64, bool)> {
        self.iterator
            .dynamic_iterations()
            .iter()
            .filter(|(_, drawn)| **drawn >= 0)
            .map(|(name, drawn)| (name.clone(), (*drawn as u64, false)))
            .collect()
    }

    fn required_tries(&self) -> Option<u64> {
        Some(self.max_count)
    }

    fn register_dynamic_parameter(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError> {
        let generator = exhaustive_for(name, arbitrary, self.max_samples)?;
        let max_count = self
            .max_count
            .checked_mul(generator.max_count())
            .filter(|total| *total <= self.max_samples)
            .ok_or(GenerationError::TooManyCombinations {
                max: self.max_samples,
            })?;

        let source = unshrinkable_source(std::slice::from_ref(&generator));
        let shrinkable = self
            .iterator
            .push_dynamic(name, source, self.has_generated)?
            .ok_or_else(|| GenerationError::DynamicValueUnavailable {
                name: name.to_string(),
            })?;
        self.max_count = max_count;
        Ok(shrinkable)
    }

    fn peek_dynamic_parameter(
        &self,
        name: &str,
        arbitrary: &BoxedArbitrary,
        info: &DynamicInfo,
        edge_case: bool,
    ) -> Result<BoxedShrinkable, GenerationError> {
        if edge_case {
            return Err(GenerationError::EdgeCasesUnsupported {
                name: name.to_string(),
            });
        }
        let generator = exhaustive_for(name, arbitrary, self.max_samples)?;
        if generator.max_count() == 0 {
            return Err(GenerationError::EmptyDynamicDimension {
                name: name.to_string(),
            });
        }
        let index = info.progress % generator.max_count();
        generator
            .iter()
            .nth(index as usize)
            .map(|value| unshrinkable(value))
            .ok_or(GenerationError::NotReproducible { index })
    }
}
