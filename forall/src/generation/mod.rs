//! Strategies that produce parameter tuples for a property.
//!
//! Every strategy implements [`ForAllParametersGenerator`]. The check loop
//! never talks to a strategy directly; it goes through the
//! [`resolving::ParametersGenerator`] layer, which counts samples and tracks
//! dynamic parameters on top of the strategy.

use std::collections::BTreeMap;

use crate::arbitrary::{ArbitraryResolver, BoxedArbitrary, ForAllParameter};
use crate::config::{GenerationMode, PropertyConfig};
use crate::error::GenerationError;
use crate::generation_info::{DynamicInfo, GenerationInfo};
use crate::parameters::ParameterSet;
use crate::shrinkable::BoxedShrinkable;

pub mod data_based;
pub mod edge_cases;
pub mod exhaustive;
pub mod randomized;
pub mod resolving;

pub use data_based::{DataBasedShrinkablesGenerator, DataTable};
pub use edge_cases::{calculate_base_to_edge_case_ratio, EdgeCasesGenerator};
pub use exhaustive::ExhaustiveShrinkablesGenerator;
pub use randomized::{PurelyRandomShrinkablesGenerator, RandomizedShrinkablesGenerator};
pub use resolving::ParametersGenerator;

/// Pull-based source of parameter tuples.
pub trait ForAllParametersGenerator {
    fn has_next(&mut self) -> bool;

    fn next(&mut self) -> Result<ParameterSet<BoxedShrinkable>, GenerationError>;

    /// Regenerate the direct parameters of the sample `info` describes
    /// without disturbing the live state of this generator.
    fn peek(&self, info: &GenerationInfo) -> Result<ParameterSet<BoxedShrinkable>, GenerationError>;

    /// Strategy-specific index of the last direct tuple handed out.
    fn base_generation_index(&self) -> u64;

    /// Per dynamic parameter, the values drawn before the current one and
    /// whether the current one came from an edge case catalog.
    fn dynamic_progress(&self) -> BTreeMap<String, (u64, bool)>;

    fn edge_cases_total(&self) -> u64 {
        0
    }

    fn edge_cases_tried(&self) -> u64 {
        0
    }

    /// Number of tries needed to cover every tuple, for strategies that
    /// enumerate a finite space.
    fn required_tries(&self) -> Option<u64> {
        None
    }

    /// Whether the last tuple came from the edge case run.
    fn generated_edge_case(&self) -> bool {
        false
    }

    /// Bring a new dynamic parameter into the run. Returns its value for the
    /// current trial.
    fn register_dynamic_parameter(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError>;

    /// Regenerate the value a dynamic parameter had in a recorded sample.
    fn peek_dynamic_parameter(
        &self,
        name: &str,
        arbitrary: &BoxedArbitrary,
        info: &DynamicInfo,
        edge_case: bool,
    ) -> Result<BoxedShrinkable, GenerationError>;
}

/// Resolve every declared parameter, failing on the first one nothing
/// can generate.
pub(crate) fn resolve_arbitraries(
    parameters: &[ForAllParameter],
    resolver: &dyn ArbitraryResolver,
) -> Result<Vec<Vec<BoxedArbitrary>>, GenerationError> {
    parameters
        .iter()
        .map(|parameter| {
            let arbitraries = resolver.for_parameter(parameter);
            if arbitraries.is_empty() {
                Err(GenerationError::CannotFindArbitrary {
                    parameter: parameter.to_string(),
                })
            } else {
                Ok(arbitraries)
            }
        })
        .collect()
}

/// Pick and build the strategy for one run.
///
/// `Auto` chooses the data table when there is one, exhaustive generation
/// when the whole space fits into the configured tries, and randomized
/// generation otherwise.
pub fn create_generator(
    parameters: &[ForAllParameter],
    resolver: &dyn ArbitraryResolver,
    config: &PropertyConfig,
    seed: u64,
    data: Option<&DataTable>,
) -> Result<Box<dyn ForAllParametersGenerator>, GenerationError> {
    match config.generation_mode {
        GenerationMode::Randomized => Ok(Box::new(RandomizedShrinkablesGenerator::new(
            parameters,
            resolver,
            seed,
            config.gen_size(),
            config.edge_cases_mode,
        )?)),
        GenerationMode::Exhaustive => Ok(Box::new(ExhaustiveShrinkablesGenerator::new(
            parameters,
            resolver,
            config.max_exhaustive_samples,
        )?)),
        GenerationMode::DataDriven => {
            let data = data.ok_or(GenerationError::MissingData)?;
            Ok(Box::new(DataBasedShrinkablesGenerator::new(parameters, data.clone())?))
        }
        GenerationMode::Auto => {
            if let Some(data) = data {
                return Ok(Box::new(DataBasedShrinkablesGenerator::new(
                    parameters,
                    data.clone(),
                )?));
            }
            let tries = config.tries as u64;
            if let Ok(exhaustive) = ExhaustiveShrinkablesGenerator::new(parameters, resolver, tries) {
                if exhaustive.max_count() <= tries {
                    tracing::debug!(
                        max_count = exhaustive.max_count(),
                        "Generating exhaustively"
                    );
                    return Ok(Box::new(exhaustive));
                }
            }
            Ok(Box::new(RandomizedShrinkablesGenerator::new(
                parameters,
                resolver,
                seed,
                config.gen_size(),
                config.edge_cases_mode,
            )?))
        }
    }
}
