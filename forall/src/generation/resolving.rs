//! The layer between a strategy and the check loop.

use super::ForAllParametersGenerator;
use crate::arbitrary::BoxedArbitrary;
use crate::dynamic::DynamicParameterSource;
use crate::error::GenerationError;
use crate::generation_info::{DynamicInfo, GenerationInfo};
use crate::parameters::ParameterSet;
use crate::shrinkable::BoxedShrinkable;

/// Counts generated samples and keeps track of dynamic parameters on top of
/// a strategy.
///
/// While a peek is active (see [`ParametersGenerator::begin_peek`]), dynamic
/// parameters are regenerated from the recorded [`GenerationInfo`] instead of
/// being registered with the strategy.
pub struct ParametersGenerator {
    strategy: Box<dyn ForAllParametersGenerator>,
    seed: Option<String>,
    current_generation_index: u64,
    dynamic_introductions: Vec<String>,
    active_peek: Option<GenerationInfo>,
}

impl ParametersGenerator {
    pub fn new(strategy: Box<dyn ForAllParametersGenerator>, seed: Option<String>) -> Self {
        Self {
            strategy,
            seed,
            current_generation_index: 0,
            dynamic_introductions: Vec::new(),
            active_peek: None,
        }
    }

    pub fn has_next(&mut self) -> bool {
        self.strategy.has_next()
    }

    pub fn next(&mut self) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let sample = self.strategy.next()?;
        self.current_generation_index += 1;
        tracing::debug!(
            generation_index = self.current_generation_index,
            edge_case = self.strategy.generated_edge_case(),
            "Generated sample"
        );
        Ok(sample)
    }

    pub fn peek(&self, info: &GenerationInfo) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        self.strategy.peek(info)
    }

    /// Resolve dynamic parameters from `info` until [`Self::end_peek`].
    pub fn begin_peek(&mut self, info: GenerationInfo) {
        self.active_peek = Some(info);
    }

    pub fn end_peek(&mut self) {
        self.active_peek = None;
    }

    pub fn is_peeking(&self) -> bool {
        self.active_peek.is_some()
    }

    /// 1-based index of the last sample, 0 before the first one.
    pub fn generation_index(&self) -> u64 {
        self.current_generation_index
    }

    pub fn edge_cases_total(&self) -> u64 {
        self.strategy.edge_cases_total()
    }

    pub fn edge_cases_tried(&self) -> u64 {
        self.strategy.edge_cases_tried()
    }

    pub fn required_tries(&self) -> Option<u64> {
        self.strategy.required_tries()
    }

    pub fn dynamic_introductions(&self) -> &[String] {
        &self.dynamic_introductions
    }

    /// The replay record of the last sample.
    pub fn generation_info(&self) -> GenerationInfo {
        let progress = self.strategy.dynamic_progress();
        let dynamics = self
            .dynamic_introductions
            .iter()
            .enumerate()
            .filter_map(|(introduction_index, name)| {
                progress.get(name).map(|&(drawn, edge_case)| {
                    (name.clone(), DynamicInfo::new(introduction_index, drawn, edge_case))
                })
            })
            .collect();

        GenerationInfo::new(self.seed.clone(), self.current_generation_index)
            .with_base_generation_index(self.strategy.base_generation_index())
            .with_edge_case(self.strategy.generated_edge_case())
            .with_dynamics(dynamics)
    }
}

impl DynamicParameterSource for ParametersGenerator {
    fn resolve(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError> {
        if let Some(info) = &self.active_peek {
            let dynamic = info
                .dynamic(name)
                .ok_or_else(|| GenerationError::UnknownDynamicParameter {
                    name: name.to_string(),
                })?;
            return self
                .strategy
                .peek_dynamic_parameter(name, arbitrary, dynamic, dynamic.edge_case);
        }

        let value = self.strategy.register_dynamic_parameter(name, arbitrary)?;
        if !self.dynamic_introductions.iter().any(|known| known == name) {
            self.dynamic_introductions.push(name.to_string());
        }
        Ok(value)
    }
}
