//! Tuples taken from an externally supplied table.

use std::collections::BTreeMap;

use super::ForAllParametersGenerator;
use crate::arbitrary::{BoxedArbitrary, ForAllParameter};
use crate::error::GenerationError;
use crate::generation_info::{DynamicInfo, GenerationInfo};
use crate::parameters::ParameterSet;
use crate::shrinkable::{unshrinkable, BoxedShrinkable};
use crate::value::Value;

/// Rows of values, one per trial, one column per declared parameter.
pub type DataTable = Vec<Vec<Value>>;

fn describe_tuple(tuple: &[Value]) -> String {
    let values: Vec<String> = tuple.iter().map(Value::to_string).collect();
    format!("({})", values.join(", "))
}

fn describe_parameters(parameters: &[ForAllParameter]) -> String {
    let declared: Vec<String> = parameters.iter().map(ForAllParameter::to_string).collect();
    format!("[{}]", declared.join(", "))
}

fn check_compatible(tuple: &[Value], parameters: &[ForAllParameter]) -> Result<(), GenerationError> {
    let compatible = tuple.len() == parameters.len()
        && tuple
            .iter()
            .zip(parameters)
            .all(|(value, parameter)| parameter.parameter_type.accepts(value));
    if compatible {
        Ok(())
    } else {
        Err(GenerationError::IncompatibleData {
            tuple: describe_tuple(tuple),
            parameters: describe_parameters(parameters),
        })
    }
}

/// Hands out the rows of a [`DataTable`] in order. The whole table is
/// checked against the declared parameters up front.
#[derive(Debug)]
pub struct DataBasedShrinkablesGenerator {
    table: DataTable,
    position: usize,
}

impl DataBasedShrinkablesGenerator {
    pub fn new(parameters: &[ForAllParameter], table: DataTable) -> Result<Self, GenerationError> {
        for tuple in &table {
            check_compatible(tuple, parameters)?;
        }
        Ok(Self { table, position: 0 })
    }

    fn row(&self, index: usize) -> Option<ParameterSet<BoxedShrinkable>> {
        self.table.get(index).map(|tuple| {
            ParameterSet::direct(tuple.iter().cloned().map(|value| unshrinkable(value)).collect())
        })
    }

    fn unsupported(name: &str) -> GenerationError {
        GenerationError::DynamicParametersUnsupported {
            strategy: "Data-driven".to_string(),
            name: name.to_string(),
        }
    }
}

impl ForAllParametersGenerator for DataBasedShrinkablesGenerator {
    fn has_next(&mut self) -> bool {
        self.position < self.table.len()
    }

    fn next(&mut self) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let sample = self.row(self.position).ok_or(GenerationError::Exhausted)?;
        self.position += 1;
        Ok(sample)
    }

    fn peek(&self, info: &GenerationInfo) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let index = info.base_generation_index();
        self.row(index as usize)
            .ok_or(GenerationError::NotReproducible { index })
    }

    fn base_generation_index(&self) -> u64 {
        self.position.saturating_sub(1) as u64
    }

    fn dynamic_progress(&self) -> BTreeMap<String, (u64, bool)> {
        BTreeMap::new()
    }

    fn required_tries(&self) -> Option<u64> {
        Some(self.table.len() as u64)
    }

    fn register_dynamic_parameter(
        &mut self,
        name: &str,
        _arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError> {
        Err(Self::unsupported(name))
    }

    fn peek_dynamic_parameter(
        &self,
        name: &str,
        _arbitrary: &BoxedArbitrary,
        _info: &DynamicInfo,
        _edge_case: bool,
    ) -> Result<BoxedShrinkable, GenerationError> {
        Err(Self::unsupported(name))
    }
}
