//! Falsified samples, before and after shrinking.

use std::fmt;

use crate::error::PropertyError;
use crate::parameters::ParameterSet;
use crate::shrinkable::BoxedShrinkable;
use crate::value::Value;

/// A parameter tuple that falsified the property.
#[derive(Debug, Clone)]
pub struct FalsifiedSample {
    parameters: ParameterSet<Value>,
    shrinkables: ParameterSet<BoxedShrinkable>,
    error: Option<PropertyError>,
    footnotes: Vec<String>,
}

impl FalsifiedSample {
    pub fn new(
        shrinkables: ParameterSet<BoxedShrinkable>,
        error: Option<PropertyError>,
        footnotes: Vec<String>,
    ) -> Self {
        Self {
            parameters: shrinkables.map(|shrinkable| shrinkable.value()),
            shrinkables,
            error,
            footnotes,
        }
    }

    /// The materialized values the property saw
    pub fn parameters(&self) -> &ParameterSet<Value> {
        &self.parameters
    }

    pub fn shrinkables(&self) -> &ParameterSet<BoxedShrinkable> {
        &self.shrinkables
    }

    pub fn error(&self) -> Option<&PropertyError> {
        self.error.as_ref()
    }

    pub fn footnotes(&self) -> &[String] {
        &self.footnotes
    }
}

impl fmt::Display for FalsifiedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parameters)?;
        if let Some(error) = &self.error {
            write!(f, " ({})", error)?;
        }
        Ok(())
    }
}

/// The smallest falsifying sample found by shrinking.
#[derive(Debug, Clone)]
pub struct ShrunkFalsifiedSample {
    sample: FalsifiedSample,
    count_shrinking_steps: usize,
}

impl ShrunkFalsifiedSample {
    pub fn new(sample: FalsifiedSample, count_shrinking_steps: usize) -> Self {
        Self {
            sample,
            count_shrinking_steps,
        }
    }

    /// The original sample, when shrinking was skipped or found nothing smaller
    pub fn unshrunk(sample: FalsifiedSample) -> Self {
        Self::new(sample, 0)
    }

    pub fn sample(&self) -> &FalsifiedSample {
        &self.sample
    }

    pub fn parameters(&self) -> &ParameterSet<Value> {
        self.sample.parameters()
    }

    pub fn shrinkables(&self) -> &ParameterSet<BoxedShrinkable> {
        self.sample.shrinkables()
    }

    pub fn error(&self) -> Option<&PropertyError> {
        self.sample.error()
    }

    pub fn footnotes(&self) -> &[String] {
        self.sample.footnotes()
    }

    /// Accepted shrink steps, i.e. how often a smaller falsifying sample was found
    pub fn count_shrinking_steps(&self) -> usize {
        self.count_shrinking_steps
    }
}

impl fmt::Display for ShrunkFalsifiedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} shrinking steps",
            self.sample, self.count_shrinking_steps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shrinkable::unshrinkable;

    #[test]
    fn test_parameters_are_materialized_from_shrinkables() {
        let mut shrinkables = ParameterSet::direct(vec![unshrinkable(1), unshrinkable("x")]);
        shrinkables.set_dynamic("d", unshrinkable(true));
        let sample = FalsifiedSample::new(shrinkables, None, Vec::new());

        assert_eq!(
            sample.parameters().direct_values(),
            &[Value::Int(1), Value::from("x")]
        );
        assert_eq!(sample.parameters().get_dynamic("d"), Some(&Value::Bool(true)));
        assert_eq!(sample.to_string(), "[1, \"x\"] {d: true}");
    }

    #[test]
    fn test_shrunk_sample_display() {
        let sample = FalsifiedSample::new(
            ParameterSet::direct(vec![unshrinkable(0)]),
            Some(PropertyError::property_failed("too small")),
            Vec::new(),
        );
        let shrunk = ShrunkFalsifiedSample::new(sample, 3);
        assert_eq!(
            shrunk.to_string(),
            "[0] (Property failed: too small) after 3 shrinking steps"
        );
    }
}
