//! The replay record of one generated sample.
//!
//! A [`GenerationInfo`] never stores values. It stores the seed, the indices
//! at which the sample was produced and the outcomes observed while shrinking
//! it, which is enough to regenerate the sample as long as the arbitraries are
//! deterministic functions of their random stream.

use std::collections::BTreeMap;
use std::fmt;

use crate::generation::resolving::ParametersGenerator;
use crate::parameters::ParameterSet;
use crate::shrink::recreator::ShrunkSampleRecreator;
use crate::shrinkable::BoxedShrinkable;

#[cfg(feature = "persistence")]
use serde::{Deserialize, Serialize};

/// Where a dynamic parameter entered the run and how far its stream had
/// advanced when the sample was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(Serialize, Deserialize))]
pub struct DynamicInfo {
    /// Position of the parameter among all dynamic parameters registered in the run
    pub introduction_index: usize,
    /// Number of values drawn for the parameter before this one
    pub progress: u64,
    /// The value was taken from the parameter's edge cases
    #[cfg_attr(feature = "persistence", serde(default))]
    pub edge_case: bool,
}

impl DynamicInfo {
    pub fn new(introduction_index: usize, progress: u64, edge_case: bool) -> Self {
        Self {
            introduction_index,
            progress,
            edge_case,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "persistence", derive(Serialize, Deserialize))]
pub struct GenerationInfo {
    random_seed: Option<String>,
    generation_index: u64,
    base_generation_index: u64,
    edge_case: bool,
    dynamics: BTreeMap<String, DynamicInfo>,
    byte_sequences: Vec<Vec<u8>>,
}

impl GenerationInfo {
    /// An empty seed string is treated as no seed.
    pub fn new(random_seed: Option<String>, generation_index: u64) -> Self {
        Self {
            random_seed: random_seed.filter(|seed| !seed.is_empty()),
            generation_index,
            ..Self::default()
        }
    }

    pub fn with_base_generation_index(mut self, index: u64) -> Self {
        self.base_generation_index = index;
        self
    }

    pub fn with_edge_case(mut self, edge_case: bool) -> Self {
        self.edge_case = edge_case;
        self
    }

    pub fn with_dynamics(mut self, dynamics: BTreeMap<String, DynamicInfo>) -> Self {
        self.dynamics = dynamics;
        self
    }

    pub fn random_seed(&self) -> Option<&str> {
        self.random_seed.as_deref()
    }

    /// The seed parsed back into the form the generators take
    pub fn seed(&self) -> Option<u64> {
        self.random_seed.as_deref().and_then(|seed| seed.parse().ok())
    }

    /// 1-based number of the sample within its run; 0 means "nothing generated".
    pub fn generation_index(&self) -> u64 {
        self.generation_index
    }

    pub fn base_generation_index(&self) -> u64 {
        self.base_generation_index
    }

    pub fn edge_case(&self) -> bool {
        self.edge_case
    }

    pub fn dynamics(&self) -> &BTreeMap<String, DynamicInfo> {
        &self.dynamics
    }

    pub fn dynamic(&self, name: &str) -> Option<&DynamicInfo> {
        self.dynamics.get(name)
    }

    pub fn byte_sequences(&self) -> &[Vec<u8>] {
        &self.byte_sequences
    }

    /// A copy with one more shrink session appended. Empty sequences are dropped.
    pub fn append_shrinking_sequence(&self, sequence: Vec<u8>) -> Self {
        let mut appended = self.clone();
        if !sequence.is_empty() {
            appended.byte_sequences.push(sequence);
        }
        appended
    }

    /// Regenerate the unshrunk sample, without replaying any shrinking.
    pub fn peek_on(
        &self,
        generator: &ParametersGenerator,
    ) -> Option<ParameterSet<BoxedShrinkable>> {
        if self.generation_index == 0 {
            return None;
        }
        match generator.peek(self) {
            Ok(sample) => Some(sample),
            Err(error) => {
                tracing::warn!(%error, "Could not regenerate sample from {}", self);
                None
            }
        }
    }

    /// Replay every recorded shrink session on top of `sample`.
    pub fn replay_shrinking(
        &self,
        sample: ParameterSet<BoxedShrinkable>,
    ) -> Option<ParameterSet<BoxedShrinkable>> {
        self.byte_sequences.iter().try_fold(sample, |current, sequence| {
            ShrunkSampleRecreator::new(current).recreate_from(sequence)
        })
    }

    /// Regenerate the sample this record describes, shrinking included.
    ///
    /// Samples with dynamic parameters need a trial run between the two
    /// steps to learn their arbitraries; the check loop takes care of that.
    pub fn generate_on(
        &self,
        generator: &ParametersGenerator,
    ) -> Option<ParameterSet<BoxedShrinkable>> {
        let sample = self.peek_on(generator)?;
        self.replay_shrinking(sample)
    }
}

impl fmt::Display for GenerationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GenerationInfo(seed={}, index={}, base={}",
            self.random_seed.as_deref().unwrap_or("<none>"),
            self.generation_index,
            self.base_generation_index
        )?;
        if self.edge_case {
            write!(f, ", edge case")?;
        }
        if !self.dynamics.is_empty() {
            write!(f, ", dynamics={}", self.dynamics.len())?;
        }
        if !self.byte_sequences.is_empty() {
            write!(f, ", shrink sessions={}", self.byte_sequences.len())?;
        }
        write!(f, ")")
    }
}
