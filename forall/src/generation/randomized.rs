//! Seeded random generation with edge cases mixed in.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, RngCore};

use super::edge_cases::{
    calculate_base_to_edge_case_ratio, calculate_next_param_max_edge_cases, EdgeCasesGenerator,
};
use super::{resolve_arbitraries, ForAllParametersGenerator};
use crate::arbitrary::{ArbitraryResolver, BoxedArbitrary, ForAllParameter};
use crate::config::EdgeCasesMode;
use crate::error::GenerationError;
use crate::generation_info::{DynamicInfo, GenerationInfo};
use crate::parameters::ParameterSet;
use crate::rng::{create_seeded_rng, BranchingRandom};
use crate::shrinkable::{BoxedShrinkable, EdgeCases};

/// Draws values for one parameter, choosing among its arbitraries at random.
#[derive(Debug, Clone)]
pub struct RandomizedParameterGenerator {
    arbitraries: Vec<BoxedArbitrary>,
}

impl RandomizedParameterGenerator {
    /// `arbitraries` must not be empty.
    pub fn new(arbitraries: Vec<BoxedArbitrary>) -> Self {
        Self { arbitraries }
    }

    pub fn generate(&self, random: &mut dyn RngCore, gen_size: usize) -> BoxedShrinkable {
        let arbitrary = if self.arbitraries.len() == 1 {
            &self.arbitraries[0]
        } else {
            &self.arbitraries[random.gen_range(0..self.arbitraries.len())]
        };
        arbitrary.generate(random, gen_size)
    }
}

#[derive(Debug)]
struct DynamicStream {
    generator: RandomizedParameterGenerator,
    random: StdRng,
}

/// Random tuples without edge cases.
///
/// Direct parameters share the stream handed to [`generate_next`]; every
/// dynamic parameter owns a stream of its own so that introducing one never
/// shifts the values of the others.
///
/// [`generate_next`]: PurelyRandomShrinkablesGenerator::generate_next
#[derive(Debug)]
pub struct PurelyRandomShrinkablesGenerator {
    direct: Vec<RandomizedParameterGenerator>,
    dynamic: BTreeMap<String, DynamicStream>,
    gen_size: usize,
}

impl PurelyRandomShrinkablesGenerator {
    pub fn new(direct_arbitraries: Vec<Vec<BoxedArbitrary>>, gen_size: usize) -> Self {
        Self {
            direct: direct_arbitraries
                .into_iter()
                .map(RandomizedParameterGenerator::new)
                .collect(),
            dynamic: BTreeMap::new(),
            gen_size,
        }
    }

    pub fn generate_next(&mut self, random: &mut dyn RngCore) -> ParameterSet<BoxedShrinkable> {
        let direct = self.generate_direct_values(random);
        let gen_size = self.gen_size;
        let dynamic = self
            .dynamic
            .iter_mut()
            .map(|(name, stream)| {
                let value = stream.generator.generate(&mut stream.random, gen_size);
                (name.clone(), value)
            })
            .collect();
        ParameterSet::new(direct, dynamic)
    }

    /// Draw the direct parameters only.
    pub fn generate_direct(&self, random: &mut dyn RngCore) -> ParameterSet<BoxedShrinkable> {
        ParameterSet::direct(self.generate_direct_values(random))
    }

    fn generate_direct_values(&self, random: &mut dyn RngCore) -> Vec<BoxedShrinkable> {
        self.direct
            .iter()
            .map(|generator| generator.generate(random, self.gen_size))
            .collect()
    }

    /// Add a dynamic parameter drawing from `random`. With `draw_now` the first
    /// value is drawn and returned immediately; otherwise the next call to
    /// [`Self::generate_next`] draws it.
    pub fn push_dynamic(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
        random: StdRng,
        draw_now: bool,
    ) -> Option<BoxedShrinkable> {
        if self.dynamic.contains_key(name) {
            return None;
        }
        let mut stream = DynamicStream {
            generator: RandomizedParameterGenerator::new(vec![arbitrary.clone()]),
            random,
        };
        let value = draw_now.then(|| stream.generator.generate(&mut stream.random, self.gen_size));
        self.dynamic.insert(name.to_string(), stream);
        value
    }
}

/// Child streams of the root seed, in branching order.
fn branch_streams(seed: u64) -> (StdRng, StdRng, StdRng) {
    let mut root = BranchingRandom::new(seed);
    let edge_case_decider = root.branch();
    let base = root.branch();
    let dynamic_seeds = root.branch();
    (edge_case_decider, base, dynamic_seeds)
}

fn list_edge_cases(
    arbitraries: &[Vec<BoxedArbitrary>],
    mode: EdgeCasesMode,
    gen_size: usize,
) -> Vec<EdgeCases> {
    if !mode.activated() {
        return Vec::new();
    }
    let mut remaining = gen_size;
    let mut list = Vec::with_capacity(arbitraries.len());
    for parameter_arbitraries in arbitraries {
        let catalogs = parameter_arbitraries
            .iter()
            .map(|arbitrary| arbitrary.edge_cases(remaining))
            .collect();
        let edge_cases = EdgeCases::concat(catalogs, remaining);
        remaining = calculate_next_param_max_edge_cases(remaining, edge_cases.len());
        list.push(edge_cases);
    }
    list
}

/// The default strategy: random tuples from a seed, with edge case
/// combinations either generated first or mixed in.
pub struct RandomizedShrinkablesGenerator {
    seed: u64,
    gen_size: usize,
    edge_cases_mode: EdgeCasesMode,
    direct_arbitraries: Vec<Vec<BoxedArbitrary>>,
    direct_edge_cases: ParameterSet<EdgeCases>,
    direct_edge_cases_total: u64,
    random_generator: PurelyRandomShrinkablesGenerator,
    edge_cases_generator: EdgeCasesGenerator,
    edge_case_decider: StdRng,
    base_random: StdRng,
    dynamic_seeds: StdRng,
    base_to_edge_case_ratio: usize,
    edge_cases_total: u64,
    edge_cases_tried: u64,
    all_edge_cases_generated: bool,
    normal_cases_tried: i64,
    edge_case_generated: bool,
    normal_case_generated: bool,
    dynamic_indices: BTreeMap<String, i64>,
}

impl RandomizedShrinkablesGenerator {
    pub fn new(
        parameters: &[ForAllParameter],
        resolver: &dyn ArbitraryResolver,
        seed: u64,
        gen_size: usize,
        edge_cases_mode: EdgeCasesMode,
    ) -> Result<Self, GenerationError> {
        let direct_arbitraries = resolve_arbitraries(parameters, resolver)?;
        let edge_cases = list_edge_cases(&direct_arbitraries, edge_cases_mode, gen_size);
        let edge_cases_total = if edge_cases.is_empty() {
            0
        } else {
            edge_cases
                .iter()
                .fold(1u64, |total, catalog| total.saturating_mul(catalog.len() as u64))
        };
        let direct_edge_cases = ParameterSet::direct(edge_cases);
        let edge_cases_generator = if edge_cases_mode.activated() {
            EdgeCasesGenerator::new(&direct_edge_cases)
        } else {
            EdgeCasesGenerator::disabled()
        };

        if edge_cases_mode.activated() && edge_cases_total > gen_size as u64 {
            tracing::info!(
                edge_cases_total,
                tries = gen_size,
                "Combinatorial explosion of edge case generation: more edge cases than tries"
            );
        }

        let (edge_case_decider, base_random, dynamic_seeds) = branch_streams(seed);
        Ok(Self {
            seed,
            gen_size,
            edge_cases_mode,
            random_generator: PurelyRandomShrinkablesGenerator::new(
                direct_arbitraries.clone(),
                gen_size,
            ),
            direct_arbitraries,
            direct_edge_cases,
            direct_edge_cases_total: edge_cases_total,
            edge_cases_generator,
            edge_case_decider,
            base_random,
            dynamic_seeds,
            base_to_edge_case_ratio: calculate_base_to_edge_case_ratio(gen_size, edge_cases_total),
            edge_cases_total,
            edge_cases_tried: 0,
            all_edge_cases_generated: !edge_cases_mode.activated(),
            normal_cases_tried: -1,
            edge_case_generated: false,
            normal_case_generated: false,
            dynamic_indices: BTreeMap::new(),
        })
    }

    /// Depends only on the direct parameters, so a peek computes the same
    /// catalog a live registration did.
    fn dynamic_edge_cases_limit(&self) -> usize {
        calculate_next_param_max_edge_cases(
            self.gen_size,
            self.direct_edge_cases_total.max(1) as usize,
        )
    }

    fn dynamic_edge_cases(&self, arbitrary: &BoxedArbitrary) -> EdgeCases {
        if self.edge_cases_mode.activated() {
            arbitrary.edge_cases(self.dynamic_edge_cases_limit())
        } else {
            EdgeCases::none()
        }
    }

    fn next_edge_case(&mut self) -> Option<ParameterSet<BoxedShrinkable>> {
        let edge_case_turn = match self.edge_cases_mode {
            EdgeCasesMode::None => false,
            EdgeCasesMode::First => true,
            EdgeCasesMode::Mixin => {
                self.edge_case_decider
                    .gen_range(0..=self.base_to_edge_case_ratio)
                    == 0
            }
        };
        if !edge_case_turn {
            return None;
        }
        if self.edge_cases_generator.has_next() {
            if let Some(edge_case) = self.edge_cases_generator.next() {
                self.edge_cases_tried += 1;
                return Some(edge_case);
            }
        }
        self.all_edge_cases_generated = true;
        None
    }
}

impl ForAllParametersGenerator for RandomizedShrinkablesGenerator {
    fn has_next(&mut self) -> bool {
        true
    }

    fn next(&mut self) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        self.edge_case_generated = false;
        self.normal_case_generated = false;

        if !self.all_edge_cases_generated {
            if let Some(edge_case) = self.next_edge_case() {
                self.edge_case_generated = true;
                return Ok(edge_case);
            }
        }

        self.normal_cases_tried += 1;
        self.normal_case_generated = true;
        Ok(self.random_generator.generate_next(&mut self.base_random))
    }

    fn peek(&self, info: &GenerationInfo) -> Result<ParameterSet<BoxedShrinkable>, GenerationError> {
        let base_index = info.base_generation_index();
        if self.direct_arbitraries.is_empty() {
            return Ok(ParameterSet::empty());
        }

        if info.edge_case() {
            let mut edge_cases = EdgeCasesGenerator::new(&self.direct_edge_cases);
            let mut sample = None;
            for _ in 0..=base_index {
                sample = edge_cases.next();
                if sample.is_none() {
                    break;
                }
            }
            return sample.ok_or(GenerationError::NotReproducible { index: base_index });
        }

        let (_, mut base_random, _) = branch_streams(self.seed);
        let generator = PurelyRandomShrinkablesGenerator::new(self.direct_arbitraries.clone(), self.gen_size);
        let mut sample = generator.generate_direct(&mut base_random);
        for _ in 0..base_index {
            sample = generator.generate_direct(&mut base_random);
        }
        Ok(sample)
    }

    fn base_generation_index(&self) -> u64 {
        let index = if self.edge_case_generated {
            self.edge_cases_generator.direct_iteration()
        } else {
            self.normal_cases_tried
        };
        index.max(0) as u64
    }

    fn dynamic_progress(&self) -> BTreeMap<String, (u64, bool)> {
        let edge_progress = if self.edge_case_generated {
            self.edge_cases_generator.dynamic_iterations()
        } else {
            BTreeMap::new()
        };
        let mut progress = BTreeMap::new();
        for (name, index) in &self.dynamic_indices {
            if let Some(&drawn) = edge_progress.get(name) {
                if drawn >= 0 {
                    progress.insert(name.clone(), (drawn as u64, true));
                }
                continue;
            }
            let drawn = self.normal_cases_tried - index;
            if drawn >= 0 {
                progress.insert(name.clone(), (drawn as u64, false));
            }
        }
        progress
    }

    fn edge_cases_total(&self) -> u64 {
        self.edge_cases_total
    }

    fn edge_cases_tried(&self) -> u64 {
        self.edge_cases_tried
    }

    fn generated_edge_case(&self) -> bool {
        self.edge_case_generated
    }

    fn register_dynamic_parameter(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError> {
        let edge_cases = self.dynamic_edge_cases(arbitrary);
        let accepted = !self.edge_cases_generator.is_disabled() && !edge_cases.is_empty();
        let edge_value = self
            .edge_cases_generator
            .push_dynamic(name, &edge_cases, self.edge_case_generated)?;
        if accepted {
            let count = edge_cases.len() as u64;
            self.edge_cases_total = if self.edge_cases_total == 0 {
                count
            } else {
                self.edge_cases_total.saturating_mul(count)
            };
            self.all_edge_cases_generated = false;
        }

        // Inside an edge case trial whose edge run could not take the
        // parameter, the random stream has to provide the value right away.
        let draw_now = self.normal_case_generated || (self.edge_case_generated && edge_value.is_none());
        let index = if draw_now {
            self.normal_cases_tried
        } else {
            self.normal_cases_tried + 1
        };
        self.dynamic_indices.insert(name.to_string(), index);

        let random = create_seeded_rng(self.dynamic_seeds.next_u64());
        let random_value = self
            .random_generator
            .push_dynamic(name, arbitrary, random, draw_now);

        tracing::debug!(name, edge_case = edge_value.is_some(), "Registered dynamic parameter");
        edge_value
            .or(random_value)
            .ok_or_else(|| GenerationError::DynamicValueUnavailable {
                name: name.to_string(),
            })
    }

    fn peek_dynamic_parameter(
        &self,
        name: &str,
        arbitrary: &BoxedArbitrary,
        info: &DynamicInfo,
        edge_case: bool,
    ) -> Result<BoxedShrinkable, GenerationError> {
        if edge_case {
            let catalog = self.dynamic_edge_cases(arbitrary);
            if catalog.is_empty() {
                return Err(GenerationError::EdgeCasesUnsupported {
                    name: name.to_string(),
                });
            }
            let index = (info.progress % catalog.len() as u64) as usize;
            return catalog
                .get(index)
                .ok_or(GenerationError::NotReproducible { index: info.progress });
        }

        let (_, _, mut dynamic_seeds) = branch_streams(self.seed);
        let mut seed = dynamic_seeds.next_u64();
        for _ in 0..info.introduction_index {
            seed = dynamic_seeds.next_u64();
        }
        let mut random = create_seeded_rng(seed);
        let generator = RandomizedParameterGenerator::new(vec![arbitrary.clone()]);
        let mut value = generator.generate(&mut random, self.gen_size);
        for _ in 0..info.progress {
            value = generator.generate(&mut random, self.gen_size);
        }
        Ok(value)
    }
}
