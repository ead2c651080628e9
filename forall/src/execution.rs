//! Property check execution: generate, run, classify, shrink and report.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::arbitrary::{ArbitraryRegistry, ArbitraryResolver, BoxedArbitrary, ForAllParameter};
use crate::config::{AfterFailureMode, PropertyConfig};
use crate::dynamic::{DynamicContext, SharedSource};
use crate::error::{panic_message, PropertyError};
use crate::generation::{create_generator, DataTable, ParametersGenerator};
use crate::generation_info::GenerationInfo;
use crate::parameters::ParameterSet;
use crate::property::{CheckedFunction, Status, TryExecutionResult, TryExecutor};
use crate::reporting::{Reporter, TracingReporter};
use crate::rng::choose_seed;
use crate::sample::{FalsifiedSample, ShrunkFalsifiedSample};
use crate::shrink::{Falsification, PropertyShrinker};
use crate::shrinkable::{unshrinkable, BoxedShrinkable};
use crate::value::{ParameterType, Value};

/// Overall outcome of checking a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Successful,
    Failed,
    /// Too many samples were invalid, or none was checked at all
    Exhausted,
}

/// Report of one property check
#[derive(Debug, Clone)]
pub struct PropertyCheckResult {
    pub status: CheckStatus,
    pub stereotype: String,
    pub property_name: String,
    /// Seed of the run, also contained in `generation`
    pub seed: Option<String>,
    /// Replay record of the failing sample including its shrinking, or of the last sample
    pub generation: GenerationInfo,
    pub tries: usize,
    pub checks: usize,
    pub edge_cases_total: u64,
    pub edge_cases_tried: u64,
    pub original_sample: Option<FalsifiedSample>,
    pub shrunk_sample: Option<ShrunkFalsifiedSample>,
    /// Cause of the failure
    pub error: Option<PropertyError>,
    pub duration: Duration,
}

impl PropertyCheckResult {
    pub fn is_successful(&self) -> bool {
        self.status == CheckStatus::Successful
    }

    pub fn is_failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }

    pub fn is_exhausted(&self) -> bool {
        self.status == CheckStatus::Exhausted
    }

    /// Values of the shrunk sample, falling back to the original one
    pub fn falsified_parameters(&self) -> Option<&ParameterSet<Value>> {
        self.shrunk_sample
            .as_ref()
            .map(ShrunkFalsifiedSample::parameters)
            .or_else(|| self.original_sample.as_ref().map(FalsifiedSample::parameters))
    }
}

/// Answers registered arbitraries first and asks the custom resolver for the rest.
struct CombinedResolver<'r> {
    registry: &'r ArbitraryRegistry,
    fallback: Option<&'r dyn ArbitraryResolver>,
}

impl ArbitraryResolver for CombinedResolver<'_> {
    fn for_parameter(&self, parameter: &ForAllParameter) -> Vec<BoxedArbitrary> {
        let registered = self.registry.for_parameter(parameter);
        match self.fallback {
            Some(fallback) if registered.is_empty() => fallback.for_parameter(parameter),
            _ => registered,
        }
    }
}

/// Counters of a running check
#[derive(Debug, Default)]
struct Counts {
    tries: usize,
    checks: usize,
}

/// A property together with its parameters and configuration.
///
/// ```
/// use forall::execution::PropertyCheck;
/// use forall::primitives::integers;
/// use forall::value::{ParameterType, Value};
///
/// let result = PropertyCheck::property("sum is small", |parameters, _| {
///     let sum: i64 = parameters.direct_values().iter().filter_map(Value::as_int).sum();
///     Ok(sum < 15)
/// })
/// .for_all("a", ParameterType::Int, integers(0, 10))
/// .for_all("b", ParameterType::Int, integers(0, 10))
/// .check()
/// .unwrap();
///
/// assert!(result.is_failed());
/// ```
pub struct PropertyCheck<'a> {
    name: String,
    parameters: Vec<ForAllParameter>,
    registry: ArbitraryRegistry,
    resolver: Option<Box<dyn ArbitraryResolver + 'a>>,
    executor: Box<dyn TryExecutor + 'a>,
    config: PropertyConfig,
    data: Option<DataTable>,
    previous: Option<GenerationInfo>,
    reporter: Arc<dyn Reporter>,
}

impl<'a> PropertyCheck<'a> {
    /// Check a property whose trials are run by `executor`
    pub fn new(name: impl Into<String>, executor: impl TryExecutor + 'a) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            registry: ArbitraryRegistry::new(),
            resolver: None,
            executor: Box::new(executor),
            config: PropertyConfig::default(),
            data: None,
            previous: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Check a boolean property body, see [`CheckedFunction`]
    pub fn property<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&ParameterSet<Value>, &DynamicContext) -> Result<bool, PropertyError> + 'a,
    {
        Self::new(name, CheckedFunction::new(function))
    }

    /// Declare a parameter generated by `arbitrary`. Declaring the same name
    /// twice adds another arbitrary to choose from.
    pub fn for_all(
        mut self,
        name: impl Into<String>,
        parameter_type: ParameterType,
        arbitrary: BoxedArbitrary,
    ) -> Self {
        let name = name.into();
        if !self.parameters.iter().any(|parameter| parameter.name == name) {
            self.parameters
                .push(ForAllParameter::new(name.clone(), parameter_type));
        }
        self.registry.register(name, arbitrary);
        self
    }

    /// Declare a parameter whose arbitraries come from the resolver
    pub fn with_parameter(mut self, parameter: ForAllParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ArbitraryResolver + 'a) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_config(mut self, config: PropertyConfig) -> Self {
        self.config = config;
        self
    }

    /// Rows of values for data-driven generation
    pub fn with_data(mut self, data: DataTable) -> Self {
        self.data = Some(data);
        self
    }

    /// The replay record of an earlier failure of this property
    pub fn with_previous_failure(mut self, previous: GenerationInfo) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PropertyConfig {
        &self.config
    }

    /// Run the check.
    ///
    /// Falsified and exhausted checks are results. Configuration errors and
    /// generation errors, including ones raised while a trial introduced a
    /// dynamic parameter, are returned as `Err`.
    pub fn check(&self) -> Result<PropertyCheckResult, PropertyError> {
        self.config.validate()?;
        let start_time = Instant::now();

        let previous = self
            .previous
            .as_ref()
            .filter(|_| self.config.after_failure != AfterFailureMode::RandomSeed);
        let seed = previous
            .and_then(GenerationInfo::seed)
            .or(self.config.seed)
            .unwrap_or_else(|| choose_seed(None));

        let resolver = CombinedResolver {
            registry: &self.registry,
            fallback: self.resolver.as_deref(),
        };
        let strategy = create_generator(
            &self.parameters,
            &resolver,
            &self.config,
            seed,
            self.data.as_ref(),
        )?;
        let generator = Rc::new(RefCell::new(ParametersGenerator::new(
            strategy,
            Some(seed.to_string()),
        )));
        let source: SharedSource = generator.clone();

        tracing::debug!(property = %self.name, seed, "Checking property");

        let mut counts = Counts::default();

        if let Some(previous) = previous.filter(|_| {
            matches!(
                self.config.after_failure,
                AfterFailureMode::SampleFirst | AfterFailureMode::SampleOnly
            )
        }) {
            match self.recreate(&generator, &source, previous) {
                Some(sample) => {
                    let parameters = sample.map(|shrinkable| shrinkable.value());
                    let context = DynamicContext::fixed(sample);
                    let result = match self.execute_trial(&parameters, &context) {
                        Ok(result) => result,
                        Err(message) => {
                            return Ok(self.fatal(&generator, counts, context, message, previous.clone(), start_time))
                        }
                    };
                    counts.tries += 1;
                    match result.status() {
                        Status::Falsified => {
                            counts.checks += 1;
                            return Ok(self.falsified(
                                &generator,
                                counts,
                                context.parameters(),
                                result,
                                previous.clone(),
                                start_time,
                            ));
                        }
                        Status::Satisfied => counts.checks += 1,
                        Status::Invalid => {}
                    }
                    if self.config.after_failure == AfterFailureMode::SampleOnly {
                        return Ok(self.finish(&generator, counts, previous.clone(), start_time));
                    }
                }
                None => tracing::warn!(
                    property = %self.name,
                    "Could not recreate previous failure from {}, running fresh samples",
                    previous
                ),
            }
        }

        let mut finished_early = false;
        loop {
            let max_tries = generator
                .borrow()
                .required_tries()
                .map_or(self.config.tries, |required| required as usize);
            if counts.tries >= max_tries || finished_early || !generator.borrow_mut().has_next() {
                break;
            }

            let sample = generator.borrow_mut().next()?;
            counts.tries += 1;

            let parameters = sample.map(|shrinkable| shrinkable.value());
            let context = DynamicContext::new(sample, source.clone());
            let result = match self.execute_trial(&parameters, &context) {
                Ok(result) => result,
                Err(message) => {
                    let info = generator.borrow().generation_info();
                    return Ok(self.fatal(&generator, counts, context, message, info, start_time));
                }
            };
            if let Some(error) = context.error() {
                return Err(error.into());
            }

            match result.status() {
                Status::Satisfied => {
                    counts.checks += 1;
                    finished_early = result.should_finish_early();
                }
                Status::Invalid => {}
                Status::Falsified => {
                    counts.checks += 1;
                    let info = generator.borrow().generation_info();
                    return Ok(self.falsified(
                        &generator,
                        counts,
                        context.parameters(),
                        result,
                        info,
                        start_time,
                    ));
                }
            }
        }

        let info = generator.borrow().generation_info();
        Ok(self.finish(&generator, counts, info, start_time))
    }

    /// Run one trial with `context` installed. `Err` carries the message of
    /// a panic that escaped the executor.
    fn execute_trial(
        &self,
        parameters: &ParameterSet<Value>,
        context: &DynamicContext,
    ) -> Result<TryExecutionResult, String> {
        catch_unwind(AssertUnwindSafe(|| {
            context.run_with(|| self.executor.execute(parameters, context))
        }))
        .map_err(|payload| panic_message(&*payload))
    }

    /// Regenerate the sample `previous` describes, dynamic parameters and
    /// shrinking included.
    fn recreate(
        &self,
        generator: &Rc<RefCell<ParametersGenerator>>,
        source: &SharedSource,
        previous: &GenerationInfo,
    ) -> Option<ParameterSet<BoxedShrinkable>> {
        let mut sample = previous.peek_on(&generator.borrow())?;

        if !previous.dynamics().is_empty() {
            // The arbitraries of dynamic parameters are only known to the
            // property body, so run it once to learn them.
            generator.borrow_mut().begin_peek(previous.clone());
            let parameters = sample.map(|shrinkable| shrinkable.value());
            let context = DynamicContext::new(sample, source.clone());
            let primed = self.execute_trial(&parameters, &context);
            generator.borrow_mut().end_peek();

            if primed.is_err() || context.error().is_some() {
                return None;
            }
            sample = context.parameters();
        }

        previous.replay_shrinking(sample)
    }

    fn falsified(
        &self,
        generator: &Rc<RefCell<ParametersGenerator>>,
        counts: Counts,
        shrinkables: ParameterSet<BoxedShrinkable>,
        result: TryExecutionResult,
        info: GenerationInfo,
        start_time: Instant,
    ) -> PropertyCheckResult {
        let original = FalsifiedSample::new(
            shrinkables,
            result.error().cloned(),
            result.footnotes().to_vec(),
        );

        let falsifier = |parameters: &ParameterSet<Value>| {
            let context = DynamicContext::fixed(parameters.map(|value| unshrinkable(value.clone())));
            match self.execute_trial(parameters, &context) {
                // A sample that asks for a parameter it never had cannot be judged.
                Ok(_) if context.error().is_some() => Falsification::Result(TryExecutionResult::invalid()),
                Ok(result) => Falsification::Result(result),
                Err(message) => {
                    tracing::warn!(property = %self.name, %message, "Trial panicked while shrinking");
                    Falsification::Done
                }
            }
        };
        let shrinking = PropertyShrinker::from_config(&self.config)
            .with_reporter(self.reporter.as_ref())
            .shrink(original.clone(), falsifier);

        let generation = info.append_shrinking_sequence(shrinking.sequence);
        let error = shrinking
            .shrunk
            .error()
            .cloned()
            .or_else(|| original.error().cloned());

        tracing::info!(
            property = %self.name,
            tries = counts.tries,
            shrinking_steps = shrinking.shrunk.count_shrinking_steps(),
            "Property falsified"
        );

        self.result(
            CheckStatus::Failed,
            generator,
            counts,
            generation,
            Some(original),
            Some(shrinking.shrunk),
            error,
            start_time,
        )
    }

    fn fatal(
        &self,
        generator: &Rc<RefCell<ParametersGenerator>>,
        counts: Counts,
        context: DynamicContext,
        message: String,
        info: GenerationInfo,
        start_time: Instant,
    ) -> PropertyCheckResult {
        let error = PropertyError::TrialPanicked { message };
        tracing::warn!(property = %self.name, %error, "Aborting check");
        let original = FalsifiedSample::new(context.parameters(), Some(error.clone()), Vec::new());
        self.result(
            CheckStatus::Failed,
            generator,
            counts,
            info,
            Some(original),
            None,
            Some(error),
            start_time,
        )
    }

    fn finish(
        &self,
        generator: &Rc<RefCell<ParametersGenerator>>,
        counts: Counts,
        info: GenerationInfo,
        start_time: Instant,
    ) -> PropertyCheckResult {
        let exhausted = counts.checks == 0
            || (counts.tries - counts.checks) / counts.checks > self.config.max_discard_ratio;
        let status = if exhausted {
            CheckStatus::Exhausted
        } else {
            CheckStatus::Successful
        };
        self.result(status, generator, counts, info, None, None, None, start_time)
    }

    #[allow(clippy::too_many_arguments)]
    fn result(
        &self,
        status: CheckStatus,
        generator: &Rc<RefCell<ParametersGenerator>>,
        counts: Counts,
        generation: GenerationInfo,
        original_sample: Option<FalsifiedSample>,
        shrunk_sample: Option<ShrunkFalsifiedSample>,
        error: Option<PropertyError>,
        start_time: Instant,
    ) -> PropertyCheckResult {
        let generator = generator.borrow();
        let result = PropertyCheckResult {
            status,
            stereotype: self.config.stereotype.clone(),
            property_name: self.name.clone(),
            seed: generation.random_seed().map(str::to_string),
            generation,
            tries: counts.tries,
            checks: counts.checks,
            edge_cases_total: generator.edge_cases_total(),
            edge_cases_tried: generator.edge_cases_tried(),
            original_sample,
            shrunk_sample,
            error,
            duration: start_time.elapsed(),
        };
        self.publish(&result);
        result
    }

    fn publish(&self, result: &PropertyCheckResult) {
        let reporter = self.reporter.as_ref();
        reporter.publish("tries", &result.tries.to_string());
        reporter.publish("checks", &result.checks.to_string());
        reporter.publish("generation", &format!("{:?}", self.config.generation_mode));
        reporter.publish("after-failure", &format!("{:?}", self.config.after_failure));
        reporter.publish("edge-cases#mode", &format!("{:?}", self.config.edge_cases_mode));
        reporter.publish("edge-cases#total", &result.edge_cases_total.to_string());
        reporter.publish("edge-cases#tried", &result.edge_cases_tried.to_string());
        if let Some(seed) = &result.seed {
            reporter.publish("seed", seed);
        }
    }
}
