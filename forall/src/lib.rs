#![allow(clippy::result_large_err)]

//! # Forall - generation and shrinking for property checks
//!
//! Forall turns a property over declared parameters into a reproducible
//! series of trials. Parameter tuples come from randomized, exhaustive or
//! data-driven generation; a property may introduce further *dynamic*
//! parameters while it runs. A falsified tuple is shrunk to a smaller
//! falsifying one, and the shrink session is recorded so that the same
//! shrunk tuple can be recreated later without running the property.
//!
//! ## Quick Start
//!
//! ```rust
//! use forall::{integers, ParameterType, PropertyCheck, Value};
//!
//! let result = PropertyCheck::property("doubling stays even", |parameters, _| {
//!     let n = parameters.get(0).and_then(Value::as_int).unwrap_or_default();
//!     Ok((n * 2) % 2 == 0)
//! })
//! .for_all("n", ParameterType::Int, integers(-1000, 1000))
//! .check()
//! .unwrap();
//!
//! assert!(result.is_successful());
//! ```
//!
//! Properties can draw values they only know how to describe at run time:
//!
//! ```rust
//! use forall::{dynamic, integers, lists, ParameterType, PropertyCheck, Value};
//!
//! let result = PropertyCheck::property("index in range", |parameters, _| {
//!     let len = parameters.get(0).and_then(Value::as_list).map_or(0, <[Value]>::len) as i64;
//!     let index = dynamic::parameter("index", || integers(0, len.max(1) - 1))?;
//!     Ok(index.as_int().unwrap_or_default() < len.max(1))
//! })
//! .for_all("list", ParameterType::List(Box::new(ParameterType::Int)), lists(integers(0, 9), 0, 5))
//! .check()
//! .unwrap();
//!
//! assert!(result.is_successful());
//! ```

pub mod arbitrary;
pub mod combinatorics;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod execution;
pub mod generation;
pub mod generation_info;
pub mod parameters;
pub mod performance;
#[cfg(feature = "persistence")]
pub mod persistence;
pub mod primitives;
pub mod property;
pub mod reporting;
pub mod rng;
pub mod sample;
pub mod shrink;
pub mod shrinkable;
pub mod value;

// Re-export the main public API
pub use arbitrary::{
    Arbitrary, ArbitraryRegistry, ArbitraryResolver, BoxedArbitrary, ExhaustiveGenerator,
    ForAllParameter,
};
pub use config::{
    AfterFailureMode, ConfigError, EdgeCasesMode, GenerationMode, GlobalConfig, PropertyConfig,
    ShrinkingMode,
};
pub use dynamic::DynamicContext;
pub use error::{assume, GenerationError, PropertyError};
pub use execution::{CheckStatus, PropertyCheck, PropertyCheckResult};
pub use generation::{DataTable, ParametersGenerator};
pub use generation_info::{DynamicInfo, GenerationInfo};
pub use parameters::{ParameterReference, ParameterSet};
pub use performance::{check_concurrently, CheckJob, ParallelConfig};
#[cfg(feature = "persistence")]
pub use persistence::{
    check_with_store, InMemoryReplayStore, JsonFileReplayStore, PersistenceError, ReplayRecord,
    ReplayStore,
};
pub use primitives::*;
pub use property::{CheckedFunction, Status, TryExecutionResult, TryExecutor};
pub use reporting::{RecordingReporter, ReportEntry, Reporter, TracingReporter};
pub use rng::create_seeded_rng;
pub use sample::{FalsifiedSample, ShrunkFalsifiedSample};
pub use shrink::{Falsification, Falsifier, PropertyShrinker, ShrinkingResult, ShrunkSampleRecreator};
pub use shrinkable::{unshrinkable, BoxedShrinkable, EdgeCases, Shrinkable, ShrinkingDistance};
pub use value::{ParameterType, Value};
