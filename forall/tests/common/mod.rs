//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use forall::{
    BoxedShrinkable, Falsification, ParameterSet, ShrinkableInteger, ShrinkableList,
    TryExecutionResult, Value,
};

pub fn integer(value: i64, min: i64, max: i64) -> BoxedShrinkable {
    Arc::new(ShrinkableInteger::new(value, min, max, 0))
}

pub fn fixed_list(values: &[i64], min: i64, max: i64) -> BoxedShrinkable {
    let elements = values.iter().map(|&v| integer(v, min, max)).collect();
    Arc::new(ShrinkableList::new(elements, values.len(), values.len()))
}

pub fn sized_list(values: &[i64], min_size: usize, max_size: usize) -> BoxedShrinkable {
    let elements = values.iter().map(|&v| integer(v, 0, 10)).collect();
    Arc::new(ShrinkableList::new(elements, min_size, max_size))
}

pub fn int_at(parameters: &ParameterSet<Value>, index: usize) -> i64 {
    parameters.get(index).and_then(Value::as_int).unwrap_or_default()
}

pub fn ints(parameters: &ParameterSet<Value>) -> Vec<i64> {
    parameters.all().into_iter().filter_map(Value::as_int).collect()
}

pub fn list_at(parameters: &ParameterSet<Value>, index: usize) -> Vec<i64> {
    parameters
        .get(index)
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_int).collect())
        .unwrap_or_default()
}

/// Falsifies exactly the tuples `condition` holds for.
pub fn falsified_when<C>(condition: C) -> impl FnMut(&ParameterSet<Value>) -> Falsification
where
    C: Fn(&ParameterSet<Value>) -> bool,
{
    move |parameters: &ParameterSet<Value>| {
        if condition(parameters) {
            Falsification::Result(TryExecutionResult::falsified(None))
        } else {
            Falsification::Result(TryExecutionResult::satisfied())
        }
    }
}

/// Opt-in log output: `RUST_LOG=forall=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
