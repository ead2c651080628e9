//! Shrinking behavior observed through the public API.

mod common;

use common::{falsified_when, fixed_list, integer, ints, list_at, sized_list};
use forall::generation::create_generator;
use forall::{
    integers, lists, ArbitraryRegistry, FalsifiedSample, ForAllParameter, GenerationMode,
    ParameterSet, ParameterType, ParametersGenerator, PropertyCheck, PropertyConfig,
    PropertyShrinker, ShrinkingMode, Value,
};

fn sample(shrinkables: Vec<forall::BoxedShrinkable>) -> FalsifiedSample {
    FalsifiedSample::new(ParameterSet::direct(shrinkables), None, Vec::new())
}

#[test]
fn test_list_sum_shrinks_to_minimal_list() {
    common::init_tracing();
    let original = sample(vec![fixed_list(&[7, 9, 3, 8], 0, 10)]);

    let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(
        original,
        falsified_when(|parameters| list_at(parameters, 0).iter().sum::<i64>() >= 21),
    );

    assert_eq!(list_at(result.shrunk.parameters(), 0), vec![0, 1, 10, 10]);
    assert!(result.completed);
}

#[test]
fn test_list_sum_shrinks_to_minimal_list_from_maximum() {
    let original = sample(vec![fixed_list(&[10, 10, 10, 10], 0, 10)]);

    let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(
        original,
        falsified_when(|parameters| list_at(parameters, 0).iter().sum::<i64>() >= 21),
    );

    assert_eq!(list_at(result.shrunk.parameters(), 0), vec![0, 1, 10, 10]);
}

#[test]
fn test_equal_parameters_shrink_together() {
    let original = sample(vec![
        integer(10, 0, 10),
        integer(10, 0, 10),
        integer(5, 0, 10),
        integer(3, 0, 10),
    ]);

    let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(
        original,
        falsified_when(|parameters| {
            let values = ints(parameters);
            values[0] == values[1] && values[0] >= 7
        }),
    );

    assert_eq!(ints(result.shrunk.parameters()), vec![7, 7, 0, 0]);
}

#[test]
fn test_equal_list_elements_shrink_together() {
    for index1 in 0..6 {
        for index2 in (0..6).filter(|&index2| index2 != index1) {
            let original = sample(vec![sized_list(&[10; 9], 6, 10)]);

            let result = PropertyShrinker::new(ShrinkingMode::Full).shrink(
                original,
                falsified_when(|parameters| {
                    let list = list_at(parameters, 0);
                    match (list.get(index1), list.get(index2)) {
                        (Some(a), Some(b)) => a == b && *a >= 7,
                        _ => false,
                    }
                }),
            );

            let mut expected = vec![0; 6];
            expected[index1] = 7;
            expected[index2] = 7;
            assert_eq!(
                list_at(result.shrunk.parameters(), 0),
                expected,
                "pair ({}, {})",
                index1,
                index2
            );
        }
    }
}

#[test]
fn test_minimal_sample_is_left_alone() {
    let original = sample(vec![fixed_list(&[], 0, 10)]);

    let result = PropertyShrinker::new(ShrinkingMode::Full)
        .shrink(original.clone(), falsified_when(|_| true));

    assert_eq!(result.shrunk.parameters(), original.parameters());
    assert_eq!(result.shrunk.count_shrinking_steps(), 0);
    assert!(result.sequence.is_empty());
}

#[test]
fn test_shrinking_twice_changes_nothing() {
    let condition = |parameters: &ParameterSet<Value>| ints(parameters).iter().sum::<i64>() >= 13;
    let original = sample(vec![integer(9, 0, 10), integer(8, 0, 10)]);

    let shrinker = PropertyShrinker::new(ShrinkingMode::Full);
    let first = shrinker.shrink(original, falsified_when(condition));
    let second = shrinker.shrink(first.shrunk.sample().clone(), falsified_when(condition));

    assert_eq!(second.shrunk.parameters(), first.shrunk.parameters());
    assert_eq!(second.shrunk.count_shrinking_steps(), 0);
}

#[test]
fn test_generation_info_recreates_shrunk_sample() {
    let parameters = vec![ForAllParameter::new(
        "list",
        ParameterType::List(Box::new(ParameterType::Int)),
    )];
    let mut registry = ArbitraryRegistry::new();
    registry.register("list", lists(integers(0, 10), 4, 4));
    let config = PropertyConfig::default()
        .with_seed(1234)
        .with_generation_mode(GenerationMode::Randomized)
        .with_shrinking_mode(ShrinkingMode::Full);

    let result = PropertyCheck::property("list sum", |parameters, _| {
        Ok(list_at(parameters, 0).iter().sum::<i64>() < 21)
    })
    .with_parameter(parameters[0].clone())
    .with_resolver(registry.clone())
    .with_config(config.clone())
    .check()
    .unwrap();
    assert!(result.is_failed());

    let strategy = create_generator(&parameters, &registry, &config, 1234, None).unwrap();
    let generator = ParametersGenerator::new(strategy, Some("1234".to_string()));
    let recreated = result
        .generation
        .generate_on(&generator)
        .map(|shrinkables| shrinkables.map(|shrinkable| shrinkable.value()));

    assert_eq!(recreated.as_ref(), result.falsified_parameters());
    assert_eq!(list_at(recreated.as_ref().unwrap(), 0).iter().sum::<i64>(), 21);
}
