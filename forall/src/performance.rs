//! Running independent property checks on several threads.
//!
//! A [`PropertyCheck`](crate::execution::PropertyCheck) itself is
//! single-threaded: its trials share a dynamic context through `Rc`. Jobs
//! therefore build their check on the worker thread that runs it.

use crossbeam::channel;

use crate::error::{panic_message, PropertyError};
use crate::execution::PropertyCheckResult;

/// Configuration for parallel execution
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of worker threads
    pub num_threads: usize,
    /// Whether to run checks in parallel at all
    pub enabled: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            enabled: true,
        }
    }
}

impl ParallelConfig {
    pub fn sequential() -> Self {
        Self {
            num_threads: 1,
            enabled: false,
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }
}

/// Builds and runs one property check.
pub type CheckJob<'a> = Box<dyn FnOnce() -> Result<PropertyCheckResult, PropertyError> + Send + 'a>;

/// Run every job and return their outcomes in job order.
///
/// A job that panics yields [`PropertyError::Internal`] without affecting
/// the others.
pub fn check_concurrently<'a>(
    jobs: Vec<CheckJob<'a>>,
    parallel: &ParallelConfig,
) -> Vec<Result<PropertyCheckResult, PropertyError>> {
    let total = jobs.len();
    let num_threads = parallel.num_threads.min(total);
    if !parallel.enabled || num_threads <= 1 {
        return jobs.into_iter().map(run_job).collect();
    }

    let (job_sender, job_receiver) = channel::unbounded::<(usize, CheckJob<'a>)>();
    for job in jobs.into_iter().enumerate() {
        // The receiver is alive until the scope below ends.
        let _ = job_sender.send(job);
    }
    drop(job_sender);

    let (result_sender, result_receiver) = channel::unbounded();
    let scoped = crossbeam::scope(|s| {
        for worker in 0..num_threads {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            s.spawn(move |_| {
                for (index, job) in jobs.iter() {
                    tracing::trace!(worker, index, "Running property check");
                    if results.send((index, run_job(job))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_sender);

    if let Err(payload) = scoped {
        tracing::error!(message = %panic_message(&*payload), "Check worker panicked");
    }

    let mut outcomes: Vec<Option<Result<PropertyCheckResult, PropertyError>>> =
        (0..total).map(|_| None).collect();
    for (index, outcome) in result_receiver.iter() {
        outcomes[index] = Some(outcome);
    }
    outcomes
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|| Err(PropertyError::internal("property check did not report a result")))
        })
        .collect()
}

fn run_job(job: CheckJob<'_>) -> Result<PropertyCheckResult, PropertyError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        Err(PropertyError::internal(format!(
            "property check panicked: {}",
            panic_message(&*payload)
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationMode, PropertyConfig};
    use crate::execution::PropertyCheck;
    use crate::primitives::integers;
    use crate::value::{ParameterType, Value};

    fn job(threshold: i64) -> CheckJob<'static> {
        Box::new(move || {
            PropertyCheck::property(format!("below {}", threshold), move |parameters, _| {
                Ok(parameters.get(0).and_then(Value::as_int).unwrap_or_default() < threshold)
            })
            .for_all("n", ParameterType::Int, integers(0, 100))
            .with_config(
                PropertyConfig::default()
                    .with_seed(7)
                    .with_generation_mode(GenerationMode::Randomized),
            )
            .check()
        })
    }

    #[test]
    fn test_results_keep_job_order() {
        let jobs = vec![job(200), job(50), job(200), job(10)];
        let results = check_concurrently(jobs, &ParallelConfig::default().with_threads(3));

        let statuses: Vec<bool> = results
            .iter()
            .map(|result| result.as_ref().map(|r| r.is_successful()).unwrap_or(false))
            .collect();
        assert_eq!(statuses, vec![true, false, true, false]);
        assert_eq!(results[1].as_ref().unwrap().property_name, "below 50");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = check_concurrently(vec![job(30), job(60)], &ParallelConfig::default().with_threads(2));
        let sequential = check_concurrently(vec![job(30), job(60)], &ParallelConfig::sequential());

        for (left, right) in parallel.iter().zip(&sequential) {
            let left = left.as_ref().unwrap();
            let right = right.as_ref().unwrap();
            assert_eq!(left.tries, right.tries);
            assert_eq!(left.falsified_parameters(), right.falsified_parameters());
        }
    }

    #[test]
    fn test_panicking_job_is_isolated() {
        let jobs: Vec<CheckJob<'static>> = vec![Box::new(|| panic!("setup failed")), job(200)];
        let results = check_concurrently(jobs, &ParallelConfig::default().with_threads(2));

        assert!(matches!(&results[0], Err(PropertyError::Internal { message }) if message.contains("setup failed")));
        assert!(results[1].as_ref().unwrap().is_successful());
    }
}
