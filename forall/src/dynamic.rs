//! Parameters introduced while a trial is running.
//!
//! A trial receives a [`DynamicContext`] explicitly, and the same context is
//! installed for the current thread while the trial runs, so that code nested
//! deep inside the property can call [`parameter`] without threading the
//! handle through.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::arbitrary::BoxedArbitrary;
use crate::error::GenerationError;
use crate::parameters::ParameterSet;
use crate::shrinkable::BoxedShrinkable;
use crate::value::Value;

/// Realizes an arbitrary for a parameter name the trial has not bound yet.
pub trait DynamicParameterSource {
    fn resolve(
        &mut self,
        name: &str,
        arbitrary: &BoxedArbitrary,
    ) -> Result<BoxedShrinkable, GenerationError>;
}

pub type SharedSource = Rc<RefCell<dyn DynamicParameterSource>>;

struct ContextState {
    parameters: ParameterSet<BoxedShrinkable>,
    source: Option<SharedSource>,
    error: Option<GenerationError>,
}

/// Per-trial binding of parameter names to values.
#[derive(Clone)]
pub struct DynamicContext {
    state: Rc<RefCell<ContextState>>,
}

impl fmt::Debug for DynamicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("DynamicContext")
            .field("parameters", &state.parameters.size())
            .field("error", &state.error)
            .finish()
    }
}

impl DynamicContext {
    /// A context that asks `source` for parameters the sample does not bind.
    pub fn new(parameters: ParameterSet<BoxedShrinkable>, source: SharedSource) -> Self {
        Self::with_source(parameters, Some(source))
    }

    /// A context limited to the parameters of `parameters`. Asking for any
    /// other name fails with [`GenerationError::UnknownDynamicParameter`].
    pub fn fixed(parameters: ParameterSet<BoxedShrinkable>) -> Self {
        Self::with_source(parameters, None)
    }

    fn with_source(parameters: ParameterSet<BoxedShrinkable>, source: Option<SharedSource>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ContextState {
                parameters,
                source,
                error: None,
            })),
        }
    }

    /// The value bound to `name`, realizing `supplier`'s arbitrary on first use.
    pub fn parameter<F>(&self, name: &str, supplier: F) -> Result<Value, GenerationError>
    where
        F: FnOnce() -> BoxedArbitrary,
    {
        self.shrinkable(name, supplier).map(|shrinkable| shrinkable.value())
    }

    pub fn shrinkable<F>(&self, name: &str, supplier: F) -> Result<BoxedShrinkable, GenerationError>
    where
        F: FnOnce() -> BoxedArbitrary,
    {
        let source = {
            let state = self.state.borrow();
            if let Some(bound) = state.parameters.get_dynamic(name) {
                return Ok(bound.clone());
            }
            state.source.clone()
        };

        let resolved = match source {
            Some(source) => {
                let arbitrary = supplier();
                let resolved = source.borrow_mut().resolve(name, &arbitrary);
                resolved
            }
            None => Err(GenerationError::UnknownDynamicParameter {
                name: name.to_string(),
            }),
        };

        let mut state = self.state.borrow_mut();
        match resolved {
            Ok(shrinkable) => {
                state.parameters.set_dynamic(name, shrinkable.clone());
                Ok(shrinkable)
            }
            Err(error) => {
                state.error.get_or_insert_with(|| error.clone());
                Err(error)
            }
        }
    }

    /// Snapshot of everything bound so far.
    pub fn parameters(&self) -> ParameterSet<BoxedShrinkable> {
        self.state.borrow().parameters.clone()
    }

    /// The first generation error raised through this context.
    pub fn error(&self) -> Option<GenerationError> {
        self.state.borrow().error.clone()
    }

    /// Install this context for the current thread while `f` runs.
    pub fn run_with<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|current| current.replace(Some(self.clone())));
        let _restore = RestoreGuard { previous };
        f()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<DynamicContext>> = const { RefCell::new(None) };
}

/// Puts back the previously installed context, also when the trial panics.
struct RestoreGuard {
    previous: Option<DynamicContext>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| {
            current.replace(previous);
        });
    }
}

/// The context of the trial running on this thread, if any.
pub fn current() -> Option<DynamicContext> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Look up or introduce the dynamic parameter `name` in the running trial.
///
/// ```
/// use forall::dynamic;
/// use forall::GenerationError;
///
/// let outside = dynamic::parameter("n", || forall::primitives::integers(0, 10));
/// assert_eq!(outside, Err(GenerationError::MissingDynamicContext));
/// ```
pub fn parameter<F>(name: &str, supplier: F) -> Result<Value, GenerationError>
where
    F: FnOnce() -> BoxedArbitrary,
{
    let context = current().ok_or(GenerationError::MissingDynamicContext)?;
    context.parameter(name, supplier)
}
