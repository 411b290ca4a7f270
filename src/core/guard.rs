//! Guard predicates for controlling state transitions.
//!
//! Guards are boolean functions over the machine context and the triggering
//! event. They must not have side effects. A guard that fails (returns `Err`
//! or panics) is reported to the caller instead of unwinding through the
//! resolver.

use std::any::Any;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Boxed error type returned by fallible guards.
pub type BoxError = Box<dyn Error + Send + Sync>;

type Predicate<C, E> = Box<dyn Fn(&C, Option<&E>) -> Result<bool, BoxError> + Send + Sync>;

/// Predicate that determines if a transition can be taken.
///
/// The event is `None` for transitions triggered by timers or by a compound
/// state completing.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Guard;
///
/// let below_limit = Guard::<u32, &str>::new(|attempts, _event| *attempts < 3);
///
/// assert_eq!(below_limit.check(&1, Some(&"RETRY")), Ok(true));
/// assert_eq!(below_limit.check(&3, None), Ok(false));
/// ```
pub struct Guard<C, E> {
    label: Option<String>,
    predicate: Predicate<C, E>,
}

impl<C, E> Guard<C, E> {
    /// Create a guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
    {
        Guard {
            label: None,
            predicate: Box::new(move |ctx, event| Ok(predicate(ctx, event))),
        }
    }

    /// Create a guard from a predicate that can fail.
    ///
    /// A failing guard counts as `false` during resolution.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Guard {
            label: None,
            predicate: Box::new(predicate),
        }
    }

    /// Attach a name used in diagnostics.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Evaluate the guard.
    ///
    /// Returns the failure reason when the predicate errors or panics.
    pub fn check(&self, context: &C, event: Option<&E>) -> Result<bool, String> {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(context, event))) {
            Ok(Ok(allowed)) => Ok(allowed),
            Ok(Err(error)) => Err(error.to_string()),
            Err(payload) => Err(panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("guard panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("guard panicked: {message}")
    } else {
        "guard panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Cart {
        items: usize,
        total: u64,
    }

    #[test]
    fn guard_allows_matching_context() {
        let guard = Guard::<Cart, &str>::new(|cart, _| cart.items > 0);

        assert_eq!(guard.check(&Cart { items: 2, total: 10 }, None), Ok(true));
        assert_eq!(guard.check(&Cart { items: 0, total: 0 }, None), Ok(false));
    }

    #[test]
    fn guard_sees_event() {
        let guard = Guard::<Cart, &str>::new(|_, event| event == Some(&"CHECKOUT"));
        let cart = Cart { items: 1, total: 5 };

        assert_eq!(guard.check(&cart, Some(&"CHECKOUT")), Ok(true));
        assert_eq!(guard.check(&cart, Some(&"BROWSE")), Ok(false));
        assert_eq!(guard.check(&cart, None), Ok(false));
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::<Cart, &str>::new(|cart, _| cart.total >= 100);
        let cart = Cart { items: 3, total: 120 };

        assert_eq!(guard.check(&cart, None), guard.check(&cart, None));
    }

    #[test]
    fn fallible_guard_reports_error() {
        let guard = Guard::<Cart, &str>::fallible(|cart, _| {
            if cart.items == 0 {
                Err("empty cart".into())
            } else {
                Ok(true)
            }
        });

        assert_eq!(
            guard.check(&Cart { items: 0, total: 0 }, None),
            Err("empty cart".to_string())
        );
        assert_eq!(guard.check(&Cart { items: 1, total: 0 }, None), Ok(true));
    }

    #[test]
    fn panicking_guard_is_contained() {
        let guard = Guard::<Cart, &str>::new(|_, _| -> bool { panic!("boom") });

        let result = guard.check(&Cart { items: 1, total: 1 }, None);
        assert_eq!(result, Err("guard panicked: boom".to_string()));
    }

    #[test]
    fn label_is_kept() {
        let guard = Guard::<Cart, &str>::new(|_, _| true).labeled("always");
        assert_eq!(guard.label(), Some("always"));
    }
}
