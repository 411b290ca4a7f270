//! Events submitted to a machine.

use std::fmt::Debug;

/// An event delivered to a machine.
///
/// Transitions match on [`Event::name`], the event's type tag. Any payload
/// lives in the value itself and is handed to guards and actions read-only.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
///
/// #[derive(Clone, Debug)]
/// enum Checkout {
///     Submit { total: u64 },
///     Cancel,
/// }
///
/// impl Event for Checkout {
///     fn name(&self) -> &str {
///         match self {
///             Self::Submit { .. } => "Submit",
///             Self::Cancel => "Cancel",
///         }
///     }
/// }
///
/// assert_eq!(Checkout::Submit { total: 10 }.name(), "Submit");
/// ```
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// The event type used for transition lookup.
    fn name(&self) -> &str;
}

impl Event for &'static str {
    fn name(&self) -> &str {
        self
    }
}

impl Event for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}
