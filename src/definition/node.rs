//! State nodes and the async services they invoke.

use super::transition::{Action, Transition};
use crate::core::{Context, Event, State};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future produced by an invoked service; resolves to the event delivered
/// back into the machine.
pub type ServiceFuture<E> = Pin<Box<dyn Future<Output = E> + Send + 'static>>;

type Service<C, E> = Box<dyn Fn(&C) -> ServiceFuture<E> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    Atomic,
    Compound,
    Final,
}

/// Async operation started when its state is entered.
///
/// The service receives the context as it stands after the state's entry
/// actions and must not borrow it. Its output is sent back through the
/// machine like any other event. A result arriving after the state was
/// exited is dropped.
pub struct Invocation<C, E> {
    operation: String,
    service: Service<C, E>,
}

impl<C: 'static, E: Send + 'static> Invocation<C, E> {
    pub fn new<F, Fut>(operation: impl Into<String>, service: F) -> Self
    where
        F: Fn(&C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E> + Send + 'static,
    {
        Self {
            operation: operation.into(),
            service: Box::new(move |context: &C| -> ServiceFuture<E> {
                Box::pin(service(context))
            }),
        }
    }

    /// Invoke a fallible service, mapping its outcome to a success or
    /// failure event.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statecraft::definition::Invocation;
    /// use statecraft::core::JsonContext;
    ///
    /// let charge: Invocation<JsonContext, String> = Invocation::fallible(
    ///     "payment",
    ///     |_ctx| async { Ok::<u64, String>(42) },
    ///     |receipt| format!("PAID:{receipt}"),
    ///     |_error| "PAYMENT_FAILED".to_string(),
    /// );
    /// assert_eq!(charge.operation(), "payment");
    /// ```
    pub fn fallible<F, Fut, T, X, OnOk, OnErr>(
        operation: impl Into<String>,
        service: F,
        on_success: OnOk,
        on_failure: OnErr,
    ) -> Self
    where
        F: Fn(&C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, X>> + Send + 'static,
        T: Send + 'static,
        X: Send + 'static,
        OnOk: Fn(T) -> E + Send + Sync + 'static,
        OnErr: Fn(X) -> E + Send + Sync + 'static,
    {
        let on_success = Arc::new(on_success);
        let on_failure = Arc::new(on_failure);
        Self::new(operation, move |context| {
            let pending = service(context);
            let on_success = Arc::clone(&on_success);
            let on_failure = Arc::clone(&on_failure);
            async move {
                match pending.await {
                    Ok(value) => on_success(value),
                    Err(error) => on_failure(error),
                }
            }
        })
    }
}

impl<C, E> Invocation<C, E> {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub(crate) fn launch(&self, context: &C) -> ServiceFuture<E> {
        (self.service)(context)
    }
}

impl<C, E> fmt::Debug for Invocation<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// One node of the state tree.
pub struct StateNode<S: State, E: Event, C: Context> {
    pub(crate) id: S,
    pub(crate) parent: Option<S>,
    pub(crate) children: Vec<S>,
    pub(crate) initial: Option<S>,
    pub(crate) kind: StateKind,
    pub(crate) entry: Vec<Action<C, E>>,
    pub(crate) exit: Vec<Action<C, E>>,
    pub(crate) transitions: Vec<Transition<S, E, C>>,
    pub(crate) invocation: Option<Invocation<C, E>>,
}

impl<S: State, E: Event, C: Context> StateNode<S, E, C> {
    pub fn id(&self) -> &S {
        &self.id
    }

    pub fn parent(&self) -> Option<&S> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[S] {
        &self.children
    }

    /// Initial child of a compound state.
    pub fn initial(&self) -> Option<&S> {
        self.initial.as_ref()
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn is_final(&self) -> bool {
        self.kind == StateKind::Final
    }

    /// Declared transitions in declaration order.
    pub fn transitions(&self) -> &[Transition<S, E, C>] {
        &self.transitions
    }

    pub fn invocation(&self) -> Option<&Invocation<C, E>> {
        self.invocation.as_ref()
    }
}

impl<S: State, E: Event, C: Context> fmt::Debug for StateNode<S, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("initial", &self.initial)
            .field("kind", &self.kind)
            .field("entry", &self.entry.len())
            .field("exit", &self.exit.len())
            .field("transitions", &self.transitions)
            .field("invocation", &self.invocation)
            .finish()
    }
}
