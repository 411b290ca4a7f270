//! Statecraft: a declarative state machine executor
//!
//! Machines are declared once as data: a tree of states, the transitions
//! between them, and the retry policies of the operations they perform. A
//! [`Machine`] then executes the definition against a typed context:
//! guarded branching, timed transitions, hierarchical states and bounded
//! retries are all handled by the engine rather than by host code.
//!
//! # Core Concepts
//!
//! - **State**: Type-safe state identifiers via the `State` trait
//! - **Context**: The record a machine owns, updated by action patches
//! - **Guards**: Predicates over context and event that enable transitions
//! - **Timers**: Delayed transitions cancelled when their state is exited
//! - **Retries**: Per-operation attempt counters with a fixed maximum
//! - **History**: Ordered record of committed transitions
//!
//! The [`machine`] core is synchronous and performs no I/O. Timers and
//! async services are requested as commands; the [`runtime`] module executes
//! them on Tokio.
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::{DefinitionBuilder, StateBuilder};
//! use statecraft::core::JsonContext;
//! use statecraft::machine::Machine;
//! use statecraft::state_enum;
//! use serde_json::json;
//!
//! state_enum! {
//!     enum Switch {
//!         Off,
//!         On,
//!     }
//! }
//!
//! let definition = DefinitionBuilder::new()
//!     .initial(Switch::Off)
//!     .state(StateBuilder::new(Switch::Off).on("TOGGLE", Switch::On))
//!     .state(
//!         StateBuilder::new(Switch::On)
//!             .entry(|ctx: &JsonContext, _| {
//!                 json!({ "presses": ctx.get_u64("presses").unwrap_or(0) + 1 })
//!             })
//!             .on("TOGGLE", Switch::Off),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut machine = Machine::new(definition, JsonContext::new()).unwrap();
//! machine.start().unwrap();
//!
//! let states: Vec<_> = (0..3)
//!     .map(|_| machine.send("TOGGLE").unwrap().state().cloned().unwrap())
//!     .collect();
//!
//! assert_eq!(states, vec![Switch::On, Switch::Off, Switch::On]);
//! assert_eq!(machine.snapshot().context.get_u64("presses"), Some(2));
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod definition;
pub mod machine;
pub mod retry;
pub mod runtime;

// Re-export commonly used types
pub use builder::{DefinitionBuilder, DefinitionError, StateBuilder, TransitionBuilder};
pub use config::{MachineConfig, RuntimeConfig};
pub use core::{Context, Event, Guard, JsonContext, State, StateHistory, StateTransition};
pub use definition::{Invocation, MachineDefinition};
pub use machine::{Machine, MachineError, Snapshot, Status};
pub use retry::RetryPolicy;
pub use runtime::{MachineHandle, RuntimeError};
