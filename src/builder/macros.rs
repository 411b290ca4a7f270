//! Macros for ergonomic state and event declarations.

/// Declare a unit enum usable as machine states.
///
/// Derives everything [`State`](crate::core::State) requires and names each
/// state after its variant. Optional `final:` and `error:` lists mark
/// variants terminal or failed.
///
/// # Example
///
/// ```
/// use statecraft::core::State;
/// use statecraft::state_enum;
///
/// state_enum! {
///     pub enum Upload {
///         Queued,
///         Sending,
///         Stored,
///         Rejected,
///     }
///     final: [Stored, Rejected]
///     error: [Rejected]
/// }
///
/// assert_eq!(Upload::Sending.name(), "Sending");
/// assert!(Upload::Rejected.is_error());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}

/// Generate Event trait implementation for enums.
///
/// Variants may carry tuple payloads; the event type is the variant name.
///
/// # Example
///
/// ```
/// use statecraft::core::Event;
/// use statecraft::event_enum;
///
/// event_enum! {
///     pub enum Payment {
///         Charge(u64),
///         Succeeded,
///         Failed(String),
///     }
/// }
///
/// assert_eq!(Payment::Charge(30).name(), "Charge");
/// assert_eq!(Payment::Failed("declined".into()).name(), "Failed");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( ( $($ty:ty),* $(,)? ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $( ( $($ty),* ) )?
            ),*
        }

        impl $crate::core::Event for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Event, State};

    state_enum! {
        enum Upload {
            Queued,
            Sending,
            Stored,
            Rejected,
        }
        final: [Stored, Rejected]
        error: [Rejected]
    }

    event_enum! {
        enum UploadEvent {
            Send,
            Progress(u32),
            Rejected(String, u16),
        }
    }

    #[test]
    fn variant_names_become_state_names() {
        let names: Vec<&str> = [Upload::Queued, Upload::Sending, Upload::Stored]
            .iter()
            .map(|state| state.name())
            .collect();
        assert_eq!(names, vec!["Queued", "Sending", "Stored"]);
    }

    #[test]
    fn final_and_error_lists_mark_variants() {
        assert!(!Upload::Sending.is_final());
        assert!(Upload::Stored.is_final() && !Upload::Stored.is_error());
        assert!(Upload::Rejected.is_final() && Upload::Rejected.is_error());
    }

    #[test]
    fn markers_default_to_false_when_omitted() {
        state_enum! {
            pub enum Phase {
                Warmup,
                Steady,
            }
        }

        assert!(!Phase::Warmup.is_final());
        assert!(!Phase::Steady.is_error());
    }

    #[test]
    fn states_round_trip_through_serde() {
        let json = serde_json::to_string(&Upload::Sending).unwrap();
        assert_eq!(json, "\"Sending\"");
        let back: Upload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Upload::Sending);
    }

    #[test]
    fn event_names_ignore_payloads() {
        assert_eq!(UploadEvent::Send.name(), "Send");
        assert_eq!(UploadEvent::Progress(40).name(), "Progress");
        assert_eq!(UploadEvent::Rejected("too large".to_string(), 413).name(), "Rejected");
        assert_ne!(UploadEvent::Progress(1), UploadEvent::Progress(2));
    }
}
