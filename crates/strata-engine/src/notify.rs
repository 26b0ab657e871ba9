use strata_types::{MutationKind, Timestamp};

/// Notification describing a committed mutation.
///
/// Emitted to listeners only after the mutation is durable in the log,
/// applied to the flat store, and recorded in the timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationEvent {
    /// The mutation's timestamp.
    pub timestamp: Timestamp,
    /// SET or DELETE.
    pub kind: MutationKind,
    /// The mutated key.
    pub key: String,
}

/// Callback invoked after each committed mutation.
///
/// Listeners run on the mutating thread, outside the writer lock. They
/// must be cheap and non-blocking; a slow listener delays only the caller
/// that committed the mutation, never other writers.
pub type MutationListener = Box<dyn Fn(&MutationEvent) + Send + Sync>;
