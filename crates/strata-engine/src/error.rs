use strata_store::StoreError;
use strata_timeline::TimelineError;
use strata_wal::WalError;

/// Errors from the versioned engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The write-ahead log append did not persist. The operation was
    /// aborted before anything was applied.
    #[error("durability failure: {0}")]
    DurabilityFailure(#[source] WalError),

    /// The flat store rejected an update after the log append succeeded.
    /// The logged record remains and will be re-applied on the next
    /// startup, so the mutation is durable even though this call failed.
    #[error("storage apply failure after durable log append: {0}")]
    StorageApplyFailure(#[source] StoreError),

    /// The write-ahead log could not be opened or replayed at startup.
    #[error("recovery failed: {0}")]
    Recovery(#[source] WalError),

    /// A flat store read failed.
    #[error("flat store read failed: {0}")]
    StoreRead(#[from] StoreError),

    /// The timeline rejected a mutation (clock or caller bug).
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
