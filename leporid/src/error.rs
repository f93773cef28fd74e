//! Errors surfaced to applications through entity handles

/// Error returned by [`Exchange`](crate::Exchange) and
/// [`Queue`](crate::Queue) handle operations.
///
/// Protocol-level failures never appear here: broker errors arrive as
/// events on the entity's notification stream and local misuse is
/// dropped by the entity itself. A handle operation can only fail
/// because the engine task it talks to is no longer running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entity's engine task has stopped
    #[error("entity engine has stopped")]
    EngineStopped,
}
