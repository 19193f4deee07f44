use thiserror::Error;

/// Errors surfaced by a top-level harvest.
///
/// Every failure raised while resolving a tree is reported through the future
/// returned by [`harvest`](crate::harvest) or
/// [`harvest_seeds`](crate::harvest_seeds); nothing is swallowed and the
/// original userland error is carried along unwrapped.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A component failed while rendering synchronously.
    #[error("Component '{0}':\n{1}")]
    Render(Box<str>, anyhow::Error),

    /// The deferred result of an asynchronous render was rejected.
    #[error("Component '{0}' (deferred):\n{1}")]
    Deferred(Box<str>, anyhow::Error),

    /// A context consumer's render closure failed.
    #[error("Consumer of context '{0}':\n{1}")]
    Consumer(Box<str>, anyhow::Error),
}

/// Errors raised while serializing a resolved tree to markup.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// The tree still contains a node that only a harvest can expand.
    #[error("Node '{0}' was not resolved before serialization")]
    Unresolved(Box<str>),
}
