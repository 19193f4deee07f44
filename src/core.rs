use std::any::Any;
use std::sync::Arc;

/// A type-erased, thread-safe container for prop and context values.
pub(crate) type Dynamic = Arc<dyn Any + Send + Sync>;

/// Atomic reference-counted string type used for identifiers and text nodes.
pub(crate) type ArcStr = Arc<str>;

/// Erases a concrete value into a [`Dynamic`].
pub(crate) fn dynamic<T: Send + Sync + 'static>(value: T) -> Dynamic {
    Arc::new(value)
}
