//! Context: named slots for passing a value down a subtree without
//! threading it through every component's props.
//!
//! A [`Context`] is created once with a registered default. A provider node
//! binds a value over its subtree; a consumer (or a function component
//! calling [`use_context`](crate::use_context)) observes the innermost
//! binding above it, falling back to the default when no provider is active.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::{ArcStr, Dynamic, dynamic};
use crate::node::{ConsumerNode, Node, ProviderNode};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A typed context handle.
///
/// Cloning the handle preserves identity: all clones refer to the same slot,
/// and lookups resolve providers created from any of them.
///
/// # Example
///
/// ```rust
/// # use karitori::{Context, Node};
/// let theme = Context::new("Theme", "light".to_string());
/// let tree = theme.provide(
///     "dark".to_string(),
///     theme.consume(|value: &String| Ok(Node::text(value.clone()))),
/// );
/// ```
pub struct Context<T> {
    inner: ContextRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Context").field(&self.inner.name).finish()
    }
}

impl<T: Send + Sync + 'static> Context<T> {
    /// Registers a new context with a display name and a default value.
    pub fn new(name: impl Into<ArcStr>, default: T) -> Self {
        Self {
            inner: ContextRef {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                fallback: dynamic(default),
            },
            _marker: PhantomData,
        }
    }

    /// Creates a provider node binding `value` over `children`.
    pub fn provide(&self, value: T, children: impl Into<Node>) -> Node {
        Node::Provider(Arc::new(ProviderNode {
            context: self.inner.clone(),
            value: dynamic(value),
            children: children.into(),
        }))
    }

    /// Creates a consumer node whose content is computed from the current
    /// context value.
    pub fn consume<F>(&self, render: F) -> Node
    where
        F: Fn(&T) -> anyhow::Result<Node> + Send + Sync + 'static,
    {
        Node::Consumer(Arc::new(ConsumerNode {
            context: self.inner.clone(),
            // The provider and fallback values both originate from a typed
            // `Context<T>`, so the downcast cannot fail.
            render: Box::new(move |value: &Dynamic| render(value.downcast_ref().unwrap())),
        }))
    }

    /// The erased handle, as requested by class components via
    /// [`ClassComponent::context`](crate::ClassComponent::context).
    pub fn erased(&self) -> ContextRef {
        self.inner.clone()
    }
}

/// A type-erased context handle: unique identity, display name and the
/// registered default value.
#[derive(Clone)]
pub struct ContextRef {
    pub(crate) id: u64,
    pub(crate) name: ArcStr,
    pub(crate) fallback: Dynamic,
}

impl Debug for ContextRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// The ordered set of context bindings active along one root-to-node path.
///
/// The stack is a persistent linked list: [`push`](Self::push) returns a new
/// stack sharing structure with the old one, and each recursive resolver call
/// owns its stack by value. Sibling subtrees can therefore never observe each
/// other's bindings, and no pop bookkeeping exists to get wrong.
#[derive(Clone, Default)]
pub(crate) struct ContextStack(Option<Arc<Frame>>);

struct Frame {
    id: u64,
    value: Dynamic,
    parent: Option<Arc<Frame>>,
}

impl ContextStack {
    /// Returns a new stack with the binding appended.
    pub(crate) fn push(&self, id: u64, value: Dynamic) -> Self {
        Self(Some(Arc::new(Frame {
            id,
            value,
            parent: self.0.clone(),
        })))
    }

    /// Resolves the innermost binding for the given context, falling back to
    /// its registered default.
    pub(crate) fn lookup(&self, context: &ContextRef) -> Dynamic {
        let mut frame = self.0.as_deref();
        while let Some(current) = frame {
            if current.id == context.id {
                return current.value.clone();
            }
            frame = current.parent.as_deref();
        }
        context.fallback.clone()
    }
}
