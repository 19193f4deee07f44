//! The recursive resolver: expands a declarative tree into primitives.
//!
//! Every function here that may suspend returns a [`Resolved`], whose
//! `Ready` arm carries the result immediately whenever no asynchronous work
//! occurred on that path. Callers match on both arms transparently; the
//! `Ready` arm is an optimization, never a semantic difference.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};

use crate::component::{Rendered, invoke};
use crate::context::ContextStack;
use crate::error::HarvestError;
use crate::node::Node;
use crate::props::resolve_props;
use crate::seed::{Seed, SeedBucket};

/// A possibly-deferred resolution result.
pub(crate) enum Resolved<T> {
    /// No asynchronous work occurred; the value is available now.
    Ready(T),
    /// The value becomes available once the future completes.
    Deferred(BoxFuture<'static, Result<T, HarvestError>>),
}

impl<T: Send + 'static> Resolved<T> {
    /// Waits for the value regardless of which arm it is in.
    pub(crate) async fn settle(self) -> Result<T, HarvestError> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Deferred(future) => future.await,
        }
    }

    /// Applies a transformation to the eventual value.
    fn map<U>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Resolved<U> {
        match self {
            Self::Ready(value) => Resolved::Ready(f(value)),
            Self::Deferred(future) => {
                Resolved::Deferred(future.map(|result| result.map(f)).boxed())
            }
        }
    }

    fn into_future(self) -> BoxFuture<'static, Result<T, HarvestError>> {
        match self {
            Self::Ready(value) => futures::future::ready(Ok(value)).boxed(),
            Self::Deferred(future) => future,
        }
    }
}

/// Outcome of resolving a child array.
enum Children {
    /// Every child resolved to itself; the original array stands.
    Unchanged,
    /// At least one child changed; a new array was built, order preserved.
    Changed(Arc<[Node]>),
}

/// Resolves a single node under the given context stack.
///
/// When `bucket` is set the harvest is in seed-collecting mode: primitive
/// and markup output is discarded (the call yields [`Node::Null`]) and only
/// asynchronous component invocations are recorded.
pub(crate) fn resolve_node(
    node: &Node,
    stack: &ContextStack,
    bucket: Option<&Arc<SeedBucket>>,
) -> Result<Resolved<Node>, HarvestError> {
    match node {
        // Primitives pass through untouched; they contribute nothing to
        // seed collection.
        Node::Null | Node::Text(_) => Ok(Resolved::Ready(match bucket {
            Some(_) => Node::Null,
            None => node.clone(),
        })),

        Node::Component(component) => {
            let props = resolve_props(&component.props, &component.def.defaults());
            tracing::debug!(component = component.def.name(), "invoking");

            match invoke(&component.def, &props, stack)? {
                Rendered::Ready(output) => resolve_node(&output, stack, bucket),
                Rendered::Deferred(future) => {
                    let def = component.def.clone();
                    let stack = stack.clone();
                    let bucket = bucket.cloned();
                    Ok(Resolved::Deferred(Box::pin(async move {
                        let output = future
                            .await
                            .map_err(|e| HarvestError::Deferred(def.name().into(), e))?;
                        tracing::debug!(component = def.name(), "deferred render settled");
                        if let Some(bucket) = &bucket {
                            bucket.push(Seed {
                                component: def,
                                props,
                                result: output.clone(),
                            });
                        }
                        resolve_node(&output, &stack, bucket.as_ref())?.settle().await
                    })))
                }
            }
        }

        // The provider dissolves into its resolved content; the extended
        // stack is scoped to this call and can never leak to siblings.
        Node::Provider(provider) => {
            let extended = stack.push(provider.context.id, provider.value.clone());
            resolve_node(&provider.children, &extended, bucket)
        }

        // The consumer's content is a function of the current value; the
        // returned content resolves under the unmodified outer stack.
        Node::Consumer(consumer) => {
            let value = stack.lookup(&consumer.context);
            let content = (consumer.render)(&value)
                .map_err(|e| HarvestError::Consumer(consumer.context.name.to_string().into(), e))?;
            resolve_node(&content, stack, bucket)
        }

        Node::Fragment(children) => {
            let original = node.clone();
            let collecting = bucket.is_some();
            Ok(resolve_children(children, stack, bucket)?.map(move |outcome| {
                if collecting {
                    return Node::Null;
                }
                match outcome {
                    Children::Unchanged => original,
                    Children::Changed(nodes) => Node::Fragment(nodes),
                }
            }))
        }

        Node::Element(element) => {
            let original = node.clone();
            let element = element.clone();
            let collecting = bucket.is_some();
            let children = element.children.clone();
            Ok(resolve_children(&children, stack, bucket)?.map(move |outcome| {
                if collecting {
                    return Node::Null;
                }
                match outcome {
                    Children::Unchanged => original,
                    Children::Changed(nodes) => {
                        Node::Element(Arc::new(element.with_children(nodes)))
                    }
                }
            }))
        }
    }
}

/// Resolves each element of a child array, joining deferred siblings.
///
/// Siblings resolve independently and their asynchronous work may
/// interleave, but the combined result preserves the original positional
/// order regardless of completion order. No implicit cancellation: even when
/// one sibling fails, the others are driven to completion before the first
/// error is reported.
fn resolve_children(
    children: &Arc<[Node]>,
    stack: &ContextStack,
    bucket: Option<&Arc<SeedBucket>>,
) -> Result<Resolved<Children>, HarvestError> {
    let mut resolved = Vec::with_capacity(children.len());
    let mut any_deferred = false;

    for child in children.iter() {
        let child = resolve_node(child, stack, bucket)?;
        any_deferred |= matches!(child, Resolved::Deferred(_));
        resolved.push(child);
    }

    if any_deferred {
        let originals = children.clone();
        Ok(Resolved::Deferred(Box::pin(async move {
            let settled = join_all(resolved.into_iter().map(Resolved::into_future)).await;
            let mut nodes = Vec::with_capacity(settled.len());
            for result in settled {
                nodes.push(result?);
            }
            Ok(rebuild(&originals, nodes))
        })))
    } else {
        let nodes = resolved
            .into_iter()
            .map(|child| match child {
                Resolved::Ready(node) => node,
                Resolved::Deferred(_) => unreachable!("checked above"),
            })
            .collect();
        Ok(Resolved::Ready(rebuild(children, nodes)))
    }
}

fn rebuild(originals: &Arc<[Node]>, nodes: Vec<Node>) -> Children {
    let unchanged = originals
        .iter()
        .zip(nodes.iter())
        .all(|(original, resolved)| original.ptr_eq(resolved));

    if unchanged {
        Children::Unchanged
    } else {
        Children::Changed(nodes.into())
    }
}
