//! The declarative tree data model. A [`Node`] describes what should end up
//! on the page without saying how to get there; the resolver in
//! [`resolve`](crate::resolve) expands it into a tree of primitives.

use std::fmt::Debug;
use std::sync::Arc;

use crate::component::ComponentDef;
use crate::context::ContextRef;
use crate::core::{ArcStr, Dynamic};
use crate::props::Props;

/// A single node of the declarative tree.
///
/// Nodes are immutable and cheap to clone; every variant with a payload holds
/// it behind an [`Arc`]. A changed subtree always produces a new node rather
/// than mutating in place, which is what makes the reference-identity
/// short-circuits in the resolver sound.
#[derive(Clone)]
pub enum Node {
    /// Nothing to render.
    Null,
    /// A plain text node. Scalars convert into this variant.
    Text(ArcStr),
    /// A markup element, e.g. `<div>`.
    Element(Arc<Element>),
    /// An ordered sequence of sibling nodes.
    Fragment(Arc<[Node]>),
    /// A component invocation, expanded during a harvest.
    Component(Arc<ComponentNode>),
    /// A context provider scoping a value to its subtree.
    Provider(Arc<ProviderNode>),
    /// A context consumer rendering from the innermost provided value.
    Consumer(Arc<ConsumerNode>),
}

impl Node {
    /// Creates a text node.
    pub fn text(value: impl Into<ArcStr>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a fragment from an ordered collection of children.
    pub fn fragment(children: impl IntoIterator<Item = Node>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// Returns `true` if this node renders nothing.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reference-identity comparison.
    ///
    /// Two nodes are identical when they share the same allocation, not
    /// merely when they are structurally equal. The resolver uses this to
    /// return original nodes unchanged when nothing in a subtree moved.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b),
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            (Self::Fragment(a), Self::Fragment(b)) => Arc::ptr_eq(a, b),
            (Self::Component(a), Self::Component(b)) => Arc::ptr_eq(a, b),
            (Self::Provider(a), Self::Provider(b)) => Arc::ptr_eq(a, b),
            (Self::Consumer(a), Self::Consumer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short human-readable name of this node, used in diagnostics.
    pub(crate) fn describe(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Element(el) => &el.tag,
            Self::Fragment(_) => "fragment",
            Self::Component(c) => c.def.name(),
            Self::Provider(p) => &p.context.name,
            Self::Consumer(c) => &c.context.name,
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::Null
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Element(el) => el.fmt(f),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Component(c) => f.debug_tuple("Component").field(&c.def.name()).finish(),
            Self::Provider(p) => f.debug_tuple("Provider").field(&p.context.name).finish(),
            Self::Consumer(c) => f.debug_tuple("Consumer").field(&c.context.name).finish(),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::text(if value { "true" } else { "false" })
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::text(value.to_string())
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::text(value.to_string())
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(Arc::new(value))
    }
}

impl<T> From<Option<T>> for Node
where
    T: Into<Node>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A markup element: a primitive tag with string attributes and children.
///
/// Elements are built fluently and then converted into a [`Node`]:
///
/// ```rust
/// # use karitori::{Element, Node};
/// let node: Node = Element::new("a")
///     .attr("href", "/about")
///     .child("About")
///     .into();
/// ```
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) tag: ArcStr,
    pub(crate) attrs: Vec<(ArcStr, ArcStr)>,
    pub(crate) children: Arc<[Node]>,
}

impl Element {
    /// Creates an empty element with the given tag.
    pub fn new(tag: impl Into<ArcStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new().into(),
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<ArcStr>, value: impl Into<ArcStr>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Appends a single child node.
    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        let mut children = self.children.to_vec();
        children.push(child.into());
        self.children = children.into();
        self
    }

    /// Replaces the children with an ordered collection.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// The element tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The element attributes, in insertion order.
    pub fn attrs(&self) -> &[(ArcStr, ArcStr)] {
        &self.attrs
    }

    /// The child nodes.
    pub fn child_nodes(&self) -> &Arc<[Node]> {
        &self.children
    }

    /// The node-cloning primitive: a copy of this element with the same tag
    /// and attributes but new children.
    pub(crate) fn with_children(&self, children: Arc<[Node]>) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children,
        }
    }
}

/// A component invocation: the component definition plus the props the node
/// was written with. Expanded by the resolver.
pub struct ComponentNode {
    pub(crate) def: ComponentDef,
    pub(crate) props: Props,
}

impl Debug for ComponentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentNode")
            .field("def", &self.def.name())
            .field("props", &self.props)
            .finish()
    }
}

/// A provider node binding a context value over its children.
pub struct ProviderNode {
    pub(crate) context: ContextRef,
    pub(crate) value: Dynamic,
    pub(crate) children: Node,
}

/// A consumer node whose content is a function of the current context value.
pub struct ConsumerNode {
    pub(crate) context: ContextRef,
    pub(crate) render: Box<dyn Fn(&Dynamic) -> anyhow::Result<Node> + Send + Sync>,
}
