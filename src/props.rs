//! Typed property bags for component invocations.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::core::{ArcStr, Dynamic, dynamic};
use crate::node::Node;

/// The effective input parameters of a component.
///
/// Values are stored type-erased and read back through [`Props::get`], which
/// downcasts to the requested type. The node's nested content lives in a
/// dedicated slot exposed only through [`Props::children`], so a stray
/// `"children"` key can never overwrite the actual content.
///
/// # Example
///
/// ```rust
/// # use karitori::Props;
/// let props = Props::new().with("label", "Save").with("count", 3u32);
/// assert_eq!(props.get::<&str>("label"), Some(&"Save"));
/// assert_eq!(props.get::<u32>("count"), Some(&3));
/// assert_eq!(props.get::<u32>("missing"), None);
/// ```
#[derive(Clone, Default)]
pub struct Props {
    values: BTreeMap<ArcStr, Dynamic>,
    children: Node,
}

impl Props {
    /// Creates an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value under the given key, consuming and returning the bag.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<ArcStr>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a value under the given key.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<ArcStr>, value: T) {
        self.values.insert(key.into(), dynamic(value));
    }

    /// Retrieves a value by key, downcast to the requested type.
    ///
    /// Returns `None` when the key is absent or holds a different type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref())
    }

    /// Returns `true` if a value is present under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Sets the nested content, consuming and returning the bag.
    #[must_use]
    pub fn with_children(mut self, children: impl Into<Node>) -> Self {
        self.children = children.into();
        self
    }

    /// The nested content of the node this bag belongs to.
    pub fn children(&self) -> &Node {
        &self.children
    }

    /// Number of declared attributes, not counting nested content.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no attributes are declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over declared attribute keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|key| &**key)
    }
}

impl Debug for Props {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Props")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

/// Builds the effective props for one component invocation: the node's own
/// attributes, with any key absent from the node but present in the
/// component's declared defaults filled in from there. The node's props are
/// never mutated; values are shared, not copied.
pub(crate) fn resolve_props(props: &Props, defaults: &Props) -> Props {
    let mut resolved = props.clone();
    for (key, value) in &defaults.values {
        if !resolved.values.contains_key(key) {
            resolved.values.insert(key.clone(), value.clone());
        }
    }
    resolved
}
