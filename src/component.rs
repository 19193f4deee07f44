//! Component definitions and the invocation protocol.
//!
//! A [`ComponentDef`] is a tagged union over the component styles the
//! resolver knows how to invoke, probed once per node instead of
//! duck-typing at every step. Class-style components implement
//! [`ClassComponent`]; function-style components are plain closures, with a
//! deferred variant for output produced asynchronously.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::{ContextRef, ContextStack};
use crate::core::{ArcStr, Dynamic, dynamic};
use crate::dispatcher::ShimGuard;
use crate::error::HarvestError;
use crate::meanwhile::Meanwhile;
use crate::node::{ComponentNode, Node};
use crate::props::Props;

/// A component definition, usable any number of times across a tree.
///
/// # Example
///
/// ```rust
/// # use karitori::{ComponentDef, Element, Node, Props};
/// let greeting = ComponentDef::function("Greeting", |props| {
///     let name = props.get::<&str>("name").copied().unwrap_or("world");
///     Ok(Element::new("p").child(format!("Hello, {name}!")).into())
/// });
/// let node = greeting.node(Props::new().with("name", "kamoshi"));
/// ```
#[derive(Clone)]
pub enum ComponentDef {
    /// A synchronous function component.
    Function(Arc<FunctionComponent>),
    /// A function component producing its output asynchronously.
    AsyncFunction(Arc<AsyncFunctionComponent>),
    /// A class-style component with lifecycle emulation.
    Class(Arc<dyn ClassComponent>),
    /// A memoization wrapper; semantically transparent to the resolver.
    Memo(Arc<ComponentDef>),
}

impl Debug for ComponentDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ComponentDef").field(&self.name()).finish()
    }
}

impl ComponentDef {
    /// Creates a synchronous function component.
    pub fn function<F>(name: impl Into<ArcStr>, call: F) -> Self
    where
        F: Fn(&Props) -> anyhow::Result<Node> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(FunctionComponent {
            name: name.into(),
            defaults: Props::new(),
            call: Box::new(call),
        }))
    }

    /// Creates a synchronous function component with declared prop defaults.
    pub fn function_with_defaults<F>(name: impl Into<ArcStr>, defaults: Props, call: F) -> Self
    where
        F: Fn(&Props) -> anyhow::Result<Node> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(FunctionComponent {
            name: name.into(),
            defaults,
            call: Box::new(call),
        }))
    }

    /// Creates a function component whose render completes asynchronously.
    ///
    /// The closure receives the resolved props and a [`Meanwhile`] handle and
    /// returns a future producing the rendered subtree.
    pub fn deferred<F, Fut>(name: impl Into<ArcStr>, call: F) -> Self
    where
        F: Fn(Props, Meanwhile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Node>> + Send + 'static,
    {
        Self::AsyncFunction(Arc::new(AsyncFunctionComponent {
            name: name.into(),
            defaults: Props::new(),
            call: Box::new(move |props, meanwhile| Box::pin(call(props, meanwhile))),
        }))
    }

    /// Like [`deferred`](Self::deferred), with declared prop defaults.
    pub fn deferred_with_defaults<F, Fut>(
        name: impl Into<ArcStr>,
        defaults: Props,
        call: F,
    ) -> Self
    where
        F: Fn(Props, Meanwhile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Node>> + Send + 'static,
    {
        Self::AsyncFunction(Arc::new(AsyncFunctionComponent {
            name: name.into(),
            defaults,
            call: Box::new(move |props, meanwhile| Box::pin(call(props, meanwhile))),
        }))
    }

    /// Wraps a class-style component.
    pub fn class(component: impl ClassComponent) -> Self {
        Self::Class(Arc::new(component))
    }

    /// Wraps a definition in a memoization marker. Harvests render every
    /// component exactly once, so the wrapper is unwrapped and ignored.
    pub fn memo(inner: Self) -> Self {
        Self::Memo(Arc::new(inner))
    }

    /// Display name of the component, unwrapping memo layers.
    pub fn name(&self) -> &str {
        match self {
            Self::Function(f) => &f.name,
            Self::AsyncFunction(f) => &f.name,
            Self::Class(c) => c.name(),
            Self::Memo(inner) => inner.name(),
        }
    }

    /// Creates a tree node invoking this component with the given props.
    pub fn node(&self, props: Props) -> Node {
        Node::Component(Arc::new(ComponentNode {
            def: self.clone(),
            props,
        }))
    }

    /// The declared prop defaults, unwrapping memo layers.
    pub(crate) fn defaults(&self) -> Props {
        match self {
            Self::Function(f) => f.defaults.clone(),
            Self::AsyncFunction(f) => f.defaults.clone(),
            Self::Class(c) => c.defaults(),
            Self::Memo(inner) => inner.defaults(),
        }
    }
}

type RenderFn = Box<dyn Fn(&Props) -> anyhow::Result<Node> + Send + Sync>;
type DeferredRenderFn =
    Box<dyn Fn(Props, Meanwhile) -> BoxFuture<'static, anyhow::Result<Node>> + Send + Sync>;

/// A synchronous function component.
pub struct FunctionComponent {
    name: ArcStr,
    defaults: Props,
    call: RenderFn,
}

/// A function component with an asynchronous render entry point.
pub struct AsyncFunctionComponent {
    name: ArcStr,
    defaults: Props,
    call: DeferredRenderFn,
}

/// The lifecycle protocol for class-style components.
///
/// One transient [`Instance`] is created per resolution of a node and
/// discarded as soon as a render result is obtained; no identity persists
/// across resolutions. Optional capabilities are probed through
/// `Option`-returning methods: a `None` from [`derive_state`] or
/// [`render_deferred`] means the capability is not declared.
///
/// [`derive_state`]: Self::derive_state
/// [`render_deferred`]: Self::render_deferred
pub trait ClassComponent: Send + Sync + 'static {
    /// Display name; defaults to the implementing type's name.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Declared prop defaults, filled in for keys absent from the node.
    fn defaults(&self) -> Props {
        Props::new()
    }

    /// The context this component wants resolved onto its instance.
    fn context(&self) -> Option<ContextRef> {
        None
    }

    /// Initial state for a fresh instance.
    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    /// Derives state from props. Returning `Some` merges the derived fields
    /// over the initial state (like-named fields override, others are
    /// retained) and suppresses [`will_mount`](Self::will_mount).
    fn derive_state(&self, _props: &Props, _state: &State) -> Option<State> {
        None
    }

    /// Will-mount lifecycle emulation. Runs only when
    /// [`derive_state`](Self::derive_state) declined; may call
    /// [`Instance::set_state`] or [`Instance::replace_state`], which take
    /// effect immediately.
    fn will_mount(&self, _instance: &mut Instance) {}

    /// Produces the rendered subtree.
    fn render(&self, instance: &Instance) -> anyhow::Result<Node>;

    /// The asynchronous-render capability. Returning `Some` makes the
    /// resolver treat the future as the render result;
    /// [`render`](Self::render) is then never called for this resolution.
    fn render_deferred(
        &self,
        _instance: &Instance,
        _meanwhile: Meanwhile,
    ) -> Option<BoxFuture<'static, anyhow::Result<Node>>> {
        None
    }
}

/// Per-resolution component state, shallow-merged or replaced wholesale.
#[derive(Clone, Default)]
pub struct State {
    values: BTreeMap<ArcStr, Dynamic>,
}

impl State {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, consuming and returning the state.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<ArcStr>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a field.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<ArcStr>, value: T) {
        self.values.insert(key.into(), dynamic(value));
    }

    /// Retrieves a field, downcast to the requested type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref())
    }

    /// Returns `true` if a field is present under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shallow merge: fields of `over` override like-named fields, all other
    /// existing fields are retained.
    pub(crate) fn merge(&mut self, over: Self) {
        for (key, value) in over.values {
            self.values.insert(key, value);
        }
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("State")
            .field(&self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A transient class-component instance: resolved props, computed state and
/// resolved context. Created fresh for each resolution of a node and dropped
/// once its render result is obtained.
#[derive(Debug)]
pub struct Instance {
    props: Props,
    state: State,
    context: Option<Dynamic>,
}

impl Instance {
    /// The resolved props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// The current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The resolved context value, downcast to the requested type.
    pub fn context<T: 'static>(&self) -> Option<&T> {
        self.context.as_ref().and_then(|value| value.downcast_ref())
    }

    /// Shallow-merges `update` over the current state, effective
    /// immediately.
    pub fn set_state(&mut self, update: State) {
        self.state.merge(update);
    }

    /// Discards the current state entirely in favor of `state`.
    pub fn replace_state(&mut self, state: State) {
        self.state = state;
    }
}

/// Outcome of one component invocation.
pub(crate) enum Rendered {
    Ready(Node),
    Deferred(BoxFuture<'static, anyhow::Result<Node>>),
}

impl std::fmt::Debug for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rendered::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
            Rendered::Deferred(_) => f.debug_tuple("Deferred").finish(),
        }
    }
}

/// Invokes a component with already-resolved props.
///
/// For function components the hook dispatcher is installed around the call
/// and restored before this function returns, so the shim can never span an
/// asynchronous boundary.
pub(crate) fn invoke(
    def: &ComponentDef,
    props: &Props,
    stack: &ContextStack,
) -> Result<Rendered, HarvestError> {
    match def {
        ComponentDef::Function(f) => {
            let _shim = ShimGuard::install(stack.clone());
            let node =
                (f.call)(props).map_err(|e| HarvestError::Render(f.name.to_string().into(), e))?;
            Ok(Rendered::Ready(node))
        }
        ComponentDef::AsyncFunction(f) => {
            // The call only constructs the future, but hooks in its
            // synchronous prologue must already see the context stack. The
            // guard drops before the deferred is handed back, so it never
            // spans an await.
            let _shim = ShimGuard::install(stack.clone());
            Ok(Rendered::Deferred((f.call)(props.clone(), Meanwhile::new())))
        }
        ComponentDef::Class(c) => {
            let mut instance = Instance {
                state: c.initial_state(props),
                context: c.context().map(|ctx| stack.lookup(&ctx)),
                props: props.clone(),
            };
            // At most one of the two state hooks runs, derived state first.
            match c.derive_state(&instance.props, &instance.state) {
                Some(derived) => instance.state.merge(derived),
                None => c.will_mount(&mut instance),
            }
            match c.render_deferred(&instance, Meanwhile::new()) {
                Some(future) => Ok(Rendered::Deferred(future)),
                None => {
                    let node = c
                        .render(&instance)
                        .map_err(|e| HarvestError::Render(c.name().into(), e))?;
                    Ok(Rendered::Ready(node))
                }
            }
        }
        ComponentDef::Memo(inner) => invoke(inner, props, stack),
    }
}
