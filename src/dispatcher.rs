//! Hook emulation for function components.
//!
//! A one-shot harvest has no live render loop, so the state, effect and
//! scheduling primitives a function component reaches for must exist but do
//! nothing persistent. The free functions in this module are those
//! primitives. Only [`use_context`] actually consults ambient state: a
//! thread-local dispatcher carrying the context stack, installed for exactly
//! the synchronous duration of one component call.
//!
//! The installation discipline is the single most safety-critical invariant
//! of the crate: the dispatcher is installed immediately before the call,
//! and the RAII guard restores the prior dispatcher on every exit path. The
//! guard must never live across an await, otherwise concurrently resolving
//! siblings would observe each other's context.

use std::cell::RefCell;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::context::{Context, ContextStack};

thread_local! {
    static CURRENT: RefCell<Option<Rc<Dispatcher>>> = const { RefCell::new(None) };
}

pub(crate) struct Dispatcher {
    stack: ContextStack,
}

/// Installs a dispatcher for the duration of one synchronous component call,
/// restoring the prior dispatcher on drop.
pub(crate) struct ShimGuard {
    prior: Option<Rc<Dispatcher>>,
}

impl ShimGuard {
    pub(crate) fn install(stack: ContextStack) -> Self {
        let next = Rc::new(Dispatcher { stack });
        let prior = CURRENT.with(|slot| slot.borrow_mut().replace(next));
        Self { prior }
    }
}

impl Drop for ShimGuard {
    fn drop(&mut self) {
        CURRENT.with(|slot| {
            *slot.borrow_mut() = self.prior.take();
        });
    }
}

/// A state setter returned by [`use_state`]. Calling it has no effect:
/// a harvest renders each component exactly once.
pub struct SetState<T>(PhantomData<fn(T)>);

impl<T> SetState<T> {
    /// Ignored; the harvested render never re-runs.
    pub fn set(&self, _value: T) {}
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<T> Debug for SetState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SetState")
    }
}

/// An action dispatcher returned by [`use_reducer`]. Calling it has no
/// effect during a harvest.
pub struct Dispatch<A>(PhantomData<fn(A)>);

impl<A> Dispatch<A> {
    /// Ignored; the reducer is never exercised.
    pub fn dispatch(&self, _action: A) {}
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<A> Debug for Dispatch<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Dispatch")
    }
}

/// A mutable box returned by [`use_ref`]. Writes are observable only within
/// the same render call.
#[derive(Debug)]
pub struct HookRef<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for HookRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> HookRef<T> {
    /// Replaces the held value.
    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }

    /// Applies a mutation to the held value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.borrow_mut());
    }
}

impl<T: Clone> HookRef<T> {
    /// Returns a copy of the held value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

/// Returns the initial value and a no-op setter.
pub fn use_state<T: Clone + 'static>(initial: T) -> (T, SetState<T>) {
    (initial, SetState(PhantomData))
}

/// Invokes the computation immediately and returns its result.
pub fn use_memo<T>(compute: impl FnOnce() -> T) -> T {
    compute()
}

/// Returns the callback unchanged.
pub fn use_callback<F>(callback: F) -> F {
    callback
}

/// Returns a mutable box seeded with the initial value.
pub fn use_ref<T: 'static>(initial: T) -> HookRef<T> {
    HookRef {
        inner: Rc::new(RefCell::new(initial)),
    }
}

/// Never scheduled, never invoked.
pub fn use_effect<F: FnOnce()>(_effect: F) {}

/// Never scheduled, never invoked.
pub fn use_layout_effect<F: FnOnce()>(_effect: F) {}

/// Never scheduled, never invoked.
pub fn use_imperative_handle<T, F: FnOnce() -> T>(_handle: &HookRef<Option<T>>, _create: F) {}

/// Ignored; there is no devtools surface during a harvest.
pub fn use_debug_value<T: Debug>(_value: T) {}

/// Returns the initial value and an inert dispatch function.
pub fn use_reducer<S, A>(_reducer: impl Fn(&S, A) -> S, initial: S) -> (S, Dispatch<A>) {
    (initial, Dispatch(PhantomData))
}

/// Like [`use_reducer`], but obtains the initial value by invoking the lazy
/// initializer with the initial argument.
pub fn use_reducer_with<S, A, I>(
    _reducer: impl Fn(&S, A) -> S,
    init_arg: I,
    init: impl FnOnce(I) -> S,
) -> (S, Dispatch<A>) {
    (init(init_arg), Dispatch(PhantomData))
}

/// Reads the current value of a context.
///
/// Inside a function component this resolves against the context stack at
/// the component's position in the tree. Outside of a render (no dispatcher
/// installed) it degrades to the context's registered default.
pub fn use_context<T: Clone + Send + Sync + 'static>(context: &Context<T>) -> T {
    let erased = context.erased();
    let value = CURRENT.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|dispatcher| dispatcher.stack.lookup(&erased))
    });
    // Values under this id always come from the same typed `Context<T>`.
    match value {
        Some(value) => value.downcast_ref::<T>().unwrap().clone(),
        None => erased.fallback.downcast_ref::<T>().unwrap().clone(),
    }
}
