#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod component;
mod context;
mod core;
mod dispatcher;
mod error;
pub mod markup;
mod meanwhile;
mod node;
mod props;
mod resolve;
mod seed;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use crate::component::{
    AsyncFunctionComponent, ClassComponent, ComponentDef, FunctionComponent, Instance, State,
};
pub use crate::context::{Context, ContextRef};
pub use crate::dispatcher::{
    Dispatch, HookRef, SetState, use_callback, use_context, use_debug_value, use_effect,
    use_imperative_handle, use_layout_effect, use_memo, use_reducer, use_reducer_with, use_ref,
    use_state,
};
pub use crate::error::{HarvestError, MarkupError};
pub use crate::meanwhile::Meanwhile;
pub use crate::node::{ComponentNode, ConsumerNode, Element, Node, ProviderNode};
pub use crate::props::Props;
pub use crate::seed::Seed;

use crate::context::ContextStack;
use crate::seed::SeedBucket;

/// Number of harvest calls currently in flight.
static HARVESTS: AtomicUsize = AtomicUsize::new(0);

struct HarvestGuard;

impl HarvestGuard {
    fn enter() -> Self {
        HARVESTS.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for HarvestGuard {
    fn drop(&mut self) {
        HARVESTS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reports whether a harvest is currently in progress.
///
/// Collaborators can use this to alter behavior only during harvesting, e.g.
/// skipping real network fetches during a pass that only pre-populates a
/// cache. Reset on every exit path of the harvest, including failure.
pub fn is_harvesting() -> bool {
    HARVESTS.load(Ordering::SeqCst) > 0
}

/// Fully resolves a declarative tree, expanding every component — including
/// asynchronous ones — into a tree of primitive nodes.
///
/// The output is structurally identical to what a purely synchronous render
/// of the same tree would have produced. Subtrees in which nothing changed
/// are returned by reference identity. Being an `async fn`, the call never
/// fails synchronously: every error surfaces through the returned future.
///
/// # Example
///
/// ```rust
/// # use karitori::{harvest, markup, ComponentDef, Element, Node, Props};
/// # async fn demo() -> anyhow::Result<()> {
/// let title = ComponentDef::deferred("Title", |_, _| async {
///     Ok(Element::new("h1").child("karitori").into())
/// });
/// let tree = harvest(title.node(Props::new())).await?;
/// assert_eq!(markup::stringify(&tree)?, "<h1>karitori</h1>");
/// # Ok(())
/// # }
/// ```
pub async fn harvest(root: Node) -> Result<Node, HarvestError> {
    let _harvesting = HarvestGuard::enter();
    tracing::debug!(root = root.describe(), "harvest started");
    let tree = resolve::resolve_node(&root, &ContextStack::default(), None)?
        .settle()
        .await?;
    tracing::debug!("harvest settled");
    Ok(tree)
}

/// Resolves a tree in seed-collecting mode.
///
/// Instead of the resolved tree, the result is the ordered list of every
/// asynchronous component invocation — its definition, resolved props and
/// eventual render result — in depth-first encounter order. Primitive and
/// markup subtrees contribute nothing; callers of this mode only want the
/// seed list, typically to pre-populate a cache for a later synchronous
/// render.
pub async fn harvest_seeds(root: Node) -> Result<Vec<Seed>, HarvestError> {
    let _harvesting = HarvestGuard::enter();
    tracing::debug!(root = root.describe(), "seed harvest started");
    let bucket = SeedBucket::new();
    resolve::resolve_node(&root, &ContextStack::default(), Some(&bucket))?
        .settle()
        .await?;
    let seeds = SeedBucket::unwrap(bucket);
    tracing::debug!(seeds = seeds.len(), "seed harvest settled");
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::markup::stringify;

    fn item(tag: &str, text: &str) -> Node {
        Element::new(tag).child(text).into()
    }

    #[tokio::test]
    async fn test_all_primitive_tree_keeps_identity() {
        let tree: Node = Element::new("main")
            .child(Element::new("p").child("a"))
            .child(Element::new("p").child("b"))
            .into();

        let out = harvest(tree.clone()).await.unwrap();
        assert!(tree.ptr_eq(&out));
    }

    #[tokio::test]
    async fn test_scalars_pass_through_unchanged() {
        let text = Node::text("hello");
        let out = harvest(text.clone()).await.unwrap();
        assert!(text.ptr_eq(&out));

        assert!(harvest(Node::Null).await.unwrap().is_null());
        assert_eq!(
            stringify(&harvest(Node::from(42i64)).await.unwrap()).unwrap(),
            "42"
        );
        assert_eq!(
            stringify(&harvest(Node::from(false)).await.unwrap()).unwrap(),
            "false"
        );
    }

    #[tokio::test]
    async fn test_async_output_matches_sync_render() {
        let sync_body = ComponentDef::function("Body", |_| {
            Ok(Element::new("p").child("lorem").into())
        });
        let async_body = ComponentDef::deferred("Body", |_, _| async {
            Ok(Element::new("p").child("lorem").into())
        });

        let page = |body: &ComponentDef| -> Node {
            Element::new("main")
                .child(Element::new("h1").child("title"))
                .child(body.node(Props::new()))
                .into()
        };

        let sync_out = harvest(page(&sync_body)).await.unwrap();
        let async_out = harvest(page(&async_body)).await.unwrap();
        assert_eq!(
            stringify(&async_out).unwrap(),
            stringify(&sync_out).unwrap()
        );
        assert_eq!(
            stringify(&async_out).unwrap(),
            "<main><h1>title</h1><p>lorem</p></main>"
        );
    }

    #[tokio::test]
    async fn test_sibling_order_survives_reverse_completion() {
        let entry = ComponentDef::deferred("Entry", |props, _| async move {
            let index = *props.get::<u64>("index").unwrap();
            let delay = *props.get::<u64>("delay").unwrap();
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Node::text(index.to_string()))
        });

        let count = 4u64;
        let list: Node = Element::new("ol")
            .children((0..count).map(|i| {
                entry.node(
                    Props::new()
                        .with("index", i)
                        .with("delay", (count - i) * 10),
                )
            }))
            .into();

        let out = harvest(list).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "<ol>0123</ol>");
    }

    #[tokio::test]
    async fn test_provider_value_reaches_sync_consumer() {
        let theme = Context::new("Theme", String::from("light"));
        let consumer = theme.consume(|value: &String| Ok(Node::text(value.clone())));

        let out = harvest(theme.provide(String::from("dark"), consumer))
            .await
            .unwrap();
        assert_eq!(stringify(&out).unwrap(), "dark");
    }

    #[tokio::test]
    async fn test_provider_value_reaches_async_consumer() {
        let theme = Context::new("Theme", String::from("light"));
        let deferred = {
            let theme = theme.clone();
            ComponentDef::deferred("Late", move |_, _| {
                let theme = theme.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(theme.consume(|value: &String| Ok(Node::text(value.clone()))))
                }
            })
        };

        let out = harvest(theme.provide(String::from("dark"), deferred.node(Props::new())))
            .await
            .unwrap();
        assert_eq!(stringify(&out).unwrap(), "dark");
    }

    #[tokio::test]
    async fn test_consumer_without_provider_sees_default() {
        let theme = Context::new("Theme", String::from("light"));
        let consumer = theme.consume(|value: &String| Ok(Node::text(value.clone())));

        let out = harvest(consumer).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "light");
    }

    #[tokio::test]
    async fn test_provider_scope_does_not_leak_to_siblings() {
        let theme = Context::new("Theme", String::from("light"));
        let consume = || theme.consume(|value: &String| Ok(Node::text(value.clone())));

        let tree: Node = Element::new("div")
            .child(theme.provide(String::from("dark"), consume()))
            .child(consume())
            .into();

        let out = harvest(tree).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "<div>darklight</div>");
    }

    #[tokio::test]
    async fn test_hooks_run_inside_function_component() {
        let theme = Context::new("Theme", String::from("light"));
        let hooky = {
            let theme = theme.clone();
            ComponentDef::function("Hooky", move |_| {
                let (count, set_count) = use_state(1u32);
                set_count.set(99);
                let doubled = use_memo(|| count * 2);
                let seen = use_context(&theme);
                use_effect(|| panic!("effects never run during a harvest"));
                Ok(Node::text(format!("{seen}:{doubled}")))
            })
        };

        let out = harvest(theme.provide(String::from("dark"), hooky.node(Props::new())))
            .await
            .unwrap();
        assert_eq!(stringify(&out).unwrap(), "dark:2");
    }

    #[tokio::test]
    async fn test_async_component_prologue_reads_context() {
        let theme = Context::new("Theme", String::from("light"));
        let late = {
            let theme = theme.clone();
            ComponentDef::deferred("Late", move |_, _| {
                // Hooks run in the synchronous prologue, before the future
                // is even constructed; the provided value must be visible.
                let seen = use_context(&theme);
                async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    Ok(Node::text(seen))
                }
            })
        };

        let out = harvest(theme.provide(String::from("dark"), late.node(Props::new())))
            .await
            .unwrap();
        assert_eq!(stringify(&out).unwrap(), "dark");
    }

    #[tokio::test]
    async fn test_class_deferred_render_resolves_and_seeds() {
        use futures::FutureExt;

        struct Body;

        impl ClassComponent for Body {
            fn name(&self) -> &str {
                "Body"
            }

            fn render(&self, _instance: &Instance) -> anyhow::Result<Node> {
                unreachable!("deferred capability takes precedence")
            }

            fn render_deferred(
                &self,
                instance: &Instance,
                _meanwhile: Meanwhile,
            ) -> Option<futures::future::BoxFuture<'static, anyhow::Result<Node>>> {
                let text = instance
                    .props()
                    .get::<&str>("text")
                    .copied()
                    .unwrap_or("?")
                    .to_string();
                Some(
                    async move {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        Ok(Element::new("p").child(text).into())
                    }
                    .boxed(),
                )
            }
        }

        let def = ComponentDef::class(Body);
        let tree: Node = Element::new("div")
            .child(def.node(Props::new().with("text", "lorem")))
            .into();

        let out = harvest(tree.clone()).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "<div><p>lorem</p></div>");

        let seeds = harvest_seeds(tree).await.unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].component.name(), "Body");
        assert_eq!(stringify(&seeds[0].result).unwrap(), "<p>lorem</p>");
    }

    #[tokio::test]
    async fn test_class_deferred_rejection_carries_name() {
        use futures::FutureExt;

        struct Flaky;

        impl ClassComponent for Flaky {
            fn name(&self) -> &str {
                "Flaky"
            }

            fn render(&self, _instance: &Instance) -> anyhow::Result<Node> {
                unreachable!("deferred capability takes precedence")
            }

            fn render_deferred(
                &self,
                _instance: &Instance,
                _meanwhile: Meanwhile,
            ) -> Option<futures::future::BoxFuture<'static, anyhow::Result<Node>>> {
                Some(async { Err(anyhow::anyhow!("upstream gone")) }.boxed())
            }
        }

        let err = harvest(ComponentDef::class(Flaky).node(Props::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Deferred(..)));
        assert!(err.to_string().contains("Flaky"));
        assert!(err.to_string().contains("upstream gone"));
    }

    #[tokio::test]
    async fn test_default_props_fill_absent_keys() {
        let greet = ComponentDef::function_with_defaults(
            "Greet",
            Props::new().with("name", "world"),
            |props| {
                let name = *props.get::<&str>("name").unwrap();
                Ok(Node::text(format!("hello {name}")))
            },
        );

        let out = harvest(greet.node(Props::new())).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "hello world");

        let out = harvest(greet.node(Props::new().with("name", "kamoshi")))
            .await
            .unwrap();
        assert_eq!(stringify(&out).unwrap(), "hello kamoshi");
    }

    #[tokio::test]
    async fn test_seed_collection_records_async_invocations() {
        let late = ComponentDef::deferred("Late", |_, _| async {
            Ok(Element::new("p").child("hi").into())
        });
        let tree: Node = Element::new("div")
            .child(late.node(Props::new().with("id", 7u32)))
            .into();

        let seeds = harvest_seeds(tree.clone()).await.unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].component.name(), "Late");
        assert_eq!(seeds[0].props.get::<u32>("id"), Some(&7));
        assert_eq!(stringify(&seeds[0].result).unwrap(), "<p>hi</p>");

        // Without seed collection the same tree resolves in full.
        let full = harvest(tree).await.unwrap();
        assert_eq!(stringify(&full).unwrap(), "<div><p>hi</p></div>");
    }

    #[tokio::test]
    async fn test_nested_seeds_in_encounter_order() {
        let inner = ComponentDef::deferred("Inner", |_, _| async { Ok(Node::text("leaf")) });
        let outer = {
            let inner = inner.clone();
            ComponentDef::deferred("Outer", move |_, _| {
                let inner = inner.clone();
                async move { Ok(inner.node(Props::new())) }
            })
        };

        let seeds = harvest_seeds(outer.node(Props::new())).await.unwrap();
        let names: Vec<_> = seeds.iter().map(|s| s.component.name()).collect();
        assert_eq!(names, ["Outer", "Inner"]);
    }

    #[tokio::test]
    async fn test_sync_render_failure_rejects_harvest() {
        let broken = ComponentDef::function("Broken", |props| {
            props
                .get::<&str>("missing")
                .copied()
                .map(Node::text)
                .ok_or_else(|| anyhow::anyhow!("field 'missing' absent"))
        });
        let tree: Node = Element::new("div").child(broken.node(Props::new())).into();

        let err = harvest(tree).await.unwrap_err();
        assert!(matches!(err, HarvestError::Render(..)));
        assert!(err.to_string().contains("Broken"));
    }

    #[tokio::test]
    async fn test_async_rejection_rejects_harvest() {
        let failing =
            ComponentDef::deferred("Failing", |_, _| async { Err::<Node, _>(anyhow::anyhow!("boom")) });

        let err = harvest(failing.node(Props::new())).await.unwrap_err();
        assert!(matches!(err, HarvestError::Deferred(..)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_failing_sibling_does_not_cancel_others() {
        let finished = Arc::new(AtomicBool::new(false));
        let slow = {
            let finished = finished.clone();
            ComponentDef::deferred("Slow", move |_, _| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(Node::text("done"))
                }
            })
        };
        let failing =
            ComponentDef::deferred("Failing", |_, _| async { Err::<Node, _>(anyhow::anyhow!("boom")) });

        let tree: Node = Element::new("div")
            .child(failing.node(Props::new()))
            .child(slow.node(Props::new()))
            .into();

        assert!(harvest(tree).await.is_err());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_concurrent_components_resolve_independently() {
        let echo = ComponentDef::deferred("Echo", |props, _| async move {
            let label = props.get::<&str>("label").copied().unwrap();
            let delay = *props.get::<u64>("delay").unwrap();
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Node::text(label))
        });

        let tree: Node = Element::new("div")
            .child(
                Element::new("section")
                    .child(echo.node(Props::new().with("label", "deep").with("delay", 15u64))),
            )
            .child(echo.node(Props::new().with("label", "shallow").with("delay", 1u64)))
            .child(item("span", "static"))
            .into();

        let out = harvest(tree).await.unwrap();
        assert_eq!(
            stringify(&out).unwrap(),
            "<div><section>deep</section>shallow<span>static</span></div>"
        );
    }

    #[tokio::test]
    async fn test_is_harvesting_visible_to_components() {
        let observed = Arc::new(AtomicBool::new(false));
        let probe = {
            let observed = observed.clone();
            ComponentDef::function("Probe", move |_| {
                observed.store(is_harvesting(), Ordering::SeqCst);
                Ok(Node::Null)
            })
        };

        harvest(probe.node(Props::new())).await.unwrap();
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fragment_children_resolve_in_place() {
        let late = ComponentDef::deferred("Late", |_, _| async { Ok(Node::text("b")) });
        let tree = Node::fragment([
            Node::text("a"),
            late.node(Props::new()),
            Node::text("c"),
        ]);

        let out = harvest(tree).await.unwrap();
        assert_eq!(stringify(&out).unwrap(), "abc");
    }
}
