//! The process-wide harvesting flag must be set for exactly the duration of
//! a top-level harvest and reset on both the success and the failure path.
//! This lives in its own test binary so no other test's harvest can overlap
//! with the observations below.

use karitori::{ComponentDef, Element, Node, Props, harvest, harvest_seeds, is_harvesting};

#[tokio::test]
async fn test_flag_spans_exactly_one_harvest() {
    assert!(!is_harvesting());

    let probe = ComponentDef::deferred("Probe", |_, _| async {
        assert!(is_harvesting());
        Ok(Node::text("ok"))
    });
    let tree: Node = Element::new("div").child(probe.node(Props::new())).into();

    harvest(tree.clone()).await.unwrap();
    assert!(!is_harvesting());

    // Failure path resets the flag as well.
    let failing = ComponentDef::function("Failing", |_| Err(anyhow::anyhow!("boom")));
    assert!(harvest(failing.node(Props::new())).await.is_err());
    assert!(!is_harvesting());

    // Same contract for the seed-collecting entry point.
    harvest_seeds(tree).await.unwrap();
    assert!(!is_harvesting());
}
