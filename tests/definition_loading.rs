use std::io::Write;

use serde_json::json;

use skein_core::config::EngineConfig;
use skein_core::error::SkeinError;
use skein_engine::WorkflowDefinition;

const PIPELINE: &str = r#"
name = "scores"

[[nodes]]
name = "parse"
mode = "split"
backends = [{ type = "identity" }]

[[nodes]]
name = "scale"
backends = [{ type = "multiply", factor = 10 }, { type = "add", value = 1 }]

[[nodes]]
name = "collect"
mode = "batch"
backends = [{ type = "sum" }]
join = { type = "count", n = 3 }
merge = { type = "list" }

[[nodes]]
name = "big"
backends = [{ type = "identity" }]

[[nodes]]
name = "small"
backends = [{ type = "identity" }]

[[transitions]]
source = "parse"
target = "scale"

[[transitions]]
source = "scale"
target = "collect"

[[transitions]]
source = "collect"
target = "big"
condition = { type = "compare", node = "collect", op = "gt", value = 50 }

[[transitions]]
source = "collect"
target = "small"
condition = { type = "compare", node = "collect", op = "le", value = 50 }
"#;

fn load(content: &str) -> WorkflowDefinition {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(content.as_bytes()).expect("write toml");
    WorkflowDefinition::load(tmp.path()).expect("load definition")
}

#[tokio::test]
async fn test_definition_runs_sequentially() {
    let workflow = load(PIPELINE).build(EngineConfig::default()).unwrap();

    let results = workflow.run("parse", json!([1, 2, 3])).await.unwrap();
    assert_eq!(results.get("collect"), Some(&json!(63)));
    assert_eq!(results.get("big"), Some(&json!(63)));
    assert!(!results.contains("small"));
}

#[tokio::test]
async fn test_definition_runs_on_pool() {
    let workflow = load(PIPELINE).build(EngineConfig::default()).unwrap();

    let results = workflow
        .run_parallel("parse", json!([0, 1, 2]), Some(2))
        .await
        .unwrap();
    assert_eq!(results.get("collect"), Some(&json!(33)));
    assert_eq!(results.get("small"), Some(&json!(33)));
    assert!(!results.contains("big"));
}

#[tokio::test]
async fn test_failing_backend_surfaces_error() {
    let content = r#"
[[nodes]]
name = "a"
backends = [{ type = "fail", message = "upstream unavailable" }]
"#;
    let workflow = load(content).build(EngineConfig::default()).unwrap();

    let err = workflow.run("a", json!(null)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Backend execution failed: fail: upstream unavailable"
    );
}

#[test]
fn test_duplicate_node_rejected() {
    let content = r#"
[[nodes]]
name = "a"
backends = [{ type = "identity" }]

[[nodes]]
name = "a"
backends = [{ type = "length" }]
"#;
    let err = load(content).build(EngineConfig::default()).unwrap_err();
    assert!(err.is_graph_definition());
}

#[test]
fn test_unknown_backend_type_rejected() {
    let err = WorkflowDefinition::parse(
        "[[nodes]]\nname = \"a\"\nbackends = [{ type = \"teleport\" }]\n",
    )
    .unwrap_err();
    assert!(matches!(err, SkeinError::GraphDefinition(_)));
}
