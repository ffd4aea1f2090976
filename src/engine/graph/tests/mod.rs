use super::PipelineGraph;
use crate::engine::run_context::RunContext;
use crate::error::{GraphError, TaskError};
use crate::task::Task;

use async_trait::async_trait;

struct EmptyTask;

#[async_trait]
impl Task for EmptyTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        Ok(())
    }
}

fn graph_with(ids: &[&str]) -> PipelineGraph {
    let mut graph = PipelineGraph::new("test_pipeline");
    for id in ids {
        graph.add_task(*id, EmptyTask, None).unwrap();
    }
    graph
}

#[test]
fn test_duplicate_task_rejected() {
    let mut graph = graph_with(&["a"]);

    let result = graph.add_task("a", EmptyTask, None);

    assert!(matches!(result, Err(GraphError::DuplicateTask(id)) if id == "a"));
    assert_eq!(graph.task_count(), 1);
}

#[test]
fn test_edge_requires_known_tasks() {
    let mut graph = graph_with(&["a"]);

    let unknown_upstream = graph.add_edge("ghost", "a");
    assert!(matches!(unknown_upstream, Err(GraphError::UnknownTask(id)) if id == "ghost"));

    let unknown_downstream = graph.add_edge("a", "ghost");
    assert!(matches!(unknown_downstream, Err(GraphError::UnknownTask(id)) if id == "ghost"));
}

#[test]
fn test_self_edge_rejected_as_cycle() {
    let mut graph = graph_with(&["a"]);

    let result = graph.add_edge("a", "a");

    assert!(matches!(result, Err(GraphError::Cycle(ids)) if ids == vec!["a".to_string()]));
}

#[test]
fn test_duplicate_edges_collapse() {
    let mut graph = graph_with(&["a", "b"]);
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("a", "b").unwrap();
    graph.finalize().unwrap();

    assert_eq!(graph.upstreams_of("b").unwrap().len(), 1);
    assert_eq!(graph.execution_order().unwrap(), &["a", "b"]);
}

#[test]
fn test_finalize_computes_lexicographic_order() {
    // Diamond: a -> b, a -> c, b -> d, c -> d
    let mut graph = graph_with(&["d", "c", "b", "a"]);
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("a", "c").unwrap();
    graph.add_edge("b", "d").unwrap();
    graph.add_edge("c", "d").unwrap();

    graph.finalize().unwrap();

    assert_eq!(graph.execution_order().unwrap(), &["a", "b", "c", "d"]);
}

#[test]
fn test_independent_tasks_order_lexicographically() {
    let mut graph = graph_with(&["zeta", "alpha", "mid"]);
    graph.finalize().unwrap();

    assert_eq!(graph.execution_order().unwrap(), &["alpha", "mid", "zeta"]);
}

#[test]
fn test_cycle_detected_with_offending_tasks() {
    let mut graph = graph_with(&["a", "b", "c", "standalone"]);
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", "c").unwrap();
    graph.add_edge("c", "a").unwrap();

    let result = graph.finalize();

    match result {
        Err(GraphError::Cycle(ids)) => {
            assert_eq!(ids, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        }
        other => panic!("expected cycle error, got {:?}", other.err()),
    }
}

#[test]
fn test_failed_finalize_leaves_graph_unfrozen() {
    let mut graph = graph_with(&["a", "b"]);
    graph.add_edge("a", "b").unwrap();
    graph.add_edge("b", "a").unwrap();

    assert!(graph.finalize().is_err());
    assert!(!graph.is_finalized());

    // Still mutable after the failed finalize
    graph.add_task("c", EmptyTask, None).unwrap();
}

#[test]
fn test_frozen_graph_rejects_mutation() {
    let mut graph = graph_with(&["a", "b"]);
    graph.add_edge("a", "b").unwrap();
    graph.finalize().unwrap();

    assert!(matches!(
        graph.add_task("c", EmptyTask, None),
        Err(GraphError::Frozen)
    ));
    assert!(matches!(graph.add_edge("a", "b"), Err(GraphError::Frozen)));
}

#[test]
fn test_finalize_is_idempotent() {
    let mut graph = graph_with(&["a", "b"]);
    graph.add_edge("a", "b").unwrap();

    graph.finalize().unwrap();
    graph.finalize().unwrap();

    assert!(graph.is_finalized());
    assert_eq!(graph.execution_order().unwrap(), &["a", "b"]);
}

#[test]
fn test_adjacency_accessors() {
    let mut graph = graph_with(&["a", "b", "c"]);
    graph.add_edge("a", "c").unwrap();
    graph.add_edge("b", "c").unwrap();

    // Not available before finalize
    assert!(graph.upstreams_of("c").is_none());

    graph.finalize().unwrap();

    let upstreams: Vec<&str> = graph
        .upstreams_of("c")
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(upstreams, vec!["a", "b"]);

    let downstreams: Vec<&str> = graph
        .downstreams_of("a")
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(downstreams, vec!["c"]);
    assert!(graph.upstreams_of("a").unwrap().is_empty());
}

#[test]
fn test_empty_graph_finalizes() {
    let mut graph = PipelineGraph::new("empty");
    graph.finalize().unwrap();

    assert!(graph.is_finalized());
    assert!(graph.execution_order().unwrap().is_empty());
}
