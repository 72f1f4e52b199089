//! Workflow metadata filtering.
//!
//! Node-graph generators store their pipeline as a JSON document in a PNG
//! text chunk named `workflow`:
//!
//! ```json
//! { "last_node_id": 9, "nodes": [ { "id": 3, "type": "KSampler", ... }, ... ], "links": [...] }
//! ```
//!
//! Some node types break tools that re-import the graph, so they are dropped
//! before the workflow is copied into the converted file. Filtering is best
//! effort: anything that does not look like a workflow passes through
//! untouched.

use serde_json::Value;

/// Node type removed from preserved workflows.
pub const EXCLUDED_NODE_TYPE: &str = "LoraInfo";

/// Text-chunk key holding the workflow JSON.
pub const WORKFLOW_KEY: &str = "workflow";

/// Result of [`filter_workflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredWorkflow {
    pub text: String,
    /// True when at least one node was removed.
    pub modified: bool,
}

impl FilteredWorkflow {
    fn unchanged(raw: &str) -> Self {
        Self {
            text: raw.to_string(),
            modified: false,
        }
    }
}

/// Remove every node of type [`EXCLUDED_NODE_TYPE`] from a workflow document.
///
/// Invalid JSON, a non-object root, or a missing/non-array `nodes` field
/// returns the raw text unchanged and logs a warning. Key order of the
/// document is preserved on re-serialization.
pub fn filter_workflow(raw: &str) -> FilteredWorkflow {
    let mut doc: Value = match serde_json::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("workflow is not valid JSON, keeping it verbatim: {e}");
            return FilteredWorkflow::unchanged(raw);
        }
    };

    let Some(nodes) = doc.get_mut("nodes").and_then(Value::as_array_mut) else {
        tracing::warn!("workflow has no `nodes` array, keeping it verbatim");
        return FilteredWorkflow::unchanged(raw);
    };

    let before = nodes.len();
    nodes.retain(|node| node.get("type").and_then(Value::as_str) != Some(EXCLUDED_NODE_TYPE));
    let removed = before - nodes.len();

    if removed == 0 {
        return FilteredWorkflow::unchanged(raw);
    }

    match serde_json::to_string(&doc) {
        Ok(text) => {
            tracing::debug!(removed, "dropped {EXCLUDED_NODE_TYPE} nodes from workflow");
            FilteredWorkflow {
                text,
                modified: true,
            }
        }
        Err(e) => {
            tracing::warn!("could not re-serialize filtered workflow: {e}");
            FilteredWorkflow::unchanged(raw)
        }
    }
}
