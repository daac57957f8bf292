//! Left-to-right layout along execution flow.

use super::parse_args;
use crate::{AgentResult, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::StateManager;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};

const DEFAULT_SPACING: f64 = 300.0;
const VERTICAL_SPACING: f64 = 150.0;

#[derive(Debug, Deserialize)]
struct AutoLayoutArgs {
    #[serde(default)]
    spacing: Option<f64>,
}

pub struct AutoLayout;

#[async_trait]
impl ToolHandler for AutoLayout {
    fn name(&self) -> &'static str {
        "auto_layout"
    }

    fn description(&self) -> &'static str {
        "Automatically arrange nodes in a left-to-right layout based on execution flow."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "spacing": { "type": "number", "description": "Horizontal spacing between nodes (default 300)" }
            }
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: AutoLayoutArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };
        if state.graph().nodes.is_empty() {
            return Ok(ToolResult::ok("No nodes to layout"));
        }
        let spacing = args.spacing.unwrap_or(DEFAULT_SPACING);

        let (moves, columns) = {
            let graph = state.graph();
            let levels = assign_levels(graph);

            // Group by level in node encounter order, then assign a column
            // per level and stack nodes vertically within it.
            let mut by_level: BTreeMap<usize, Vec<String>> = BTreeMap::new();
            for node in &graph.nodes {
                by_level
                    .entry(levels.get(node.id.as_str()).copied().unwrap_or(0))
                    .or_default()
                    .push(node.id.clone());
            }

            let columns = by_level.len();
            let mut moves = Vec::with_capacity(graph.nodes.len());
            for (level, node_ids) in by_level {
                let mut y = 100.0;
                for node_id in node_ids {
                    moves.push((node_id, 100.0 + level as f64 * spacing, y));
                    y += VERTICAL_SPACING;
                }
            }
            (moves, columns)
        };

        let deltas = state.move_nodes(&moves)?;
        Ok(ToolResult::ok_with(
            format!("Arranged {} nodes across {} columns", moves.len(), columns),
            deltas,
        ))
    }
}

/// Longest-path layering over a Kahn traversal. Nodes trapped in a cycle
/// never reach zero in-degree and keep level 0, same as disconnected nodes.
fn assign_levels(graph: &blueprint::Blueprint) -> HashMap<&str, usize> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    for node in &graph.nodes {
        outgoing.entry(node.id.as_str()).or_default();
        indegree.entry(node.id.as_str()).or_insert(0);
    }
    for conn in &graph.connections {
        let (source, target) = (conn.source_node_id.as_str(), conn.target_node_id.as_str());
        if indegree.contains_key(target) {
            if let Some(next) = outgoing.get_mut(source) {
                next.push(target);
                indegree.entry(target).and_modify(|d| *d += 1);
            }
        }
    }

    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&str> = graph
        .nodes
        .iter()
        .filter(|n| indegree[n.id.as_str()] == 0)
        .map(|n| n.id.as_str())
        .collect();
    if queue.is_empty() {
        queue.push_back(graph.nodes[0].id.as_str());
    }
    for root in &queue {
        levels.insert(*root, 0);
    }

    while let Some(current) = queue.pop_front() {
        let next_level = levels[current] + 1;
        for &target in &outgoing[current] {
            let level = levels.entry(target).or_insert(0);
            *level = (*level).max(next_level);
            if let Some(degree) = indegree.get_mut(target) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(target);
                }
            }
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ConnectPins, CreateNode};
    use pretty_assertions::assert_eq;

    async fn chain_of_three(state: &mut StateManager) -> Vec<String> {
        let args = json!({
            "title": "N", "category": "Test", "style": "Function",
            "inputPins": [{ "name": "Exec", "type": "Exec" }],
            "outputPins": [{ "name": "Exec", "type": "Exec" }]
        });
        for _ in 0..3 {
            CreateNode.execute(&args, state).await.unwrap();
        }
        let ids: Vec<String> = state.graph().nodes.iter().map(|n| n.id.clone()).collect();
        for pair in ids.windows(2) {
            ConnectPins
                .execute(
                    &json!({
                        "sourceNodeId": pair[0], "sourcePinName": "Exec",
                        "targetNodeId": pair[1], "targetPinName": "Exec"
                    }),
                    state,
                )
                .await
                .unwrap();
        }
        ids
    }

    #[tokio::test]
    async fn chain_is_laid_out_in_columns() {
        let mut state = StateManager::new();
        let ids = chain_of_three(&mut state).await;

        let result = AutoLayout.execute(&json!({}), &mut state).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Arranged 3 nodes across 3 columns");
        assert_eq!(result.deltas.len(), 3);

        let graph = state.graph();
        assert_eq!(graph.node(&ids[0]).unwrap().position_x, 100.0);
        assert_eq!(graph.node(&ids[1]).unwrap().position_x, 400.0);
        assert_eq!(graph.node(&ids[2]).unwrap().position_x, 700.0);
    }

    #[tokio::test]
    async fn custom_spacing_is_honored() {
        let mut state = StateManager::new();
        let ids = chain_of_three(&mut state).await;

        AutoLayout
            .execute(&json!({ "spacing": 500.0 }), &mut state)
            .await
            .unwrap();
        assert_eq!(state.graph().node(&ids[2]).unwrap().position_x, 1100.0);
    }

    #[tokio::test]
    async fn empty_graph_is_a_successful_noop() {
        let mut state = StateManager::new();
        let result = AutoLayout.execute(&json!({}), &mut state).await.unwrap();
        assert!(result.success);
        assert!(result.deltas.is_empty());
        assert_eq!(state.version(), 0);
    }
}
