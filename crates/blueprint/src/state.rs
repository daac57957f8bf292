//! Versioned state engine with full-snapshot undo/redo.
//!
//! Every mutating operation follows the same protocol: push a serialized
//! snapshot of the current graph onto the undo stack (clearing redo), apply
//! the mutation, bump the version, and return the [`Delta`] describing
//! exactly that mutation. Validation happens before the snapshot so a failed
//! operation leaves the stacks untouched.
//!
//! Snapshots are full serde_json serializations; structural diffs were
//! considered and rejected for now (interactive-scale graphs, see DESIGN.md).

use crate::error::{StateError, StateResult};
use crate::model::{Blueprint, Comment, Connection, Delta, Node, Variable};

#[derive(Debug, Default)]
pub struct StateManager {
    current: Blueprint,
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Blueprint {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    /// A `FullSync` delta carrying the complete graph at its current version,
    /// used for connect-time reconciliation. Does not mutate anything.
    pub fn full_sync(&self) -> Delta {
        Delta::FullSync {
            full_state: self.current.clone(),
            version: self.current.version,
        }
    }

    fn save_snapshot(&mut self) -> StateResult<()> {
        self.undo_stack.push(serde_json::to_string(&self.current)?);
        self.redo_stack.clear();
        Ok(())
    }

    /// Replace the graph's contents in place from a deserialized snapshot.
    /// The running version counter is deliberately not restored.
    fn restore(&mut self, snapshot: Blueprint) {
        self.current.name = snapshot.name;
        self.current.nodes = snapshot.nodes;
        self.current.connections = snapshot.connections;
        self.current.comments = snapshot.comments;
        self.current.variables = snapshot.variables;
    }

    pub fn add_node(&mut self, node: Node) -> StateResult<Delta> {
        self.save_snapshot()?;
        self.current.nodes.push(node.clone());
        self.current.version += 1;
        Ok(Delta::NodeAdded {
            node,
            version: self.current.version,
        })
    }

    /// Remove a node and every connection touching it. Connection removals
    /// are emitted first, in encounter order, each with its own version; the
    /// node removal delta comes last. The whole cascade is one undo unit.
    pub fn remove_node(&mut self, node_id: &str) -> StateResult<Vec<Delta>> {
        if self.current.node(node_id).is_none() {
            return Err(StateError::NodeNotFound(node_id.to_string()));
        }
        self.save_snapshot()?;

        let mut deltas = Vec::new();
        let touching: Vec<String> = self
            .current
            .connections
            .iter()
            .filter(|c| c.touches_node(node_id))
            .map(|c| c.id.clone())
            .collect();

        for conn_id in touching {
            self.current.connections.retain(|c| c.id != conn_id);
            self.current.version += 1;
            deltas.push(Delta::ConnectionRemoved {
                removed_id: conn_id,
                version: self.current.version,
            });
        }

        self.current.nodes.retain(|n| n.id != node_id);
        self.current.version += 1;
        deltas.push(Delta::NodeRemoved {
            removed_id: node_id.to_string(),
            version: self.current.version,
        });
        Ok(deltas)
    }

    /// Replace a node wholesale, matched by id.
    pub fn update_node(&mut self, node: Node) -> StateResult<Delta> {
        let index = self
            .current
            .nodes
            .iter()
            .position(|n| n.id == node.id)
            .ok_or_else(|| StateError::NodeNotFound(node.id.clone()))?;
        self.save_snapshot()?;
        self.current.nodes[index] = node.clone();
        self.current.version += 1;
        Ok(Delta::NodeUpdated {
            node,
            version: self.current.version,
        })
    }

    /// Add a connection between two existing pins, marking both as connected.
    /// Dangling references are rejected before anything is touched.
    pub fn add_connection(&mut self, connection: Connection) -> StateResult<Delta> {
        self.pin_exists(
            &connection.source_node_id,
            &connection.source_pin_id,
        )?;
        self.pin_exists(
            &connection.target_node_id,
            &connection.target_pin_id,
        )?;
        self.save_snapshot()?;

        self.set_pin_connected(&connection.source_node_id, &connection.source_pin_id, true);
        self.set_pin_connected(&connection.target_node_id, &connection.target_pin_id, true);
        self.current.connections.push(connection.clone());
        self.current.version += 1;
        Ok(Delta::ConnectionAdded {
            connection,
            version: self.current.version,
        })
    }

    /// Remove a single connection and recompute the connected flags of the
    /// two pins it joined.
    pub fn remove_connection(&mut self, connection_id: &str) -> StateResult<Delta> {
        let conn = self
            .current
            .connection(connection_id)
            .cloned()
            .ok_or_else(|| StateError::ConnectionNotFound(connection_id.to_string()))?;
        self.save_snapshot()?;

        self.current.connections.retain(|c| c.id != connection_id);

        let source_still = self
            .current
            .connections
            .iter()
            .any(|c| c.source_pin_id == conn.source_pin_id);
        let target_still = self
            .current
            .connections
            .iter()
            .any(|c| c.target_pin_id == conn.target_pin_id);
        self.set_pin_connected(&conn.source_node_id, &conn.source_pin_id, source_still);
        self.set_pin_connected(&conn.target_node_id, &conn.target_pin_id, target_still);

        self.current.version += 1;
        Ok(Delta::ConnectionRemoved {
            removed_id: conn.id,
            version: self.current.version,
        })
    }

    pub fn add_comment(&mut self, comment: Comment) -> StateResult<Delta> {
        self.save_snapshot()?;
        self.current.comments.push(comment.clone());
        self.current.version += 1;
        Ok(Delta::CommentAdded {
            comment,
            version: self.current.version,
        })
    }

    pub fn remove_comment(&mut self, comment_id: &str) -> StateResult<Delta> {
        if !self.current.comments.iter().any(|c| c.id == comment_id) {
            return Err(StateError::CommentNotFound(comment_id.to_string()));
        }
        self.save_snapshot()?;
        self.current.comments.retain(|c| c.id != comment_id);
        self.current.version += 1;
        Ok(Delta::CommentRemoved {
            removed_id: comment_id.to_string(),
            version: self.current.version,
        })
    }

    pub fn add_variable(&mut self, variable: Variable) -> StateResult<Delta> {
        self.save_snapshot()?;
        self.current.variables.push(variable.clone());
        self.current.version += 1;
        Ok(Delta::VariableAdded {
            variable,
            version: self.current.version,
        })
    }

    pub fn remove_variable(&mut self, variable_id: &str) -> StateResult<Delta> {
        if !self.current.variables.iter().any(|v| v.id == variable_id) {
            return Err(StateError::VariableNotFound(variable_id.to_string()));
        }
        self.save_snapshot()?;
        self.current.variables.retain(|v| v.id != variable_id);
        self.current.version += 1;
        Ok(Delta::VariableRemoved {
            removed_id: variable_id.to_string(),
            version: self.current.version,
        })
    }

    /// Reposition a batch of nodes (layout pass). One undo unit, one
    /// `NodeUpdated` delta per node in the given order.
    pub fn move_nodes(&mut self, moves: &[(String, f64, f64)]) -> StateResult<Vec<Delta>> {
        for (node_id, _, _) in moves {
            if self.current.node(node_id).is_none() {
                return Err(StateError::NodeNotFound(node_id.clone()));
            }
        }
        self.save_snapshot()?;

        let mut deltas = Vec::with_capacity(moves.len());
        for (node_id, x, y) in moves {
            if let Some(node) = self.current.nodes.iter_mut().find(|n| n.id == *node_id) {
                node.position_x = *x;
                node.position_y = *y;
                let node = node.clone();
                self.current.version += 1;
                deltas.push(Delta::NodeUpdated {
                    node,
                    version: self.current.version,
                });
            }
        }
        Ok(deltas)
    }

    /// Replace the whole graph contents (external import). One undo unit,
    /// one `FullSync` delta.
    pub fn replace_contents(&mut self, imported: Blueprint) -> StateResult<Delta> {
        self.save_snapshot()?;
        self.restore(imported);
        self.current.version += 1;
        Ok(self.full_sync())
    }

    /// Pop the undo stack and restore that snapshot in place. Returns `None`
    /// on an empty stack. The version counter always moves forward.
    pub fn undo(&mut self) -> StateResult<Option<Delta>> {
        let Some(snapshot) = self.undo_stack.pop() else {
            return Ok(None);
        };
        self.redo_stack.push(serde_json::to_string(&self.current)?);
        let restored: Blueprint = serde_json::from_str(&snapshot)?;
        self.restore(restored);
        self.current.version += 1;
        Ok(Some(self.full_sync()))
    }

    /// Mirror of [`Self::undo`].
    pub fn redo(&mut self) -> StateResult<Option<Delta>> {
        let Some(snapshot) = self.redo_stack.pop() else {
            return Ok(None);
        };
        self.undo_stack.push(serde_json::to_string(&self.current)?);
        let restored: Blueprint = serde_json::from_str(&snapshot)?;
        self.restore(restored);
        self.current.version += 1;
        Ok(Some(self.full_sync()))
    }

    fn pin_exists(&self, node_id: &str, pin_id: &str) -> StateResult<()> {
        let node = self
            .current
            .node(node_id)
            .ok_or_else(|| StateError::NodeNotFound(node_id.to_string()))?;
        let found = node
            .input_pins
            .iter()
            .chain(node.output_pins.iter())
            .any(|p| p.id == pin_id);
        if found {
            Ok(())
        } else {
            Err(StateError::PinNotFound {
                node: node_id.to_string(),
                pin: pin_id.to_string(),
            })
        }
    }

    fn set_pin_connected(&mut self, node_id: &str, pin_id: &str, connected: bool) {
        if let Some(node) = self.current.nodes.iter_mut().find(|n| n.id == node_id) {
            if let Some(pin) = node
                .input_pins
                .iter_mut()
                .chain(node.output_pins.iter_mut())
                .find(|p| p.id == pin_id)
            {
                pin.is_connected = connected;
            }
        }
    }
}
