//! Unique identifiers for Tributary entities.
//!
//! Vertices and edges of a monitored pipeline segment are usually named by the
//! job graph layer, so both support name-based (v5) construction next to the
//! random (v4) one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vertex identifier - identifies one parallel instance of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(Uuid);

impl VertexId {
    /// Create a new random VertexId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create from name (for named vertices)
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for VertexId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vtx_{}", self.0)
    }
}

/// Edge identifier - identifies a forward edge between two vertex instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Create a new random EdgeId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from name (for named edges)
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
    }

    /// Edge id derived from its two endpoints and gates
    #[must_use]
    pub fn between(source: VertexId, output_gate: usize, target: VertexId, input_gate: usize) -> Self {
        let mut name = Vec::with_capacity(48);
        name.extend_from_slice(source.as_bytes());
        name.extend_from_slice(&(output_gate as u64).to_be_bytes());
        name.extend_from_slice(target.as_bytes());
        name.extend_from_slice(&(input_gate as u64).to_be_bytes());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, &name))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edge_{}", self.0)
    }
}

/// Task identifier - identifies a running task on a task manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new random TaskId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_id_creation() {
        assert_ne!(VertexId::new(), VertexId::new());
        assert_ne!(EdgeId::new(), EdgeId::new());
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn test_id_from_bytes() {
        let bytes = [7u8; 16];
        let id = VertexId::from_bytes(bytes);
        assert_eq!(id.as_bytes(), &bytes);
    }

    #[test]
    fn test_id_display() {
        assert!(VertexId::new().to_string().starts_with("vtx_"));
        assert!(EdgeId::new().to_string().starts_with("edge_"));
        assert!(TaskId::new().to_string().starts_with("task_"));
    }

    #[test]
    fn test_vertex_id_from_name() {
        let id1 = VertexId::from_name("map.0");
        let id2 = VertexId::from_name("map.0");
        assert_eq!(id1, id2);
        assert_ne!(id1, VertexId::from_name("map.1"));
    }

    #[test]
    fn test_edge_id_between() {
        let a = VertexId::from_name("source.0");
        let b = VertexId::from_name("map.0");

        assert_eq!(EdgeId::between(a, 0, b, 0), EdgeId::between(a, 0, b, 0));
        assert_ne!(EdgeId::between(a, 0, b, 0), EdgeId::between(a, 1, b, 0));
        assert_ne!(EdgeId::between(a, 0, b, 0), EdgeId::between(b, 0, a, 0));
    }

    proptest::proptest! {
        #[test]
        fn prop_edge_id_distinguishes_gates(
            output_gate in 0usize..1024,
            input_gate in 0usize..1024,
            other_gate in 0usize..1024,
        ) {
            let a = VertexId::from_name("a.0");
            let b = VertexId::from_name("b.0");
            let id = EdgeId::between(a, output_gate, b, input_gate);

            prop_assert_eq!(id, EdgeId::between(a, output_gate, b, input_gate));
            if other_gate != output_gate {
                prop_assert_ne!(id, EdgeId::between(a, other_gate, b, input_gate));
            }
            if other_gate != input_gate {
                prop_assert_ne!(id, EdgeId::between(a, output_gate, b, other_gate));
            }
        }
    }
}
