//! Staged pipeline topology.
//!
//! A topology is an ordered sequence of stages. Every stage is a group of
//! parallel vertex instances, and every instance of a non-final stage is
//! connected to instances of the next stage by an ordered list of forward
//! edges. Once built it is immutable and shared read-only by any number of
//! profiling cycles.

use std::sync::Arc;

use tributary_core::{EdgeId, VertexId};
use tributary_qos::{EdgeCharacteristics, VertexStatistics};

use crate::error::{TopologyError, TopologyResult};

/// A forward edge from an output gate of one instance to an input gate of an
/// instance in the next stage
#[derive(Debug, Clone)]
pub struct ForwardEdge {
    pub(crate) id: EdgeId,
    pub(crate) source_member: usize,
    pub(crate) output_gate: usize,
    pub(crate) target_member: usize,
    pub(crate) input_gate: usize,
    pub(crate) characteristics: Arc<EdgeCharacteristics>,
}

impl ForwardEdge {
    /// Edge identity
    #[must_use]
    pub const fn id(&self) -> EdgeId {
        self.id
    }

    /// Index of the source instance within its stage
    #[must_use]
    pub const fn source_member(&self) -> usize {
        self.source_member
    }

    /// Output gate of the source instance
    #[must_use]
    pub const fn output_gate(&self) -> usize {
        self.output_gate
    }

    /// Index of the target instance within the next stage
    #[must_use]
    pub const fn target_member(&self) -> usize {
        self.target_member
    }

    /// Input gate of the target instance
    #[must_use]
    pub const fn input_gate(&self) -> usize {
        self.input_gate
    }

    /// Latency characteristics, shared with the channel instrumentation
    #[must_use]
    pub fn characteristics(&self) -> &Arc<EdgeCharacteristics> {
        &self.characteristics
    }

    /// Whether the edge carries traffic
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.characteristics.is_active()
    }
}

/// One parallel instance of a stage
#[derive(Debug, Clone)]
pub struct VertexInstance {
    pub(crate) id: VertexId,
    pub(crate) stage: usize,
    pub(crate) member: usize,
    pub(crate) statistics: Arc<VertexStatistics>,
    pub(crate) forward_edges: Vec<ForwardEdge>,
}

impl VertexInstance {
    /// Vertex identity
    #[must_use]
    pub const fn id(&self) -> VertexId {
        self.id
    }

    /// Stage index
    #[must_use]
    pub const fn stage(&self) -> usize {
        self.stage
    }

    /// Index within the stage's group
    #[must_use]
    pub const fn member(&self) -> usize {
        self.member
    }

    /// Latency statistics, shared with the task instrumentation
    #[must_use]
    pub fn statistics(&self) -> &Arc<VertexStatistics> {
        &self.statistics
    }

    /// Ordered forward edges into the next stage
    #[must_use]
    pub fn forward_edges(&self) -> &[ForwardEdge] {
        &self.forward_edges
    }

    /// Whether the vertex carries traffic
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.statistics.is_active()
    }
}

/// A group of parallel vertex instances
#[derive(Debug, Clone)]
pub struct Stage {
    pub(crate) name: String,
    pub(crate) members: Vec<VertexInstance>,
}

impl Stage {
    /// Stage name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group members in index order
    #[must_use]
    pub fn members(&self) -> &[VertexInstance] {
        &self.members
    }

    /// Group size
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// An immutable staged topology
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) stages: Vec<Stage>,
    pub(crate) include_start_vertex: bool,
    pub(crate) include_end_vertex: bool,
}

impl Topology {
    /// Number of stages
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stages.len()
    }

    /// All stages in order
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage by index
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// Vertex instance by stage and member index
    #[must_use]
    pub fn vertex(&self, stage: usize, member: usize) -> Option<&VertexInstance> {
        self.stages.get(stage).and_then(|s| s.members.get(member))
    }

    /// Whether first-stage vertices take part in activity filtering and
    /// latency accounting
    #[must_use]
    pub const fn include_start_vertex(&self) -> bool {
        self.include_start_vertex
    }

    /// Whether last-stage vertices take part in activity filtering and
    /// latency accounting
    #[must_use]
    pub const fn include_end_vertex(&self) -> bool {
        self.include_end_vertex
    }

    /// Whether the vertex at `depth` must be active for a path through it to
    /// be active
    #[must_use]
    pub fn is_vertex_included(&self, depth: usize) -> bool {
        if depth == 0 {
            self.include_start_vertex
        } else if depth + 1 == self.depth() {
            self.include_end_vertex
        } else {
            true
        }
    }

    /// Number of choices at each path depth
    ///
    /// Depth 0 chooses among the first stage's members; depth `i` chooses
    /// among the forward edges of the vertex picked at depth `i - 1`.
    #[must_use]
    pub fn fan_out(&self, depth: usize) -> usize {
        match depth {
            0 => self.stages.first().map_or(0, Stage::len),
            _ => self
                .stages
                .get(depth - 1)
                .and_then(|s| s.members.first())
                .map_or(0, |v| v.forward_edges.len()),
        }
    }

    /// Number of vertex instances over all stages
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    /// Number of forward edges over all stages
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.members.iter())
            .map(|v| v.forward_edges.len())
            .sum()
    }

    /// Check the structural contract the profiling cycle relies on
    ///
    /// # Errors
    ///
    /// Returns the first violation found: fewer than two stages, an empty
    /// stage, a stage name used twice, members of one stage with differing
    /// fan-out, or a forward edge
    /// that leaves the last stage or targets a member that does not exist.
    pub fn validate(&self) -> TopologyResult<()> {
        let depth = self.depth();
        if depth < 2 {
            return Err(TopologyError::DepthTooSmall { depth });
        }

        for (stage_index, stage) in self.stages.iter().enumerate() {
            if stage.is_empty() {
                return Err(TopologyError::EmptyStage { stage: stage_index });
            }
            if let Some(first) = self.stages[..stage_index].iter().position(|s| s.name == stage.name) {
                return Err(TopologyError::DuplicateStageName {
                    stage: stage_index,
                    first,
                    name: stage.name.clone(),
                });
            }

            let Some(next) = self.stages.get(stage_index + 1) else {
                if stage.members.iter().any(|v| !v.forward_edges.is_empty()) {
                    return Err(TopologyError::StageOutOfRange { stage: stage_index });
                }
                continue;
            };

            let expected = stage.members[0].forward_edges.len();
            for vertex in &stage.members {
                if vertex.forward_edges.len() != expected {
                    return Err(TopologyError::InconsistentFanOut {
                        stage: stage_index,
                        member: vertex.member,
                        expected,
                        found: vertex.forward_edges.len(),
                    });
                }
                for edge in &vertex.forward_edges {
                    if edge.target_member >= next.len() {
                        return Err(TopologyError::TargetOutOfRange {
                            stage: stage_index + 1,
                            member: edge.target_member,
                            size: next.len(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TopologyBuilder;

    #[test]
    fn test_topology_accessors() {
        let topology = TopologyBuilder::new()
            .with_stage("source", 2)
            .with_stage("map", 3)
            .with_stage("sink", 1)
            .with_all_to_all(0)
            .with_all_to_all(1)
            .build()
            .unwrap();

        assert_eq!(topology.depth(), 3);
        assert_eq!(topology.vertex_count(), 6);
        assert_eq!(topology.edge_count(), 2 * 3 + 3);
        assert_eq!(topology.fan_out(0), 2);
        assert_eq!(topology.fan_out(1), 3);
        assert_eq!(topology.fan_out(2), 1);
        assert_eq!(topology.stage(1).unwrap().name(), "map");

        let vertex = topology.vertex(1, 2).unwrap();
        assert_eq!(vertex.stage(), 1);
        assert_eq!(vertex.member(), 2);
        assert_eq!(vertex.forward_edges()[0].target_member(), 0);
        assert!(topology.vertex(3, 0).is_none());
    }

    #[test]
    fn test_vertex_inclusion() {
        let topology = TopologyBuilder::new()
            .with_stage("a", 1)
            .with_stage("b", 1)
            .with_stage("c", 1)
            .with_pointwise(0)
            .with_pointwise(1)
            .with_endpoints(false, true)
            .build()
            .unwrap();

        assert!(!topology.is_vertex_included(0));
        assert!(topology.is_vertex_included(1));
        assert!(topology.is_vertex_included(2));
    }

    #[test]
    fn test_fresh_topology_is_inactive() {
        let topology = TopologyBuilder::new()
            .with_stage("a", 1)
            .with_stage("b", 1)
            .with_pointwise(0)
            .build()
            .unwrap();

        let vertex = topology.vertex(0, 0).unwrap();
        assert!(!vertex.is_active());
        assert!(!vertex.forward_edges()[0].is_active());
    }

    #[test]
    fn test_validate_catches_tampered_fan_out() {
        let mut topology = TopologyBuilder::new()
            .with_stage("a", 2)
            .with_stage("b", 2)
            .with_all_to_all(0)
            .build()
            .unwrap();

        topology.stages[0].members[1].forward_edges.pop();
        assert_eq!(
            topology.validate(),
            Err(TopologyError::InconsistentFanOut {
                stage: 0,
                member: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_validate_catches_tampered_target() {
        let mut topology = TopologyBuilder::new()
            .with_stage("a", 1)
            .with_stage("b", 1)
            .with_pointwise(0)
            .build()
            .unwrap();

        topology.stages[0].members[0].forward_edges[0].target_member = 4;
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::TargetOutOfRange { stage: 1, member: 4, size: 1 })
        ));
    }
}
