//! Builder for staged topologies.
//!
//! Connections are collected first and resolved in [`TopologyBuilder::build`],
//! which reports every contract violation instead of repairing it.

use std::sync::Arc;

use tributary_core::{EdgeId, QosConfig, VertexId, DEFAULT_STATISTICS_WINDOW_SIZE};
use tributary_qos::{EdgeCharacteristics, VertexStatistics};

use crate::error::{TopologyError, TopologyResult};
use crate::topology::{ForwardEdge, Stage, Topology, VertexInstance};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Connection {
    Edge {
        stage: usize,
        source: usize,
        output_gate: usize,
        target: usize,
        input_gate: usize,
    },
    AllToAll(usize),
    Pointwise(usize),
}

/// Builder for a [`Topology`]
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    stages: Vec<(String, usize)>,
    connections: Vec<Connection>,
    include_start_vertex: bool,
    include_end_vertex: bool,
    window_size: usize,
}

impl TopologyBuilder {
    /// Create an empty builder
    ///
    /// Endpoint flags default to excluding the start vertex and including
    /// the end vertex.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            connections: Vec::new(),
            include_start_vertex: false,
            include_end_vertex: true,
            window_size: DEFAULT_STATISTICS_WINDOW_SIZE,
        }
    }

    /// Create a builder taking endpoint flags and window size from a config
    #[must_use]
    pub fn from_config(config: &QosConfig) -> Self {
        Self::new()
            .with_endpoints(config.include_start_vertex, config.include_end_vertex)
            .with_window_size(config.statistics_window_size)
    }

    /// Append a stage of `parallelism` vertex instances
    #[must_use]
    pub fn with_stage(mut self, name: impl Into<String>, parallelism: usize) -> Self {
        self.stages.push((name.into(), parallelism));
        self
    }

    /// Set the endpoint include flags
    #[must_use]
    pub fn with_endpoints(mut self, include_start_vertex: bool, include_end_vertex: bool) -> Self {
        self.include_start_vertex = include_start_vertex;
        self.include_end_vertex = include_end_vertex;
        self
    }

    /// Set the sliding window capacity of all created statistics
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Add one forward edge from `source` in `stage` to `target` in `stage + 1`
    ///
    /// Edges of one source keep the order in which they are added.
    #[must_use]
    pub fn with_edge(
        mut self,
        stage: usize,
        source: usize,
        output_gate: usize,
        target: usize,
        input_gate: usize,
    ) -> Self {
        self.connections.push(Connection::Edge {
            stage,
            source,
            output_gate,
            target,
            input_gate,
        });
        self
    }

    /// Connect every member of `stage` to every member of `stage + 1`
    #[must_use]
    pub fn with_all_to_all(mut self, stage: usize) -> Self {
        self.connections.push(Connection::AllToAll(stage));
        self
    }

    /// Connect member `m` of `stage` to member `m mod n` of `stage + 1`
    #[must_use]
    pub fn with_pointwise(mut self, stage: usize) -> Self {
        self.connections.push(Connection::Pointwise(stage));
        self
    }

    fn successor_size(&self, stage: usize) -> TopologyResult<usize> {
        stage
            .checked_add(1)
            .and_then(|next| self.stages.get(next))
            .map(|(_, size)| *size)
            .ok_or(TopologyError::StageOutOfRange { stage })
    }

    fn resolve(&self) -> TopologyResult<Vec<(usize, usize, usize, usize, usize)>> {
        let mut edges = Vec::new();
        for connection in &self.connections {
            match *connection {
                Connection::Edge {
                    stage,
                    source,
                    output_gate,
                    target,
                    input_gate,
                } => {
                    let next = self.successor_size(stage)?;
                    let size = self.stages[stage].1;
                    if source >= size {
                        return Err(TopologyError::SourceOutOfRange {
                            stage,
                            member: source,
                            size,
                        });
                    }
                    if target >= next {
                        return Err(TopologyError::TargetOutOfRange {
                            stage: stage + 1,
                            member: target,
                            size: next,
                        });
                    }
                    edges.push((stage, source, output_gate, target, input_gate));
                }
                Connection::AllToAll(stage) => {
                    let next = self.successor_size(stage)?;
                    for source in 0..self.stages[stage].1 {
                        for target in 0..next {
                            edges.push((stage, source, 0, target, 0));
                        }
                    }
                }
                Connection::Pointwise(stage) => {
                    let next = self.successor_size(stage)?;
                    if next == 0 {
                        return Err(TopologyError::EmptyStage { stage: stage + 1 });
                    }
                    for source in 0..self.stages[stage].1 {
                        edges.push((stage, source, 0, source % next, 0));
                    }
                }
            }
        }
        Ok(edges)
    }

    /// Build and validate the topology
    ///
    /// # Errors
    ///
    /// Returns error on fewer than two stages, empty stages, two stages with
    /// the same name, connections that reference missing stages or members,
    /// or members of one stage with differing fan-out.
    pub fn build(self) -> TopologyResult<Topology> {
        let edges = self.resolve()?;

        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .enumerate()
            .map(|(stage_index, (name, parallelism))| Stage {
                name: name.clone(),
                members: (0..*parallelism)
                    .map(|member| {
                        let id = VertexId::from_name(&format!("{}.{}", name, member));
                        VertexInstance {
                            id,
                            stage: stage_index,
                            member,
                            statistics: Arc::new(VertexStatistics::with_window_size(id, self.window_size)),
                            forward_edges: Vec::new(),
                        }
                    })
                    .collect(),
            })
            .collect();

        for (stage, source, output_gate, target, input_gate) in edges {
            let source_id = stages[stage].members[source].id;
            let target_id = stages[stage + 1].members[target].id;
            let id = EdgeId::between(source_id, output_gate, target_id, input_gate);
            stages[stage].members[source].forward_edges.push(ForwardEdge {
                id,
                source_member: source,
                output_gate,
                target_member: target,
                input_gate,
                characteristics: Arc::new(EdgeCharacteristics::with_window_size(id, self.window_size)),
            });
        }

        let topology = Topology {
            stages,
            include_start_vertex: self.include_start_vertex,
            include_end_vertex: self.include_end_vertex,
        };
        topology.validate()?;

        tracing::debug!(
            depth = topology.depth(),
            vertices = topology.vertex_count(),
            edges = topology.edge_count(),
            "topology built"
        );
        Ok(topology)
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
