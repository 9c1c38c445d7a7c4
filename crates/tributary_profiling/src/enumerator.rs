//! Active path enumeration over a staged topology.
//!
//! An active path picks one vertex per stage, joined by forward edges, such
//! that every edge is active and every vertex is active unless it is an
//! endpoint excluded by the topology's include flags. Paths are produced in
//! depth-first order: the first stage's members in index order, then each
//! vertex's forward edges in list order.
//!
//! The search keeps an explicit stack of frames, one per depth, each holding
//! the index of the branch it currently tries. A fresh search starts with a
//! single frame at depth 0; resuming after a found path drops the deepest
//! vertex and lets the deepest frame try its next branch. Both run through
//! the same loop, which pops a frame once its branches are exhausted and
//! moves its parent on to the next branch.

use tributary_topology::{ForwardEdge, Topology, VertexInstance};

use crate::error::{ProfilingError, ProfilingResult};

/// Search state of one depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    depth: usize,
    /// Branch currently tried, `None` before the first one
    choice: Option<usize>,
}

impl Frame {
    const fn fresh(depth: usize) -> Self {
        Self { depth, choice: None }
    }
}

/// Number of entries in the latency decomposition of a path through a
/// topology of `depth` stages
///
/// One entry per included vertex plus two per edge (output buffer latency
/// and remaining channel latency). Topologies too shallow to hold an
/// excluded endpoint yield zero rather than underflowing.
#[must_use]
pub fn decomposition_len(depth: usize, include_start_vertex: bool, include_end_vertex: bool) -> usize {
    let mut len = 2 * depth.saturating_sub(1) + depth;
    if !include_start_vertex {
        len = len.saturating_sub(1);
    }
    if !include_end_vertex {
        len = len.saturating_sub(1);
    }
    len
}

/// Walks the active paths of a topology one at a time
///
/// Created per reporting interval and driven to exhaustion. Statistics are
/// read live, not snapshotted at construction; a path counts as active if it
/// was active when the search passed it. Samples are never removed during a
/// reporting window, so every path active at construction is found, and the
/// count may additionally include paths that turned active ahead of the
/// search.
#[derive(Debug)]
pub struct SubsequenceEnumerator<'a> {
    topology: &'a Topology,
    depth: usize,
    fan_out: Vec<usize>,
    frames: Vec<Frame>,
    path: Vec<&'a VertexInstance>,
    vertices: Vec<&'a VertexInstance>,
    edges: Vec<&'a ForwardEdge>,
    element_latencies: Vec<f64>,
    latency: f64,
    active: bool,
    active_paths_found: usize,
}

impl<'a> SubsequenceEnumerator<'a> {
    /// Create an enumerator and search for the first active path
    ///
    /// # Errors
    ///
    /// Returns [`ProfilingError::ContractViolation`] if the topology is
    /// malformed.
    pub fn new(topology: &'a Topology) -> ProfilingResult<Self> {
        topology.validate()?;

        let depth = topology.depth();
        let len = decomposition_len(
            depth,
            topology.include_start_vertex(),
            topology.include_end_vertex(),
        );

        let mut enumerator = Self {
            topology,
            depth,
            fan_out: (0..depth).map(|d| topology.fan_out(d)).collect(),
            frames: Vec::with_capacity(depth),
            path: Vec::with_capacity(depth),
            vertices: Vec::with_capacity(depth),
            edges: Vec::with_capacity(depth - 1),
            element_latencies: vec![0.0; len],
            latency: 0.0,
            active: false,
            active_paths_found: 0,
        };

        enumerator.frames.push(Frame::fresh(0));
        enumerator.find_next_active_path();
        Ok(enumerator)
    }

    /// Whether an active path is currently held
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Move on to the next active path
    ///
    /// Returns `false` once all paths have been produced. From then on every
    /// call returns `false` and the getters keep returning the last path.
    pub fn advance(&mut self) -> bool {
        if self.active {
            // drop the deepest vertex so its frame tries the next branch
            self.path.pop();
            self.find_next_active_path();
        }
        self.active
    }

    fn find_next_active_path(&mut self) {
        self.active = self.search();
        if self.active {
            self.active_paths_found += 1;
            self.collect_path();
            self.compute_latency();
            tracing::trace!(
                path = self.active_paths_found,
                latency = self.latency,
                "active path found"
            );
        } else {
            tracing::debug!(
                active_paths = self.active_paths_found,
                "path enumeration exhausted"
            );
        }
    }

    /// Run the frame stack until a full active path is on `path` or the
    /// stack is empty
    ///
    /// While the top frame is at depth `d`, `path` holds exactly `d`
    /// vertices.
    fn search(&mut self) -> bool {
        while let Some(frame) = self.frames.last().copied() {
            let depth = frame.depth;
            let choice = frame.choice.map_or(0, |c| c + 1);

            if choice >= self.fan_out[depth] {
                self.frames.pop();
                if !self.frames.is_empty() {
                    // the parent's vertex leaves the path before it branches again
                    self.path.pop();
                }
                continue;
            }

            if let Some(top) = self.frames.last_mut() {
                top.choice = Some(choice);
            }

            let (edge, vertex) = self.candidate(depth, choice);
            let edge_active = edge.is_none_or(ForwardEdge::is_active);
            let vertex_active = !self.topology.is_vertex_included(depth) || vertex.is_active();

            if edge_active && vertex_active {
                self.path.push(vertex);
                if depth + 1 == self.depth {
                    return true;
                }
                self.frames.push(Frame::fresh(depth + 1));
            }
        }
        false
    }

    /// Edge and vertex reached by taking branch `choice` at `depth`
    fn candidate(&self, depth: usize, choice: usize) -> (Option<&'a ForwardEdge>, &'a VertexInstance) {
        let stages = self.topology.stages();
        if depth == 0 {
            return (None, &stages[0].members()[choice]);
        }
        let edge = &self.path[depth - 1].forward_edges()[choice];
        (Some(edge), &stages[depth].members()[edge.target_member()])
    }

    fn collect_path(&mut self) {
        self.vertices.clear();
        self.vertices.extend_from_slice(&self.path);

        self.edges.clear();
        for frame in &self.frames[1..] {
            let source = self.path[frame.depth - 1];
            if let Some(choice) = frame.choice {
                self.edges.push(&source.forward_edges()[choice]);
            }
        }
    }

    fn compute_latency(&mut self) {
        let mut position = 0;
        self.latency = 0.0;

        for (depth, vertex) in self.vertices.iter().enumerate() {
            if self.topology.is_vertex_included(depth) {
                let vertex_latency = vertex.statistics().mean_latency();
                self.element_latencies[position] = vertex_latency;
                self.latency += vertex_latency;
                position += 1;
            }

            if let Some(edge) = self.edges.get(depth) {
                let edge_latency = edge.characteristics().latency().unwrap_or_default();

                // channel latency already contains the output buffer latency
                let buffer = edge_latency.output_buffer_latency();
                let channel = edge_latency.remaining_channel_latency();
                self.element_latencies[position] = buffer;
                self.element_latencies[position + 1] = channel;
                self.latency += buffer + channel;
                position += 2;
            }
        }
    }

    /// Vertices of the held path, one per stage
    #[must_use]
    pub fn current_vertices(&self) -> &[&'a VertexInstance] {
        &self.vertices
    }

    /// Edges of the held path, one between each pair of consecutive vertices
    #[must_use]
    pub fn current_edges(&self) -> &[&'a ForwardEdge] {
        &self.edges
    }

    /// Total latency of the held path in milliseconds
    #[must_use]
    pub const fn current_latency(&self) -> f64 {
        self.latency
    }

    /// Latency decomposition of the held path
    ///
    /// For each vertex on the path its mean latency (if included), followed
    /// by half the output buffer lifetime and the remaining channel latency
    /// of its outgoing edge.
    #[must_use]
    pub fn element_latencies(&self) -> &[f64] {
        &self.element_latencies
    }

    /// Add the held path's decomposition element-wise into `buffer`
    ///
    /// # Errors
    ///
    /// Returns [`ProfilingError::LengthMismatch`] if `buffer` does not have
    /// the decomposition's length.
    pub fn accumulate_latency(&self, buffer: &mut [f64]) -> ProfilingResult<()> {
        if buffer.len() != self.element_latencies.len() {
            return Err(ProfilingError::LengthMismatch {
                expected: self.element_latencies.len(),
                actual: buffer.len(),
            });
        }
        for (sum, value) in buffer.iter_mut().zip(&self.element_latencies) {
            *sum += value;
        }
        Ok(())
    }

    /// Number of active paths produced so far
    #[must_use]
    pub const fn active_paths_found(&self) -> usize {
        self.active_paths_found
    }

    /// Length of the latency decomposition
    #[must_use]
    pub fn decomposition_len(&self) -> usize {
        self.element_latencies.len()
    }

    /// The topology being walked
    #[must_use]
    pub const fn topology(&self) -> &'a Topology {
        self.topology
    }
}
