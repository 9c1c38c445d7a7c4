//! Topology contract violations.

/// Result type for topology construction
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Ways an externally built topology can break the profiling contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Fewer than two stages
    #[error("Topology needs at least 2 stages, got {depth}")]
    DepthTooSmall {
        /// Number of stages given
        depth: usize,
    },

    /// A stage without vertex instances
    #[error("Stage {stage} has no vertex instances")]
    EmptyStage {
        /// Stage index
        stage: usize,
    },

    /// Two stages share a name, which would give their vertices equal ids
    #[error("Stage {stage} reuses the name {name:?} of stage {first}")]
    DuplicateStageName {
        /// Stage index of the later stage
        stage: usize,
        /// Stage index that used the name first
        first: usize,
        /// The shared name
        name: String,
    },

    /// An edge leaves a stage index that does not exist
    #[error("Stage {stage} does not exist or has no successor")]
    StageOutOfRange {
        /// Stage index
        stage: usize,
    },

    /// An edge leaves a member that does not exist
    #[error("Source member {member} out of range for stage {stage} with {size} members")]
    SourceOutOfRange {
        /// Stage index of the source
        stage: usize,
        /// Offending member index
        member: usize,
        /// Group size of the stage
        size: usize,
    },

    /// An edge targets a member that does not exist
    #[error("Target member {member} out of range for stage {stage} with {size} members")]
    TargetOutOfRange {
        /// Stage index of the target
        stage: usize,
        /// Offending member index
        member: usize,
        /// Group size of the stage
        size: usize,
    },

    /// Members of one stage have different numbers of forward edges
    #[error("Inconsistent fan-out in stage {stage}: member {member} has {found} forward edges, expected {expected}")]
    InconsistentFanOut {
        /// Stage index
        stage: usize,
        /// Member with the deviating fan-out
        member: usize,
        /// Fan-out of the stage's first member
        expected: usize,
        /// Fan-out of the deviating member
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TopologyError::InconsistentFanOut {
            stage: 1,
            member: 2,
            expected: 3,
            found: 1,
        };
        let s = err.to_string();
        assert!(s.contains("stage 1"));
        assert!(s.contains("member 2"));

        let err = TopologyError::DepthTooSmall { depth: 1 };
        assert_eq!(err.to_string(), "Topology needs at least 2 stages, got 1");
    }
}
