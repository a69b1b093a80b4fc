use thiserror::Error;

/// An invariant of the plan collection that the stored data violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("capability '{capability_id}' has {count} active plans")]
    MultipleActivePlans { capability_id: String, count: usize },

    #[error("capability '{capability_id}' has plan versions {versions:?}, expected 1..={expected}")]
    VersionGap {
        capability_id: String,
        versions: Vec<u32>,
        expected: usize,
    },

    #[error("capability '{capability_id}' has {count} plans but none is active")]
    NoActivePlan { capability_id: String, count: usize },
}

