use thiserror::Error;

/// Errors that can occur when constructing or driving the planner.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("agent {0} has an empty action set")]
    EmptyActionSet(usize),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("agent {0} has no hypotheses to sample from")]
    NoHypotheses(usize),
}

impl PlannerError {
    /// Shorthand for configuration failures detected at construction.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience Result type for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;
