use ndarray::ShapeError;

pub type Result<T> = std::result::Result<T, MpcError>;

/// Errors raised while configuring or running an MPC solver.
#[derive(Debug, Clone, PartialEq)]
pub enum MpcError {
    UnknownDefaultAction(String),
    UnknownSolver(String),
    InvalidConfig { field: String, message: String },
    ShapeMismatch { expected: String, actual: String },
    Parse { source: String },
}

impl MpcError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        MpcError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        MpcError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl std::fmt::Display for MpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpcError::UnknownDefaultAction(name) => {
                write!(f, "Unknown default action '{}': expected zero, constant or mean", name)
            }
            MpcError::UnknownSolver(name) => {
                write!(f, "{} not recognized: expected cem, random or mppi", name)
            }
            MpcError::InvalidConfig { field, message } => {
                write!(f, "Invalid solver configuration in '{}': {}", field, message)
            }
            MpcError::ShapeMismatch { expected, actual } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, actual)
            }
            MpcError::Parse { source } => write!(f, "Failed to parse solver config: {}", source),
        }
    }
}

impl std::error::Error for MpcError {}

impl From<ShapeError> for MpcError {
    fn from(e: ShapeError) -> Self {
        MpcError::shape("compatible array layout", e.to_string())
    }
}

impl From<serde_json::Error> for MpcError {
    fn from(e: serde_json::Error) -> Self {
        MpcError::Parse {
            source: e.to_string(),
        }
    }
}
