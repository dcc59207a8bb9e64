//! Error types for engine collaboration and run launch.

/// One compile-time diagnostic reported by an engine.
#[derive(Debug, Clone)]
pub struct CompileDiagnostic {
    /// Module or stylesheet the diagnostic refers to, if the engine knows.
    pub module: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

impl std::fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}: ")?;
        }
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "line {line}, column {column}: ")?,
            (Some(line), None) => write!(f, "line {line}: ")?,
            _ => {}
        }
        write!(f, "{}", self.message)
    }
}

/// Failure reported by an engine while executing a transform.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("transform failed: {0}")]
    Transform(String),
    #[error("unsupported by this engine: {0}")]
    Unsupported(String),
}

/// Failure starting an execution run.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("a transform run is already active")]
    AlreadyRunning,
    #[error("no engine registered for selector '{0}'")]
    UnknownEngine(String),
}
