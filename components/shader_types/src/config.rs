//! Runtime configuration shared by both execution paths

/// Execution settings
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Maximum number of points shaded together by the interpreter
    pub batch_size: usize,
    /// Forward numeric faults (division by zero and friends) to the sink
    pub report_numeric_faults: bool,
    /// Bounds-check varying array and component indices
    pub check_varying_indices: bool,
}

impl RuntimeConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            batch_size: 256,
            report_numeric_faults: true,
            check_varying_indices: true,
        }
    }

    /// Configuration that keeps faults out of the sink (they are still traced)
    pub fn quiet() -> Self {
        Self {
            report_numeric_faults: false,
            ..Self::new()
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
