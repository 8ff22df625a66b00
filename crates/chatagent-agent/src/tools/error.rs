//! Errors raised at the tool-dispatch seam.
//!
//! None of these abort a turn: the loop renders them into tool-result
//! strings so the model can see what went wrong and adapt.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}

impl ToolError {
    /// The text fed back to the model in place of tool output.
    pub fn to_result_string(&self) -> String {
        format!("Error: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_result_string() {
        let err = ToolError::NotFound { name: "nope".into() };
        assert_eq!(err.to_result_string(), "Error: Tool 'nope' not found");
    }

    #[test]
    fn test_invalid_arguments_result_string() {
        let err = ToolError::InvalidArguments {
            name: "glob".into(),
            reason: "expected value at line 1 column 1".into(),
        };
        assert!(err.to_result_string().starts_with("Error: Invalid arguments for glob:"));
    }
}
