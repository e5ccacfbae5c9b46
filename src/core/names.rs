use crate::error::{PipelineError, Result};

/// Names containing this affix are reserved for framework-internal ports.
pub const RESERVED_AFFIX: &str = "__";

/// Check a registry, parameter or port name against `[A-Za-z][A-Za-z0-9_]*`.
pub fn validate_name(name: &str) -> Result<()> {
    if is_identifier(name) && !name.contains(RESERVED_AFFIX) {
        Ok(())
    } else {
        Err(PipelineError::InvalidName(name.to_string()))
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
