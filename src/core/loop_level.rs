use super::names::is_identifier;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::str::FromStr;

/// A position in the loop nest at which a node is computed or stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LoopLevel {
    /// Not chosen yet; schedule code must supply a real level before use.
    #[default]
    Undefined,
    Inlined,
    Root,
    At { func: String, var: String },
}

impl LoopLevel {
    pub fn at(func: impl Into<String>, var: impl Into<String>) -> Self {
        Self::At {
            func: func.into(),
            var: var.into(),
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "undefined" => Ok(Self::Undefined),
            "inline" => Ok(Self::Inlined),
            "root" => Ok(Self::Root),
            _ => match s.split_once('.') {
                Some((func, var)) if is_identifier(func) && is_identifier(var) => Ok(Self::at(func, var)),
                _ => Err(PipelineError::lookup("LoopLevel", s)),
            },
        }
    }
}

impl FromStr for LoopLevel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LoopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Inlined => f.write_str("inline"),
            Self::Root => f.write_str("root"),
            Self::At { func, var } => write!(f, "{}.{}", func, var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for level in [
            LoopLevel::Undefined,
            LoopLevel::Inlined,
            LoopLevel::Root,
            LoopLevel::at("pyramid_0", "y"),
        ] {
            assert_eq!(LoopLevel::parse(&level.to_string()).unwrap(), level);
        }
    }

    #[test]
    fn test_rejects_malformed_levels() {
        for bad in ["", "roots", "f.", ".x", "f.x.y", "1f.x"] {
            assert!(matches!(LoopLevel::parse(bad), Err(PipelineError::Lookup { .. })), "{}", bad);
        }
    }
}
