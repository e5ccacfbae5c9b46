use crate::core::{LoopLevel, ScalarType, Target};
use std::collections::BTreeMap;
use std::fmt;

/// The declared shape of a config parameter's value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Enum { name: String, map: BTreeMap<String, i64> },
    /// A scalar element type, keyed by the built-in type map
    Type,
    Target,
    LoopLevel,
}

impl ValueKind {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Int { .. } | Self::Float { .. })
    }

    /// Inclusive range representable by an integer kind; `None` for widths
    /// an `i128` cannot hold.
    pub(crate) fn natural_int_range(&self) -> Option<(i128, i128)> {
        match self {
            Self::Int { bits: 0, .. } => None,
            Self::Int { bits, signed: true } => {
                let max = i128::MAX.checked_shr(128u32.checked_sub(u32::from(*bits))?)?;
                Some((-max - 1, max))
            }
            Self::Int { bits, signed: false } => {
                let max = i128::MAX.checked_shr(127u32.checked_sub(u32::from(*bits))?)?;
                Some((0, max))
            }
            _ => None,
        }
    }

    /// Whether `value` is the variant this kind stores.
    pub fn accepts(&self, value: &ConfigValue) -> bool {
        matches!(
            (self, value),
            (Self::Bool, ConfigValue::Bool(_))
                | (Self::Int { .. }, ConfigValue::Int(_))
                | (Self::Float { .. }, ConfigValue::Float(_))
                | (Self::Enum { .. }, ConfigValue::Enum(_))
                | (Self::Type, ConfigValue::Type(_))
                | (Self::Target, ConfigValue::Target(_))
                | (Self::LoopLevel, ConfigValue::LoopLevel(_))
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int { bits, signed: true } => write!(f, "int{}", bits),
            Self::Int { bits, signed: false } => write!(f, "uint{}", bits),
            Self::Float { bits } => write!(f, "float{}", bits),
            Self::Enum { name, .. } => write!(f, "enum {}", name),
            Self::Type => f.write_str("type"),
            Self::Target => f.write_str("target"),
            Self::LoopLevel => f.write_str("loop_level"),
        }
    }
}

/// A config parameter value; the variant always matches the owner's `ValueKind`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    Enum(i64),
    Type(ScalarType),
    Target(Target),
    LoopLevel(LoopLevel),
}

impl ConfigValue {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Enum(_) => "enum",
            Self::Type(_) => "type",
            Self::Target(_) => "target",
            Self::LoopLevel(_) => "loop_level",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i64> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<ScalarType> {
        match self {
            Self::Type(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Self::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_loop_level(&self) -> Option<&LoopLevel> {
        match self {
            Self::LoopLevel(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Enum(v) => write!(f, "{}", v),
            Self::Type(t) => write!(f, "{}", t),
            Self::Target(t) => write!(f, "{}", t),
            Self::LoopLevel(l) => write!(f, "{}", l),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! int_config_value {
    ($($t:ty),*) => {
        $(impl From<$t> for ConfigValue {
            fn from(v: $t) -> Self {
                Self::Int(v as i128)
            }
        })*
    };
}

int_config_value!(i8, i16, i32, i64, i128, u8, u16, u32, u64, usize);

impl From<f32> for ConfigValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<ScalarType> for ConfigValue {
    fn from(t: ScalarType) -> Self {
        Self::Type(t)
    }
}

impl From<Target> for ConfigValue {
    fn from(t: Target) -> Self {
        Self::Target(t)
    }
}

impl From<LoopLevel> for ConfigValue {
    fn from(l: LoopLevel) -> Self {
        Self::LoopLevel(l)
    }
}
