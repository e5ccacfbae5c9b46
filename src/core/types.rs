use serde::{Serialize, Serializer};
use std::fmt;

/// Element type of a scalar value or of a node's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int(u8),
    UInt(u8),
    Float(u8),
    /// Opaque pointer-sized value
    Handle,
}

/// Names accepted by type-valued config parameters, in map order.
pub const TYPE_NAMES: [(&str, ScalarType); 11] = [
    ("bool", ScalarType::Bool),
    ("float32", ScalarType::Float(32)),
    ("float64", ScalarType::Float(64)),
    ("int16", ScalarType::Int(16)),
    ("int32", ScalarType::Int(32)),
    ("int64", ScalarType::Int(64)),
    ("int8", ScalarType::Int(8)),
    ("uint16", ScalarType::UInt(16)),
    ("uint32", ScalarType::UInt(32)),
    ("uint64", ScalarType::UInt(64)),
    ("uint8", ScalarType::UInt(8)),
];

impl ScalarType {
    pub fn from_name(name: &str) -> Option<Self> {
        TYPE_NAMES
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, ty)| *ty)
    }

    /// The key of this type in the type map, if it has one.
    pub fn type_name(&self) -> Option<&'static str> {
        TYPE_NAMES
            .iter()
            .find(|(_, ty)| ty == self)
            .map(|(key, _)| *key)
    }

    pub fn bits(&self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::Int(bits) | Self::UInt(bits) | Self::Float(bits) => *bits,
            Self::Handle => 64,
        }
    }

    /// Storage size in bytes; bool occupies one byte.
    pub fn bytes(&self) -> usize {
        (self.bits() as usize).div_ceil(8)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Converts an arbitrary value into the value set of this type.
    ///
    /// Floats round to their precision; integers truncate toward zero and wrap
    /// to their width.
    pub fn normalize(&self, value: f64) -> f64 {
        match self {
            Self::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Float(32) => value as f32 as f64,
            Self::Float(_) => value,
            Self::Int(bits) => wrap_signed(value.trunc() as i128, *bits) as f64,
            Self::UInt(bits) => wrap_unsigned(value.trunc() as i128, *bits) as f64,
            Self::Handle => value.trunc(),
        }
    }

    /// Picks the result type of a binary operation between two operands.
    pub fn promote(lhs: ScalarType, rhs: ScalarType) -> ScalarType {
        if lhs == rhs {
            return lhs;
        }
        match (lhs, rhs) {
            (Self::Float(a), Self::Float(b)) => Self::Float(a.max(b)),
            (Self::Float(_), _) => lhs,
            (_, Self::Float(_)) => rhs,
            (a, b) => {
                let bits = a.bits().max(b.bits()).max(8);
                if a.is_signed() || b.is_signed() {
                    Self::Int(bits)
                } else {
                    Self::UInt(bits)
                }
            }
        }
    }
}

fn wrap_signed(value: i128, bits: u8) -> i128 {
    let modulus = 1i128 << bits;
    let half = modulus >> 1;
    let wrapped = value.rem_euclid(modulus);
    if wrapped >= half {
        wrapped - modulus
    } else {
        wrapped
    }
}

fn wrap_unsigned(value: i128, bits: u8) -> i128 {
    value.rem_euclid(1i128 << bits)
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int(bits) => write!(f, "int{}", bits),
            Self::UInt(bits) => write!(f, "uint{}", bits),
            Self::Float(bits) => write!(f, "float{}", bits),
            Self::Handle => write!(f, "handle"),
        }
    }
}

impl Serialize for ScalarType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
