use super::{ConfigValue, ValueKind};
use crate::core::{validate_name, LoopLevel, ScalarType, Target};
use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// When a parameter may still be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamScope {
    /// Until inputs are bound; affects the structure of the graph.
    Build,
    /// Until the schedule step runs; affects only execution strategy.
    Schedule,
}

/// A typed, named, string-configurable compile-time knob.
#[derive(Debug, Clone)]
pub struct ConfigParameter {
    name: String,
    kind: ValueKind,
    value: ConfigValue,
    default: ConfigValue,
    bounds: Option<(ConfigValue, ConfigValue)>,
    scope: ParamScope,
}

impl ConfigParameter {
    fn with_kind(name: impl Into<String>, kind: ValueKind, default: ConfigValue) -> Self {
        let scope = match kind {
            ValueKind::LoopLevel => ParamScope::Schedule,
            _ => ParamScope::Build,
        };
        Self {
            name: name.into(),
            kind,
            value: default.clone(),
            default,
            bounds: None,
            scope,
        }
    }

    pub fn bool(name: impl Into<String>, default: bool) -> Self {
        Self::with_kind(name, ValueKind::Bool, ConfigValue::Bool(default))
    }

    /// A signed 32-bit integer parameter.
    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self::integer(name, 32, true, default as i128)
    }

    /// An integer parameter of arbitrary width (8, 16, 32 or 64) and signedness.
    pub fn integer(name: impl Into<String>, bits: u8, signed: bool, default: i128) -> Self {
        Self::with_kind(name, ValueKind::Int { bits, signed }, ConfigValue::Int(default))
    }

    pub fn float32(name: impl Into<String>, default: f32) -> Self {
        Self::with_kind(name, ValueKind::Float { bits: 32 }, ConfigValue::Float(default as f64))
    }

    pub fn float64(name: impl Into<String>, default: f64) -> Self {
        Self::with_kind(name, ValueKind::Float { bits: 64 }, ConfigValue::Float(default))
    }

    pub fn enumeration<K: Into<String>>(
        name: impl Into<String>,
        enum_name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, i64)>,
        default: i64,
    ) -> Self {
        let map: BTreeMap<String, i64> = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::with_kind(
            name,
            ValueKind::Enum {
                name: enum_name.into(),
                map,
            },
            ConfigValue::Enum(default),
        )
    }

    pub fn scalar_type(name: impl Into<String>, default: ScalarType) -> Self {
        Self::with_kind(name, ValueKind::Type, ConfigValue::Type(default))
    }

    pub fn target(name: impl Into<String>, default: Target) -> Self {
        Self::with_kind(name, ValueKind::Target, ConfigValue::Target(default))
    }

    pub fn loop_level(name: impl Into<String>, default: LoopLevel) -> Self {
        Self::with_kind(name, ValueKind::LoopLevel, ConfigValue::LoopLevel(default))
    }

    /// Restricts an arithmetic parameter to the inclusive range `[min, max]`.
    pub fn range(mut self, min: impl Into<ConfigValue>, max: impl Into<ConfigValue>) -> Self {
        let (min, max) = match self.kind {
            // Literal bounds on a float parameter may be written as integers.
            ValueKind::Float { .. } => (float_bound(min.into()), float_bound(max.into())),
            _ => (min.into(), max.into()),
        };
        self.bounds = Some((min, max));
        self
    }

    /// Marks the parameter as settable until the schedule step runs.
    pub fn schedule_scope(mut self) -> Self {
        self.scope = ParamScope::Schedule;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn value(&self) -> &ConfigValue {
        &self.value
    }

    pub fn default_value(&self) -> &ConfigValue {
        &self.default
    }

    pub fn bounds(&self) -> Option<&(ConfigValue, ConfigValue)> {
        self.bounds.as_ref()
    }

    pub fn scope(&self) -> ParamScope {
        self.scope
    }

    /// Checks the declaration itself: name, bounds shape and default value.
    pub(crate) fn validate(&mut self) -> Result<()> {
        validate_name(&self.name)?;
        self.validate_kind()?;

        if let Some((min, max)) = &self.bounds {
            if !self.kind.is_arithmetic() {
                return Err(PipelineError::InternalContract(format!(
                    "only arithmetic parameters may declare a range, '{}' is {}",
                    self.name, self.kind
                )));
            }
            if !self.kind.accepts(min) || !self.kind.accepts(max) {
                return Err(PipelineError::InternalContract(format!(
                    "range of '{}' does not match its {} kind",
                    self.name, self.kind
                )));
            }
        }

        // Defaults go through set() so out-of-range defaults are caught, never clamped.
        let default = self.default.clone();
        self.set(default)?;
        self.default = self.value.clone();
        Ok(())
    }

    fn validate_kind(&self) -> Result<()> {
        let ok = match &self.kind {
            ValueKind::Int { bits, .. } => matches!(bits, 8 | 16 | 32 | 64),
            ValueKind::Float { bits } => matches!(bits, 32 | 64),
            ValueKind::Enum { map, .. } => !map.is_empty(),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::InternalContract(format!(
                "parameter '{}' has an unsupported kind {}",
                self.name, self.kind
            )))
        }
    }

    /// Assigns a value, enforcing range and map membership.
    pub fn set(&mut self, value: impl Into<ConfigValue>) -> Result<()> {
        let value = value.into();
        self.validate_kind()?;
        if !self.kind.accepts(&value) {
            return Err(PipelineError::TypeMismatch {
                name: self.name.clone(),
                expected: self.kind.to_string(),
                found: value.variant_name().to_string(),
            });
        }

        let value = match (&self.kind, value) {
            (ValueKind::Int { .. }, ConfigValue::Int(v)) => {
                self.check_int_range(v)?;
                ConfigValue::Int(v)
            }
            (ValueKind::Float { bits }, ConfigValue::Float(v)) => {
                let (lo, hi) = if *bits == 32 {
                    (f64::from(f32::MIN), f64::from(f32::MAX))
                } else {
                    (f64::MIN, f64::MAX)
                };
                if !(v >= lo && v <= hi) {
                    return Err(self.range_error(v.to_string(), lo.to_string(), hi.to_string()));
                }
                let v = if *bits == 32 { v as f32 as f64 } else { v };
                self.check_float_range(v)?;
                ConfigValue::Float(v)
            }
            (ValueKind::Enum { name, map }, ConfigValue::Enum(v)) => {
                if !map.values().any(|mapped| *mapped == v) {
                    return Err(PipelineError::lookup(format!("Enumeration value of {}", name), v.to_string()));
                }
                ConfigValue::Enum(v)
            }
            (ValueKind::Type, ConfigValue::Type(t)) => {
                if t.type_name().is_none() {
                    return Err(PipelineError::lookup("Type", t.to_string()));
                }
                ConfigValue::Type(t)
            }
            (_, value) => value,
        };

        log::debug!("config parameter {} = {}", self.name, self.format(&value));
        self.value = value;
        Ok(())
    }

    fn check_int_range(&self, v: i128) -> Result<()> {
        let (mut min, mut max) = self.kind.natural_int_range().ok_or_else(|| {
            PipelineError::InternalContract(format!("parameter '{}' has an unsupported kind {}", self.name, self.kind))
        })?;
        if let Some((ConfigValue::Int(lo), ConfigValue::Int(hi))) = &self.bounds {
            min = min.max(*lo);
            max = max.min(*hi);
        }
        if v < min || v > max {
            return Err(self.range_error(v.to_string(), min.to_string(), max.to_string()));
        }
        Ok(())
    }

    fn check_float_range(&self, v: f64) -> Result<()> {
        if let Some((ConfigValue::Float(min), ConfigValue::Float(max))) = &self.bounds {
            // Written so that NaN is rejected.
            if !(v >= *min && v <= *max) {
                return Err(self.range_error(v.to_string(), min.to_string(), max.to_string()));
            }
        }
        Ok(())
    }

    fn range_error(&self, value: String, min: String, max: String) -> PipelineError {
        PipelineError::Range {
            name: self.name.clone(),
            value,
            min,
            max,
        }
    }

    /// Parses `s` with this parameter's grammar without assigning it.
    pub fn parse_value(&self, s: &str) -> Result<ConfigValue> {
        let parse_error = |expected: &str| PipelineError::Parse {
            name: self.name.clone(),
            value: s.to_string(),
            expected: expected.to_string(),
        };

        match &self.kind {
            ValueKind::Bool => match s {
                "true" => Ok(ConfigValue::Bool(true)),
                "false" => Ok(ConfigValue::Bool(false)),
                _ => Err(parse_error("bool")),
            },
            ValueKind::Int { .. } => s
                .parse::<i128>()
                .map(ConfigValue::Int)
                .map_err(|_| parse_error("integer")),
            ValueKind::Float { .. } => s
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ConfigValue::Float)
                .ok_or_else(|| parse_error("finite float")),
            ValueKind::Enum { name, map } => map
                .get(s)
                .map(|v| ConfigValue::Enum(*v))
                .ok_or_else(|| PipelineError::lookup(format!("Enumeration value of {}", name), s)),
            ValueKind::Type => ScalarType::from_name(s)
                .map(ConfigValue::Type)
                .ok_or_else(|| PipelineError::lookup("Type", s)),
            ValueKind::Target => Target::parse(s).map(ConfigValue::Target),
            ValueKind::LoopLevel => LoopLevel::parse(s).map(ConfigValue::LoopLevel),
        }
    }

    /// Parses and assigns a value given in string form.
    pub fn set_from_string(&mut self, s: &str) -> Result<()> {
        let value = self.parse_value(s)?;
        self.set(value)
    }

    /// The current value in the string form accepted by `set_from_string`.
    pub fn value_string(&self) -> String {
        self.format(&self.value)
    }

    fn format(&self, value: &ConfigValue) -> String {
        match (&self.kind, value) {
            (ValueKind::Float { bits: 32 }, ConfigValue::Float(v)) => (*v as f32).to_string(),
            (ValueKind::Enum { map, .. }, ConfigValue::Enum(v)) => map
                .iter()
                .find(|(_, mapped)| *mapped == v)
                .map(|(key, _)| key.clone())
                .unwrap_or_else(|| v.to_string()),
            (_, value) => value.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }

    pub fn schema(&self) -> ParameterSchema {
        ParameterSchema {
            name: self.name.clone(),
            param_type: self.kind.to_string(),
            value: self.value_string(),
            default: self.format(&self.default),
            min: self.bounds.as_ref().map(|(min, _)| self.format(min)),
            max: self.bounds.as_ref().map(|(_, max)| self.format(max)),
            scope: self.scope,
        }
    }
}

fn float_bound(value: ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::Int(v) => ConfigValue::Float(v as f64),
        other => other,
    }
}

impl fmt::Display for ConfigParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value_string())
    }
}

/// Serializable description of a config parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: String,
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    pub scope: ParamScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(mut p: ConfigParameter) -> ConfigParameter {
        p.validate().unwrap();
        p
    }

    #[test]
    fn test_bounded_set_is_inclusive() {
        let mut p = validated(ConfigParameter::int("levels", 4).range(1, 10));
        assert!(p.set(1).is_ok());
        assert!(p.set(10).is_ok());
        assert!(matches!(p.set(0), Err(PipelineError::Range { .. })));
        assert!(matches!(p.set(11), Err(PipelineError::Range { .. })));
        assert_eq!(p.value(), &ConfigValue::Int(10));
    }

    #[test]
    fn test_natural_range_of_narrow_integer() {
        let mut p = validated(ConfigParameter::integer("mask", 8, false, 0));
        assert!(p.set_from_string("255").is_ok());
        assert!(matches!(p.set_from_string("256"), Err(PipelineError::Range { .. })));
        assert!(matches!(p.set_from_string("-1"), Err(PipelineError::Range { .. })));
    }

    #[test]
    fn test_default_out_of_range_is_rejected() {
        let mut p = ConfigParameter::int("n", 20).range(0, 10);
        assert!(matches!(p.validate(), Err(PipelineError::Range { .. })));
    }

    #[test]
    fn test_bool_grammar() {
        let mut p = validated(ConfigParameter::bool("vectorize", true));
        assert!(p.set_from_string("false").is_ok());
        assert_eq!(p.value_string(), "false");
        for bad in ["False", "1", "yes", ""] {
            assert!(matches!(p.set_from_string(bad), Err(PipelineError::Parse { .. })), "{}", bad);
        }
    }

    #[test]
    fn test_numbers_must_parse_entirely() {
        let mut i = validated(ConfigParameter::int("i", 0));
        assert!(matches!(i.set_from_string("12abc"), Err(PipelineError::Parse { .. })));
        assert!(matches!(i.set_from_string(" 12"), Err(PipelineError::Parse { .. })));

        let mut f = validated(ConfigParameter::float32("f", 0.0));
        assert!(matches!(f.set_from_string("1.5x"), Err(PipelineError::Parse { .. })));
        assert!(f.set_from_string("1.5").is_ok());
    }

    #[test]
    fn test_float32_round_trip() {
        let mut f = validated(ConfigParameter::float32("f", 0.0));
        f.set(0.1f64).unwrap();
        let text = f.value_string();
        let parsed = f.parse_value(&text).unwrap();
        f.set(parsed).unwrap();
        assert_eq!(f.value_string(), text);
    }

    #[test]
    fn test_non_finite_float_text_is_a_parse_error() {
        let mut k = validated(ConfigParameter::float64("k", 1.0));
        for bad in ["NaN", "nan", "inf", "-infinity", "1e400"] {
            assert!(matches!(k.set_from_string(bad), Err(PipelineError::Parse { .. })), "{}", bad);
        }
        assert_eq!(k.value(), &ConfigValue::Float(1.0));
        assert!(matches!(k.set(f64::NAN), Err(PipelineError::Range { .. })));
        assert!(matches!(k.set(f64::NEG_INFINITY), Err(PipelineError::Range { .. })));
    }

    #[test]
    fn test_float32_overflow_is_a_range_error() {
        let mut g = validated(ConfigParameter::float32("g", 1.0));
        assert!(matches!(g.set_from_string("1e300"), Err(PipelineError::Range { .. })));
        assert!(matches!(g.set_from_string("-3.5e38"), Err(PipelineError::Range { .. })));
        assert_eq!(g.value_string(), "1");

        g.set_from_string("3.4e38").unwrap();
        assert!(g.value_string().parse::<f32>().unwrap().is_finite());
    }

    #[test]
    fn test_unsupported_integer_width_is_contract_error() {
        for bits in [0, 7, 128, 255] {
            let mut p = ConfigParameter::integer("w", bits, true, 0);
            assert!(matches!(p.set(1), Err(PipelineError::InternalContract(_))), "{}", bits);
            assert!(matches!(p.validate(), Err(PipelineError::InternalContract(_))), "{}", bits);
        }
        let mut unsigned = ConfigParameter::integer("w", 128, false, 0);
        assert!(matches!(unsigned.set(1), Err(PipelineError::InternalContract(_))));
    }

    #[test]
    fn test_natural_ranges_at_the_edges() {
        let signed = |bits| ValueKind::Int { bits, signed: true }.natural_int_range();
        let unsigned = |bits| ValueKind::Int { bits, signed: false }.natural_int_range();
        assert_eq!(signed(8), Some((-128, 127)));
        assert_eq!(signed(64), Some((i64::MIN as i128, i64::MAX as i128)));
        assert_eq!(unsigned(64), Some((0, u64::MAX as i128)));
        assert_eq!(signed(128), Some((i128::MIN, i128::MAX)));
        assert_eq!(signed(0), None);
        assert_eq!(unsigned(128), None);
    }

    #[test]
    fn test_wrong_variant_is_type_mismatch() {
        let mut p = validated(ConfigParameter::bool("b", false));
        assert!(matches!(p.set(3), Err(PipelineError::TypeMismatch { .. })));
    }

    #[test]
    fn test_range_on_non_arithmetic_is_contract_error() {
        let mut p = ConfigParameter::bool("b", false).range(0, 1);
        assert!(matches!(p.validate(), Err(PipelineError::InternalContract(_))));
    }

    #[test]
    fn test_type_parameter_rejects_handle() {
        let mut p = validated(ConfigParameter::scalar_type("t", ScalarType::UInt(8)));
        assert!(matches!(p.set(ScalarType::Handle), Err(PipelineError::Lookup { .. })));
        assert!(p.set_from_string("float32").is_ok());
        assert_eq!(p.value(), &ConfigValue::Type(ScalarType::Float(32)));
    }

    #[test]
    fn test_loop_level_defaults_to_schedule_scope() {
        let p = ConfigParameter::loop_level("compute_level", LoopLevel::Undefined);
        assert_eq!(p.scope(), ParamScope::Schedule);
        assert_eq!(ConfigParameter::int("n", 1).scope(), ParamScope::Build);
    }

    #[test]
    fn test_schema_serializes_bounds() {
        let p = validated(ConfigParameter::float64("gain", 1.0).range(0, 80));
        let json = serde_json::to_value(p.schema()).unwrap();
        assert_eq!(json["type"], "float64");
        assert_eq!(json["min"], "0");
        assert_eq!(json["max"], "80");
        assert_eq!(json["scope"], "build");
    }
}
