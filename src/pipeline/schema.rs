use crate::core::Target;
use crate::error::{PipelineError, Result};
use crate::param::ConfigParameter;
use crate::port::{Direction, PortDecl};
use std::collections::HashSet;

/// Name of the parameter every pipeline carries for its target descriptor.
pub const TARGET_PARAM: &str = "target";

/// Collects the declarations a generator makes in `describe`.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    params: Vec<ConfigParameter>,
    inputs: Vec<PortDecl>,
    outputs: Vec<PortDecl>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(&mut self, param: ConfigParameter) -> &mut Self {
        self.params.push(param);
        self
    }

    pub fn input(&mut self, decl: PortDecl) -> &mut Self {
        self.inputs.push(decl.with_direction(Direction::Input));
        self
    }

    pub fn output(&mut self, decl: PortDecl) -> &mut Self {
        self.outputs.push(decl.with_direction(Direction::Output));
        self
    }

    /// Prepends the target parameter and validates every declaration.
    pub(crate) fn finish(self) -> Result<Schema> {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(ConfigParameter::target(TARGET_PARAM, Target::host()));
        params.extend(self.params);

        let mut seen = HashSet::new();
        for param in params.iter_mut() {
            param.validate()?;
            if !seen.insert(param.name().to_string()) {
                return Err(duplicate("parameter", param.name()));
            }
        }

        for decl in self.inputs.iter().chain(self.outputs.iter()) {
            decl.validate(&params)?;
            if !seen.insert(decl.name().to_string()) {
                return Err(duplicate("port", decl.name()));
            }
        }

        Ok(Schema {
            params,
            inputs: self.inputs,
            outputs: self.outputs,
        })
    }
}

fn duplicate(what: &str, name: &str) -> PipelineError {
    PipelineError::Duplicate {
        what: what.to_string(),
        name: name.to_string(),
    }
}

/// The validated result of schema registration
#[derive(Debug)]
pub(crate) struct Schema {
    pub(crate) params: Vec<ConfigParameter>,
    pub(crate) inputs: Vec<PortDecl>,
    pub(crate) outputs: Vec<PortDecl>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScalarType;

    #[test]
    fn test_target_comes_first() {
        let mut builder = SchemaBuilder::new();
        builder
            .param(ConfigParameter::int("levels", 3))
            .input(PortDecl::node("input", ScalarType::Float(32), 2));
        let schema = builder.finish().unwrap();

        let names: Vec<&str> = schema.params.iter().map(ConfigParameter::name).collect();
        assert_eq!(names, vec!["target", "levels"]);
        assert_eq!(schema.inputs[0].direction(), Direction::Input);
    }

    #[test]
    fn test_user_target_param_is_duplicate() {
        let mut builder = SchemaBuilder::new();
        builder.param(ConfigParameter::bool("target", true));
        assert!(matches!(builder.finish(), Err(PipelineError::Duplicate { .. })));
    }

    #[test]
    fn test_ports_and_params_share_a_namespace() {
        let mut builder = SchemaBuilder::new();
        builder
            .param(ConfigParameter::int("gain", 1))
            .output(PortDecl::node("gain", ScalarType::Float(32), 2));
        assert!(matches!(builder.finish(), Err(PipelineError::Duplicate { .. })));
    }

    #[test]
    fn test_reserved_names_are_rejected() {
        let mut builder = SchemaBuilder::new();
        builder.input(PortDecl::scalar("__user_context", ScalarType::Handle));
        assert!(matches!(builder.finish(), Err(PipelineError::InvalidName(_))));
    }
}
