use crate::core::{Feature, ScalarType, Target};
use crate::port::{Port, PortKind};
use serde::Serialize;

/// Reserved argument appended after the target when it has the `user_context` feature.
pub const USER_CONTEXT_ARG: &str = "__user_context";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    Scalar,
    Buffer,
}

/// One entry of the external calling signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    pub name: String,
    pub kind: ArgumentKind,
    #[serde(rename = "type")]
    pub ty: ScalarType,
    pub dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Argument {
    fn buffer(name: String, ty: ScalarType, dimensions: usize) -> Self {
        Self {
            name,
            kind: ArgumentKind::Buffer,
            ty,
            dimensions,
            default: None,
            min: None,
            max: None,
        }
    }
}

/// The ordered calling signature: target, inputs, then outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub target: Target,
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
}

impl Signature {
    pub(crate) fn from_ports(target: Target, inputs: &[Port], outputs: &[Port]) -> Self {
        let mut args = Vec::new();
        if target.has_feature(Feature::UserContext) {
            args.push(Argument {
                name: USER_CONTEXT_ARG.to_string(),
                kind: ArgumentKind::Scalar,
                ty: ScalarType::Handle,
                dimensions: 0,
                default: None,
                min: None,
                max: None,
            });
        }
        args.extend(inputs.iter().flat_map(input_arguments));

        Self {
            target,
            inputs: args,
            outputs: outputs.iter().flat_map(output_arguments).collect(),
        }
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|a| a.name.as_str()).collect()
    }

    /// Every argument name in calling order, starting with `target`.
    pub fn argument_names(&self) -> Vec<&str> {
        std::iter::once("target")
            .chain(self.input_names())
            .chain(self.output_names())
            .collect()
    }
}

fn input_arguments(port: &Port) -> Vec<Argument> {
    (0..port.arity())
        .map(|i| {
            let name = port.entry_name(i);
            let ty = port.types()[0];
            match port.kind() {
                PortKind::Scalar => {
                    let spec = port.scalar_spec();
                    Argument {
                        name,
                        kind: ArgumentKind::Scalar,
                        ty,
                        dimensions: 0,
                        default: spec.map(|s| s.default),
                        min: spec.and_then(|s| s.min),
                        max: spec.and_then(|s| s.max),
                    }
                }
                PortKind::Node => Argument::buffer(name, ty, port.dimensions()),
            }
        })
        .collect()
}

fn output_arguments(port: &Port) -> Vec<Argument> {
    let tuple = port.types().len() > 1;
    let mut args = Vec::new();
    for i in 0..port.arity() {
        let entry = port.entry_name(i);
        for (j, ty) in port.types().iter().enumerate() {
            let name = if tuple { format!("{}_{}", entry, j) } else { entry.clone() };
            args.push(Argument::buffer(name, *ty, port.dimensions()));
        }
    }
    args
}
