use super::{
    Backend, BuildContext, BuildShape, FinalizedPipeline, Generator, Phase, ScheduleContext, SchemaBuilder, Signature,
};
use crate::config::{param_values_from_json, ParamValues};
use crate::core::Target;
use crate::error::{PipelineError, Result};
use crate::graph::schedule::{validate_schedules, ScheduleSnapshot};
use crate::graph::{self, Expr, Node, Realization};
use crate::param::{ConfigParameter, ParamScope};
use crate::port::{Direction, InputGroup, Port, PortDecl, PortKind};
use std::fmt;

/// One instance of a generator, driven through its construction phases.
///
/// ```text
/// Constructed -> SchemaBuilt -> [InputsBound] -> BodyBuilt -> Scheduled
/// ```
///
/// Every method checks the current phase and fails with
/// [`PipelineError::Sequence`] when called out of order. A failed step leaves
/// the phase where it was.
pub struct PipelineDefinition {
    name: Option<String>,
    generator: Box<dyn Generator>,
    phase: Phase,
    shape: Option<BuildShape>,
    params: Vec<ConfigParameter>,
    input_decls: Vec<PortDecl>,
    output_decls: Vec<PortDecl>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    schedule_attempted: bool,
}

impl PipelineDefinition {
    /// Wraps a generator without registering its schema yet.
    pub fn construct(generator: Box<dyn Generator>) -> Self {
        Self {
            name: None,
            generator,
            phase: Phase::Constructed,
            shape: None,
            params: Vec::new(),
            input_decls: Vec::new(),
            output_decls: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            schedule_attempted: false,
        }
    }

    /// Constructs the instance and registers its schema.
    pub fn new(generator: Box<dyn Generator>) -> Result<Self> {
        let mut definition = Self::construct(generator);
        definition.build_schema()?;
        Ok(definition)
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn shape(&self) -> Option<BuildShape> {
        self.shape
    }

    pub fn is_two_stage(&self) -> bool {
        self.shape == Some(BuildShape::TwoStage)
    }

    fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(PipelineError::InternalContract(format!(
                "'{}' cannot move from {} to {}",
                self.label(),
                self.phase,
                next
            )));
        }
        log::debug!("'{}': {} -> {}", self.label(), self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Records the ordered parameter and port declarations. Runs once.
    pub fn build_schema(&mut self) -> Result<()> {
        if self.phase != Phase::Constructed {
            return Err(PipelineError::InternalContract(format!(
                "schema of '{}' registered twice",
                self.label()
            )));
        }

        let single = self.generator.as_single_stage().is_some();
        let two = self.generator.as_two_stage().is_some();
        let shape = match (single, two) {
            (true, false) => BuildShape::SingleStage,
            (false, true) => BuildShape::TwoStage,
            (true, true) => {
                return Err(PipelineError::InternalContract(format!(
                    "'{}' provides both a single-stage and a two-stage builder",
                    self.label()
                )))
            }
            (false, false) => {
                return Err(PipelineError::InternalContract(format!(
                    "'{}' provides neither a single-stage nor a two-stage builder",
                    self.label()
                )))
            }
        };

        let mut builder = SchemaBuilder::new();
        self.generator.describe(&mut builder);
        let schema = builder.finish()?;

        self.params = schema.params;
        self.input_decls = schema.inputs;
        self.output_decls = schema.outputs;
        self.shape = Some(shape);
        self.advance(Phase::SchemaBuilt)
    }

    // =========================================================================
    // === Configuration
    // =========================================================================

    pub fn params(&self) -> &[ConfigParameter] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Result<&ConfigParameter> {
        self.params
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PipelineError::lookup("parameter", name))
    }

    pub fn target(&self) -> Target {
        self.params
            .first()
            .and_then(|p| p.value().as_target().cloned())
            .unwrap_or_else(Target::host)
    }

    /// Sets one parameter from its string form.
    ///
    /// Build-scope parameters are open until inputs are bound, schedule-scope
    /// parameters until the schedule step has run.
    pub fn configure(&mut self, name: &str, value: &str) -> Result<()> {
        let phase = self.phase;
        if phase == Phase::Constructed {
            return Err(PipelineError::sequence(format!("configure '{}'", name), phase));
        }

        let param = self
            .params
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| PipelineError::lookup("parameter", name))?;
        let open = match param.scope() {
            ParamScope::Build => phase == Phase::SchemaBuilt,
            ParamScope::Schedule => phase < Phase::Scheduled,
        };
        if !open {
            return Err(PipelineError::sequence(format!("configure '{}'", name), phase));
        }

        param.set_from_string(value)?;
        log::debug!("configured {}", param);
        Ok(())
    }

    /// Applies every entry, in key order; stops at the first failure.
    pub fn set_param_values(&mut self, values: &ParamValues) -> Result<()> {
        for (name, value) in values {
            self.configure(name, value)?;
        }
        Ok(())
    }

    pub fn configure_json(&mut self, value: &serde_json::Value) -> Result<()> {
        let values = param_values_from_json(value)?;
        self.set_param_values(&values)
    }

    /// Current values of every parameter in their string form.
    pub fn param_values(&self) -> ParamValues {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value_string()))
            .collect()
    }

    // =========================================================================
    // === Ports
    // =========================================================================

    pub fn input_decls(&self) -> &[PortDecl] {
        &self.input_decls
    }

    pub fn output_decls(&self) -> &[PortDecl] {
        &self.output_decls
    }

    /// Materialized inputs; empty until inputs are bound or the body is built.
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    fn materialize(&self) -> Result<(Vec<Port>, Vec<Port>)> {
        let resolve = |decls: &[PortDecl]| {
            decls
                .iter()
                .map(|d| d.materialize(&self.params))
                .collect::<Result<Vec<_>>>()
        };
        Ok((resolve(&self.input_decls)?, resolve(&self.output_decls)?))
    }

    /// Binds one group per declared input, positionally in declaration order.
    pub fn bind_inputs(&mut self, groups: Vec<InputGroup>) -> Result<()> {
        if self.phase != Phase::SchemaBuilt {
            return Err(PipelineError::sequence("bind inputs", self.phase));
        }

        let (mut inputs, outputs) = self.materialize()?;
        if groups.len() != inputs.len() {
            return Err(PipelineError::ArityMismatch {
                port: format!("inputs of '{}'", self.label()),
                expected: inputs.len(),
                found: groups.len(),
            });
        }
        for (port, group) in inputs.iter_mut().zip(groups) {
            port.bind(group)?;
        }

        self.inputs = inputs;
        self.outputs = outputs;
        self.advance(Phase::InputsBound)
    }

    // =========================================================================
    // === Body and schedule
    // =========================================================================

    fn require_shape(&self) -> Result<BuildShape> {
        self.shape
            .ok_or_else(|| PipelineError::InternalContract(format!("'{}' has no build shape", self.label())))
    }

    /// Runs user body construction. Unbound inputs get runtime placeholders.
    pub fn build_body(&mut self) -> Result<()> {
        match self.phase {
            Phase::SchemaBuilt | Phase::InputsBound => {}
            phase => return Err(PipelineError::sequence("build body", phase)),
        }
        let shape = self.require_shape()?;

        let (inputs, mut outputs) = if self.phase == Phase::SchemaBuilt {
            let (mut inputs, outputs) = self.materialize()?;
            inputs.iter_mut().for_each(Port::bind_placeholders);
            (inputs, outputs)
        } else {
            (self.inputs.clone(), self.outputs.clone())
        };

        let label = self.label().to_string();
        let lost = || PipelineError::InternalContract(format!("'{}' changed its build shape", label));
        match shape {
            BuildShape::SingleStage => {
                let builder = self.generator.as_single_stage().ok_or_else(lost)?;
                let mut ctx = BuildContext::new(&self.params, &inputs, &mut outputs);
                let nodes = builder.build(&mut ctx).map_err(PipelineError::from_body)?;
                fill_single_stage_outputs(&label, &mut outputs, nodes)?;
            }
            BuildShape::TwoStage => {
                let builder = self.generator.as_two_stage().ok_or_else(lost)?;
                let mut ctx = BuildContext::new(&self.params, &inputs, &mut outputs);
                builder.generate(&mut ctx).map_err(PipelineError::from_body)?;
            }
        }

        check_outputs_populated(&mut outputs)?;
        if shape == BuildShape::SingleStage {
            validate_schedules(&output_roots(&outputs))?;
        }

        self.inputs = inputs;
        self.outputs = outputs;
        self.advance(Phase::BodyBuilt)?;
        if shape == BuildShape::SingleStage {
            self.advance(Phase::Scheduled)?;
        }
        Ok(())
    }

    /// Runs the user schedule step of a two-stage generator, at most once.
    ///
    /// On failure the directives it applied are undone and the instance
    /// stays at BodyBuilt; a later call fails with a sequence error.
    pub fn schedule(&mut self) -> Result<()> {
        if self.phase != Phase::BodyBuilt {
            return Err(PipelineError::sequence("schedule", self.phase));
        }
        if self.schedule_attempted {
            return Err(PipelineError::sequence("schedule after a failed schedule step", self.phase));
        }
        let Some(scheduler) = self.generator.as_two_stage() else {
            return Err(PipelineError::InternalContract(format!(
                "'{}' has no schedule step",
                self.name.as_deref().unwrap_or("<anonymous>")
            )));
        };
        self.schedule_attempted = true;

        let roots = output_roots(&self.outputs);
        let snapshot = ScheduleSnapshot::capture(&roots);
        let ctx = ScheduleContext::new(&self.params, &self.inputs, &self.outputs);
        let result = scheduler
            .schedule(&ctx)
            .map_err(PipelineError::from_body)
            .and_then(|()| validate_schedules(&roots));
        if let Err(err) = result {
            log::warn!("'{}': schedule step failed: {}", self.label(), err);
            snapshot.restore();
            return Err(err);
        }
        self.advance(Phase::Scheduled)
    }

    // =========================================================================
    // === Results
    // =========================================================================

    /// The calling signature. Available from schema registration on;
    /// before binding it is resolved from the current configuration.
    pub fn signature(&self) -> Result<Signature> {
        match self.phase {
            Phase::Constructed => Err(PipelineError::sequence("compute signature", self.phase)),
            Phase::SchemaBuilt => {
                let (inputs, outputs) = self.materialize()?;
                Ok(Signature::from_ports(self.target(), &inputs, &outputs))
            }
            _ => Ok(Signature::from_ports(self.target(), &self.inputs, &self.outputs)),
        }
    }

    pub fn finalize(&self) -> Result<FinalizedPipeline> {
        if self.phase != Phase::Scheduled {
            return Err(PipelineError::sequence("finalize", self.phase));
        }
        Ok(FinalizedPipeline {
            name: self.name.clone(),
            signature: self.signature()?,
            outputs: self.outputs.clone(),
            target: self.target(),
        })
    }

    pub fn compile_with<B: Backend>(&self, backend: &mut B) -> Result<B::Output> {
        let pipeline = self.finalize()?;
        log::debug!("compiling '{}' for {}", self.label(), pipeline.target);
        backend.compile(&pipeline).map_err(PipelineError::from_body)
    }

    fn built_output(&self, name: &str) -> Result<&Port> {
        let declared = self.output_decls.iter().any(|d| d.name() == name);
        if !self.phase.is_built() {
            return Err(if declared {
                PipelineError::NotYetBound(name.to_string())
            } else {
                PipelineError::lookup("output", name)
            });
        }
        self.outputs
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PipelineError::lookup("output", name))
    }

    /// First entry of the named node output.
    pub fn output_node(&self, name: &str) -> Result<Node> {
        first_node(self.built_output(name)?)
    }

    pub fn output_nodes(&self, name: &str) -> Result<Vec<Node>> {
        Ok(self.built_output(name)?.nodes()?.to_vec())
    }

    pub fn output_value(&self, name: &str) -> Result<Expr> {
        let port = self.built_output(name)?;
        port.values()?.first().cloned().ok_or_else(|| PipelineError::ArityMismatch {
            port: port.name().to_string(),
            expected: 1,
            found: 0,
        })
    }

    /// First entry of the output at `index` in declaration order.
    pub fn output_at(&self, index: usize) -> Result<Node> {
        if !self.phase.is_built() {
            return Err(match self.output_decls.get(index) {
                Some(decl) => PipelineError::NotYetBound(decl.name().to_string()),
                None => PipelineError::lookup("output", index.to_string()),
            });
        }
        let port = self
            .outputs
            .get(index)
            .ok_or_else(|| PipelineError::lookup("output", index.to_string()))?;
        first_node(port)
    }

    /// Evaluates the first output over `[0, extent)` per dimension.
    pub fn realize(&self, extents: &[usize]) -> Result<Realization> {
        if self.phase != Phase::Scheduled {
            return Err(PipelineError::sequence("realize", self.phase));
        }
        graph::realize(&self.output_at(0)?, extents)
    }
}

impl fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("shape", &self.shape)
            .field("params", &self.params.len())
            .field("inputs", &self.input_decls.len())
            .field("outputs", &self.output_decls.len())
            .finish()
    }
}

fn first_node(port: &Port) -> Result<Node> {
    port.nodes()?.first().cloned().ok_or_else(|| PipelineError::ArityMismatch {
        port: port.name().to_string(),
        expected: 1,
        found: 0,
    })
}

fn output_roots(outputs: &[Port]) -> Vec<Node> {
    outputs
        .iter()
        .filter_map(|p| p.nodes().ok())
        .flat_map(|nodes| nodes.iter().cloned())
        .collect()
}

/// Distributes single-stage results over the node outputs not yet set.
fn fill_single_stage_outputs(label: &str, outputs: &mut Vec<Port>, nodes: Vec<Node>) -> Result<()> {
    if outputs.is_empty() {
        if nodes.is_empty() {
            return Err(PipelineError::InternalContract(format!(
                "'{}' declares no outputs and its builder returned no nodes",
                label
            )));
        }
        log::warn!("'{}' declares no outputs, using {} implicit output(s)", label, nodes.len());
        for node in nodes {
            let mut port = Port::new(
                node.name(),
                Direction::Output,
                PortKind::Node,
                node.types(),
                node.dimensions(),
                1,
                false,
                None,
            );
            port.populate_nodes(vec![node])?;
            outputs.push(port);
        }
        return Ok(());
    }

    let mut pending: Vec<&mut Port> = outputs
        .iter_mut()
        .filter(|p| p.kind() == PortKind::Node && !p.is_bound())
        .collect();
    let expected: usize = pending.iter().map(|p| p.arity()).sum();
    if nodes.len() != expected {
        return Err(PipelineError::ArityMismatch {
            port: format!("outputs of '{}'", label),
            expected,
            found: nodes.len(),
        });
    }

    let mut nodes = nodes.into_iter();
    for port in pending.iter_mut() {
        let entries: Vec<Node> = nodes.by_ref().take(port.arity()).collect();
        port.populate_nodes(entries)?;
    }
    Ok(())
}

fn check_outputs_populated(outputs: &mut [Port]) -> Result<()> {
    for port in outputs.iter_mut().filter(|p| !p.is_bound()) {
        if port.arity() == 0 {
            match port.kind() {
                PortKind::Node => port.populate_nodes(Vec::new())?,
                PortKind::Scalar => port.populate_values(Vec::new())?,
            }
            continue;
        }
        return Err(PipelineError::ArityMismatch {
            port: port.name().to_string(),
            expected: port.arity(),
            found: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScalarType;
    use crate::graph::Var;
    use crate::pipeline::{PipelineView, SingleStage, TwoStage};

    struct Both;

    impl SingleStage for Both {
        fn build(&mut self, _ctx: &mut BuildContext<'_>) -> anyhow::Result<Vec<Node>> {
            Ok(Vec::new())
        }
    }

    impl TwoStage for Both {
        fn generate(&mut self, _ctx: &mut BuildContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }

        fn schedule(&mut self, _ctx: &ScheduleContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl Generator for Both {
        fn describe(&self, _schema: &mut SchemaBuilder) {}

        fn as_single_stage(&mut self) -> Option<&mut dyn SingleStage> {
            Some(self)
        }

        fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
            Some(self)
        }
    }

    struct Neither;

    impl Generator for Neither {
        fn describe(&self, _schema: &mut SchemaBuilder) {}
    }

    /// Returns its input plus one, with no declared outputs.
    struct Implicit;

    impl SingleStage for Implicit {
        fn build(&mut self, ctx: &mut BuildContext<'_>) -> anyhow::Result<Vec<Node>> {
            let x = Var::new("x");
            let input = ctx.input_node("input")?;
            let plus_one = Node::new("plus_one");
            plus_one.define_value(&[x.clone()], input.at([&x]) + 1.0f32)?;
            Ok(vec![plus_one])
        }
    }

    impl Generator for Implicit {
        fn describe(&self, schema: &mut SchemaBuilder) {
            schema.input(PortDecl::node("input", ScalarType::Float(32), 1));
        }

        fn as_single_stage(&mut self) -> Option<&mut dyn SingleStage> {
            Some(self)
        }
    }

    #[test]
    fn test_exactly_one_build_shape() {
        let generators: Vec<Box<dyn Generator>> = vec![Box::new(Both), Box::new(Neither)];
        for generator in generators {
            assert!(matches!(
                PipelineDefinition::new(generator),
                Err(PipelineError::InternalContract(_))
            ));
        }
    }

    #[test]
    fn test_schema_registration_runs_once() {
        let mut definition = PipelineDefinition::new(Box::new(Implicit)).unwrap();
        assert!(matches!(definition.build_schema(), Err(PipelineError::InternalContract(_))));
        assert_eq!(definition.phase(), Phase::SchemaBuilt);
    }

    #[test]
    fn test_single_stage_creates_implicit_outputs() {
        let mut definition = PipelineDefinition::new(Box::new(Implicit)).unwrap();
        definition.build_body().unwrap();

        assert_eq!(definition.phase(), Phase::Scheduled);
        assert_eq!(definition.output_node("plus_one").unwrap().name(), "plus_one");
        assert_eq!(definition.inputs()[0].nodes().unwrap()[0].name(), "input");
        assert_eq!(definition.signature().unwrap().output_names(), vec!["plus_one"]);
    }

    #[test]
    fn test_configure_unknown_parameter_is_lookup_error() {
        let mut definition = PipelineDefinition::new(Box::new(Implicit)).unwrap();
        assert!(matches!(
            definition.configure("gain", "2"),
            Err(PipelineError::Lookup { .. })
        ));
    }
}
