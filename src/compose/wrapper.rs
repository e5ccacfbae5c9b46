use crate::config::ParamValues;
use crate::core::Target;
use crate::error::{PipelineError, Result};
use crate::graph::{Expr, Node, Realization};
use crate::pipeline::{Generator, PipelineDefinition, TARGET_PARAM};
use crate::port::InputGroup;
use crate::registry::GeneratorRegistry;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A built inner pipeline used as a node inside another pipeline's body.
///
/// Clones share the one inner instance; it is never rebuilt. Its outputs
/// can be realized only after [`Composed::schedule`] has run once, whatever
/// the inner build shape.
#[derive(Clone)]
pub struct Composed {
    inner: Rc<RefCell<PipelineDefinition>>,
    scheduled: Rc<Cell<bool>>,
    first: Node,
}

impl Composed {
    /// Creates the inner instance from `factory` and builds its body against `inputs`.
    pub fn new(
        target: &Target,
        factory: &dyn Fn() -> Box<dyn Generator>,
        values: &ParamValues,
        inputs: Vec<InputGroup>,
    ) -> Result<Self> {
        Self::with_generator(target, factory(), values, inputs)
    }

    /// Like [`Composed::new`], with the factory looked up by name.
    pub fn from_registry(
        registry: &GeneratorRegistry,
        name: &str,
        target: &Target,
        values: &ParamValues,
        inputs: Vec<InputGroup>,
    ) -> Result<Self> {
        let factory = registry.factory(name)?;
        let mut definition = PipelineDefinition::new(factory())?.with_name(name);
        Self::prepare(&mut definition, target, values, inputs)?;
        Self::finish(definition)
    }

    pub fn with_generator(
        target: &Target,
        generator: Box<dyn Generator>,
        values: &ParamValues,
        inputs: Vec<InputGroup>,
    ) -> Result<Self> {
        let mut definition = PipelineDefinition::new(generator)?;
        Self::prepare(&mut definition, target, values, inputs)?;
        Self::finish(definition)
    }

    fn prepare(
        definition: &mut PipelineDefinition,
        target: &Target,
        values: &ParamValues,
        inputs: Vec<InputGroup>,
    ) -> Result<()> {
        definition.set_param_values(values)?;
        // The outer target always wins over a target in `values`.
        definition.configure(TARGET_PARAM, &target.to_string())?;
        definition.bind_inputs(inputs)?;
        definition.build_body()
    }

    fn finish(definition: PipelineDefinition) -> Result<Self> {
        let first = definition.output_at(0)?;
        Ok(Self {
            inner: Rc::new(RefCell::new(definition)),
            scheduled: Rc::new(Cell::new(false)),
            first,
        })
    }

    /// Applies schedule-scope values, then runs the inner schedule step. Runs once.
    ///
    /// A single-stage inner pipeline was scheduled by its builder; it accepts
    /// only an empty value map.
    pub fn schedule(&self, values: &ParamValues) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if self.scheduled.get() {
            return Err(PipelineError::sequence("schedule a composition twice", inner.phase()));
        }
        if inner.is_two_stage() {
            inner.set_param_values(values)?;
            inner.schedule()?;
        } else if !values.is_empty() {
            return Err(PipelineError::sequence("apply schedule values", inner.phase()));
        }
        self.scheduled.set(true);
        Ok(())
    }

    /// The first declared output.
    pub fn node(&self) -> Node {
        self.first.clone()
    }

    pub fn output(&self, name: &str) -> Result<Node> {
        self.inner.borrow().output_node(name)
    }

    pub fn outputs(&self, name: &str) -> Result<Vec<Node>> {
        self.inner.borrow().output_nodes(name)
    }

    pub fn output_at(&self, index: usize) -> Result<Node> {
        self.inner.borrow().output_at(index)
    }

    pub fn output_value(&self, name: &str) -> Result<Expr> {
        self.inner.borrow().output_value(name)
    }

    /// Value 0 of the first output at the given coordinates.
    pub fn at<E: Into<Expr>>(&self, args: impl IntoIterator<Item = E>) -> Expr {
        self.first.at(args)
    }

    /// Evaluates the first output; fails until [`Composed::schedule`] has run.
    pub fn realize(&self, extents: &[usize]) -> Result<Realization> {
        let inner = self.inner.borrow();
        if !self.scheduled.get() {
            return Err(PipelineError::sequence("realize an unscheduled composition", inner.phase()));
        }
        inner.realize(extents)
    }

    pub fn target(&self) -> Target {
        self.inner.borrow().target()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.get()
    }

    /// Number of wrappers sharing the inner instance.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl From<&Composed> for Node {
    fn from(composed: &Composed) -> Self {
        composed.node()
    }
}

impl From<Composed> for Node {
    fn from(composed: Composed) -> Self {
        composed.first
    }
}

impl fmt::Debug for Composed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composed")
            .field("inner", &*self.inner.borrow())
            .field("scheduled", &self.scheduled.get())
            .field("first", &self.first)
            .finish()
    }
}
