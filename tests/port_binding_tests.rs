use pipegen::core::ScalarType;
use pipegen::generators::MetadataTester;
use pipegen::graph::{Buffer, Expr, Node};
use pipegen::pipeline::{Phase, PipelineDefinition};
use pipegen::port::{Binding, InputGroup, PortKind};
use pipegen::PipelineError;

fn image(name: &str, ty: ScalarType, extents: &[usize]) -> Node {
    Node::from_buffer(name, Buffer::from_fn(ty, extents, |c| (c[0] + c[1]) as f64))
}

fn tester() -> PipelineDefinition {
    PipelineDefinition::new(Box::new(MetadataTester)).unwrap()
}

/// One valid group per input of the default `metadata_tester` configuration.
fn default_groups() -> Vec<InputGroup> {
    vec![
        vec![image("typed", ScalarType::Float(32), &[3, 3]).into()],
        vec![Binding::from(2.0f32)],
        vec![
            image("a", ScalarType::UInt(8), &[3, 3]).into(),
            image("b", ScalarType::UInt(8), &[3, 3]).into(),
        ],
        vec![Binding::from(10), Binding::from(20)],
    ]
}

#[test]
fn test_array_input_follows_its_count_parameter() {
    let mut definition = tester();
    definition.configure("array_count", "3").unwrap();

    let mut groups = default_groups();
    groups[2] = ["a", "b", "c"]
        .iter()
        .map(|name| Binding::from(image(name, ScalarType::UInt(8), &[3, 3])))
        .collect();
    definition.bind_inputs(groups).unwrap();

    let port = &definition.inputs()[2];
    assert_eq!(port.arity(), 3);
    assert!(port.is_array());
    let names: Vec<String> = port.nodes().unwrap().iter().map(Node::name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(port.entry_name(2), "array_input_2");
}

#[test]
fn test_wrong_entry_count_is_arity_mismatch() {
    let mut definition = tester();
    definition.configure("array_count", "3").unwrap();

    let err = definition.bind_inputs(default_groups()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ArityMismatch { ref port, expected: 3, found: 2 } if port == "array_input"
    ));
    assert_eq!(definition.phase(), Phase::SchemaBuilt);
    assert!(definition.inputs().is_empty());
}

#[test]
fn test_scalar_for_node_port_is_kind_mismatch() {
    let mut definition = tester();
    let mut groups = default_groups();
    groups[0] = vec![Binding::from(1.0f32)];

    assert!(matches!(
        definition.bind_inputs(groups),
        Err(PipelineError::KindMismatch { ref port, .. }) if port == "typed_input"
    ));

    let mut groups = default_groups();
    groups[1] = vec![image("oops", ScalarType::Float(32), &[3, 3]).into()];
    assert!(matches!(
        definition.bind_inputs(groups),
        Err(PipelineError::KindMismatch { ref port, .. }) if port == "scalar_in"
    ));
}

#[test]
fn test_node_shape_is_checked() {
    let mut definition = tester();

    let mut groups = default_groups();
    groups[0] = vec![image("typed", ScalarType::Float(32), &[3, 3, 3]).into()];
    assert!(matches!(definition.bind_inputs(groups), Err(PipelineError::KindMismatch { .. })));

    // input_type is float32 by default
    let mut groups = default_groups();
    groups[0] = vec![image("typed", ScalarType::UInt(8), &[3, 3]).into()];
    assert!(matches!(definition.bind_inputs(groups), Err(PipelineError::KindMismatch { .. })));

    definition.configure("input_type", "uint8").unwrap();
    let mut groups = default_groups();
    groups[0] = vec![image("typed", ScalarType::UInt(8), &[3, 3]).into()];
    definition.bind_inputs(groups).unwrap();
    assert_eq!(definition.inputs()[0].types(), &[ScalarType::UInt(8)]);
}

#[test]
fn test_scalar_bindings_are_cast_and_range_checked() {
    let mut definition = tester();

    let mut groups = default_groups();
    groups[1] = vec![Binding::from(20.0f32)];
    assert!(matches!(definition.bind_inputs(groups), Err(PipelineError::Range { .. })));

    let mut groups = default_groups();
    groups[1] = vec![Binding::from(5)];
    definition.bind_inputs(groups).unwrap();

    let scalar_in = &definition.inputs()[1];
    assert_eq!(scalar_in.kind(), PortKind::Scalar);
    let value = &scalar_in.values().unwrap()[0];
    assert_eq!(value.ty().unwrap(), ScalarType::Float(32));
    assert_eq!(value.as_const(), Some(5.0));
}

#[test]
fn test_runtime_scalar_expressions_skip_the_range_check() {
    let mut definition = tester();
    let mut groups = default_groups();
    groups[1] = vec![Binding::from(Expr::param("outer_gain", ScalarType::Float(32)))];

    definition.bind_inputs(groups).unwrap();
    assert!(definition.inputs()[1].values().unwrap()[0].as_const().is_none());
}

#[test]
fn test_zero_length_array_binds_empty_group() {
    let mut definition = tester();
    definition.configure("array_count", "0").unwrap();

    let mut groups = default_groups();
    groups[2] = Vec::new();
    definition.bind_inputs(groups).unwrap();

    definition.build_body().unwrap();
    assert!(definition.output_nodes("array_output").unwrap().is_empty());
    let signature = definition.signature().unwrap();
    assert!(!signature.input_names().iter().any(|n| n.starts_with("array_input")));
}

#[test]
fn test_bound_values_flow_into_the_body() {
    let mut definition = tester();
    definition.bind_inputs(default_groups()).unwrap();
    definition.build_body().unwrap();
    definition.schedule().unwrap();

    // output = (typed, typed * gain * scalar_in) with gain 1.5 and scalar_in 2
    let output = definition.realize(&[3, 3]).unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0].get(&[2, 1]), Some(3.0));
    assert_eq!(output[1].get(&[2, 1]), Some(9.0));

    let total = definition.output_value("total").unwrap();
    assert_eq!(total.ty().unwrap(), ScalarType::Float(32));

    let arrays = definition.output_nodes("array_output").unwrap();
    let names: Vec<String> = arrays.iter().map(Node::name).collect();
    assert_eq!(names, vec!["array_output_0", "array_output_1"]);
}
