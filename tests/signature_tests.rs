use pipegen::config::param_values;
use pipegen::core::ScalarType;
use pipegen::generators::{InvertImage, MetadataTester, Pyramid, WrapUser, Wraptest};
use pipegen::graph::{Buffer, Node};
use pipegen::pipeline::{ArgumentKind, Backend, FinalizedPipeline, PipelineDefinition, USER_CONTEXT_ARG};
use pipegen::registry::GeneratorRegistry;
use pipegen::PipelineError;

fn link_generators() {
    let _ = (InvertImage, MetadataTester, Pyramid, WrapUser::default(), Wraptest);
}

fn create(name: &str, values: &[(&str, &str)]) -> PipelineDefinition {
    link_generators();
    GeneratorRegistry::global()
        .create(name, &param_values(values.iter().copied()))
        .unwrap()
}

/// Records what it was handed and answers with the output argument names.
#[derive(Default)]
struct RecordingBackend {
    compiled: Vec<String>,
}

impl Backend for RecordingBackend {
    type Output = Vec<String>;

    fn compile(&mut self, pipeline: &FinalizedPipeline) -> anyhow::Result<Vec<String>> {
        self.compiled.push(pipeline.name.clone().unwrap_or_default());
        Ok(pipeline
            .signature
            .output_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}

struct RefusingBackend;

impl Backend for RefusingBackend {
    type Output = ();

    fn compile(&mut self, _pipeline: &FinalizedPipeline) -> anyhow::Result<()> {
        anyhow::bail!("no code generator for this target")
    }
}

#[test]
fn test_wraptest_signature_order() {
    let definition = create("wraptest", &[]);
    let signature = definition.signature().unwrap();

    assert_eq!(
        signature.argument_names(),
        vec!["target", "input", "float_arg", "int_arg", "f_0", "f_1", "g"]
    );

    let float_arg = &signature.inputs[1];
    assert_eq!(float_arg.kind, ArgumentKind::Scalar);
    assert_eq!(float_arg.ty, ScalarType::Float(32));
    assert_eq!(float_arg.default, Some(1.0));
    assert_eq!((float_arg.min, float_arg.max), (Some(0.0), Some(100.0)));

    let input = &signature.inputs[0];
    assert_eq!(input.kind, ArgumentKind::Buffer);
    assert_eq!(input.dimensions, 3);
    assert_eq!(signature.outputs[1].ty, ScalarType::Float(32));
}

#[test]
fn test_signature_tracks_configuration() {
    let mut definition = create("wraptest", &[("output_type", "int16")]);
    assert_eq!(definition.signature().unwrap().outputs[1].ty, ScalarType::Int(16));

    definition.configure("input_type", "float64").unwrap();
    let signature = definition.signature().unwrap();
    assert_eq!(signature.inputs[0].ty, ScalarType::Float(64));
    assert_eq!(signature.outputs[0].ty, ScalarType::Float(64));
}

#[test]
fn test_pyramid_levels_expand() {
    let mut definition = create("pyramid", &[("levels", "3")]);
    assert_eq!(
        definition.signature().unwrap().output_names(),
        vec!["pyramid_0", "pyramid_1", "pyramid_2"]
    );

    definition.build_body().unwrap();
    definition.schedule().unwrap();
    let levels: Vec<String> = definition
        .output_nodes("pyramid")
        .unwrap()
        .iter()
        .map(Node::name)
        .collect();
    assert_eq!(levels, vec!["pyramid_0", "pyramid_1", "pyramid_2"]);
}

#[test]
fn test_pyramid_levels_are_averaged() {
    let mut definition = create("pyramid", &[("levels", "2")]);
    let input = Node::from_buffer(
        "input",
        Buffer::from_fn(ScalarType::Float(32), &[4, 4], |c| (c[0] + 4 * c[1]) as f64),
    );
    definition.bind_inputs(vec![vec![input.into()]]).unwrap();
    definition.build_body().unwrap();
    definition.schedule().unwrap();

    let level_1 = pipegen::graph::realize(&definition.output_nodes("pyramid").unwrap()[1], &[2, 2]).unwrap();
    // mean of 0, 1, 4 and 5
    assert_eq!(level_1[0].get(&[0, 0]), Some(2.5));
    assert_eq!(level_1[0].get(&[1, 1]), Some(12.5));
}

#[test]
fn test_metadata_tester_names() {
    let definition = create("metadata_tester", &[]);
    let signature = definition.signature().unwrap();

    assert_eq!(
        signature.input_names(),
        vec![
            "typed_input",
            "scalar_in",
            "array_input_0",
            "array_input_1",
            "array_scalar_0",
            "array_scalar_1"
        ]
    );
    assert_eq!(
        signature.output_names(),
        vec!["output_0", "output_1", "array_output_0", "array_output_1", "total"]
    );

    let total = &signature.outputs[4];
    assert_eq!(total.kind, ArgumentKind::Buffer);
    assert_eq!(total.dimensions, 0);
}

#[test]
fn test_user_context_argument() {
    let definition = create("invert_image", &[("target", "x86-64-linux-user_context")]);
    let signature = definition.signature().unwrap();

    assert_eq!(signature.argument_names(), vec!["target", USER_CONTEXT_ARG, "input", "inverted"]);
    assert_eq!(signature.inputs[0].ty, ScalarType::Handle);
}

#[test]
fn test_signature_json() {
    let definition = create("wraptest", &[("target", "arm-64-android-neon")]);
    let json = serde_json::to_value(definition.signature().unwrap()).unwrap();

    assert_eq!(json["target"], "arm-64-android-neon");
    assert_eq!(json["inputs"][0]["name"], "input");
    assert_eq!(json["inputs"][0]["kind"], "buffer");
    assert_eq!(json["inputs"][0]["type"], "uint8");
    assert_eq!(json["inputs"][1]["default"], 1.0);
    assert!(json["inputs"][0].get("default").is_none());
    assert_eq!(json["outputs"][2]["type"], "int16");
}

#[test]
fn test_backend_receives_finalized_pipeline() {
    let mut definition = create("wraptest", &[]);
    let mut backend = RecordingBackend::default();
    assert!(matches!(
        definition.compile_with(&mut backend),
        Err(PipelineError::Sequence { .. })
    ));

    definition.build_body().unwrap();
    definition.schedule().unwrap();
    let outputs = definition.compile_with(&mut backend).unwrap();

    assert_eq!(outputs, vec!["f_0", "f_1", "g"]);
    assert_eq!(backend.compiled, vec!["wraptest"]);

    let finalized = definition.finalize().unwrap();
    let names: Vec<String> = finalized.output_nodes().iter().map(Node::name).collect();
    assert_eq!(names, vec!["f", "g"]);
}

#[test]
fn test_backend_failure_is_a_body_error() {
    let mut definition = create("invert_image", &[]);
    definition.build_body().unwrap();

    let err = definition.compile_with(&mut RefusingBackend).unwrap_err();
    assert!(matches!(err, PipelineError::Body(_)));
    assert!(err.to_string().contains("no code generator"));
}
