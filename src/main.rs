use anyhow::Context;
use pipegen::config::parse_assignments;
use pipegen::generators::{InvertImage, MetadataTester, Pyramid, WrapUser, Wraptest};
use pipegen::registry::GeneratorRegistry;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Force the statically registered generators into the binary
    let _ = (
        InvertImage,
        MetadataTester,
        Pyramid,
        WrapUser::default(),
        Wraptest,
    );

    let registry = GeneratorRegistry::global();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some((name, assignments)) = args.split_first() else {
        println!("pipegen - parameterized pipeline generators");
        println!("usage: pipegen <generator> [name=value ...]\n");
        println!("Registered generators:");
        for name in registry.enumerate() {
            println!("  {}", name);
        }
        return Ok(());
    };

    let values = parse_assignments(assignments)?;
    let mut definition = registry
        .create(name, &values)
        .with_context(|| format!("Failed to create generator '{}'", name))?;

    let metadata = registry.metadata(name)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    definition.build_body().context("Body construction failed")?;
    if definition.is_two_stage() {
        definition.schedule().context("Schedule step failed")?;
    }

    let finalized = definition.finalize()?;
    println!("{}", serde_json::to_string_pretty(&finalized.signature)?);
    for node in finalized.output_nodes() {
        println!("{} {:?}", node.name(), node.directives());
    }
    Ok(())
}
