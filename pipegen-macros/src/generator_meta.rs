use darling::FromAttributes;
use syn::DeriveInput;

/// Parsed attributes from #[generator(...)]
#[derive(Debug, FromAttributes)]
#[darling(attributes(generator))]
pub struct GeneratorMetaArgs {
    pub name: String,

    /// Name of the composition wrapper type, if one is generated for this generator
    #[darling(default)]
    pub wrapper: Option<String>,
}

pub fn parse_generator_info(input: &DeriveInput) -> darling::Result<GeneratorMetaArgs> {
    let args = GeneratorMetaArgs::from_attributes(&input.attrs)?;

    if !is_valid_name(&args.name) {
        return Err(darling::Error::custom(format!(
            "generator name '{}' must match [A-Za-z][A-Za-z0-9_]* and may not contain \"__\"",
            args.name
        )));
    }

    Ok(args)
}

// Mirrors pipegen::core::names::validate_name; duplicated because a proc-macro
// crate cannot depend on the crate it expands into.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.contains("__")
}
