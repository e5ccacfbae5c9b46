use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod generator_meta;
use generator_meta::parse_generator_info;

/// Registers a `Default` generator type with the process-wide registry.
///
/// ```ignore
/// #[derive(Default, RegisterGenerator)]
/// #[generator(name = "pyramid")]
/// pub struct Pyramid { /* ... */ }
/// ```
#[proc_macro_derive(RegisterGenerator, attributes(generator))]
pub fn derive_register_generator(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_generator_info(&input) {
        Ok(info) => info,
        Err(e) => return e.write_errors().into(),
    };

    let struct_name = &input.ident;
    let generator_name = &info.name;

    let with_wrapper = info.wrapper.as_ref().map(|wrapper| {
        quote! { .with_wrapper(#wrapper) }
    });

    let mod_name = syn::Ident::new(
        &format!("__generator_registration_{}", struct_name.to_string().to_lowercase()),
        struct_name.span(),
    );

    let expanded = quote! {
        #[doc(hidden)]
        mod #mod_name {
            use super::*;

            fn make_generator() -> Box<dyn crate::pipeline::Generator> {
                Box::new(<#struct_name as ::core::default::Default>::default())
            }

            fn create_entry() -> crate::registry::RegistryEntry {
                crate::registry::RegistryEntry::new(#generator_name, make_generator)
                    #with_wrapper
            }

            ::inventory::submit! {
                crate::registry::StaticRegistration(create_entry)
            }
        }
    };

    TokenStream::from(expanded)
}
