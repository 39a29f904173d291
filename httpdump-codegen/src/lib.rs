use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;
use std::path::Path;

const DUMP_EXTENSIONS: &[&str] = &["json", "jsonl", "ndjson"];

/// Turns a function into a test that replays a dump log and fails on any divergence.
///
/// ```ignore
/// fn configure(config: &mut httpdump::ReplayConfiguration) {
///     config.set_target("http://localhost:1333");
/// }
///
/// #[replay_test("fixtures/hello.json", configure)]
/// fn hello_still_works() {}
/// ```
///
/// The function body runs after the configuration and before the replay.
#[proc_macro_attribute]
pub fn replay_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let signature = &input.sig;
    let block = &input.block;

    let dump_path: String;

    if args.len() < 2 {
        return quote! {
            compile_error!("A dump log path and a configuration function should be passed to the macro");
        }
        .into();
    }

    if let syn::NestedMeta::Lit(syn::Lit::Str(parsed_dump_path)) = &args[0] {
        dump_path = parsed_dump_path.value();
        if let Err(stream) = validate_dump_path(&dump_path, parsed_dump_path.span()) {
            return stream.into();
        }
    } else {
        return quote! {
            compile_error!("The first argument should be a string literal!");
        }
        .into();
    }

    let configuration_function;
    if let syn::NestedMeta::Meta(syn::Meta::Path(function_path)) = &args[1] {
        configuration_function = function_path;
    } else {
        let error = quote! {
            compile_error!("The second argument should be a configuration function!");
        };

        return error.into();
    }

    let output = quote! {
        #[test]
        #signature {
            let mut __replay_configuration = httpdump::ReplayConfiguration::new(#dump_path);
            #configuration_function(&mut __replay_configuration);

            #block

            match httpdump::replay_blocking(__replay_configuration) {
                Ok(summary) => {
                    if summary.divergent > 0 || summary.failed > 0 {
                        panic!("Replay of {} diverged: {}", #dump_path, summary);
                    }
                }
                Err(e) => panic!("Replay error: {}", e),
            }
        }
    };

    TokenStream::from(output)
}

fn validate_dump_path<P: AsRef<Path>>(
    path: P,
    span: Span,
) -> Result<(), proc_macro2::TokenStream> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("");

    if !DUMP_EXTENSIONS.contains(&extension) {
        return Err(quote_spanned! {span=>
            compile_error!("The path should point to a .json, .jsonl or .ndjson dump log!");
        });
    }

    Ok(())
}
