mod utils;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{Error, ItemFn, parse_macro_input};

/// Runs an `async` routine as the program entry point.
///
/// The function may take a `Co` and an `Args` parameter and must return
/// `Result<_, strand::Error>`. It is driven to completion on a fresh event
/// loop; a failure becomes the error returned by `main`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(Span::call_site(), "#[strand::main] takes no arguments")
            .to_compile_error()
            .into();
    }

    let input = parse_macro_input!(item as ItemFn);
    let sig = &input.sig;

    if sig.asyncness.is_none() {
        return Error::new_spanned(
            sig.fn_token,
            "#[strand::main] must be used on an async function",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return Error::new_spanned(&sig.ident, "#[strand::main] must be used on fn main")
            .to_compile_error()
            .into();
    }

    let inner = format_ident!("__strand_main");
    let routine = match utils::routine_fn(&input, &inner) {
        Ok(tokens) => tokens,
        Err(err) => return err.to_compile_error().into(),
    };

    let attrs = &input.attrs;
    let vis = &input.vis;

    quote! {
        #(#attrs)*
        #vis fn main() -> ::core::result::Result<(), ::strand::Error> {
            #routine

            ::strand::block_on(::strand::routine(#inner), ()).map(|_| ())
        }
    }
    .into()
}

/// Runs an `async` routine as a test.
///
/// The test fails if the routine fails or never completes.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let sig = &input.sig;

    if sig.asyncness.is_none() {
        return Error::new_spanned(
            sig.fn_token,
            "#[strand::test] must be used on an async function",
        )
        .to_compile_error()
        .into();
    }

    let inner = format_ident!("__strand_test");
    let routine = match utils::routine_fn(&input, &inner) {
        Ok(tokens) => tokens,
        Err(err) => return err.to_compile_error().into(),
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let name = &sig.ident;

    quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #name() {
            #routine

            if let ::core::result::Result::Err(err) =
                ::strand::block_on(::strand::routine(#inner), ())
            {
                ::core::panic!("routine failed: {err}");
            }
        }
    }
    .into()
}
