use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, FnArg, Ident, ItemFn, ReturnType};

/// Rewrites the annotated function as a nested `async fn` named `name` with
/// the full routine signature `(Co, Args) -> Result<_, Error>`.
///
/// Missing parameters are filled in with wildcards.
pub(crate) fn routine_fn(input: &ItemFn, name: &Ident) -> syn::Result<TokenStream> {
    let sig = &input.sig;

    if sig.inputs.len() > 2 {
        return Err(Error::new_spanned(
            &sig.inputs,
            "a routine takes at most two parameters: `Co` and `Args`",
        ));
    }

    let mut params = sig
        .inputs
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(pat) => Ok(quote!(#pat)),
            FnArg::Receiver(receiver) => Err(Error::new_spanned(
                receiver,
                "a routine can not take `self`",
            )),
        })
        .collect::<syn::Result<Vec<_>>>()?;

    if params.is_empty() {
        params.push(quote!(_: ::strand::Co));
    }
    if params.len() == 1 {
        params.push(quote!(_: ::strand::Args));
    }

    let output = match &sig.output {
        ReturnType::Default => {
            return Err(Error::new_spanned(
                sig.fn_token,
                "a routine must return `Result<_, strand::Error>`",
            ));
        }
        output => output,
    };

    let block = &input.block;

    Ok(quote! {
        async fn #name(#(#params),*) #output #block
    })
}
