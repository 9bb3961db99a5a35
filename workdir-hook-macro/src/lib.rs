//! `#[interpose(symbol = "...")]`: turns a hook-logic function into an
//! exported C symbol that forwards to the next definition in the dynamic
//! linker's resolution order.
//!
//! The logic function receives the resolved original as its first argument:
//!
//! ```ignore
//! #[interpose(symbol = "getcwd")]
//! fn log_getcwd(
//!     original: unsafe extern "C" fn(buf: *mut c_char, size: size_t) -> *mut c_char,
//!     buf: *mut c_char,
//!     size: size_t,
//! ) -> *mut c_char {
//!     unsafe { original(buf, size) }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, AttributeArgs, Error, FnArg, ItemFn, Lit, LitByteStr, Meta, NestedMeta,
    PatType, Result, ReturnType, Signature,
};

fn parse_interpose_attributes(args: &[NestedMeta]) -> Result<String> {
    let mut symbol = None;

    for arg in args {
        let NestedMeta::Meta(Meta::NameValue(nv)) = arg else {
            return Err(Error::new_spanned(
                arg,
                "expected name-value attribute, like symbol = \"...\"",
            ));
        };
        if !nv.path.is_ident("symbol") {
            return Err(Error::new_spanned(
                &nv.path,
                "unknown attribute key, expected 'symbol'",
            ));
        }
        let Lit::Str(lit) = &nv.lit else {
            return Err(Error::new_spanned(
                &nv.lit,
                "expected a string literal for symbol",
            ));
        };
        if symbol.is_some() {
            return Err(Error::new_spanned(nv, "'symbol' given more than once"));
        }
        let value = lit.value();
        if syn::parse_str::<syn::Ident>(&value).is_err() {
            return Err(Error::new_spanned(lit, "symbol must be a C identifier"));
        }
        symbol = Some(value);
    }

    symbol.ok_or_else(|| {
        Error::new(
            Span::call_site(),
            "missing required attribute 'symbol = \"...\"'",
        )
    })
}

fn validate_logic_fn_signature(sig: &Signature) -> Result<()> {
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &sig.generics,
            "hook logic function cannot be generic",
        ));
    }

    match sig.inputs.first() {
        None => Err(Error::new_spanned(
            &sig.inputs,
            "hook logic function must accept at least one argument (the original function pointer)",
        )),
        Some(FnArg::Typed(PatType { ty, .. })) => match **ty {
            syn::Type::BareFn(_) => Ok(()),
            _ => Err(Error::new_spanned(
                ty,
                "the first argument must be a function pointer, e.g. `original: unsafe extern \"C\" fn(...) -> ...`",
            )),
        },
        Some(receiver @ FnArg::Receiver(_)) => Err(Error::new_spanned(
            receiver,
            "hook logic function cannot take 'self'",
        )),
    }
}

fn expand(args: &[NestedMeta], logic_fn: ItemFn) -> Result<proc_macro2::TokenStream> {
    let symbol = parse_interpose_attributes(args)?;
    validate_logic_fn_signature(&logic_fn.sig)?;

    let logic_ident = &logic_fn.sig.ident;
    let forwarded_inputs = logic_fn.sig.inputs.iter().skip(1).collect::<Vec<_>>();

    let mut forwarded_idents = Vec::with_capacity(forwarded_inputs.len());
    let mut forwarded_types = Vec::with_capacity(forwarded_inputs.len());
    for arg in &forwarded_inputs {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            return Err(Error::new_spanned(arg, "expected a typed argument like 'name: Type'"));
        };
        forwarded_idents.push(pat);
        forwarded_types.push(ty);
    }

    let output = match &logic_fn.sig.output {
        ReturnType::Default => quote! { -> () },
        ReturnType::Type(_, ty) => quote! { -> #ty },
    };
    let original_fn_type = quote! { unsafe extern "C" fn(#(#forwarded_types),*) #output };

    let export_ident = format_ident!("{}", symbol);
    let slot_ident = format_ident!("{}_ORIGINAL", symbol.to_uppercase());
    let resolve_ident = format_ident!("__resolve_{}_original", symbol);
    let symbol_bytes = LitByteStr::new(format!("{symbol}\0").as_bytes(), Span::call_site());

    let call_logic = quote! { #logic_ident(original, #(#forwarded_idents),*) };
    let call_logic = if logic_fn.sig.unsafety.is_some() {
        quote! { unsafe { #call_logic } }
    } else {
        call_logic
    };

    Ok(quote! {
        #logic_fn

        // Holds the next definition of the symbol; written once, never cleared.
        static #slot_ident: ::workdir_hook::NextSymbol<#original_fn_type> =
            unsafe { ::workdir_hook::NextSymbol::new(#symbol_bytes) };

        // Installs diagnostics before resolving.
        #[::workdir_hook::ctor::ctor]
        fn #resolve_ident() {
            ::workdir_hook::diagnostics::init_from_env();
            if let Err(err) = #slot_ident.resolve() {
                ::workdir_hook::tracing::debug!(%err, "load-time resolution failed, retrying on first call");
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn #export_ident(#(#forwarded_inputs),*) #output {
            let original = #slot_ident.ensure();
            #call_logic
        }
    })
}

#[proc_macro_attribute]
pub fn interpose(args: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = parse_macro_input!(args as AttributeArgs);
    let logic_fn = parse_macro_input!(item as ItemFn);

    match expand(&attr_args, logic_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
