//! SyncBench Macros
//!
//! Procedural macro for suite declaration and registration.
//!
//! ## Macros
//!
//! - `#[syncbench::suite]` - Turn an inherent impl block into a registered suite
//! - `#[case(...)]` - Per-case overrides inside a `#[suite]` block

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, Type, parse_macro_input};

/// Identifier prefix of benchmark cases
const CASE_PREFIX: &str = "perf_";

// ============================================================================
// Attribute Parsing Helpers
// ============================================================================

mod attr {
    use syn::meta::ParseNestedMeta;

    /// Get the attribute name as a string
    pub fn name(meta: &ParseNestedMeta) -> String {
        meta.path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default()
    }

    /// Parse a string literal attribute: `attr = "value"`
    pub fn string(meta: &ParseNestedMeta) -> syn::Result<String> {
        let value: syn::LitStr = meta.value()?.parse()?;
        Ok(value.value())
    }

    /// Parse an integer literal attribute: `attr = 42`
    pub fn int(meta: &ParseNestedMeta) -> syn::Result<i64> {
        let value: syn::LitInt = meta.value()?.parse()?;
        value.base10_parse()
    }

    /// Parse a boolean literal attribute: `attr = true`
    pub fn bool(meta: &ParseNestedMeta) -> syn::Result<bool> {
        let value: syn::LitBool = meta.value()?.parse()?;
        Ok(value.value())
    }

    /// Create an unknown attribute error
    pub fn unknown(meta: &ParseNestedMeta, name: &str) -> syn::Error {
        meta.error(format!("unknown attribute: {}", name))
    }
}

/// Declare a benchmark suite
///
/// Every method named `perf_*` taking only `&mut self` becomes a case, run
/// in declaration order. Methods may return `()` or any `Result<(), E>` with
/// `E: Into<anyhow::Error>`. Inherent `set_up` / `tear_down` methods become
/// the per-case hooks. The type must implement `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct Elementwise { a: Vec<f32>, b: Vec<f32> }
///
/// #[syncbench::suite]
/// impl Elementwise {
///     fn set_up(&mut self, device: &syncbench::Device) -> anyhow::Result<()> { ... }
///
///     #[case(repetitions = 100, warmup = 2)]
///     fn perf_add(&mut self) -> anyhow::Result<()> { ... }
///
///     fn perf_sum(&mut self) { ... }
/// }
///
/// // Custom name, no automatic registration
/// #[syncbench::suite(name = "reduce", register = false)]
/// impl Reduce { ... }
/// ```
#[proc_macro_attribute]
pub fn suite(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(args);
    let item = parse_macro_input!(item as ItemImpl);

    suite_impl(args, item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

#[derive(Default)]
struct SuiteConfig {
    name: Option<String>,
    register: Option<bool>,
}

fn parse_suite_config(args: TokenStream2) -> syn::Result<SuiteConfig> {
    let mut config = SuiteConfig::default();

    if args.is_empty() {
        return Ok(config);
    }

    let parser = syn::meta::parser(|meta| {
        let name = attr::name(&meta);
        match name.as_str() {
            "name" => config.name = Some(attr::string(&meta)?),
            "register" => config.register = Some(attr::bool(&meta)?),
            _ => return Err(attr::unknown(&meta, &name)),
        }
        Ok(())
    });

    syn::parse::Parser::parse2(parser, args)?;
    Ok(config)
}

/// Hook arity as declared by the user
#[derive(Clone, Copy)]
enum Hook {
    Absent,
    SelfOnly,
    WithDevice,
}

fn suite_impl(args: TokenStream2, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    let config = parse_suite_config(args)?;
    validate_impl(&item)?;

    let self_ty = (*item.self_ty).clone();
    let suite_name = match config.name {
        Some(name) => name,
        None => type_name(&self_ty)?,
    };

    let mut members = Vec::new();
    let mut set_up = Hook::Absent;
    let mut tear_down = Hook::Absent;

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let case_attrs = take_case_attrs(&mut method.attrs);
        let ident = method.sig.ident.to_string();

        match ident.as_str() {
            "set_up" | "tear_down" if !case_attrs.is_empty() => {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "SyncBench: hooks cannot carry #[case]",
                ));
            }
            "set_up" => {
                set_up = hook_arity(method, 2)?;
                continue;
            }
            "tear_down" => {
                tear_down = hook_arity(method, 1)?;
                continue;
            }
            _ => {}
        }

        // Configured members without the prefix are still declared, discovery skips them
        if !ident.starts_with(CASE_PREFIX) && case_attrs.is_empty() {
            continue;
        }

        validate_case_method(method)?;
        let overrides = parse_case_attrs(&case_attrs)?;
        members.push(member_tokens(&self_ty, method, &overrides));
    }

    let suite_block = suite_trait_impl(&self_ty, set_up, tear_down);

    let registration = if config.register.unwrap_or(true) {
        quote! {
            ::syncbench::internal::inventory::submit! {
                ::syncbench::SuiteDef {
                    name: #suite_name,
                    file: file!(),
                    line: line!(),
                    run_fn: ::syncbench::internal::run_suite::<#self_ty>,
                    list_fn: ::syncbench::internal::list_cases::<#self_ty>,
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        #item

        impl ::syncbench::CaseSet for #self_ty {
            fn suite_name() -> &'static str {
                #suite_name
            }

            fn members() -> ::core::result::Result<
                ::std::vec::Vec<::syncbench::Member<Self>>,
                ::syncbench::ConfigError,
            > {
                ::core::result::Result::Ok(::std::vec![#(#members),*])
            }
        }

        #suite_block

        #registration
    })
}

fn validate_impl(item: &ItemImpl) -> syn::Result<()> {
    if item.trait_.is_some() {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "SyncBench: #[suite] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "SyncBench: generic suites are not supported",
        ));
    }
    Ok(())
}

fn type_name(ty: &Type) -> syn::Result<String> {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(ty, "SyncBench: empty type path")),
        _ => Err(syn::Error::new_spanned(
            ty,
            "SyncBench: cannot derive a suite name, use #[suite(name = \"...\")]",
        )),
    }
}

fn take_case_attrs(attrs: &mut Vec<Attribute>) -> Vec<Attribute> {
    let (case, rest): (Vec<_>, Vec<_>) = attrs.drain(..).partition(|a| a.path().is_ident("case"));
    *attrs = rest;
    case
}

fn is_mut_self(arg: Option<&FnArg>) -> bool {
    matches!(
        arg,
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_some()
    )
}

fn validate_case_method(method: &ImplItemFn) -> syn::Result<()> {
    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig,
            "SyncBench: benchmark cases cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "SyncBench: benchmark cases cannot be generic",
        ));
    }
    if sig.inputs.len() != 1 || !is_mut_self(sig.inputs.first()) {
        return Err(syn::Error::new_spanned(
            sig,
            "SyncBench: benchmark cases must take exactly `&mut self`",
        ));
    }
    Ok(())
}

fn hook_arity(method: &ImplItemFn, max_inputs: usize) -> syn::Result<Hook> {
    let sig = &method.sig;
    if !is_mut_self(sig.inputs.first()) || sig.inputs.len() > max_inputs {
        let expected = if max_inputs == 2 {
            "`&mut self` and optionally `&Device`"
        } else {
            "exactly `&mut self`"
        };
        return Err(syn::Error::new_spanned(
            sig,
            format!("SyncBench: `{}` must take {}", sig.ident, expected),
        ));
    }
    Ok(if sig.inputs.len() == 2 {
        Hook::WithDevice
    } else {
        Hook::SelfOnly
    })
}

/// Parse `#[case(...)]` attributes in order; later fields override earlier ones
fn parse_case_attrs(attrs: &[Attribute]) -> syn::Result<Vec<(&'static str, i64)>> {
    let mut fields = Vec::new();

    for attr in attrs {
        // bare `#[case]` marks a member without overrides
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let name = attr::name(&meta);
            match name.as_str() {
                "repetitions" | "n" => {
                    let value = attr::int(&meta)?;
                    if value <= 0 {
                        return Err(meta.error("repetitions must be positive"));
                    }
                    fields.push(("repetitions", value));
                }
                "warmup" | "n_warmup" => fields.push(("warmup", attr::int(&meta)?)),
                _ => return Err(attr::unknown(&meta, &name)),
            }
            Ok(())
        })?;
    }

    Ok(fields)
}

fn member_tokens(self_ty: &Type, method: &ImplItemFn, overrides: &[(&str, i64)]) -> TokenStream2 {
    let ident = &method.sig.ident;
    let ident_str = ident.to_string();

    let func = quote! {
        let func: ::syncbench::CaseFn<#self_ty> =
            |suite| ::syncbench::IntoCaseResult::into_case_result(<#self_ty>::#ident(suite));
    };

    if overrides.is_empty() {
        quote! {{
            #func
            ::syncbench::Member::workload(#ident_str, func)
        }}
    } else {
        let names = overrides.iter().map(|(name, _)| *name);
        let values = overrides.iter().map(|(_, value)| *value);
        quote! {{
            #func
            ::syncbench::Member::case(
                #ident_str,
                ::syncbench::CaseAttr::new()
                    #(.set(#names, #values)?)*
                    .wrap(func)?,
            )
        }}
    }
}

fn suite_trait_impl(self_ty: &Type, set_up: Hook, tear_down: Hook) -> TokenStream2 {
    let set_up_fn = match set_up {
        Hook::Absent => quote! {},
        Hook::SelfOnly => quote! {
            fn set_up(&mut self, _device: &::syncbench::Device) -> ::syncbench::internal::anyhow::Result<()> {
                ::syncbench::IntoCaseResult::into_case_result(<#self_ty>::set_up(self))
            }
        },
        Hook::WithDevice => quote! {
            fn set_up(&mut self, device: &::syncbench::Device) -> ::syncbench::internal::anyhow::Result<()> {
                ::syncbench::IntoCaseResult::into_case_result(<#self_ty>::set_up(self, device))
            }
        },
    };
    let tear_down_fn = match tear_down {
        Hook::Absent => quote! {},
        Hook::SelfOnly | Hook::WithDevice => quote! {
            fn tear_down(&mut self) -> ::syncbench::internal::anyhow::Result<()> {
                ::syncbench::IntoCaseResult::into_case_result(<#self_ty>::tear_down(self))
            }
        },
    };

    quote! {
        impl ::syncbench::Suite for #self_ty {
            #set_up_fn
            #tear_down_fn
        }
    }
}
