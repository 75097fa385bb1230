//! Derive macros for spindrift parameter sets.
//!
//! This crate provides one derive macro:
//!
//! - [`ParameterSet`] - Turns a plain struct of effect controls into a typed,
//!   range-checked parameter set with uniform bindings
//!
//! # Usage
//!
//! The macro is re-exported from the main `spindrift` crate. You don't need
//! to add this crate directly:
//!
//! ```ignore
//! use spindrift::prelude::*;
//!
//! #[derive(ParameterSet, Clone, Debug)]
//! #[parameters(effect = "sparks")]
//! struct SparkParams {
//!     #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
//!     size: f32,
//!     #[param(uniform = "uColor", min = 0.0, max = 1.0)]
//!     color: Vec3,
//! }
//! ```
//!
//! # Generated Items
//!
//! - `impl ParameterSet` with the static list of declared parameters, name
//!   lookup, string-keyed `set`, binding export and `normalize`
//! - One clamping setter per field, `set_<field>(value) -> &mut Self`
//!
//! # Supported Field Types
//!
//! `f32`, `u32`, `bool`, `Vec2`, `Vec3`. Vector bounds apply per component.
//!
//! # Container Attributes
//!
//! - `effect = "name"` - Effect name used in diagnostics (required)
//! - `constrain = "method"` - Inherent `fn(&mut self)` run after every write,
//!   for limits that depend on more than one field

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use std::collections::HashSet;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, Ident, LitStr, Type};

/// Uniform names every effect binds on its own; parameter sets may not reuse them.
const RESERVED_UNIFORMS: &[&str] = &["uTime", "uResolution"];

/// Derive macro for effect parameter sets.
///
/// Every named field must carry a `#[param(...)]` attribute:
///
/// | Key | Meaning |
/// |-----|---------|
/// | `uniform` | Name the value is bound under for the shader (required) |
/// | `label` | Human-readable control name (defaults to the field name) |
/// | `min`, `max` | Inclusive range; writes outside it are clamped |
///
/// # Example
///
/// ```ignore
/// #[derive(ParameterSet, Clone, Debug)]
/// #[parameters(effect = "impulse_trail", constrain = "clamp_force_window")]
/// struct ImpulseParams {
///     #[param(uniform = "uLifetime", min = 0.05, max = 20.0)]
///     lifetime: f32,
///     #[param(uniform = "uForceTime", min = 0.0, max = 20.0)]
///     force_time: f32,
/// }
///
/// impl ImpulseParams {
///     fn clamp_force_window(&mut self) {
///         self.force_time = self.force_time.min(self.lifetime);
///     }
/// }
/// ```
///
/// # Panics
///
/// The macro panics at compile time if:
/// - Applied to an enum, a tuple struct or a unit struct
/// - The `effect` container attribute is missing
/// - A field lacks `#[param(uniform = ...)]` or has an unsupported type
/// - Two fields share a uniform name, or a field uses `uTime`/`uResolution`
#[proc_macro_derive(ParameterSet, attributes(parameters, param))]
pub fn derive_parameter_set(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("ParameterSet derive only supports structs with named fields"),
        },
        _ => panic!("ParameterSet derive only supports structs"),
    };

    let container = parse_container(&input);
    let effect = container
        .effect
        .unwrap_or_else(|| panic!("ParameterSet on '{}' needs #[parameters(effect = \"...\")]", name));

    let constrain_call = match &container.constrain {
        Some(method) => {
            let method = Ident::new(method, Span::call_site());
            quote! { self.#method(); }
        }
        None => quote! {},
    };

    let mut seen_uniforms = HashSet::new();
    let mut specs = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut binding_writes = Vec::new();
    let mut normalize_steps = Vec::new();
    let mut setters = Vec::new();

    for field in fields.iter() {
        let field_name = field.ident.as_ref().unwrap();
        let field_name_str = field_name.to_string();
        let param = parse_param(field_name, &field.attrs);
        let kind = field_kind(&field.ty);

        if RESERVED_UNIFORMS.contains(&param.uniform.as_str()) {
            panic!(
                "Parameter '{}' uses reserved uniform name '{}'",
                field_name_str, param.uniform
            );
        }
        if !seen_uniforms.insert(param.uniform.clone()) {
            panic!(
                "Uniform name '{}' is declared twice in '{}'",
                param.uniform, name
            );
        }

        let uniform = &param.uniform;
        let label = param.label.clone().unwrap_or_else(|| field_name_str.clone());
        let min = param
            .min
            .as_ref()
            .map(|e| quote! { (#e) as f32 })
            .unwrap_or_else(|| quote! { f32::NEG_INFINITY });
        let max = param
            .max
            .as_ref()
            .map(|e| quote! { (#e) as f32 })
            .unwrap_or_else(|| quote! { f32::INFINITY });
        let kind_ident = Ident::new(kind.variant, Span::call_site());

        specs.push(quote! {
            ::spindrift::params::ParameterSpec {
                field: #field_name_str,
                uniform: #uniform,
                label: #label,
                kind: ::spindrift::params::ParameterKind::#kind_ident,
                min: #min,
                max: #max,
            }
        });

        get_arms.push(quote! {
            #field_name_str | #uniform => Some(::spindrift::UniformValue::from(self.#field_name))
        });

        let setter = Ident::new(&format!("set_{}", field_name_str), Span::call_site());
        let accessor = Ident::new(kind.accessor, Span::call_site());
        let expected = kind.expected;
        set_arms.push(quote! {
            #field_name_str | #uniform => match value.#accessor() {
                Some(v) => {
                    self.#setter(v);
                    Ok(())
                }
                None => Err(::spindrift::EffectError::ParameterType {
                    name: #uniform,
                    expected: #expected,
                }),
            }
        });

        binding_writes.push(quote! { bindings.set(#uniform, self.#field_name); });

        let field_type = &field.ty;
        let clamp = clamp_expr(&kind, field_name, uniform, &min, &max);
        normalize_steps.push(quote! {
            let value = self.#field_name;
            self.#field_name = #clamp;
        });

        let doc = format!("Set `{}` (`{}`), clamped to its declared range.", field_name_str, uniform);
        setters.push(quote! {
            #[doc = #doc]
            pub fn #setter(&mut self, value: #field_type) -> &mut Self {
                self.#field_name = #clamp;
                #constrain_call
                self
            }
        });
    }

    let expanded = quote! {
        impl ::spindrift::params::ParameterSet for #name {
            const EFFECT: &'static str = #effect;

            const SPECS: &'static [::spindrift::params::ParameterSpec] = &[
                #(#specs),*
            ];

            fn get(&self, name: &str) -> Option<::spindrift::UniformValue> {
                match name {
                    #(#get_arms,)*
                    _ => None,
                }
            }

            fn set(
                &mut self,
                name: &str,
                value: ::spindrift::UniformValue,
            ) -> Result<(), ::spindrift::EffectError> {
                match name {
                    #(#set_arms,)*
                    _ => Err(::spindrift::EffectError::UnknownParameter {
                        effect: #effect,
                        name: name.to_string(),
                    }),
                }
            }

            fn write_bindings(&self, bindings: &mut ::spindrift::ParameterBindings) {
                #(#binding_writes)*
            }

            fn normalize(&mut self) {
                #(#normalize_steps)*
                #constrain_call
            }
        }

        impl #name {
            #(#setters)*
        }
    };

    TokenStream::from(expanded)
}

/// Parsed `#[parameters(...)]` container attribute.
#[derive(Default)]
struct ContainerAttrs {
    effect: Option<String>,
    constrain: Option<String>,
}

fn parse_container(input: &DeriveInput) -> ContainerAttrs {
    let mut attrs = ContainerAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("parameters") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("effect") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.effect = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("constrain") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.constrain = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported #[parameters] key"))
            }
        })
        .unwrap_or_else(|e| panic!("Invalid #[parameters] attribute: {}", e));
    }
    attrs
}

/// Parsed `#[param(...)]` field attribute.
struct ParamAttrs {
    uniform: String,
    label: Option<String>,
    min: Option<Expr>,
    max: Option<Expr>,
}

fn parse_param(field_name: &Ident, attrs: &[syn::Attribute]) -> ParamAttrs {
    let mut uniform = None;
    let mut label = None;
    let mut min = None;
    let mut max = None;

    for attr in attrs {
        if !attr.path().is_ident("param") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("uniform") {
                let value: LitStr = meta.value()?.parse()?;
                uniform = Some(value.value());
            } else if meta.path.is_ident("label") {
                let value: LitStr = meta.value()?.parse()?;
                label = Some(value.value());
            } else if meta.path.is_ident("min") {
                min = Some(meta.value()?.parse::<Expr>()?);
            } else if meta.path.is_ident("max") {
                max = Some(meta.value()?.parse::<Expr>()?);
            } else {
                return Err(meta.error("unsupported #[param] key"));
            }
            Ok(())
        })
        .unwrap_or_else(|e| panic!("Invalid #[param] on '{}': {}", field_name, e));
    }

    let uniform = uniform
        .unwrap_or_else(|| panic!("Field '{}' needs #[param(uniform = \"...\")]", field_name));

    ParamAttrs {
        uniform,
        label,
        min,
        max,
    }
}

/// How a field type maps onto the runtime parameter machinery.
struct FieldKind {
    /// `ParameterKind` variant name.
    variant: &'static str,
    /// `UniformValue` accessor used by string-keyed writes.
    accessor: &'static str,
    /// Type name reported when a write has the wrong kind.
    expected: &'static str,
    /// Clamp helper in `spindrift::params`, if the type has a range.
    clamp_fn: Option<&'static str>,
}

fn field_kind(ty: &Type) -> FieldKind {
    let type_str = quote!(#ty).to_string().replace(" ", "");

    match type_str.as_str() {
        "f32" => FieldKind {
            variant: "F32",
            accessor: "as_f32",
            expected: "f32",
            clamp_fn: Some("clamp_f32"),
        },
        "u32" => FieldKind {
            variant: "U32",
            accessor: "as_u32",
            expected: "u32",
            clamp_fn: Some("clamp_u32"),
        },
        "bool" => FieldKind {
            variant: "Bool",
            accessor: "as_bool",
            expected: "bool",
            clamp_fn: None,
        },
        "Vec2" | "glam::Vec2" | "spindrift::Vec2" => FieldKind {
            variant: "Vec2",
            accessor: "as_vec2",
            expected: "vec2<f32>",
            clamp_fn: Some("clamp_vec2"),
        },
        "Vec3" | "glam::Vec3" | "spindrift::Vec3" => FieldKind {
            variant: "Vec3",
            accessor: "as_vec3",
            expected: "vec3<f32>",
            clamp_fn: Some("clamp_vec3"),
        },
        _ => panic!("Unsupported type in ParameterSet struct: {}", type_str),
    }
}

/// Expression that clamps `value` into range, keeping `self.<field>` when the
/// write is unusable (NaN components).
fn clamp_expr(
    kind: &FieldKind,
    field_name: &Ident,
    uniform: &str,
    min: &proc_macro2::TokenStream,
    max: &proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    match kind.clamp_fn {
        Some(helper) => {
            let helper = Ident::new(helper, Span::call_site());
            quote! {
                ::spindrift::params::#helper(
                    <Self as ::spindrift::params::ParameterSet>::EFFECT,
                    #uniform,
                    self.#field_name,
                    value,
                    #min,
                    #max,
                )
            }
        }
        None => quote! { value },
    }
}
