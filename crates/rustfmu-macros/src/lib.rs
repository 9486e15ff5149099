//! Procedural macros for rustfmu slave development
//!
//! This crate provides the `Reflect` derive macro, which exposes the fields of a slave struct
//! to the variable registry as positional tables, so that registering
//! `Real("container.gain")` can be resolved once into field/owner indices instead of being
//! looked up by name on every get/set.
//!
//! # Example
//!
//! ```ignore
//! use rustfmu_core::Reflect;
//!
//! #[derive(Reflect)]
//! pub struct Thermostat {
//!     setpoint: f64,
//!     heating: bool,
//!
//!     #[reflect(rename = "T")]
//!     temperature: f64,
//!
//!     #[reflect(nested)]
//!     controller: Controller,
//!
//!     // Not exposed to the registry
//!     #[reflect(skip)]
//!     history: Vec<f64>,
//! }
//! ```
//!
//! This generates an implementation of `rustfmu_core::reflect::Reflect` where:
//! - every field without an attribute is a scalar field (its type must implement
//!   `rustfmu_core::value::FieldValue`)
//! - `#[reflect(nested)]` fields are owners that can be traversed with `owner`/`owner_mut`
//!   (their type must implement `Reflect` itself)
//! - `#[reflect(skip)]` fields are invisible

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

/// How a field takes part in reflection
enum FieldRole {
    Scalar,
    Nested,
    Skip,
}

/// Metadata for an exposed field
struct ReflectField {
    rust_name: Ident,
    exposed_name: String,
    ty: Type,
}

/// Parse the #[reflect(...)] attributes of a field using the syn 2.0 API
fn parse_reflect_attributes(attrs: &[Attribute]) -> syn::Result<(FieldRole, Option<String>)> {
    let mut role = FieldRole::Scalar;
    let mut rename = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("nested") {
                role = FieldRole::Nested;
                Ok(())
            } else if meta.path.is_ident("skip") {
                role = FieldRole::Skip;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `nested`, `skip` or `rename = \"...\"`"))
            }
        })?;
    }

    Ok((role, rename))
}

/// Split the struct fields into scalar fields and nested owners
fn extract_fields(fields: &Fields) -> syn::Result<(Vec<ReflectField>, Vec<ReflectField>)> {
    let mut scalars = Vec::new();
    let mut owners = Vec::new();

    let named = match fields {
        Fields::Named(named) => named,
        Fields::Unit => return Ok((scalars, owners)),
        Fields::Unnamed(unnamed) => {
            return Err(syn::Error::new_spanned(
                unnamed,
                "Reflect can only be derived for structs with named fields",
            ))
        }
    };

    for field in &named.named {
        let rust_name = field
            .ident
            .clone()
            .expect("Named fields should have idents");
        let (role, rename) = parse_reflect_attributes(&field.attrs)?;
        let exposed_name = rename.unwrap_or_else(|| rust_name.to_string());
        let reflect_field = ReflectField {
            rust_name,
            exposed_name,
            ty: field.ty.clone(),
        };
        match role {
            FieldRole::Scalar => scalars.push(reflect_field),
            FieldRole::Nested => owners.push(reflect_field),
            FieldRole::Skip => {}
        }
    }

    Ok((scalars, owners))
}

/// Derive macro for index-addressed field access
///
/// # Attributes
///
/// ## Field attributes
/// - `#[reflect(nested)]` - Expose the field as a nested owner
/// - `#[reflect(skip)]` - Hide the field
/// - `#[reflect(rename = "...")]` - Expose the field under a different name
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_reflect(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand_reflect(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let struct_label = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Reflect can only be derived for structs",
            ))
        }
    };

    let (scalars, owners) = extract_fields(fields)?;

    let field_name_arms: Vec<TokenStream2> = scalars
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let name = &f.exposed_name;
            quote! { #name => ::core::option::Option::Some(#i) }
        })
        .collect();

    let get_arms: Vec<TokenStream2> = scalars
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let field = &f.rust_name;
            quote! {
                #i => ::core::option::Option::Some(
                    ::rustfmu_core::value::FieldValue::to_scalar(&self.#field)
                )
            }
        })
        .collect();

    let set_arms: Vec<TokenStream2> = scalars
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let field = &f.rust_name;
            let name = &f.exposed_name;
            let ty = &f.ty;
            quote! {
                #i => {
                    self.#field =
                        <#ty as ::rustfmu_core::value::FieldValue>::from_scalar(value, #name)?;
                    ::core::result::Result::Ok(())
                }
            }
        })
        .collect();

    let type_arms: Vec<TokenStream2> = scalars
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let ty = &f.ty;
            quote! {
                #i => ::core::option::Option::Some(
                    <#ty as ::rustfmu_core::value::FieldValue>::TYPE
                )
            }
        })
        .collect();

    let check_arms: Vec<TokenStream2> = scalars
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let name = &f.exposed_name;
            let ty = &f.ty;
            quote! {
                #i => <#ty as ::rustfmu_core::value::FieldValue>::from_scalar(value.clone(), #name)
                    .map(|_| ())
            }
        })
        .collect();

    let exposed_names: Vec<&String> = scalars.iter().map(|f| &f.exposed_name).collect();

    let owner_name_arms: Vec<TokenStream2> = owners
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let name = &f.exposed_name;
            quote! { #name => ::core::option::Option::Some(#i) }
        })
        .collect();

    let owner_arms: Vec<TokenStream2> = owners
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let field = &f.rust_name;
            quote! {
                #i => ::core::option::Option::Some(
                    &self.#field as &dyn ::rustfmu_core::reflect::Reflect
                )
            }
        })
        .collect();

    let owner_mut_arms: Vec<TokenStream2> = owners
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let field = &f.rust_name;
            quote! {
                #i => ::core::option::Option::Some(
                    &mut self.#field as &mut dyn ::rustfmu_core::reflect::Reflect
                )
            }
        })
        .collect();

    let expanded = quote! {
        impl #impl_generics ::rustfmu_core::reflect::Reflect for #struct_name #ty_generics #where_clause {
            fn field_index(&self, name: &str) -> ::core::option::Option<usize> {
                match name {
                    #(#field_name_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn get_field(
                &self,
                index: usize,
            ) -> ::core::option::Option<::rustfmu_core::value::ScalarValue> {
                match index {
                    #(#get_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                index: usize,
                value: ::rustfmu_core::value::ScalarValue,
            ) -> ::rustfmu_core::errors::FmuResult<()> {
                match index {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(
                        ::rustfmu_core::reflect::missing_field(#struct_label, index)
                    ),
                }
            }

            fn field_type(
                &self,
                index: usize,
            ) -> ::core::option::Option<::rustfmu_core::value::VariableType> {
                match index {
                    #(#type_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn check_field(
                &self,
                index: usize,
                value: &::rustfmu_core::value::ScalarValue,
            ) -> ::rustfmu_core::errors::FmuResult<()> {
                match index {
                    #(#check_arms,)*
                    _ => ::core::result::Result::Err(
                        ::rustfmu_core::reflect::missing_field(#struct_label, index)
                    ),
                }
            }

            fn field_names(&self) -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#exposed_names),*]
            }

            fn owner_index(&self, name: &str) -> ::core::option::Option<usize> {
                match name {
                    #(#owner_name_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn owner(
                &self,
                index: usize,
            ) -> ::core::option::Option<&dyn ::rustfmu_core::reflect::Reflect> {
                match index {
                    #(#owner_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn owner_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn ::rustfmu_core::reflect::Reflect> {
                match index {
                    #(#owner_mut_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    Ok(expanded)
}
