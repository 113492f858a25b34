//! `#[derive(Configurable)]` implementation.
//!
//! # Overview
//!
//! For a struct with named fields the derive generates:
//!
//! 1. `impl ::vane_core::Configurable` - `describe_into` and `assign_key`,
//!    walking fields in declaration order
//! 2. `impl ::vane_core::ConfigField` - so the struct can itself appear as a
//!    field, an array element or a map value
//!
//! # Field-level attributes `#[config(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `rename = "..."` | Configuration key (default: the field name) |
//! | `skip` | Exclude the field from description and assignment |
//! | `flatten` | Merge the nested struct's keys into this level |
//! | `format = "..."` | Format hint copied into the schema node |
//! | `required` | Marks the schema node as required |
//!
//! Private fields and fields whose type contains a function pointer, trait
//! object, `impl Trait`, reference or raw pointer are left out silently.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr, PathArguments,
    Type, Visibility, spanned::Spanned,
};

// ============================================================================
// Attribute structures
// ============================================================================

/// Per-field `#[config(...)]` markers.
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
    format: Option<String>,
    required: bool,
}

/// A field that takes part in configuration.
struct ConfigMember<'a> {
    ident: &'a Ident,
    /// Configuration key.
    key: String,
    /// Field name without the `r#` prefix.
    name: String,
    attrs: FieldAttrs,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_configurable(input: &DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unnamed(_) | Fields::Unit => {
                return Err(syn::Error::new(
                    input.span(),
                    "Configurable requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Configurable cannot be derived for enums",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Configurable cannot be derived for unions",
            ));
        }
    };

    let mut members = Vec::new();
    for field in fields {
        if let Some(member) = collect_member(field)? {
            members.push(member);
        }
    }

    let configurable_impl = generate_configurable(input, &members);
    let field_impl = generate_config_field(input, &members);

    Ok(quote! {
        #configurable_impl
        #field_impl
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("config") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                result.rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("flatten") {
                result.flatten = true;
            } else if meta.path.is_ident("format") {
                result.format = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("required") {
                result.required = true;
            } else {
                return Err(meta.error("unknown config attribute"));
            }
            Ok(())
        })?;
    }

    if result.flatten && (result.rename.is_some() || result.format.is_some() || result.required) {
        return Err(syn::Error::new(
            attrs.first().map_or_else(proc_macro2::Span::call_site, |a| a.span()),
            "#[config(flatten)] cannot be combined with rename, format or required",
        ));
    }

    Ok(result)
}

fn collect_member(field: &Field) -> syn::Result<Option<ConfigMember<'_>>> {
    let attrs = parse_field_attrs(&field.attrs)?;
    let Some(ident) = field.ident.as_ref() else {
        return Ok(None);
    };

    if attrs.skip || !matches!(field.vis, Visibility::Public(_)) || is_unrepresentable(&field.ty)
    {
        return Ok(None);
    }

    let name = ident.unraw().to_string();
    let key = attrs.rename.clone().unwrap_or_else(|| name.clone());
    Ok(Some(ConfigMember {
        ident,
        key,
        name,
        attrs,
    }))
}

/// Whether `ty` holds something with no configuration form anywhere in it.
fn is_unrepresentable(ty: &Type) -> bool {
    match ty {
        Type::BareFn(_)
        | Type::TraitObject(_)
        | Type::ImplTrait(_)
        | Type::Ptr(_)
        | Type::Reference(_)
        | Type::Never(_) => true,
        Type::Paren(inner) => is_unrepresentable(&inner.elem),
        Type::Group(inner) => is_unrepresentable(&inner.elem),
        Type::Array(inner) => is_unrepresentable(&inner.elem),
        Type::Slice(inner) => is_unrepresentable(&inner.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(is_unrepresentable),
        Type::Path(path) => path.path.segments.iter().any(|segment| match &segment.arguments {
            PathArguments::AngleBracketed(args) => args.args.iter().any(|arg| match arg {
                GenericArgument::Type(inner) => is_unrepresentable(inner),
                _ => false,
            }),
            PathArguments::Parenthesized(_) => true,
            PathArguments::None => false,
        }),
        _ => false,
    }
}

// ============================================================================
// Code generation
// ============================================================================

fn generate_configurable(input: &DeriveInput, members: &[ConfigMember<'_>]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let describe_steps = members.iter().map(|m| {
        let ident = m.ident;
        if m.attrs.flatten {
            return quote! {
                ::vane_core::Configurable::describe_into(&self.#ident, fields);
            };
        }
        let key = &m.key;
        let format = m.attrs.format.as_ref().map(|f| quote! { .with_format(#f) });
        let required = m.attrs.required.then(|| quote! { .with_required(true) });
        quote! {
            fields.insert(
                ::std::string::String::from(#key),
                ::vane_core::ConfigField::schema(&self.#ident) #format #required,
            );
        }
    });

    let assign_steps = members.iter().map(|m| {
        let ident = m.ident;
        if m.attrs.flatten {
            return quote! {
                if ::vane_core::Configurable::assign_key(&mut self.#ident, key, value)? {
                    return ::std::result::Result::Ok(true);
                }
            };
        }
        let key = &m.key;
        let field_name = &m.name;
        quote! {
            if key == #key || key.eq_ignore_ascii_case(#field_name) {
                ::vane_core::ConfigField::set_from(&mut self.#ident, value)
                    .map_err(|e| e.at(key))?;
                return ::std::result::Result::Ok(true);
            }
        }
    });

    quote! {
        impl #impl_generics ::vane_core::Configurable for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn describe_into(&self, fields: &mut ::vane_core::FieldMap) {
                #(#describe_steps)*
            }

            #[allow(unused_variables)]
            fn assign_key(
                &mut self,
                key: &str,
                value: &::vane_core::__private::Value,
            ) -> ::vane_core::CoerceResult<bool> {
                #(#assign_steps)*
                ::std::result::Result::Ok(false)
            }
        }
    }
}

fn generate_config_field(input: &DeriveInput, members: &[ConfigMember<'_>]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let zero_checks = members.iter().map(|m| {
        let ident = m.ident;
        quote! { && ::vane_core::ConfigField::is_zero(&self.#ident) }
    });

    let value_steps = members.iter().map(|m| {
        let ident = m.ident;
        if m.attrs.flatten {
            return quote! {
                if let ::vane_core::__private::Value::Object(inner) =
                    ::vane_core::ConfigField::to_value(&self.#ident)
                {
                    map.extend(inner);
                }
            };
        }
        let key = &m.key;
        quote! {
            map.insert(
                ::std::string::String::from(#key),
                ::vane_core::ConfigField::to_value(&self.#ident),
            );
        }
    });

    quote! {
        impl #impl_generics ::vane_core::ConfigField for #name #ty_generics #where_clause {
            fn field_kind() -> ::vane_core::FieldKind {
                ::vane_core::FieldKind::Object
            }

            fn object_fields() -> ::vane_core::FieldMap {
                ::vane_core::describe(&<Self as ::std::default::Default>::default())
            }

            fn is_zero(&self) -> bool {
                true #(#zero_checks)*
            }

            fn to_value(&self) -> ::vane_core::__private::Value {
                #[allow(unused_mut)]
                let mut map = ::vane_core::__private::Map::new();
                #(#value_steps)*
                ::vane_core::__private::Value::Object(map)
            }

            fn set_from(
                &mut self,
                value: &::vane_core::__private::Value,
            ) -> ::vane_core::CoerceResult<()> {
                ::vane_core::coerce::assign_object(self, value)
            }
        }
    }
}
