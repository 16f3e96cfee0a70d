//! Procedural macros for the docreg project.
//!
//! `#[derive(Mapped)]` describes a struct's declared fields to the key inferencer:
//!
//! - `#[key]` on a field marks it as the primary key;
//! - `#[mapped(key_typed)]` on the struct links its `KeyTyped` implementation, which then takes
//!   precedence over any `#[key]` field;
//! - `#[serde(rename = "...")]` on a field and `#[serde(rename_all = "...")]` on the struct are
//!   honoured, so the recorded name is the stored one.

#[allow(unused_extern_crates)]
extern crate self as docreg_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Field, Fields, LitStr, Token, ext::IdentExt,
    meta::ParseNestedMeta, parse_macro_input,
};

#[proc_macro_derive(Mapped, attributes(key, mapped))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_mapped(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_mapped(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(named), .. }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "`Mapped` can only be derived for structs with named fields",
            ));
        }
    };

    let key_typed = key_typed(&input.attrs)?;
    let rename_all = rename_all(&input.attrs)?;

    let decls = fields
        .iter()
        .map(|field| {
            let name = serialized_name(field, rename_all)?;
            let ty = &field.ty;
            let type_name = quote!(#ty)
                .to_string()
                .replace(' ', "");
            let key_marker = field
                .attrs
                .iter()
                .any(|attr| attr.path().is_ident("key"));

            Ok(quote! {
                ::docreg::document::FieldDecl::new(#name, #type_name, #key_marker)
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let declared_key = if key_typed {
        quote! {
            fn declared_key() -> ::core::option::Option<::docreg::key::KeyDescriptor> {
                ::core::option::Option::Some(
                    <Self as ::docreg::document::KeyTyped>::key_descriptor()
                )
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::docreg::document::Mapped for #ident #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::docreg::document::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            #declared_key
        }
    })
}

/// Reads `#[mapped(key_typed)]` from the container attributes.
fn key_typed(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut key_typed = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("mapped")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key_typed") {
                key_typed = true;
                Ok(())
            } else {
                Err(meta.error("unsupported `mapped` attribute, expected `key_typed`"))
            }
        })?;
    }

    Ok(key_typed)
}

/// Serde's `rename_all` rules, as applied to snake_case field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_lit(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!("unknown serde rename rule {other:?}"),
                ));
            }
        })
    }

    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for c in field.chars() {
                    if c == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(c.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(c);
                    }
                }
                pascal
            }
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

/// Reads `#[serde(rename_all = "...")]` from the container attributes.
///
/// For `rename_all(serialize = "...", deserialize = "...")` the serialize rule is used, since
/// that is the name documents are stored under.
fn rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                rule = Some(RenameRule::from_lit(&meta.value()?.parse::<LitStr>()?)?);
            } else if meta.path.is_ident("rename_all") {
                meta.parse_nested_meta(|inner| {
                    let lit: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        rule = Some(RenameRule::from_lit(&lit)?);
                    }
                    Ok(())
                })?;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(rule)
}

/// The name serde stores the field under.
fn serialized_name(field: &Field, rename_all: Option<RenameRule>) -> syn::Result<String> {
    let ident = field
        .ident
        .as_ref()
        .map(|ident| ident.unraw().to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let mut name = match rename_all {
        Some(rule) => rule.apply(&ident),
        None => ident,
    };

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                name = meta.value()?.parse::<LitStr>()?.value();
            } else if meta.path.is_ident("rename") {
                meta.parse_nested_meta(|inner| {
                    let lit: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        name = lit.value();
                    }
                    Ok(())
                })?;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(name)
}

/// Consumes a serde attribute this macro has no use for.
fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }

    Ok(())
}
