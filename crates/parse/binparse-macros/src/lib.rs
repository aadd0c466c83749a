//! Proc-macro crate for `#[derive(FromBytes)]` and `#[derive(AsBytes)]`.
//!
//! Both derives emit an `unsafe impl` of the matching `ember_binparse` trait,
//! guarded by compile-time checks on the struct's `#[repr]` and field types.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Type, parse_macro_input};

/// Derives `ember_binparse::FromBytes` for a `#[repr(C)]` struct.
///
/// All fields must implement `FromBytes`. Accepted representations are
/// `#[repr(C)]`, `#[repr(C, packed)]` and `#[repr(transparent)]`.
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_from_bytes_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `ember_binparse::AsBytes` for a padding-free struct.
///
/// The struct must be `#[repr(C, packed)]` or `#[repr(transparent)]` and all
/// fields must implement `AsBytes`. A compile-time assertion checks that the
/// struct size equals the sum of its field sizes.
#[proc_macro_derive(AsBytes)]
pub fn derive_as_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_as_bytes_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Layout-relevant `#[repr]` flags found on the input.
#[derive(Default)]
struct Repr {
    c: bool,
    packed: bool,
    transparent: bool,
}

fn parse_repr(input: &DeriveInput) -> Repr {
    let mut repr = Repr::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("repr")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                repr.c = true;
            } else if meta.path.is_ident("packed") {
                repr.packed = true;
            } else if meta.path.is_ident("transparent") {
                repr.transparent = true;
            }
            Ok(())
        });
    }
    repr
}

fn struct_field_types<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<Vec<&'a Type>> {
    match &input.data {
        Data::Struct(data) => Ok(match &data.fields {
            Fields::Named(named) => named.named.iter().map(|f| &f.ty).collect(),
            Fields::Unnamed(unnamed) => unnamed.unnamed.iter().map(|f| &f.ty).collect(),
            Fields::Unit => Vec::new(),
        }),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// One `where T: Trait` marker struct per field; fails to compile if a field
/// type does not implement the trait.
fn field_assertions(
    input: &DeriveInput,
    types: &[&Type],
    trait_name: &str,
) -> Vec<proc_macro2::TokenStream> {
    let name = &input.ident;
    let trait_ident = format_ident!("{}", trait_name);
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let assert_name = format_ident!("_Assert{}_{}_{}", trait_name, name, i);
            quote! {
                #[doc(hidden)]
                #[allow(non_camel_case_types, dead_code)]
                struct #assert_name where #ty: ember_binparse::#trait_ident;
            }
        })
        .collect()
}

fn derive_from_bytes_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let repr = parse_repr(input);
    if !(repr.c || repr.transparent) {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "FromBytes requires #[repr(C)], #[repr(C, packed)] or #[repr(transparent)]",
        ));
    }

    let types = struct_field_types(input, "FromBytes")?;
    let assertions = field_assertions(input, &types, "FromBytes");
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #(#assertions)*

        // SAFETY: the layout is fixed by #[repr] and every field accepts any
        // bit pattern (checked by the assertions above).
        unsafe impl #impl_generics ember_binparse::FromBytes for #name #ty_generics #where_clause {}
    })
}

fn derive_as_bytes_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let repr = parse_repr(input);
    if !((repr.c && repr.packed) || repr.transparent) {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "AsBytes requires #[repr(C, packed)] or #[repr(transparent)]",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "AsBytes cannot be derived for generic structs",
        ));
    }

    let types = struct_field_types(input, "AsBytes")?;
    let assertions = field_assertions(input, &types, "AsBytes");
    let name = &input.ident;

    Ok(quote! {
        #(#assertions)*

        const _: () = assert!(
            ::core::mem::size_of::<#name>() == 0 #(+ ::core::mem::size_of::<#types>())*,
            "AsBytes struct contains padding",
        );

        // SAFETY: packed/transparent layout with the size assertion above
        // rules out padding; every field is itself AsBytes.
        unsafe impl ember_binparse::AsBytes for #name {}
    })
}
