use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Field, Fields, LitStr, Result, Token};

#[derive(Default)]
struct RecordAttrs {
    collection: Option<LitStr>,
    identity: Option<LitStr>,
    identity_field: Option<LitStr>,
    hooks: bool,
}

fn parse_record_attrs(ast: &DeriveInput) -> Result<RecordAttrs> {
    let mut attrs = RecordAttrs::default();

    for attr in &ast.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let name: LitStr = meta.value()?.parse()?;
                if name.value().is_empty() {
                    return Err(syn::Error::new_spanned(name, "collection name must not be empty"));
                }
                attrs.collection = Some(name);
                Ok(())
            } else if meta.path.is_ident("identity") {
                attrs.identity = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("identity_field") {
                attrs.identity_field = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("hooks") {
                attrs.hooks = true;
                Ok(())
            } else {
                Err(meta.error("unknown record attribute"))
            }
        })?;
    }

    Ok(attrs)
}

/// The name serde writes the field under, if renamed.
fn serde_rename(field: &Field) -> Option<String> {
    let mut rename = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        // malformed serde attributes are reported by serde itself
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let name: LitStr = meta.value()?.parse()?;
                    rename = Some(name.value());
                } else {
                    meta.parse_nested_meta(|nested| {
                        let name: LitStr = nested.value()?.parse()?;
                        if nested.path.is_ident("serialize") {
                            rename = Some(name.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.input.peek(Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|nested| {
                    if nested.input.peek(Token![=]) {
                        let _: syn::Expr = nested.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        });
    }

    rename
}

pub(crate) fn generate_record(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ast,
            "Record can only be derived for structs with named fields",
        ));
    };

    let attrs = parse_record_attrs(ast)?;

    let collection_impl = attrs.collection.as_ref().map(|collection| {
        quote! {
            impl #impl_generics ::docmapper::record::CollectionNamed for #name #ty_generics #where_clause {
                fn collection_name(&self) -> &str {
                    #collection
                }
            }
        }
    });

    let identity_impl = match &attrs.identity {
        Some(identity) => {
            let field = fields
                .named
                .iter()
                .find(|field| field.ident.as_ref().is_some_and(|ident| ident == &identity.value()))
                .ok_or_else(|| {
                    syn::Error::new_spanned(
                        identity,
                        format!("field `{}` not found in struct", identity.value()),
                    )
                })?;

            let ident = &field.ident;
            let identity_field = attrs
                .identity_field
                .as_ref()
                .map(LitStr::value)
                .or_else(|| serde_rename(field))
                .unwrap_or_else(|| identity.value());

            Some(quote! {
                impl #impl_generics ::docmapper::record::Identified for #name #ty_generics #where_clause {
                    fn identity(&self) -> String {
                        ::docmapper::record::IdentityValue::to_identity(&self.#ident)
                    }

                    fn identity_field(&self) -> &str {
                        #identity_field
                    }
                }
            })
        }
        None if attrs.identity_field.is_some() => {
            return Err(syn::Error::new_spanned(
                ast,
                "identity_field requires an identity field",
            ));
        }
        None => None,
    };

    let as_collection_named = collection_impl.as_ref().map(|_| {
        quote! {
            fn as_collection_named(&self) -> Option<&dyn ::docmapper::record::CollectionNamed> {
                Some(self)
            }
        }
    });

    let as_identified = identity_impl.as_ref().map(|_| {
        quote! {
            fn as_identified(&self) -> Option<&dyn ::docmapper::record::Identified> {
                Some(self)
            }
        }
    });

    let as_hooks = attrs.hooks.then(|| {
        quote! {
            fn as_hooks(&mut self) -> Option<&mut dyn ::docmapper::hooks::Hooks> {
                Some(self)
            }
        }
    });

    Ok(quote! {
        #collection_impl
        #identity_impl

        impl #impl_generics ::docmapper::record::Record for #name #ty_generics #where_clause {
            #as_collection_named
            #as_identified
            #as_hooks
        }
    })
}
