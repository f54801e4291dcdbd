//! Procedural macros for docmapper.
//!
//! # `Record`
//!
//! Implements `Record` and the capability traits named by a `#[record(...)]`
//! attribute on a struct with named fields:
//!
//! - `collection = "name"` implements `CollectionNamed`
//! - `identity = "field"` implements `Identified` from that field, which must
//!   implement `IdentityValue`
//! - `identity_field = "name"` overrides the document field holding the identity.
//!   Defaults to the field's `#[serde(rename)]`, else its name
//! - `hooks` exposes the type's own `Hooks` impl to the mapper
//!
//! ```rust,ignore
//! use docmapper::{Record, hooks::{Hooks, HookContext, HookResult}};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! #[record(collection = "users", identity = "id", hooks)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//!
//! impl Hooks for User {
//!     fn pre_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
//!         self.name = self.name.trim().to_string();
//!         Ok(())
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

mod record;

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, parse_macro_input};

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => record::generate_record(&ast, data),
        _ => Err(syn::Error::new_spanned(
            &ast,
            "Record can only be derived for structs with named fields",
        )),
    };

    result
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
