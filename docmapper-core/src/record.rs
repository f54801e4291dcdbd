//! Records and the optional capabilities they expose.
//!
//! A [`Record`] is any serde-encodable application type. Everything beyond that is
//! opt-in: a record exposes a capability by overriding the matching accessor on
//! [`Record`] and returning itself.
//!
//! | Capability | Trait | Accessor | When absent |
//! |---|---|---|---|
//! | collection name | [`CollectionNamed`] | [`Record::as_collection_named`] | [`MissingCollectionName`](DocumentStoreError::MissingCollectionName) |
//! | identity | [`Identified`] | [`Record::as_identified`] | record is treated as new |
//! | lifecycle hooks | [`Hooks`] | [`Record::as_hooks`] | stages are skipped |
//!
//! # Example
//!
//! ```ignore
//! use docmapper::record::{CollectionNamed, Identified, IdentityValue, Record};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//!
//! impl CollectionNamed for User {
//!     fn collection_name(&self) -> &str { "users" }
//! }
//!
//! impl Identified for User {
//!     fn identity(&self) -> String { self.id.to_identity() }
//! }
//!
//! impl Record for User {
//!     fn as_collection_named(&self) -> Option<&dyn CollectionNamed> { Some(self) }
//!     fn as_identified(&self) -> Option<&dyn Identified> { Some(self) }
//! }
//! ```
//!
//! The `#[derive(Record)]` macro from the `docmapper` crate writes the accessors
//! and capability impls from attributes.

use bson::{Uuid as BsonUuid, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use std::any::type_name;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    hooks::Hooks,
};

/// Field name used for identities when a record does not name its own.
pub const DEFAULT_IDENTITY_FIELD: &str = "_id";

/// An application value stored as one document.
///
/// All accessors default to `None`, meaning the capability is absent.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Exposes the collection-name capability.
    fn as_collection_named(&self) -> Option<&dyn CollectionNamed> {
        None
    }

    /// Exposes the identity capability.
    fn as_identified(&self) -> Option<&dyn Identified> {
        None
    }

    /// Exposes the lifecycle hooks.
    fn as_hooks(&mut self) -> Option<&mut dyn Hooks> {
        None
    }
}

/// Names the collection a record is stored in. The name must not be empty.
pub trait CollectionNamed {
    fn collection_name(&self) -> &str;
}

/// Exposes a record's identity in its external string form.
pub trait Identified {
    /// The identity as a string. Empty means the record has not been persisted yet.
    fn identity(&self) -> String;

    /// The document field holding the identity.
    fn identity_field(&self) -> &str {
        DEFAULT_IDENTITY_FIELD
    }
}

/// Converts an identity field value to its external string form.
///
/// Zero integers and `None` convert to the empty string, which marks a record as new.
pub trait IdentityValue {
    fn to_identity(&self) -> String;
}

impl IdentityValue for String {
    fn to_identity(&self) -> String {
        self.clone()
    }
}

impl IdentityValue for str {
    fn to_identity(&self) -> String {
        self.to_string()
    }
}

impl IdentityValue for ObjectId {
    fn to_identity(&self) -> String {
        self.to_hex()
    }
}

impl IdentityValue for BsonUuid {
    fn to_identity(&self) -> String {
        self.to_string()
    }
}

impl IdentityValue for uuid::Uuid {
    fn to_identity(&self) -> String {
        if self.is_nil() {
            String::new()
        } else {
            self.to_string()
        }
    }
}

macro_rules! integer_identity {
    ($($ty:ty),*) => {
        $(
            impl IdentityValue for $ty {
                fn to_identity(&self) -> String {
                    if *self == 0 {
                        String::new()
                    } else {
                        self.to_string()
                    }
                }
            }
        )*
    };
}

integer_identity!(i32, i64, u32, u64);

impl<T: IdentityValue> IdentityValue for Option<T> {
    fn to_identity(&self) -> String {
        self.as_ref()
            .map(IdentityValue::to_identity)
            .unwrap_or_default()
    }
}

/// The collection and identity discovered on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Collection the record belongs to.
    pub collection: String,
    /// External identity; empty when the record is new.
    pub identity: String,
    /// Document field holding the identity.
    pub identity_field: String,
}

impl Resolution {
    /// Whether the record has not been persisted yet.
    pub fn is_new(&self) -> bool {
        self.identity.is_empty()
    }
}

/// Discovers collection names and identities through capability probing.
pub struct Resolver;

impl Resolver {
    /// Probes the record for its collection name and identity.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MissingCollectionName`] when the record does not
    /// expose a collection name or exposes an empty one. A missing identity is not
    /// an error.
    pub fn resolve<R: Record>(record: &R) -> DocumentStoreResult<Resolution> {
        Ok(Resolution {
            collection: Self::collection(record)?,
            identity: Self::identity(record),
            identity_field: Self::identity_field(record),
        })
    }

    /// Probes the record for its collection name.
    pub fn collection<R: Record>(record: &R) -> DocumentStoreResult<String> {
        match record
            .as_collection_named()
            .map(CollectionNamed::collection_name)
        {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(DocumentStoreError::MissingCollectionName(
                type_name::<R>().to_string(),
            )),
        }
    }

    /// Probes the record for its identity, returning an empty string when absent.
    pub fn identity<R: Record>(record: &R) -> String {
        record
            .as_identified()
            .map(Identified::identity)
            .unwrap_or_default()
    }

    /// Probes the record for its identity field name.
    pub fn identity_field<R: Record>(record: &R) -> String {
        record
            .as_identified()
            .map(|identified| identified.identity_field().to_string())
            .unwrap_or_else(|| DEFAULT_IDENTITY_FIELD.to_string())
    }
}
