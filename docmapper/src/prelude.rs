//! Commonly used types and traits.
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```

pub use docmapper_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, TypedCollection},
    config::ConnectionConfig,
    connection::Connection,
    encoding::RecordExt,
    error::{DocumentStoreError, DocumentStoreResult},
    hooks::{HookContext, HookResult, HookStage, Hooks},
    mapper::{Mapper, MapperState},
    query::{Expr, FieldOp, Filter, IntoFilter, Query, QueryBuilder, Sort, SortDirection},
    record::{CollectionNamed, Identified, IdentityValue, Record},
    update::{ChangeInfo, Update},
};
pub use docmapper_macros::Record;
