//! Convenient re-exports of commonly used types from docreg.
//!
//! ```ignore
//! use docreg::prelude::*;
//! ```

pub use docreg_core::{
    backend::{StoreBackend, StoreConnector},
    collection::{CollectionHandle, WriteResult},
    config::{ConfigMap, ConnectionConfig},
    document::{DocumentExt, FieldDecl, KeyTyped, KeyValue, Mapped, MappedType},
    error::{RegistryError, RegistryResult},
    key::{KeyDescriptor, KeyInferencer, KeyKind, KeyStrategy},
    lifecycle::Lifecycle,
    registry::CollectionRegistry,
};
pub use docreg_macros::Mapped;
