//! Core traits and descriptors for mapped document types.
//!
//! A mapped type is an application struct persisted as documents in a named collection. It
//! implements [`Mapped`], usually through `#[derive(Mapped)]`, which describes its declared fields
//! so the key inferencer can find the primary key. A type can instead declare its key explicitly
//! by implementing [`KeyTyped`].

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    any::{TypeId, type_name},
    borrow::Cow,
};

use crate::{
    error::{RegistryError, RegistryResult},
    key::{KeyDescriptor, KeyKind},
};

/// Core trait that all types stored through a collection handle must implement.
///
/// # Example
///
/// ```ignore
/// use docreg::prelude::*;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
/// pub struct User {
///     #[key]
///     pub email: String,
///     pub name: String,
/// }
/// ```
pub trait Mapped: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {
    /// Returns the declared fields of this type, in declaration order.
    fn fields() -> Vec<FieldDecl>;

    /// Returns the key declared through [`KeyTyped`], if this type opted into the capability.
    fn declared_key() -> Option<KeyDescriptor> {
        None
    }
}

/// A type that declares its own key type, bypassing inference.
///
/// Link the capability to the derive with `#[mapped(key_typed)]`; the declared key then takes
/// precedence over any `#[key]` field.
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
/// #[mapped(key_typed)]
/// pub struct Session {
///     pub id: String,
/// }
///
/// impl KeyTyped for Session {
///     type Key = String;
///     const KEY_FIELD: &'static str = "id";
/// }
/// ```
pub trait KeyTyped {
    /// The Rust type of the key.
    type Key: KeyValue;

    /// Serialized name of the field holding the key.
    const KEY_FIELD: &'static str = "_id";

    /// Builds the descriptor for the declared key.
    fn key_descriptor() -> KeyDescriptor {
        KeyDescriptor::new(Self::KEY_FIELD, <Self::Key as KeyValue>::KIND)
    }
}

/// Rust types usable as a declared key.
pub trait KeyValue: Serialize + DeserializeOwned + Send + Sync {
    /// The semantic kind of the key.
    const KIND: KeyKind;
}

macro_rules! key_values {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl KeyValue for $ty {
                const KIND: KeyKind = $kind;
            }
        )+
    };
}

key_values!(KeyKind::String => String, Box<str>, Cow<'static, str>);
key_values!(KeyKind::Number => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
key_values!(KeyKind::ObjectId => ObjectId);
key_values!(KeyKind::Uuid => bson::Uuid);

/// A declared field of a mapped type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Serialized field name.
    pub name: String,
    /// Declared Rust type, as written in the source with whitespace removed.
    pub type_name: String,
    /// Whether the field carries the key marker.
    pub key_marker: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, key_marker: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            key_marker,
        }
    }

    /// Shorthand for a field carrying the key marker.
    pub fn key(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, type_name, true)
    }

    /// Shorthand for a plain field.
    pub fn plain(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, type_name, false)
    }
}

/// Runtime descriptor of a mapped type.
///
/// Identity is the Rust [`TypeId`]; two descriptors of the same type compare equal.
#[derive(Debug, Clone)]
pub struct MappedType {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDecl>,
    declared_key: Option<KeyDescriptor>,
}

impl MappedType {
    /// Describes `D` from its [`Mapped`] implementation.
    pub fn of<D: Mapped>() -> Self {
        Self {
            type_id: TypeId::of::<D>(),
            type_name: type_name::<D>(),
            fields: D::fields(),
            declared_key: D::declared_key(),
        }
    }

    /// Builds a descriptor by hand, mainly for exercising key strategies in isolation.
    pub fn new(
        type_id: TypeId,
        type_name: &'static str,
        fields: Vec<FieldDecl>,
        declared_key: Option<KeyDescriptor>,
    ) -> Self {
        Self { type_id, type_name, fields, declared_key }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn declared_key(&self) -> Option<&KeyDescriptor> {
        self.declared_key.as_ref()
    }
}

impl PartialEq for MappedType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for MappedType {}

/// Extension trait providing BSON conversion for mapped types.
///
/// Automatically implemented for all types that implement [`Mapped`].
pub trait DocumentExt: Mapped {
    /// Converts this value to a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value does not serialize to a document.
    fn to_document(&self) -> RegistryResult<BsonDocument>;

    /// Creates a value from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    fn from_document(document: BsonDocument) -> RegistryResult<Self>;
}

impl<D: Mapped> DocumentExt for D {
    fn to_document(&self) -> RegistryResult<BsonDocument> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(RegistryError::InvalidDocument(format!(
                "{} serialized to {:?}, expected a document",
                type_name::<D>(),
                other.element_type()
            ))),
        }
    }

    fn from_document(document: BsonDocument) -> RegistryResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ticket {
        id: i64,
        title: String,
    }

    impl Mapped for Ticket {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::key("id", "i64"), FieldDecl::plain("title", "String")]
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        slug: String,
    }

    impl Mapped for Note {
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::plain("slug", "String")]
        }

        fn declared_key() -> Option<KeyDescriptor> {
            Some(<Self as KeyTyped>::key_descriptor())
        }
    }

    impl KeyTyped for Note {
        type Key = String;
        const KEY_FIELD: &'static str = "slug";
    }

    #[test]
    fn mapped_type_reflects_declarations() {
        let mapped = MappedType::of::<Ticket>();
        assert_eq!(mapped.type_id(), TypeId::of::<Ticket>());
        assert_eq!(mapped.fields().len(), 2);
        assert!(mapped.fields()[0].key_marker);
        assert!(mapped.declared_key().is_none());
        assert!(mapped.type_name().ends_with("Ticket"));
    }

    #[test]
    fn key_typed_declares_descriptor() {
        let mapped = MappedType::of::<Note>();
        assert_eq!(
            mapped.declared_key(),
            Some(&KeyDescriptor::new("slug", KeyKind::String))
        );
    }

    #[test]
    fn descriptors_compare_by_type_identity() {
        assert_eq!(MappedType::of::<Ticket>(), MappedType::of::<Ticket>());
        assert_ne!(MappedType::of::<Ticket>(), MappedType::of::<Note>());
    }

    #[test]
    fn document_conversion_keeps_fields() {
        let ticket = Ticket { id: 7, title: "leak".into() };
        let document = ticket.to_document().unwrap();
        assert_eq!(document.get_i64("id").unwrap(), 7);

        let back = Ticket::from_document(document).unwrap();
        assert_eq!(back.title, "leak");
    }

    #[test]
    fn key_value_kinds() {
        assert_eq!(<String as KeyValue>::KIND, KeyKind::String);
        assert_eq!(<i64 as KeyValue>::KIND, KeyKind::Number);
        assert_eq!(<ObjectId as KeyValue>::KIND, KeyKind::ObjectId);
    }

    #[test]
    fn key_value_kinds_match_declared_type_classification() {
        fn agrees<K: KeyValue>(declared: &str) -> bool {
            K::KIND == KeyKind::from_type_name(declared)
        }

        assert!(agrees::<String>("String"));
        assert!(agrees::<Box<str>>("Box<str>"));
        assert!(agrees::<Cow<'static, str>>("Cow<'static, str>"));
        assert!(agrees::<i8>("i8"));
        assert!(agrees::<i16>("i16"));
        assert!(agrees::<i32>("i32"));
        assert!(agrees::<i64>("i64"));
        assert!(agrees::<u8>("u8"));
        assert!(agrees::<u16>("u16"));
        assert!(agrees::<u32>("u32"));
        assert!(agrees::<u64>("u64"));
        assert!(agrees::<f32>("f32"));
        assert!(agrees::<f64>("f64"));
        assert!(agrees::<ObjectId>("bson::oid::ObjectId"));
        assert!(agrees::<bson::Uuid>("bson::Uuid"));
    }
}
