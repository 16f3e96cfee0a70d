//! Primary key resolution for mapped types.
//!
//! Each mapped type has exactly one key. It is found by running a chain of [`KeyStrategy`]
//! implementations in order; the first one that recognises the type wins:
//!
//! 1. [`CapabilityStrategy`] - the type implements [`KeyTyped`](crate::document::KeyTyped).
//! 2. [`FieldScanStrategy`] - exactly one declared field carries the `#[key]` marker.
//!
//! [`KeyInferencer`] runs the chain and memoizes the result per type for the life of the process.

use mea::rwlock::RwLock;
use std::{any::TypeId, collections::HashMap, fmt};
use tracing::debug;

use crate::{
    document::MappedType,
    error::{RegistryError, RegistryResult},
};

/// Semantic type of a primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// UTF-8 string keys.
    String,
    /// Integer or floating point keys.
    Number,
    /// MongoDB `ObjectId` keys; generated on save when missing.
    ObjectId,
    /// UUID keys; generated on save when missing.
    Uuid,
    /// Any other key type, stored as whatever it serializes to.
    Opaque,
}

impl KeyKind {
    /// Classifies a declared Rust type name.
    ///
    /// `Option<T>` and `Box<T>` are unwrapped, `Cow<'_, str>` counts as a string and any leading
    /// path is ignored, so `Option<bson::oid::ObjectId>` classifies as [`KeyKind::ObjectId`].
    /// The recognised names are exactly the [`KeyValue`](crate::document::KeyValue) types.
    pub fn from_type_name(type_name: &str) -> Self {
        let compact = type_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();

        Self::classify(&compact)
    }

    fn classify(ty: &str) -> Self {
        match split_generic(ty) {
            ("Option" | "Box", Some(inner)) => Self::classify(inner),
            ("Cow", Some(args)) => Self::classify(args.rsplit(',').next().unwrap_or(args)),
            ("String" | "str", None) => KeyKind::String,
            ("i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "f32" | "f64", None) => {
                KeyKind::Number
            }
            ("ObjectId", None) => KeyKind::ObjectId,
            ("Uuid", None) => KeyKind::Uuid,
            _ => KeyKind::Opaque,
        }
    }
}

/// Splits `path::Name<args>` into `Name` and `args`.
fn split_generic(ty: &str) -> (&str, Option<&str>) {
    match (ty.find('<'), ty.strip_suffix('>')) {
        (Some(open), Some(body)) => (last_segment(&ty[..open]), Some(&body[open + 1..])),
        _ => (last_segment(ty), None),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyKind::String => "string",
            KeyKind::Number => "number",
            KeyKind::ObjectId => "object id",
            KeyKind::Uuid => "uuid",
            KeyKind::Opaque => "opaque",
        })
    }
}

/// The resolved key of a mapped type: which field holds it and what kind it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyDescriptor {
    field: String,
    kind: KeyKind,
}

impl KeyDescriptor {
    pub fn new(field: impl Into<String>, kind: KeyKind) -> Self {
        Self { field: field.into(), kind }
    }

    /// Serialized name of the key field.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }
}

/// One way of finding the key of a mapped type.
///
/// Returns `Ok(None)` when the strategy does not apply to the type, so the next strategy in the
/// chain gets a chance. Returns an error when the strategy applies but the declaration is invalid.
pub trait KeyStrategy: Send + Sync + fmt::Debug {
    fn resolve(&self, mapped: &MappedType) -> RegistryResult<Option<KeyDescriptor>>;
}

/// Uses the key declared through the `KeyTyped` capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityStrategy;

impl KeyStrategy for CapabilityStrategy {
    fn resolve(&self, mapped: &MappedType) -> RegistryResult<Option<KeyDescriptor>> {
        Ok(mapped.declared_key().cloned())
    }
}

/// Scans declared fields for the key marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldScanStrategy;

impl KeyStrategy for FieldScanStrategy {
    fn resolve(&self, mapped: &MappedType) -> RegistryResult<Option<KeyDescriptor>> {
        let mut marked = mapped
            .fields()
            .iter()
            .filter(|field| field.key_marker);

        let Some(field) = marked.next() else {
            return Ok(None);
        };

        if marked.next().is_some() {
            let names = mapped
                .fields()
                .iter()
                .filter(|field| field.key_marker)
                .map(|field| field.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            return Err(RegistryError::KeyResolution(format!(
                "{} marks more than one key field: {names}",
                mapped.type_name()
            )));
        }

        Ok(Some(KeyDescriptor::new(
            field.name.clone(),
            KeyKind::from_type_name(&field.type_name),
        )))
    }
}

/// Resolves and memoizes key descriptors per mapped type.
#[derive(Debug)]
pub struct KeyInferencer {
    strategies: Vec<Box<dyn KeyStrategy>>,
    resolved: RwLock<HashMap<TypeId, KeyDescriptor>>,
}

impl Default for KeyInferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyInferencer {
    /// Creates an inferencer with the standard chain: capability first, then field scanning.
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(CapabilityStrategy),
            Box::new(FieldScanStrategy),
        ])
    }

    /// Creates an inferencer with a custom strategy chain, tried in order.
    pub fn with_strategies(strategies: Vec<Box<dyn KeyStrategy>>) -> Self {
        Self {
            strategies,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves the key of `mapped`, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyResolution`] if no strategy finds a key, or if the type's
    /// declaration is ambiguous.
    pub async fn resolve(&self, mapped: &MappedType) -> RegistryResult<KeyDescriptor> {
        if let Some(key) = self.resolved.read().await.get(&mapped.type_id()) {
            return Ok(key.clone());
        }

        let key = self.run_strategies(mapped)?;

        debug!(
            mapped_type = mapped.type_name(),
            field = key.field(),
            kind = %key.kind(),
            "resolved key"
        );

        Ok(self
            .resolved
            .write()
            .await
            .entry(mapped.type_id())
            .or_insert(key)
            .clone())
    }

    /// Number of types resolved so far.
    pub async fn cached(&self) -> usize {
        self.resolved.read().await.len()
    }

    fn run_strategies(&self, mapped: &MappedType) -> RegistryResult<KeyDescriptor> {
        for strategy in &self.strategies {
            if let Some(key) = strategy.resolve(mapped)? {
                return Ok(key);
            }
        }

        Err(RegistryError::KeyResolution(format!(
            "{} declares no key: implement KeyTyped or mark one field with #[key]",
            mapped.type_name()
        )))
    }
}
