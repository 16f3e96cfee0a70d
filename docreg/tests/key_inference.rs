use docreg::{bson, memory::InMemoryConnector, prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Mapped)]
struct Customer {
    #[key]
    email: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Mapped)]
#[mapped(key_typed)]
struct Ledger {
    #[key]
    label: String,
    code: i64,
}

impl KeyTyped for Ledger {
    type Key = i64;
    const KEY_FIELD: &'static str = "code";
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
struct Unkeyed {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
struct TwoKeys {
    #[key]
    first: String,
    #[key]
    second: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Mapped)]
struct Renamed {
    #[key]
    #[serde(rename = "orderNumber")]
    order_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
struct Generated {
    #[key]
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<bson::oid::ObjectId>,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Mapped)]
#[serde(rename_all = "camelCase")]
struct Profile {
    #[key]
    user_id: String,
    display_name: String,
    #[serde(rename = "tz")]
    time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Mapped)]
#[serde(rename_all = "camelCase")]
struct Post {
    #[key]
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<bson::oid::ObjectId>,
    body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
#[serde(rename_all(serialize = "SCREAMING-KEBAB-CASE", deserialize = "SCREAMING-KEBAB-CASE"))]
struct Legacy {
    #[key]
    record_no: i64,
}

async fn started() -> CollectionRegistry {
    let registry = CollectionRegistry::new(Arc::new(InMemoryConnector));
    registry.on_start(&ConfigMap::new()).await.unwrap();
    registry
}

#[test]
fn derive_records_declared_fields() {
    let fields = Customer::fields();

    assert_eq!(
        fields,
        vec![FieldDecl::key("email", "String"), FieldDecl::plain("name", "String")]
    );
    assert!(Customer::declared_key().is_none());
}

#[test]
fn derive_honours_serde_rename() {
    let fields = Renamed::fields();

    assert_eq!(fields[0].name, "orderNumber");
    assert!(fields[0].key_marker);
    assert_eq!(fields[1].type_name, "Option<String>");
}

#[test]
fn derive_links_declared_key() {
    assert_eq!(
        Ledger::declared_key(),
        Some(KeyDescriptor::new("code", KeyKind::Number))
    );
}

#[tokio::test]
async fn marked_field_becomes_the_key() {
    let registry = started().await;
    let customers = registry.get_collection::<Customer>("customers").await.unwrap();

    assert_eq!(customers.key(), &KeyDescriptor::new("email", KeyKind::String));
}

#[tokio::test]
async fn declared_key_takes_precedence_over_marker() {
    let registry = started().await;
    let ledgers = registry.get_collection::<Ledger>("ledgers").await.unwrap();

    assert_eq!(ledgers.key(), &KeyDescriptor::new("code", KeyKind::Number));

    let ledger = Ledger { label: "travel".into(), code: 4100 };
    let saved = ledgers.save(&ledger).await.unwrap();
    assert_eq!(saved.saved_key().unwrap(), 4100);
    assert_eq!(ledgers.find_by_key(&4100).await.unwrap(), Some(ledger));
}

#[tokio::test]
async fn missing_key_fails_resolution() {
    let registry = started().await;
    let err = registry.get_collection::<Unkeyed>("unkeyed").await.unwrap_err();

    assert!(matches!(err, RegistryError::KeyResolution(_)));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn ambiguous_markers_fail_resolution() {
    let registry = started().await;
    let err = registry.get_collection::<TwoKeys>("pairs").await.unwrap_err();

    match err {
        RegistryError::KeyResolution(message) => {
            assert!(message.contains("first"));
            assert!(message.contains("second"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn renamed_key_round_trips() {
    let registry = started().await;
    let orders = registry.get_collection::<Renamed>("orders").await.unwrap();
    assert_eq!(orders.key().field(), "orderNumber");

    let order = Renamed { order_number: 17, note: Some("rush".into()) };
    let saved = orders.save(&order).await.unwrap();

    assert_eq!(saved.saved_id_as::<u32>().unwrap(), 17);
    assert_eq!(orders.find_one_by_id(saved.saved_id().clone()).await.unwrap(), Some(order));
}

#[tokio::test]
async fn missing_object_id_is_generated_on_save() {
    let registry = started().await;
    let posts = registry.get_collection::<Generated>("posts").await.unwrap();
    assert_eq!(posts.key().kind(), KeyKind::ObjectId);

    let saved = posts
        .save(&Generated { id: None, body: "hello".into() })
        .await
        .unwrap();
    let id = saved.saved_id_as::<bson::oid::ObjectId>().unwrap();

    let found = posts.find_one_by_id(id).await.unwrap().unwrap();
    assert_eq!(found.id, Some(id));
    assert_eq!(found.body, "hello");
}

#[tokio::test]
async fn inference_is_cached_per_type() {
    let registry = started().await;
    registry.get_collection::<Customer>("a").await.unwrap();
    registry.get_collection::<Customer>("b").await.unwrap();
    registry.get_collection::<Ledger>("c").await.unwrap();

    assert_eq!(registry.inferencer().cached().await, 2);
}

#[test]
fn derive_applies_container_rename_rule() {
    let names = Profile::fields()
        .into_iter()
        .map(|field| field.name)
        .collect::<Vec<_>>();

    assert_eq!(names, vec!["userId", "displayName", "tz"]);
    assert_eq!(Legacy::fields()[0].name, "RECORD-NO");
}

#[tokio::test]
async fn renamed_string_key_is_saved_and_found() {
    let registry = started().await;
    let profiles = registry.get_collection::<Profile>("profiles").await.unwrap();
    assert_eq!(profiles.key().field(), "userId");

    let profile = Profile {
        user_id: "u-42".into(),
        display_name: "Ada".into(),
        time_zone: "UTC".into(),
    };
    let saved = profiles.save(&profile).await.unwrap();

    assert_eq!(saved.saved_id_as::<String>().unwrap(), "u-42");
    assert_eq!(profiles.find_one_by_id("u-42").await.unwrap(), Some(profile));
}

#[tokio::test]
async fn renamed_object_id_key_is_not_regenerated() {
    let registry = started().await;
    let posts = registry.get_collection::<Post>("posts").await.unwrap();

    let id = bson::oid::ObjectId::new();
    let post = Post { post_id: Some(id), body: "first".into() };

    let first = posts.save(&post).await.unwrap();
    let second = posts.save(&post).await.unwrap();

    assert_eq!(first.saved_id(), &bson::Bson::ObjectId(id));
    assert_eq!(second.saved_id(), &bson::Bson::ObjectId(id));
    assert_eq!(posts.count(bson::Document::new()).await.unwrap(), 1);
    assert_eq!(posts.find_one_by_id(id).await.unwrap(), Some(post));
}
