use docmapper::{
    bson::oid::ObjectId,
    prelude::*,
    record::Resolver,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Record)]
#[record(collection = "articles", identity = "id")]
struct Article {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Record)]
#[record(collection = "tickets", identity = "number", identity_field = "ticket_no")]
struct Ticket {
    #[serde(rename(serialize = "ticket_no", deserialize = "ticket_no"))]
    number: u64,
}

#[derive(Debug, Default, Serialize, Deserialize, Record)]
#[record(collection = "slugs", identity = "slug")]
struct Slugged {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    slug: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Record)]
#[record(collection = "hooked", hooks)]
struct Hooked {
    #[serde(skip)]
    touched: bool,
}

impl Hooks for Hooked {
    fn pre_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        self.touched = true;
        Ok(())
    }
}

#[test]
fn identity_field_follows_serde_rename() {
    let id = ObjectId::new();
    let article = Article { id: Some(id), title: "t".into() };

    let resolution = Resolver::resolve(&article).unwrap();

    assert_eq!(resolution.collection, "articles");
    assert_eq!(resolution.identity, id.to_hex());
    assert_eq!(resolution.identity_field, "_id");
    assert!(Resolver::resolve(&Article::default()).unwrap().is_new());
}

#[test]
fn identity_field_can_be_named_explicitly() {
    let resolution = Resolver::resolve(&Ticket { number: 12 }).unwrap();

    assert_eq!(resolution.identity, "12");
    assert_eq!(resolution.identity_field, "ticket_no");
    assert!(Resolver::resolve(&Ticket { number: 0 }).unwrap().is_new());
}

#[test]
fn identity_field_defaults_to_the_field_name() {
    let slugged = Slugged { slug: "hello-world".into() };

    assert_eq!(Resolver::identity_field(&slugged), "slug");
    assert_eq!(Resolver::identity(&slugged), "hello-world");
}

#[test]
fn capabilities_are_only_exposed_when_declared() {
    let mut hooked = Hooked::default();

    assert!(hooked.as_identified().is_none());
    assert_eq!(hooked.as_collection_named().map(CollectionNamed::collection_name), Some("hooked"));
    assert!(hooked.as_hooks().is_some());

    let mut article = Article::default();
    assert!(article.as_hooks().is_none());
}

#[tokio::test]
async fn declared_hooks_run_on_save() {
    let connection = Connection::new(docmapper::memory::InMemoryStore::new());
    let mut hooked = Hooked::default();

    connection.save(&mut hooked).await.unwrap();

    assert!(hooked.touched);
}
