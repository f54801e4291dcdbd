mod common;

use common::{User, connection};
use docmapper::prelude::*;

async fn seeded() -> Connection<common::RecordingBackend> {
    let connection = connection();

    for (email, age) in [("ann@x.io", 31), ("bob@x.io", 17), ("cid@x.io", 45), ("dee@x.io", 31)] {
        connection.save(&mut User::new(email, age)).await.unwrap();
    }

    connection
}

#[test]
fn example_filters_only_constrain_set_fields() {
    let example = User { created: 0, ..User::new("ann@x.io", 31) };

    assert_eq!(
        Filter::example(&example).unwrap(),
        Expr::And(vec![
            Expr::field("email".into(), FieldOp::Eq, "ann@x.io".into()),
            Expr::field("age".into(), FieldOp::Eq, 31.into()),
        ])
    );
    assert!(Filter::example(&User::default()).unwrap().matches_all());
}

#[test]
fn sort_keys_from_examples_use_field_names_only() {
    let sort = Sort::from_example(&User::new("ignored", 99), SortDirection::Desc).unwrap();

    assert_eq!(sort.iter().map(Sort::to_key).collect::<Vec<_>>(), vec!["-email", "-age"]);
}

#[tokio::test]
async fn find_one_and_count_by_example() {
    let connection = seeded().await;

    let bob = connection
        .find_one(&User { email: "bob@x.io".into(), ..Default::default() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob.age, 17);

    assert_eq!(connection.count(&User { age: 31, ..Default::default() }).await.unwrap(), 2);
    assert_eq!(connection.count(&User::default()).await.unwrap(), 4);
    assert!(
        connection
            .find_one(&User::new("nobody@x.io", 0))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn find_all_applies_sort_skip_and_limit() {
    let connection = seeded().await;

    let query = Query::builder()
        .sort_key("-age")
        .sort_key("email")
        .skip(1)
        .limit(2)
        .build();
    let users = connection.find_all(&User::default(), query).await.unwrap();

    assert_eq!(
        users.iter().map(|user| user.email.as_str()).collect::<Vec<_>>(),
        vec!["ann@x.io", "dee@x.io"]
    );
}

#[tokio::test]
async fn find_all_combines_the_example_with_a_raw_filter() {
    let connection = seeded().await;

    let query = Query::builder()
        .filter(Filter::starts_with("email", "d"))
        .build();
    let users = connection
        .find_all(&User { age: 31, ..Default::default() }, query)
        .await
        .unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "dee@x.io");
}

#[tokio::test]
async fn raw_filters_are_used_verbatim() {
    let connection = seeded().await;
    let users = connection.typed_collection::<User>("users");

    assert_eq!(users.count(Filter::gte("age", 31)).await.unwrap(), 3);
    assert_eq!(
        users
            .count(Filter::or([Filter::lt("age", 18), Filter::gt("age", 40)]))
            .await
            .unwrap(),
        2
    );

    let raw = connection
        .collection("users")
        .find_one(Filter::eq("email", "cid@x.io"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.get_i32("age").unwrap(), 45);
}

#[tokio::test]
async fn find_by_identity_selects_on_the_identity_field() {
    let connection = seeded().await;
    let mut user = User::new("eve@x.io", 22);
    connection.save(&mut user).await.unwrap();

    let users = connection.collection_of(&user).unwrap();
    assert_eq!(users.identity_field(), "_id");

    let found = users
        .find_by_identity(user.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.email, "eve@x.io");

    let projected = users
        .untyped()
        .find_one(Filter::identity("_id", user.id.unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(projected.get_str("email").unwrap(), "eve@x.io");
    assert!(!projected.contains_key("password"));
    assert_eq!(projected.get_i32("age").unwrap(), 22);
}
