//! Integration tests for the record driver over the in-memory store.


use std::sync::Arc;

use record_driver::{
    doc, Bson, CollectionsExt, ConfigError, DriverConfig, DriverError, ObjectId, Record,
    RecordDriver, StoreError, Verb,
};
use serde_json::json;
use users::{driver, user, DATABASE, USERS};

#[tokio::test]
async fn user_lifecycle() {
    let driver = driver(false);

    // Create
    let mut created = user(doc! { "firstname": "toto" });
    let result = driver.create(&mut created).await.unwrap().unwrap();
    assert_eq!(result.data().get_str("firstname").unwrap(), "toto");
    let id = result.id().unwrap();
    assert!(!id.is_empty());

    // Read it back by id
    let mut loaded = user(doc! { "id": id.clone() });
    let result = driver.read(&mut loaded).await.unwrap().unwrap();
    assert_eq!(result.id().as_deref(), Some(id.as_str()));
    assert_eq!(result.data().get_str("firstname").unwrap(), "toto");

    // Update one field
    let mut renamed = user(doc! { "id": id.clone(), "firstname": "jéjé" });
    let result = driver.update(&mut renamed).await.unwrap().unwrap();
    assert_eq!(result.id().as_deref(), Some(id.as_str()));
    assert_eq!(result.data().get_str("firstname").unwrap(), "jéjé");

    // Update another; the first survives
    let mut surnamed = user(doc! { "id": id.clone(), "lastname": "postman" });
    let result = driver.update(&mut surnamed).await.unwrap().unwrap();
    assert_eq!(result.data().get_str("firstname").unwrap(), "jéjé");
    assert_eq!(result.data().get_str("lastname").unwrap(), "postman");

    // Delete
    let doomed = user(doc! { "id": id });
    assert!(driver.delete(&doomed).await.unwrap());
    assert_eq!(driver.store().inner().count(DATABASE, USERS).unwrap(), 0);
}

#[tokio::test]
async fn create_then_update_keeps_both_fields() {
    let driver = driver(true);

    let mut toto = user(doc! { "firstname": "toto" });
    driver.create(&mut toto).await.unwrap();
    let id = toto.id().unwrap();

    let mut patch = user(doc! { "id": id, "lastname": "postman" });
    let result = driver.update(&mut patch).await.unwrap().unwrap();
    assert_eq!(result.data().get_str("firstname").unwrap(), "toto");
    assert_eq!(result.data().get_str("lastname").unwrap(), "postman");
}

#[tokio::test]
async fn invalid_records_never_reach_storage() {
    let driver = driver(true);
    let id = ObjectId::new().to_hex();

    let mut bad = user(doc! { "id": id.clone(), "firstname": 42 });
    let expected = "\"firstname\" must be a string";

    let err = driver.create(&mut bad).await.unwrap_err();
    assert!(matches!(&err, DriverError::Validation(msg) if msg == expected));
    let err = driver.read(&mut bad).await.unwrap_err();
    assert!(matches!(&err, DriverError::Validation(msg) if msg == expected));
    let err = driver.update(&mut bad).await.unwrap_err();
    assert!(matches!(&err, DriverError::Validation(msg) if msg == expected));
    let err = driver.delete(&bad).await.unwrap_err();
    assert!(matches!(&err, DriverError::Validation(msg) if msg == expected));

    let mut unknown = user(doc! { "nickname": "tt" });
    let err = driver.create(&mut unknown).await.unwrap_err();
    assert!(matches!(&err, DriverError::Validation(msg) if msg == "\"nickname\" is not allowed"));

    assert_eq!(driver.store().calls(), 0);
    assert_eq!(driver.store().inner().connections(), 0);
}

#[tokio::test]
async fn identifier_required_before_storage() {
    let driver = driver(false);
    let mut anonymous = user(doc! { "firstname": "toto" });

    let err = driver.read(&mut anonymous).await.unwrap_err();
    assert!(matches!(err, DriverError::IdentifierRequired));
    let err = driver.update(&mut anonymous).await.unwrap_err();
    assert!(matches!(err, DriverError::IdentifierRequired));
    let err = driver.delete(&anonymous).await.unwrap_err();
    assert!(matches!(err, DriverError::IdentifierRequired));

    let mut blank = user(doc! { "id": "" });
    let err = driver.read(&mut blank).await.unwrap_err();
    assert!(matches!(err, DriverError::IdentifierRequired));

    assert_eq!(driver.store().calls(), 0);
}

#[tokio::test]
async fn delete_missing_depends_on_strict_mode() {
    let ghost = user(doc! { "id": ObjectId::new().to_hex() });

    let strict = driver(true);
    let err = strict.delete(&ghost).await.unwrap_err();
    assert!(matches!(err, DriverError::NothingAffected(Verb::Delete)));
    assert_eq!(err.to_string(), "no item to delete");
    assert_eq!(strict.store().calls(), 1);

    let lenient = driver(false);
    assert!(!lenient.delete(&ghost).await.unwrap());
}

#[tokio::test]
async fn update_missing_depends_on_strict_mode() {
    let id = ObjectId::new().to_hex();

    let strict = driver(true);
    let mut ghost = user(doc! { "id": id.clone(), "firstname": "boo" });
    let err = strict.update(&mut ghost).await.unwrap_err();
    assert!(matches!(err, DriverError::NothingAffected(Verb::Update)));
    assert_eq!(err.to_string(), "no item to update");

    let lenient = driver(false);
    let mut ghost = user(doc! { "id": id.clone(), "firstname": "boo" });
    assert!(lenient.update(&mut ghost).await.unwrap().is_none());
    assert_eq!(ghost.data(), &doc! { "id": id, "firstname": "boo" });
    assert_eq!(lenient.store().inner().count(DATABASE, USERS).unwrap(), 0);
}

#[tokio::test]
async fn read_missing_returns_none() {
    let driver = driver(true);
    let mut ghost = user(doc! { "id": ObjectId::new().to_hex() });
    assert!(driver.read(&mut ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn unreachable_store_is_not_an_empty_result() {
    let driver = driver(false);
    let mut toto = user(doc! { "firstname": "toto" });
    driver.create(&mut toto).await.unwrap();

    driver.store().inner().set_online(false);

    let mut loaded = user(doc! { "id": toto.id().unwrap() });
    let err = driver.read(&mut loaded).await.unwrap_err();
    assert!(matches!(err, DriverError::Store(ref e) if e.is_connection()));

    let err = driver.update(&mut loaded).await.unwrap_err();
    assert!(matches!(err, DriverError::Store(StoreError::Connection { .. })));

    let err = driver.delete(&loaded).await.unwrap_err();
    assert!(matches!(err, DriverError::Store(StoreError::Connection { .. })));

    let mut fresh = user(doc! { "firstname": "x" });
    let err = driver.create(&mut fresh).await.unwrap_err();
    assert!(matches!(err, DriverError::Store(StoreError::Connection { .. })));
    assert!(fresh.id().is_none());
}

#[tokio::test]
async fn each_call_opens_its_own_connection() {
    let driver = driver(false);
    let mut toto = user(doc! { "firstname": "toto" });

    driver.create(&mut toto).await.unwrap();
    driver.read(&mut toto).await.unwrap();
    driver.update(&mut toto).await.unwrap();
    driver.delete(&toto).await.unwrap();

    assert_eq!(driver.store().calls(), 4);
    assert_eq!(driver.store().inner().connections(), 4);
}

#[tokio::test]
async fn concurrent_updates_merge_fields() {
    let driver = Arc::new(driver(true));

    let mut toto = user(doc! { "firstname": "toto" });
    driver.create(&mut toto).await.unwrap();
    let id = toto.id().unwrap();

    let patches = vec![
        doc! { "id": id.clone(), "lastname": "postman" },
        doc! { "id": id.clone(), "favorites": { "color": "blue" } },
        doc! { "id": id.clone(), "preferences": ["dark"] },
        doc! { "id": id.clone(), "order": 3 },
    ];

    let handles: Vec<_> = patches
        .into_iter()
        .map(|patch| {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move {
                let mut record = user(patch);
                driver.update(&mut record).await.map(|updated| updated.is_some())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let mut loaded = user(doc! { "id": id });
    driver.read(&mut loaded).await.unwrap().unwrap();
    let data = loaded.data();
    assert_eq!(data.get_str("firstname").unwrap(), "toto");
    assert_eq!(data.get_str("lastname").unwrap(), "postman");
    assert_eq!(data.get_document("favorites").unwrap(), &doc! { "color": "blue" });
    assert_eq!(data.get_array("preferences").unwrap(), &vec![Bson::from("dark")]);
    assert_eq!(data.get_i32("order").unwrap(), 3);
}

#[tokio::test]
async fn string_and_native_ids_find_the_same_document() {
    let driver = driver(false);
    let users = driver.collection(USERS);

    let outcome = users.insert(doc! { "firstname": "toto" }).await.unwrap();
    let Some(Bson::ObjectId(oid)) = outcome.inserted_id else {
        panic!("expected a generated object id");
    };

    let by_native = users.find(doc! { "_id": oid }).await.unwrap();
    let by_string = users.find(doc! { "_id": oid.to_hex() }).await.unwrap();
    assert_eq!(by_native.len(), 1);
    assert_eq!(by_native, by_string);
}

#[tokio::test]
async fn collection_handle_bulk_operations() {
    let driver = driver(false);
    let users = driver.collection(USERS);
    assert_eq!(users.name(), USERS);

    let outcome = users
        .insert(vec![
            doc! { "firstname": "a", "team": "red" },
            doc! { "firstname": "b", "team": "red" },
            doc! { "firstname": "c", "team": "blue" },
        ])
        .await
        .unwrap();
    assert_eq!(outcome.inserted_count, 3);
    assert!(outcome.inserted_id.is_none());

    let updated = users
        .update_many(doc! { "team": "red" }, doc! { "team": "green" })
        .await
        .unwrap();
    assert_eq!(updated.matched_count, 2);
    assert_eq!(updated.modified_count, 2);

    let one = users
        .update_one(doc! { "firstname": "c" }, doc! { "score": 7 })
        .await
        .unwrap();
    assert_eq!(one.matched_count, 1);
    assert_eq!(one.modified_count, 1);

    let err = users
        .update_many(doc! {}, "not a document")
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::MalformedUpdate { expected: "data" });

    let deleted = users.delete_one(doc! { "team": "green" }).await.unwrap();
    assert_eq!(deleted.deleted_count, 1);
    assert_eq!(users.find(doc! {}).await.unwrap().len(), 2);
}

#[tokio::test]
async fn driver_from_application_config() {
    let config = DriverConfig::from_json_str(
        r#"{ "mongo": { "database": "from_json", "host": "mongodb://localhost", "strict": true } }"#,
    )
    .unwrap();
    let driver = RecordDriver::new(config, record_driver::InMemoryStore::new());
    assert!(driver.config().strict);

    let mut toto = user(doc! { "firstname": "toto" });
    driver.create(&mut toto).await.unwrap();
    assert_eq!(driver.store().count("from_json", USERS).unwrap(), 1);
}

#[cfg(feature = "mongodb")]
#[test]
fn from_app_config_without_mongo_section_fails() {
    let err = RecordDriver::from_app_config(&json!({ "postgres": {} }))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DriverError::Config(ConfigError::MissingSection("mongo"))
    ));
}

#[cfg(feature = "mongodb")]
#[test]
fn from_app_config_reads_mongo_section() {
    let driver = RecordDriver::from_app_config(&json!({
        "mongo": { "database": "from_app", "host": "mongodb://localhost:27017", "strict": true }
    }))
    .unwrap();

    assert!(driver.config().strict);
    assert_eq!(driver.config().database, "from_app");
    assert_eq!(driver.store().host(), "mongodb://localhost:27017");
}

#[tokio::test]
async fn id_only_update_reads_instead_of_writing() {
    let driver = driver(true);
    let mut created = user(doc! { "firstname": "toto", "lastname": "postman" });
    driver.create(&mut created).await.unwrap();
    let id = created.id().unwrap();

    let mut bare = user(doc! { "id": id.clone() });
    let result = driver.update(&mut bare).await.unwrap().unwrap();
    assert_eq!(result.id().as_deref(), Some(id.as_str()));
    assert_eq!(result.data().get_str("firstname").unwrap(), "toto");
    assert_eq!(result.data().get_str("lastname").unwrap(), "postman");
    assert_eq!(driver.store().methods(), vec!["create", "find"]);

    let mut ghost = user(doc! { "id": ObjectId::new().to_hex() });
    let err = driver.update(&mut ghost).await.unwrap_err();
    assert!(matches!(err, DriverError::NothingAffected(Verb::Update)));
}

#[tokio::test]
async fn field_update_uses_find_one_and_update() {
    let driver = driver(false);
    let mut created = user(doc! { "firstname": "toto" });
    driver.create(&mut created).await.unwrap();
    let id = created.id().unwrap();

    let mut renamed = user(doc! { "id": id, "firstname": "titi" });
    driver.update(&mut renamed).await.unwrap().unwrap();
    assert_eq!(
        driver.store().methods(),
        vec!["create", "find_one_and_update"]
    );
}
