mod common;

use serde_json::json;
use tablestore::{Error, WriteRequest};

fn schema_doc() -> String {
    json!({
        "attributes": {
            "key": "string",
            "rev": "varint",
            "title": "string",
            "body": "blob"
        },
        "index": { "hash": "key", "range": ["rev"] },
        "secondaryIndexes": { "by_title": { "hash": "title" } }
    })
    .to_string()
}

fn plain_schema_doc() -> String {
    json!({
        "attributes": { "key": "string", "rev": "varint", "body": "blob" },
        "index": { "hash": "key", "range": ["rev"] }
    })
    .to_string()
}

#[tokio::test]
async fn key_only_write_is_an_insert() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
        ]
        .into_iter()
        .collect(),
        ..WriteRequest::default()
    };
    let response = store.put("org.example", &request).await.unwrap();
    assert_eq!(response.status, 201);

    let statement = driver.executed_statements().last().unwrap().clone();
    assert!(statement.query.starts_with("INSERT INTO"));
    assert!(statement.query.ends_with("(\"key\",\"rev\") VALUES (?,?)"));
    assert_eq!(statement.params, vec![json!("k1"), json!(1)]);
}

#[tokio::test]
async fn write_with_values_is_an_update_binding_values_first() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
            ("body".to_string(), json!("text")),
        ]
        .into_iter()
        .collect(),
        ..WriteRequest::default()
    };
    store.put("org.example", &request).await.unwrap();

    let statement = driver.executed_statements().last().unwrap().clone();
    assert!(statement.query.contains("UPDATE"));
    assert!(
        statement
            .query
            .ends_with("SET \"body\" = ? WHERE \"key\" = ? AND \"rev\" = ?")
    );
    assert_eq!(statement.params, vec![json!("text"), json!("k1"), json!(1)]);
}

#[tokio::test]
async fn not_exists_forces_insert_with_keys_first() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    driver.respond(vec![common::row(&[("[applied]", json!(true))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
            ("body".to_string(), json!("text")),
        ]
        .into_iter()
        .collect(),
        condition: Some(json!("Not  Exists")),
        ..WriteRequest::default()
    };
    store.put("org.example", &request).await.unwrap();

    let statement = driver.executed_statements().last().unwrap().clone();
    assert!(statement.query.starts_with("INSERT INTO"));
    assert!(statement.query.contains("(\"key\",\"rev\",\"body\")"));
    assert!(statement.query.ends_with("IF NOT EXISTS"));
    assert_eq!(
        statement.params,
        vec![json!("k1"), json!(1), json!("text")]
    );
}

#[tokio::test]
async fn failed_condition_surfaces_the_applied_row() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    driver.respond(vec![common::row(&[
        ("[applied]", json!(false)),
        ("rev", json!(4)),
    ])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
        ]
        .into_iter()
        .collect(),
        condition: Some(json!("not exists")),
        ..WriteRequest::default()
    };
    match store.put("org.example", &request).await {
        Err(Error::ConditionNotMet(row)) => assert_eq!(row["rev"], json!(4)),
        other => panic!("expected ConditionNotMet, got {other:?}"),
    }
}

#[tokio::test]
async fn condition_predicate_appends_an_if_clause() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    driver.respond(vec![common::row(&[("[applied]", json!(true))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
            ("body".to_string(), json!("new")),
        ]
        .into_iter()
        .collect(),
        condition: Some(json!({ "body": { "eq": "old" } })),
        ..WriteRequest::default()
    };
    store.put("org.example", &request).await.unwrap();

    let statement = driver.executed_statements().last().unwrap().clone();
    assert!(statement.query.ends_with("IF \"body\" = ?"));
    assert_eq!(
        statement.params,
        vec![json!("new"), json!("k1"), json!(1), json!("old")]
    );
}

#[tokio::test]
async fn secondary_indexes_fan_out_as_one_batch() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(schema_doc()))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("rev".to_string(), json!(1)),
            ("title".to_string(), json!("hello")),
        ]
        .into_iter()
        .collect(),
        ..WriteRequest::default()
    };
    store.put("org.example", &request).await.unwrap();

    let batches = driver.batched();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.len(), 2);
    assert!(batch[0].query.contains("\".\"data\""));
    assert!(batch[1].query.contains("\".\"i_by_title\""));

    // The companion's params follow its own key order: title, key, rev, _tid.
    assert!(batch[1].query.contains("\"title\""));
    assert_eq!(batch[1].params[0], json!("hello"));
    assert_eq!(batch[1].params[1], json!("k1"));
    assert_eq!(batch[1].params[2], json!(1));
    let tid = batch[1].params[3].as_str().unwrap().to_string();
    assert!(uuid_like(&tid));

    // The synthesized _tid binds nowhere on the primary, which has no such
    // column.
    assert!(!batch[0].query.contains("_tid"));
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}

#[tokio::test]
async fn missing_index_attribute_fails_before_io() {
    let (driver, store) = common::store();
    driver.respond(vec![common::row(&[("value", json!(plain_schema_doc()))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [("key".to_string(), json!("k1"))].into_iter().collect(),
        ..WriteRequest::default()
    };
    let err = store.put("org.example", &request).await.unwrap_err();
    assert!(err.to_string().contains("Index attribute rev missing"));
    // Only the schema read reached the driver.
    assert_eq!(driver.executed_queries().len(), 1);
    assert!(driver.batched().is_empty());
}

#[tokio::test]
async fn object_values_are_json_encoded() {
    let (driver, store) = common::store();
    let doc = json!({
        "attributes": { "key": "string", "meta": "json" },
        "index": { "hash": "key" }
    })
    .to_string();
    driver.respond(vec![common::row(&[("value", json!(doc))])]);
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [
            ("key".to_string(), json!("k1")),
            ("meta".to_string(), json!({ "a": 1 })),
        ]
        .into_iter()
        .collect(),
        ..WriteRequest::default()
    };
    store.put("org.example", &request).await.unwrap();

    let statement = driver.executed_statements().last().unwrap().clone();
    assert_eq!(statement.params[0], json!("{\"a\":1}"));
    assert_eq!(statement.params[1], json!("k1"));
}

#[tokio::test]
async fn put_without_schema_is_not_found() {
    let (_driver, store) = common::store();
    let request = WriteRequest {
        table: "things".to_string(),
        attributes: [("key".to_string(), json!("k1"))].into_iter().collect(),
        ..WriteRequest::default()
    };
    assert!(matches!(
        store.put("org.example", &request).await,
        Err(Error::NotFound(_))
    ));
}
