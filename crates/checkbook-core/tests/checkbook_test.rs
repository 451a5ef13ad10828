#![allow(clippy::unwrap_used)]
// End-to-end tests of the `Checkbook` service against a mock server.

use chrono::{TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkbook_core::{Checkbook, ClientConfig, CoreError, Credentials, NewEntry};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Checkbook) {
    let server = MockServer::start().await;
    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let checkbook = Checkbook::new(config).unwrap();
    (server, checkbook)
}

fn entry_json(id: i64, category: i64, datetime: &str, value: f64) -> serde_json::Value {
    json!({
        "id": id,
        "caption": format!("entry{id}"),
        "value": value,
        "category": category,
        "datetime": datetime,
        "details": null
    })
}

/// Months 557 (June 2016) with categories 1 and 2, one entry in category 1.
async fn mount_june(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/months/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 557, "value": 100 },
            { "id": 558, "value": 0 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/months/557/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "caption": "category1", "value": 100 },
            { "id": 2, "caption": "category2", "value": 0 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/months/557/categories/1/entries/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry_json(1, 1, "2016-06-10T00:00:00.000Z", 100.0)
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/months/557/categories/2/entries/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_with_credentials() {
    let server = MockServer::start().await;
    let mut config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    config.credentials = Some(Credentials {
        username: "alice".into(),
        password: SecretString::from("hunter2".to_string()),
    });
    let checkbook = Checkbook::new(config).unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({ "grant_type": "password" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a1",
            "refresh_token": "r1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "caption": "Rent" }
        ])))
        .mount(&server)
        .await;

    checkbook.login().await.unwrap();
    assert_eq!(checkbook.refresh_token().unwrap().expose_secret(), "r1");

    let categories = checkbook.categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].caption(), "Rent");
}

#[tokio::test]
async fn test_refresh_token_resumes_session() {
    let server = MockServer::start().await;
    let mut config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    config.refresh_token = Some(SecretString::from("saved".to_string()));
    let checkbook = Checkbook::new(config).unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "saved"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a2",
            "refresh_token": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    checkbook.login().await.unwrap();
    assert_eq!(checkbook.refresh_token().unwrap().expose_secret(), "r2");
}

#[tokio::test]
async fn test_login_without_anything_requires_login() {
    let (_server, checkbook) = setup().await;
    let result = checkbook.login().await;
    assert!(matches!(result, Err(CoreError::LoginRequired)));
}

// ── Reads and totals ────────────────────────────────────────────────

#[tokio::test]
async fn test_month_totals_follow_loaded_data() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    let months = checkbook.months().await.unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].label(), "2016-06");
    assert!((checkbook.month_total(&months[0]) - 100.0).abs() < f64::EPSILON);

    let categories = checkbook.categories_for_month(557).await.unwrap();
    assert_eq!(categories[0].monthid(), Some(557));
    assert!(
        checkbook
            .category_for_month_store()
            .unwrap()
            .has("/months/557/categories/1")
    );

    let entries = checkbook.entries_for(557, 1).await.unwrap();
    assert_eq!(entries.len(), 1);
    entries[0].set_value(40.0);
    assert!((checkbook.category_total(&categories[0]) - 40.0).abs() < f64::EPSILON);
    assert!((checkbook.month_total(&months[0]) - 40.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_nested_entries_are_found_by_id() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    Mock::given(method("GET"))
        .and(path("/entries/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let nested = checkbook.entries_for(557, 1).await.unwrap();
    let direct = checkbook.entry(1).await.unwrap();
    assert!(direct.element().ptr_eq(nested[0].element()));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_move_entry_refiles_between_loaded_lists() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    Mock::given(method("PUT"))
        .and(path("/entries/1"))
        .and(body_partial_json(json!({ "category": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(
            1,
            2,
            "2016-06-10T00:00:00.000Z",
            100.0,
        )))
        .expect(1)
        .mount(&server)
        .await;

    checkbook.months().await.unwrap();
    let categories = checkbook.categories_for_month(557).await.unwrap();
    let entry = checkbook.entries_for(557, 1).await.unwrap().remove(0);
    checkbook.entries_for(557, 2).await.unwrap();

    let found = checkbook.find_category_for_entry(&entry).unwrap();
    assert_eq!(found.id(), Some(1));

    checkbook.move_entry(&entry, Some(2), None).await.unwrap();

    let store = checkbook.entry_store().unwrap();
    let old_list = store.get_collection("/months/557/categories/1/entries/").unwrap();
    let new_list = store.get_collection("/months/557/categories/2/entries/").unwrap();
    assert!(!old_list.contains(entry.element()));
    assert!(new_list.contains(entry.element()));

    let found = checkbook.find_category_for_entry(&entry).unwrap();
    assert_eq!(found.id(), Some(2));
    assert!((checkbook.category_total(&categories[0])).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_move_entry_requires_a_target() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    let entry = checkbook.entries_for(557, 1).await.unwrap().remove(0);
    let result = checkbook.move_entry(&entry, None, None).await;
    assert!(matches!(result, Err(CoreError::ValidationFailed { .. })));
}

#[tokio::test]
async fn test_created_entry_joins_nested_list() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    Mock::given(method("POST"))
        .and(path("/entries/"))
        .and(body_partial_json(json!({ "caption": "Coffee", "category": 2 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(entry_json(
            5,
            2,
            "2016-06-20T00:00:00.000Z",
            3.5,
        )))
        .mount(&server)
        .await;

    let list = checkbook.entries_for(557, 2).await.unwrap();
    assert!(list.is_empty());

    let entry = checkbook
        .create_entry(&NewEntry {
            caption: "Coffee".into(),
            value: 3.5,
            category: 2,
            datetime: Utc.with_ymd_and_hms(2016, 6, 20, 0, 0, 0).unwrap(),
            details: None,
        })
        .await
        .unwrap();

    assert_eq!(entry.id(), Some(5));
    let nested = checkbook
        .entry_store()
        .unwrap()
        .get_collection("/months/557/categories/2/entries/")
        .unwrap();
    assert!(nested.contains(entry.element()));
}

#[tokio::test]
async fn test_deleted_entry_leaves_lists() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/entries/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let entry = checkbook.entries_for(557, 1).await.unwrap().remove(0);
    checkbook.delete_entry(&entry).await.unwrap();

    let store = checkbook.entry_store().unwrap();
    assert!(!store.has("/entries/1"));
    assert!(
        store
            .get_collection("/months/557/categories/1/entries/")
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_month_and_month_list_share_elements() {
    let (server, checkbook) = setup().await;
    mount_june(&server).await;

    Mock::given(method("GET"))
        .and(path("/months/557"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 557, "value": 90 })))
        .expect(1)
        .mount(&server)
        .await;

    let month = checkbook.month(557).await.unwrap();
    assert_eq!(month.id(), Some(557));

    let months = checkbook.months().await.unwrap();
    assert!(months[0].element().ptr_eq(month.element()));
    assert!((months[0].value() - 90.0).abs() < f64::EPSILON);

    let again = checkbook.month(557).await.unwrap();
    assert!(again.element().ptr_eq(month.element()));
}
