//! HTTP transport tests against a local mock server.

use std::collections::BTreeMap;

use audience_rs::api::{ApiContact, AudienceApi, HttpAudienceApi};
use audience_rs::error::Error;
use audience_rs::model::{Address, Contact, ContactEvent, ContactStatus, Country};
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpAudienceApi {
    HttpAudienceApi::new(server.uri(), &SecretString::from("key")).unwrap()
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    let request = requests.last().expect("a request was sent");
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn contact_updates_are_authenticated_posts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts"))
        .and(header("authorization", "apikey key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let contact = Contact::builder("a@b.com").add_tag("T").build();
    let response = client(&server)
        .update_contact(&ApiContact::from(&contact))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_successful());
}

#[tokio::test]
async fn contact_body_uses_the_wire_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let address = Address::builder("1 Main St", "Atlanta", "30308")
        .country(Country::Usa)
        .build();
    let contact = Contact::builder("a@b.com")
        .merge_field("FNAME", "Ada")
        .merge_field("ADDRESS", address)
        .add_tag("T")
        .remove_tag("Old")
        .marketing_permission("perm1", true)
        .contact_status(Some(ContactStatus::Transactional))
        .build();
    client(&server)
        .update_contact(&ApiContact::from(&contact))
        .await
        .unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["email_address"], "a@b.com");
    assert_eq!(body["status"], "transactional");
    assert_eq!(body["merge_fields"]["FNAME"], "Ada");
    assert_eq!(
        body["merge_fields"]["ADDRESS"],
        json!({"addr1": "1 Main St", "city": "Atlanta", "country": "US", "zip": "30308"})
    );
    let tags = body["tags"].as_array().unwrap();
    assert!(tags.contains(&json!({"name": "T", "status": "active"})));
    assert!(tags.contains(&json!({"name": "Old", "status": "inactive"})));
    assert_eq!(
        body["marketing_permissions"],
        json!([{"marketing_permission_id": "perm1", "enabled": true}])
    );
}

#[tokio::test]
async fn unset_fields_are_left_out_of_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let contact = Contact::builder("bare@b.com").build();
    client(&server)
        .update_contact(&ApiContact::from(&contact))
        .await
        .unwrap();

    assert_eq!(last_body(&server).await, json!({"email_address": "bare@b.com"}));
}

#[tokio::test]
async fn events_go_to_the_events_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts/events"))
        .and(header("authorization", "apikey key"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let properties = BTreeMap::from([("item".to_string(), "42".to_string())]);
    let event = ContactEvent::new("a@b.com", "purchased", Some(properties)).unwrap();
    let response = client(&server).add_contact_event(&event).await.unwrap();

    assert!(response.is_successful());
    assert_eq!(
        last_body(&server).await,
        json!({
            "email_address": "a@b.com",
            "event_name": "purchased",
            "properties": {"item": "42"}
        })
    );
}

#[tokio::test]
async fn error_statuses_are_responses_not_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let contact = Contact::builder("a@b.com").build();
    let response = client(&server)
        .update_contact(&ApiContact::from(&contact))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_successful());
}

#[tokio::test]
async fn connection_failures_surface_as_http_errors() {
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let api = HttpAudienceApi::new(uri, &SecretString::from("key")).unwrap();
    let contact = Contact::builder("a@b.com").build();
    let err = api
        .update_contact(&ApiContact::from(&contact))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}

#[test]
fn trailing_slash_in_base_url_is_ignored() {
    let api = HttpAudienceApi::new("https://us1.example.com/sdk/", &SecretString::from("k")).unwrap();
    assert_eq!(api.base_url(), "https://us1.example.com/sdk");
}

#[test]
fn keys_that_are_not_header_safe_are_rejected() {
    let err = HttpAudienceApi::new("https://example.com", &SecretString::from("bad\nkey")).err();
    assert!(matches!(err, Some(Error::Config(_))));
}
