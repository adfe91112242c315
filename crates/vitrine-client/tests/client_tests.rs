//! `TargetClient` against a mock HTTP server.

use serde_json::json;
use vitrine_client::{TargetClient, TargetConfig};
use vitrine_core::{Error, activity::ActivityType, api::TargetApi};
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_json, body_string_contains, header, method, path, query_param},
};

const TOKEN_PATH: &str = "/ims/token/v3";

fn client(server: &MockServer) -> TargetClient {
  let config = TargetConfig::new("acme", "client-id", "client-secret", "api-key", "openid")
    .with_token_url(format!("{}{TOKEN_PATH}", server.uri()))
    .with_base_url(server.uri());
  TargetClient::new(config).expect("client")
}

async fn mount_token(server: &MockServer, token: &str, expires_in: i64, times: u64) {
  Mock::given(method("POST"))
    .and(path(TOKEN_PATH))
    .and(body_string_contains("grant_type=client_credentials"))
    .and(body_string_contains("client_id=client-id"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "access_token": token, "expires_in": expires_in })),
    )
    .expect(times)
    .mount(server)
    .await;
}

// ─── Token cache ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_is_reused_within_validity_window() {
  let server = MockServer::start().await;
  mount_token(&server, "tok-1", 86_399, 1).await;
  Mock::given(method("GET"))
    .and(path("/acme/target/activities"))
    .and(header("authorization", "Bearer tok-1"))
    .and(header("x-api-key", "api-key"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "activities": [] })))
    .expect(2)
    .mount(&server)
    .await;

  let client = client(&server);
  client.list_activities(&[]).await.unwrap();
  client.list_activities(&[]).await.unwrap();
}

#[tokio::test]
async fn expired_token_is_refreshed() {
  let server = MockServer::start().await;
  // A 60 s lifetime is entirely eaten by the safety margin.
  mount_token(&server, "short-lived", 60, 2).await;

  let client = client(&server);
  assert_eq!(client.tokens().access_token().await.unwrap(), "short-lived");
  assert_eq!(client.tokens().access_token().await.unwrap(), "short-lived");
}

#[tokio::test]
async fn invalidated_token_is_requested_again() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 2).await;

  let client = client(&server);
  client.tokens().access_token().await.unwrap();
  client.tokens().invalidate().await;
  client.tokens().access_token().await.unwrap();
}

#[tokio::test]
async fn token_endpoint_failure_is_an_auth_error() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path(TOKEN_PATH))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })))
    .mount(&server)
    .await;

  let err = client(&server).list_audiences().await.unwrap_err();
  assert!(matches!(&err, Error::Auth(msg) if msg.contains("invalid_client")), "{err}");
}

#[tokio::test]
async fn malformed_token_payload_is_an_auth_error() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path(TOKEN_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "nope" })))
    .mount(&server)
    .await;

  let err = client(&server).tokens().access_token().await.unwrap_err();
  assert!(matches!(err, Error::Auth(_)));
}

// ─── Resources ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn upstream_failure_carries_status_and_body() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 1).await;
  Mock::given(method("GET"))
    .and(path("/acme/target/offers"))
    .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
    .mount(&server)
    .await;

  let err = client(&server).list_offers(&[]).await.unwrap_err();
  assert_eq!(err.upstream_status(), Some(503));
  assert_eq!(err.details(), "maintenance");
}

#[tokio::test]
async fn list_queries_are_forwarded() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 1).await;
  Mock::given(method("GET"))
    .and(path("/acme/target/offers"))
    .and(query_param("search", "4242"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "total": 1,
      "offers": [{ "id": 4242, "name": "Banner", "type": "json" }]
    })))
    .expect(1)
    .mount(&server)
    .await;

  let offers = client(&server)
    .list_offers(&[("search".to_owned(), "4242".to_owned())])
    .await
    .unwrap();
  assert_eq!(offers.len(), 1);
  assert_eq!(offers[0].normalized_kind().as_deref(), Some("json"));
}

#[tokio::test]
async fn activity_detail_uses_type_segment() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 1).await;
  Mock::given(method("GET"))
    .and(path("/acme/target/activities/xt/42"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({ "id": 42, "type": "xt", "options": [] })),
    )
    .expect(1)
    .mount(&server)
    .await;

  let detail = client(&server)
    .activity_detail(ActivityType::Xt, "42")
    .await
    .unwrap();
  assert_eq!(detail["id"], 42);
}

#[tokio::test]
async fn offer_detail_and_update_round_trip() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 1).await;
  Mock::given(method("GET"))
    .and(path("/acme/target/offers/json/7"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "id": 7,
      "name": "Home",
      "content": { "payload": { "nomeOferta": "home-20240101" } }
    })))
    .mount(&server)
    .await;
  let update = json!({ "name": "Home", "content": { "payload": { "nomeOferta": "home-20240202" } } });
  Mock::given(method("PUT"))
    .and(path("/acme/target/offers/json/7"))
    .and(body_json(&update))
    .respond_with(ResponseTemplate::new(200).set_body_json(&update))
    .expect(1)
    .mount(&server)
    .await;

  let client = client(&server);
  let offer = client.offer_detail("json", "7").await.unwrap();
  assert_eq!(offer.content["payload"]["nomeOferta"], "home-20240101");
  let echoed = client.update_offer("json", "7", &update).await.unwrap();
  assert_eq!(echoed, update);
}

#[tokio::test]
async fn empty_success_body_decodes_as_null() {
  let server = MockServer::start().await;
  mount_token(&server, "tok", 3600, 1).await;
  Mock::given(method("PUT"))
    .and(path("/acme/target/activities/ab/9"))
    .respond_with(ResponseTemplate::new(204))
    .mount(&server)
    .await;

  let out = client(&server)
    .update_activity(ActivityType::Ab, "9", &json!({ "name": "x" }))
    .await
    .unwrap();
  assert!(out.is_null());
}
