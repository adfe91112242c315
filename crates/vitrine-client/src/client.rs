//! [`TargetClient`] — the HTTP implementation of [`TargetApi`].

use std::sync::Arc;

use reqwest::{
  Client, RequestBuilder,
  header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use vitrine_core::{
  Error, Result,
  activity::{ActivityOverview, ActivityType, Audience, Offer, OfferSummary},
  api::{QueryParams, TargetApi},
};

use crate::{config::TargetConfig, token::TokenCache};

const ACTIVITIES_MEDIA_TYPE: &str = "application/vnd.adobe.target.v3+json";
const AUDIENCES_MEDIA_TYPE: &str = "application/vnd.adobe.target.v3+json";
const OFFERS_MEDIA_TYPE: &str = "application/vnd.adobe.target.v2+json";

/// Async HTTP client for the remote platform's admin API.
///
/// Cheap to clone — the inner [`reqwest::Client`], configuration and token
/// cache are all shared.
#[derive(Clone)]
pub struct TargetClient {
  http:   Client,
  config: Arc<TargetConfig>,
  tokens: Arc<TokenCache>,
}

impl TargetClient {
  pub fn new(config: TargetConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;
    let config = Arc::new(config);
    let tokens = Arc::new(TokenCache::new(http.clone(), config.clone()));
    Ok(Self {
      http,
      config,
      tokens,
    })
  }

  pub fn config(&self) -> &TargetConfig { &self.config }

  pub fn tokens(&self) -> &TokenCache { &self.tokens }

  /// Attach bearer token, API key and `Accept` header.
  async fn authorized(&self, req: RequestBuilder, media_type: &str) -> Result<RequestBuilder> {
    let token = self.tokens.access_token().await?;
    Ok(
      req
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header("x-api-key", &self.config.api_key)
        .header(ACCEPT, media_type),
    )
  }

  /// Send `req` and decode its JSON body. An empty body decodes as `null`.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Value> {
    let resp = req
      .send()
      .await
      .map_err(|e| Error::transport(format!("{what} failed: {e}")))?;

    let status = resp.status();
    let body = resp
      .text()
      .await
      .map_err(|e| Error::transport(format!("{what}: reading body: {e}")))?;

    if !status.is_success() {
      return Err(Error::status(status.as_u16(), what, body));
    }
    if body.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| Error::RemoteApi {
      status:  Some(status.as_u16()),
      message: format!("{what}: response is not JSON: {e}"),
      body:    Some(body),
    })
  }

  async fn get(&self, path: &str, query: &QueryParams, media_type: &str) -> Result<Value> {
    let req = self.http.get(self.config.api_url(path)).query(query);
    let req = self.authorized(req, media_type).await?;
    self.send(req, &format!("GET {path}")).await
  }

  async fn put(&self, path: &str, body: &Value, media_type: &str) -> Result<Value> {
    let req = self
      .http
      .put(self.config.api_url(path))
      .header(CONTENT_TYPE, media_type)
      .json(body);
    let req = self.authorized(req, media_type).await?;
    self.send(req, &format!("PUT {path}")).await
  }
}

/// Items of a list response: either a bare array or an object holding the
/// array under `key`. Anything else is an empty collection; non-object items
/// are skipped.
fn collection<T: DeserializeOwned>(payload: Value, key: &str) -> Result<Vec<T>> {
  let items = match payload {
    Value::Array(items) => items,
    Value::Object(mut map) => match map.remove(key) {
      Some(Value::Array(items)) => items,
      _ => Vec::new(),
    },
    _ => Vec::new(),
  };
  items
    .into_iter()
    .filter(Value::is_object)
    .map(|item| serde_json::from_value(item).map_err(Error::from))
    .collect()
}

fn offer_path(kind: &str, id: &str) -> String {
  format!("/offers/{}/{id}", kind.trim().to_ascii_lowercase())
}

impl TargetApi for TargetClient {
  async fn list_activities(&self, query: &QueryParams) -> Result<Vec<ActivityOverview>> {
    let payload = self.get("/activities", query, ACTIVITIES_MEDIA_TYPE).await?;
    collection(payload, "activities")
  }

  async fn activity_detail(&self, kind: ActivityType, id: &str) -> Result<Value> {
    self
      .get(&format!("/activities/{kind}/{id}"), &[], ACTIVITIES_MEDIA_TYPE)
      .await
  }

  async fn update_activity(&self, kind: ActivityType, id: &str, body: &Value) -> Result<Value> {
    self
      .put(&format!("/activities/{kind}/{id}"), body, ACTIVITIES_MEDIA_TYPE)
      .await
  }

  async fn list_audiences(&self) -> Result<Vec<Audience>> {
    let payload = self.get("/audiences", &[], AUDIENCES_MEDIA_TYPE).await?;
    collection(payload, "audiences")
  }

  async fn list_offers(&self, query: &QueryParams) -> Result<Vec<OfferSummary>> {
    let payload = self.get("/offers", query, OFFERS_MEDIA_TYPE).await?;
    collection(payload, "offers")
  }

  async fn offer_detail(&self, kind: &str, id: &str) -> Result<Offer> {
    let payload = self.get(&offer_path(kind, id), &[], OFFERS_MEDIA_TYPE).await?;
    if !payload.is_object() {
      return Err(Error::RemoteApi {
        status:  None,
        message: format!("offer {id} detail is not a JSON object"),
        body:    Some(payload.to_string()),
      });
    }
    Ok(serde_json::from_value(payload)?)
  }

  async fn update_offer(&self, kind: &str, id: &str, body: &Value) -> Result<Value> {
    self.put(&offer_path(kind, id), body, OFFERS_MEDIA_TYPE).await
  }
}
