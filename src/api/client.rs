use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{ListParams, ListResponse};
use super::remote::{RemoteCollection, RemoteProfile};
use crate::config::{ApiConfig, Config};
use crate::domain::{Domain, Entity, EntityId, ProfileDraft, UserProfile};

/// HTTP client for the cash-flow API
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    Self::with_token(config, Config::get_api_token())
  }

  pub fn with_token(config: &ApiConfig, token: Option<String>) -> Result<Self> {
    // Url::join drops the last segment unless the base ends with a slash
    let mut base = config.base_url.trim().to_string();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base =
      Url::parse(&base).map_err(|e| eyre!("Invalid API base URL '{}': {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("cashflow/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base, token })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Resolve a path relative to the base URL.
  pub fn url(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid API path '{}': {}", path, e))
  }

  /// Build the list URL for a domain, including query parameters.
  pub fn list_url(&self, domain: Domain, params: &ListParams) -> Result<Url> {
    let mut url = self.url(domain.endpoint())?;
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
  }

  /// Build the detail URL for one entity of a domain.
  pub fn item_url(&self, domain: Domain, id: EntityId) -> Result<Url> {
    self.url(&format!("{}{}/", domain.endpoint(), id))
  }

  /// Typed handle for one list endpoint.
  pub fn collection<T: Entity>(&self) -> HttpCollection<T> {
    HttpCollection {
      client: self.clone(),
      _entity: PhantomData,
    }
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let builder = self.http.request(method, url);
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
    let request = builder
      .build()
      .map_err(|e| eyre!("Failed to build request: {}", e))?;
    let method = request.method().clone();
    let url = request.url().clone();
    debug!(%method, %url, "API request");

    let response = self
      .http
      .execute(request)
      .await
      .map_err(|e| eyre!("{} {} failed: {}", method, url, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("{} {} returned {}: {}", method, url, status, body));
    }
    Ok(response)
  }

  async fn send_json<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R> {
    let response = self.send(builder).await?;
    let url = response.url().clone();
    response
      .json::<R>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }
}

#[async_trait]
impl RemoteProfile for ApiClient {
  async fn fetch(&self) -> Result<UserProfile> {
    let url = self.url(Domain::Profile.endpoint())?;
    self.send_json(self.request(Method::GET, url)).await
  }

  async fn update(&self, data: &ProfileDraft) -> Result<UserProfile> {
    let url = self.url(Domain::Profile.endpoint())?;
    self
      .send_json(self.request(Method::PATCH, url).json(data))
      .await
  }
}

/// One list endpoint of the API, typed by its entity.
pub struct HttpCollection<T> {
  client: ApiClient,
  _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpCollection<T> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      _entity: PhantomData,
    }
  }
}

#[async_trait]
impl<T: Entity> RemoteCollection<T> for HttpCollection<T> {
  async fn list(&self, params: &ListParams) -> Result<Vec<T>> {
    let url = self.client.list_url(T::DOMAIN, params)?;
    let response: ListResponse<T> = self
      .client
      .send_json(self.client.request(Method::GET, url))
      .await?;
    if response.has_more() {
      debug!(domain = %T::DOMAIN, "List response has further pages; using first page");
    }
    Ok(response.into_items())
  }

  async fn get(&self, id: EntityId) -> Result<T> {
    let url = self.client.item_url(T::DOMAIN, id)?;
    self
      .client
      .send_json(self.client.request(Method::GET, url))
      .await
  }

  async fn create(&self, data: &T::Draft) -> Result<T> {
    let url = self.client.url(T::DOMAIN.endpoint())?;
    self
      .client
      .send_json(self.client.request(Method::POST, url).json(data))
      .await
  }

  async fn update(&self, id: EntityId, data: &T::Draft) -> Result<T> {
    let url = self.client.item_url(T::DOMAIN, id)?;
    self
      .client
      .send_json(self.client.request(Method::PATCH, url).json(data))
      .await
  }

  async fn delete(&self, id: EntityId) -> Result<()> {
    let url = self.client.item_url(T::DOMAIN, id)?;
    self
      .client
      .send(self.client.request(Method::DELETE, url))
      .await?;
    Ok(())
  }
}
