use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::error::ApiFailure;
use shared::protocol::{Envelope, ErrorEnvelope};
use tracing::debug;
use url::Url;

use crate::config::Settings;
use crate::error::ViewError;
use crate::list_view::{ListQuery, ListResult, PageMeta, PaginationSource};
use crate::mutation::{MutationIntent, MutationKind, MutationReply};

/// Narrow seam between the controller and the remote admin API. Everything a
/// list view ever does to the outside world goes through these three calls.
#[async_trait]
pub trait DataSource<T>: Send + Sync {
    async fn fetch_list(&self, resource: &str, query: &ListQuery)
        -> Result<ListResult<T>, ViewError>;

    async fn fetch_one(&self, resource: &str, id: &str) -> Result<T, ViewError>;

    async fn mutate(
        &self,
        resource: &str,
        intent: &MutationIntent,
    ) -> Result<MutationReply<T>, ViewError>;
}

/// Strict decode boundary between wire records and usable domain values.
/// Malformed payloads fail loudly with a decode error here instead of
/// leaking half-parsed records into controller state.
pub trait WireDecode: Sized {
    type Wire: DeserializeOwned + Send;

    fn from_wire(wire: Self::Wire) -> Result<Self, ViewError>;
}

/// Decodes one of the backend's stringified pseudo-JSON fields
/// (`personalInfo`, `address`). Anything that is not real JSON is a hard
/// failure, never a silent `{}`.
pub(crate) fn decode_embedded_json<P: DeserializeOwned>(
    field: &str,
    raw: &str,
) -> Result<P, ViewError> {
    serde_json::from_str(raw.trim())
        .map_err(|err| ViewError::decode(format!("malformed {field} payload: {err}")))
}

/// reqwest-backed data source for the admin API: bearer auth, the
/// `{success, message, data, meta}` JSON envelope, `data.message` error
/// bodies.
pub struct HttpDataSource {
    http: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpDataSource {
    pub fn new(settings: &Settings) -> Result<Self, ViewError> {
        let mut base = settings.api_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|err| ViewError::fetch(format!("invalid api base url: {err}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds.max(1)))
            .build()
            .map_err(|err| ViewError::fetch(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url,
            bearer_token: settings.bearer_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ViewError> {
        let path = segments.join("/");
        self.base_url
            .join(&path)
            .map_err(|err| ViewError::fetch(format!("invalid endpoint '{path}': {err}")))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.bearer_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_failure(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.display_message().map(str::to_string))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
        ApiFailure::from_status(status.as_u16(), detail).to_string()
    }
}

fn mutation_route<'a>(resource: &'a str, intent: &'a MutationIntent) -> (Method, Vec<&'a str>) {
    let id = intent.id.as_str();
    match intent.kind {
        MutationKind::Approve => (Method::PATCH, vec![resource, id, "approve"]),
        MutationKind::Reject => (Method::PATCH, vec![resource, id, "reject"]),
        MutationKind::Block => (Method::PATCH, vec![resource, id, "block"]),
        MutationKind::Unblock => (Method::PATCH, vec![resource, id, "unblock"]),
        MutationKind::Delete => (Method::DELETE, vec![resource, id]),
        // broadcasts create a new notification at the collection root
        MutationKind::Broadcast => (Method::POST, vec![resource]),
    }
}

#[async_trait]
impl<T> DataSource<T> for HttpDataSource
where
    T: WireDecode + Send + Sync + 'static,
{
    async fn fetch_list(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> Result<ListResult<T>, ViewError> {
        let url = self.endpoint(&[resource])?;
        let mut params: Vec<(String, String)> = vec![
            ("page".into(), query.page.to_string()),
            ("limit".into(), query.page_size.to_string()),
        ];
        if !query.search_term.is_empty() {
            params.push(("search".into(), query.search_term.clone()));
        }
        for (key, value) in &query.filters {
            params.push((key.clone(), value.clone()));
        }
        debug!(resource, page = query.page, "fetching list");

        let response = self
            .authorize(self.http.get(url).query(&params))
            .send()
            .await
            .map_err(|err| ViewError::fetch(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ViewError::fetch(Self::read_failure(response).await));
        }

        let envelope: Envelope<Vec<T::Wire>> = response
            .json()
            .await
            .map_err(|err| ViewError::decode(format!("invalid list envelope: {err}")))?;
        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "request failed".into());
            return Err(ViewError::fetch(message));
        }
        let wire_items = envelope
            .data
            .ok_or_else(|| ViewError::decode("list envelope carries no data"))?;
        let items = wire_items
            .into_iter()
            .map(T::from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match envelope.meta {
            Some(meta) => ListResult {
                meta: PageMeta {
                    total: meta.total,
                    page: meta.page,
                    page_size: meta.limit,
                    total_pages: meta.total_page.max(1),
                },
                items,
                source: PaginationSource::ServerPaginated,
            },
            // no meta means the endpoint handed us the whole set
            None => ListResult {
                meta: PageMeta::new(items.len() as u64, query.page, query.page_size),
                items,
                source: PaginationSource::ClientPaginated,
            },
        })
    }

    async fn fetch_one(&self, resource: &str, id: &str) -> Result<T, ViewError> {
        let url = self.endpoint(&[resource, id])?;
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|err| ViewError::fetch(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ViewError::fetch(Self::read_failure(response).await));
        }

        let envelope: Envelope<T::Wire> = response
            .json()
            .await
            .map_err(|err| ViewError::decode(format!("invalid entity envelope: {err}")))?;
        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "request failed".into());
            return Err(ViewError::fetch(message));
        }
        let wire = envelope
            .data
            .ok_or_else(|| ViewError::decode("entity envelope carries no data"))?;
        T::from_wire(wire)
    }

    async fn mutate(
        &self,
        resource: &str,
        intent: &MutationIntent,
    ) -> Result<MutationReply<T>, ViewError> {
        let (method, segments) = mutation_route(resource, intent);
        let url = self.endpoint(&segments)?;
        debug!(resource, id = %intent.id, kind = intent.kind.label(), "dispatching mutation");

        let mut builder = self.authorize(self.http.request(method, url));
        if let Some(payload) = &intent.payload {
            builder = builder.json(payload);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| ViewError::mutation(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ViewError::mutation(Self::read_failure(response).await));
        }

        let envelope: Envelope<T::Wire> = response
            .json()
            .await
            .map_err(|err| ViewError::decode(format!("invalid mutation envelope: {err}")))?;
        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "mutation failed".into());
            return Err(ViewError::mutation(message));
        }
        let entity = envelope.data.map(T::from_wire).transpose()?;
        Ok(MutationReply {
            entity,
            message: envelope.message.unwrap_or_else(|| "ok".into()),
        })
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
