//! HTTP-backed [`EntityService`] over a conventional JSON CRUD surface.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Entity, EntityId},
    error::ServiceError,
};
use tokio::sync::broadcast;

use crate::EntityService;

const RESET_CHANNEL_CAPACITY: usize = 16;

/// Entity service speaking JSON to `{base_url}/{collection}`:
/// `POST /{collection}` and `GET/PUT/DELETE /{collection}/{id}`.
///
/// Hosts call [`HttpEntityService::trigger_reset`] after reloading the
/// backing dataset; every subscribed editor refetches its entity.
pub struct HttpEntityService<E: Entity> {
    http: Client,
    collection_url: String,
    reset: broadcast::Sender<()>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpEntityService<E> {
    pub fn new(base_url: impl Into<String>, collection: &str) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        let (reset, _) = broadcast::channel(RESET_CHANNEL_CAPACITY);
        Self {
            http: Client::new(),
            collection_url: format!("{base_url}/{collection}"),
            reset,
            _entity: PhantomData,
        }
    }

    /// Broadcasts the data-source reset signal to all subscribers.
    pub fn trigger_reset(&self) {
        let _ = self.reset.send(());
    }

    fn item_url(&self, id: EntityId) -> String {
        format!("{}/{}", self.collection_url, id.0)
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ServiceError::Status(status.as_u16()))
    }
}

async fn decode_body<E: Entity>(response: Response) -> Result<E, ServiceError> {
    response
        .json::<E>()
        .await
        .map_err(|err| ServiceError::Decode(err.to_string()))
}

#[async_trait]
impl<E: Entity> EntityService<E> for HttpEntityService<E> {
    async fn fetch(&self, id: EntityId) -> Result<Option<E>, ServiceError> {
        let response = self
            .http
            .get(self.item_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response)?;
        Ok(Some(decode_body(response).await?))
    }

    async fn create(&self, entity: &E) -> Result<E, ServiceError> {
        let response = self
            .http
            .post(&self.collection_url)
            .json(entity)
            .send()
            .await
            .map_err(transport_error)?;
        decode_body(check_status(response)?).await
    }

    async fn update(&self, entity: &E) -> Result<(), ServiceError> {
        let id = entity.id().ok_or(ServiceError::MissingId)?;
        let response = self
            .http
            .put(self.item_url(id))
            .json(entity)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response)?;
        Ok(())
    }

    async fn delete(&self, entity: &E) -> Result<(), ServiceError> {
        let id = entity.id().ok_or(ServiceError::MissingId)?;
        let response = self
            .http
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response)?;
        Ok(())
    }

    fn subscribe_reset(&self) -> broadcast::Receiver<()> {
        self.reset.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
