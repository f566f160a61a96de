//! Request extractors.
//!
//! Both map axum's rejections to a 400 validation error, so malformed input
//! gets the same JSON error body as every other failure.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use saga_model::KnowledgeError;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor that reports every malformed body as a 400
/// validation error, including bodies of the right syntax but wrong shape.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(KnowledgeError::validation(rejection.body_text()))),
        }
    }
}

/// Path extractor for record ids; an id that does not parse is a 400.
pub struct PathId<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(KnowledgeError::validation(rejection.body_text()))),
        }
    }
}
