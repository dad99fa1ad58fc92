use axum::{
    body::Body,
    extract::{
        rejection::JsonRejection, FromRequest, FromRequestParts, OptionalFromRequestParts, Request,
    },
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// JSON extractor that runs `validator` rules and reports failures in the API envelope
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let value = match Json::<T>::from_request(req, state).await {
            Ok(value) => value.0,
            Err(rejection) => return Err(json_rejection_response(rejection)),
        };

        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()).into_response())?;

        Ok(Self(value))
    }
}

fn json_rejection_response(rejection: JsonRejection) -> Response {
    let message = match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
        JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err),
        JsonRejection::MissingJsonContentType(err) => {
            format!("Missing JSON content type: {}", err)
        }
        _ => "Failed to parse JSON body".to_string(),
    };

    AppError::BadRequest(message).into_response()
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Lets public handlers take `Option<AuthenticatedUser>` for anonymous callers
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}
