//! Extractors whose rejections come back as `AccessError`, so malformed
//! bodies and ids get the same JSON error shape as everything else.

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::error::AccessError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AccessError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AccessError))]
pub struct IdPath<T>(pub T);
