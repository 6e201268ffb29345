//! Request extractors whose rejections render as `{"error": ...}`
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body; a body that fails to decode is a 400
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters; a segment that fails to parse is a 400
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
