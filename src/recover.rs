//! Panic recovery
//!
//! `RecoverPanic` wraps an application so that a panic while handling a
//! request produces a 500 response instead of tearing down the connection
//! without a reply. The response asks the client to close the connection,
//! since keep-alive state may no longer be trustworthy.
//!
//! The recovered response travels as an `actix_web::Error`, which actix
//! renders into the stored response before anything reaches the client.


use std::any::Any;
use std::future::{ready, Ready};
use std::panic::{self, AssertUnwindSafe};

use actix_web::{Error, HttpResponse};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::error;
use serde_json::json;

use crate::error::SERVER_ERROR_MESSAGE;


/// Middleware that converts handler panics into 500 responses
pub struct RecoverPanic;

impl<S, B> Transform<S, ServiceRequest> for RecoverPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RecoverPanicMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoverPanicMiddleware { service }))
    }
}


pub struct RecoverPanicMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RecoverPanicMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, request: ServiceRequest) -> Self::Future {

        // The router needs sole ownership of the request, so only plain
        // copies of what the log line needs are kept across the call
        let method = request.method().to_string();
        let path = request.path().to_owned();

        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(request))) {
            Ok(fut) => fut,
            Err(payload) => return Box::pin(ready(Err(recovered(&method, &path, payload)))),
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(recovered(&method, &path, payload)),
            }
        })
    }
}


fn recovered(method: &str, path: &str, payload: Box<dyn Any + Send>) -> Error {

    let reason = payload.downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("unknown panic"));
    error!("recovered from panic handling {} {}: {}", method, path, reason);

    let response = HttpResponse::InternalServerError()
        .force_close()
        .json(json!({ "error": SERVER_ERROR_MESSAGE }));

    InternalError::from_response(reason, response).into()
}
