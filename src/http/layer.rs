//! Tower middleware serving compiled bundles.
//!
//! # Responsibilities
//! - Mount a [`BundlePipeline`] in front of an inner service
//! - Serve applicable module paths as `application/javascript`
//! - Forward everything else to the inner service unchanged
//!
//! # Design Decisions
//! - Tower has no "next(err)" hop, so generation failures become a 500 text
//!   response from this service plus an error-level log entry

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};

use crate::pipeline::{BundlePipeline, PipelineError};

/// Layer that mounts a [`BundlePipeline`] in front of an inner service.
#[derive(Clone)]
pub struct BundleLayer {
    pipeline: BundlePipeline,
}

impl BundleLayer {
    pub fn new(pipeline: BundlePipeline) -> Self {
        Self { pipeline }
    }
}

impl<S> Layer<S> for BundleLayer {
    type Service = BundleService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BundleService {
            inner,
            pipeline: self.pipeline.clone(),
        }
    }
}

/// Service that serves applicable module paths and forwards the rest.
#[derive(Clone)]
pub struct BundleService<S> {
    inner: S,
    pipeline: BundlePipeline,
}

impl<S> Service<Request<Body>> for BundleService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let pipeline = self.pipeline.clone();
        // Readiness was established on the original service; hand that one
        // to the future and keep the fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let req_path = request.uri().path().to_owned();
            match pipeline.handle(&req_path).await {
                Ok(Some(text)) => Ok(javascript_response(&text)),
                Ok(None) => inner.call(request).await,
                Err(error) => {
                    tracing::error!(path = %req_path, %error, "Bundle generation failed");
                    Ok(error_response(&error))
                }
            }
        })
    }
}

fn javascript_response(text: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .body(Body::from(text.to_owned()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn error_response(error: &PipelineError) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(error.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
