//! Ordered composition of global middleware.
//!
//! `Router::layer` calls read inside-out: the last call is the outermost
//! layer. [`Pipeline`] lists stages in the order a request meets them and
//! folds them onto the router in reverse, so
//!
//! ```rust,ignore
//! Pipeline::new().layer(a).layer(b).wrap(router)
//! ```
//!
//! runs `a`, then `b`, then the router.

use std::convert::Infallible;

use axum::Router;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::Route;
use tower::{Layer, Service};

type Stage = Box<dyn FnOnce(Router) -> Router + Send>;

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage after all previously added ones.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.stages.push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `router` so the first stage is outermost.
    pub fn wrap(self, router: Router) -> Router {
        self.stages
            .into_iter()
            .rev()
            .fold(router, |router, stage| stage(router))
    }
}
