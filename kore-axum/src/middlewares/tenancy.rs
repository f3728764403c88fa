use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use kore_core::{KoreError, TenantContext};
use tower::{Layer, Service};

use crate::{KoreAxumError, KoreAxumState};

/// The request's tenant context, as installed by [`TenancyLayer`].
#[derive(Clone)]
pub struct Tenancy(pub Arc<TenantContext>);

impl Deref for Tenancy {
    type Target = TenantContext;

    fn deref(&self) -> &TenantContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Tenancy
where
    S: Send + Sync,
{
    type Rejection = KoreAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Tenancy>().cloned().ok_or_else(|| {
            KoreError::general_error("tenant context missing: TenancyLayer is not installed")
                .into()
        })
    }
}

/// Opens one [`TenantContext`] per request.
///
/// The tenant comes from the configured header (`x-agency-id` by default).
/// A request without it gets an unset context, so every scoped call it makes
/// fails with `NoActiveTenant`. The tenant is cleared once the inner
/// service has produced a response or the request future is dropped.
#[derive(Clone)]
pub struct TenancyLayer {
    state: KoreAxumState,
}

impl TenancyLayer {
    pub fn new(state: KoreAxumState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for TenancyLayer {
    type Service = TenancyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenancyService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TenancyService<S> {
    inner: S,
    state: KoreAxumState,
}

impl<S> Service<Request<Body>> for TenancyService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let state = self.state.clone();

        Box::pin(async move {
            let ctx = Arc::new(state.context_from_headers(req.headers()));
            let tenant = state.tenant_from_headers(req.headers());

            let _tenant = match tenant {
                Some(tenant) => match ctx.enter(tenant) {
                    Ok(guard) => Some(guard),
                    Err(err) => return Ok(KoreAxumError::from(err).into_response()),
                },
                None => {
                    tracing::debug!(
                        operation_id = %ctx.operation_id(),
                        header = %state.settings.tenant_header,
                        "no tenant header; context left unset"
                    );
                    None
                }
            };

            req.extensions_mut().insert(Tenancy(Arc::clone(&ctx)));
            inner.call(req).await
        })
    }
}
