use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use kore_core::{Entity, ScopedRepository};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rest::{self, EntityRoutes};
use crate::{KoreAxumState, TenancyLayer};

/// Router under construction plus the state every request's tenant context
/// is opened from.
#[derive(Clone)]
pub struct AxumApp {
    pub state: KoreAxumState,
    pub router: Router<()>,
}

impl AxumApp {
    pub fn new(state: KoreAxumState) -> Self {
        Self {
            state,
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Mount the REST routes of a tenant-owned entity under `path`.
    pub fn use_entity<E: Entity>(self, path: &str, repo: ScopedRepository<E>) -> Self {
        tracing::debug!(path, entity = E::COLLECTION, "entity routes mounted");
        self.use_router(path, rest::entity_router(repo))
    }

    /// Like [`use_entity`](Self::use_entity), with hooks attached.
    pub fn use_entity_routes<E: Entity>(self, path: &str, routes: EntityRoutes<E>) -> Self {
        tracing::debug!(path, entity = E::COLLECTION, "entity routes mounted");
        self.use_router(path, routes.into_router())
    }

    /// Final router: tenancy resolution, tracing and `x-request-id`
    /// (generated when absent, echoed on the response).
    pub fn into_router(self) -> Router<()> {
        self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TenancyLayer::new(self.state)),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

pub fn axum(state: KoreAxumState) -> AxumApp {
    AxumApp::new(state)
}
