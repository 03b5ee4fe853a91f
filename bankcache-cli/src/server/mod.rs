//! JSON API over the cache
//!
//! `/api/db/*` serves cached rows, `/api/accounts/*` fetches live data and
//! writes it through the cache. Both need `Authorization: Bearer <token>`
//! with a token from a previous enrollment. Core calls block, so every
//! handler hops onto the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use tower_http::trace::TraceLayer;

use bankcache_core::{BankcacheContext, CoreResult};

mod error;
mod handlers;

pub use error::ServerError;

#[derive(Clone)]
pub struct ServerState {
    pub ctx: Arc<BankcacheContext>,
}

/// Run a core call on the blocking pool
pub async fn blocking<T, F>(state: &ServerState, f: F) -> Result<T, ServerError>
where
    F: FnOnce(&BankcacheContext) -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let ctx = Arc::clone(&state.ctx);
    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|err| ServerError::Internal(format!("blocking task failed: {err}")))?
        .map_err(ServerError::from)
}

/// Resolve the bearer token to an enrolled user
async fn auth(
    State(state): State<ServerState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Ok(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthorized("Authentication required"));
    };
    let token = bearer.token().trim().to_string();
    if token.is_empty() {
        return Err(ServerError::Unauthorized("Authentication required"));
    }

    let user = blocking(&state, move |ctx| ctx.repository.get_user_by_token(&token))
        .await?
        .ok_or(ServerError::Unauthorized("Unknown access token"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub fn router(state: ServerState) -> Router {
    let authenticated = Router::new()
        .route("/api/db/accounts", get(handlers::cached_accounts))
        .route("/api/db/accounts/{account_id}/balances", get(handlers::cached_balance))
        .route(
            "/api/db/accounts/{account_id}/transactions",
            get(handlers::cached_transactions),
        )
        .route("/api/accounts/{account_id}/balances", get(handlers::live_balance))
        .route(
            "/api/accounts/{account_id}/transactions",
            get(handlers::live_transactions),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let router = Router::new()
        .route("/api/healthz", get(handlers::healthz))
        .route("/api/config", get(handlers::runtime_config))
        .route("/api/enrollments", post(handlers::enroll))
        .merge(authenticated)
        .layer(middleware::map_response(no_store))
        .with_state(state);

    add_tracing_layer(router)
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // ServerError already logs internal failures
        .on_failure(());

    router.layer(tracing_layer)
}

pub async fn serve(ctx: Arc<BankcacheContext>, listener: tokio::net::TcpListener) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(
        provider = ctx.cache_service.provider_name(),
        "Server listening on http://{}",
        addr
    );

    axum::serve(listener, router(ServerState { ctx }))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(err) => {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    }
}
