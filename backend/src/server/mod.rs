//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{ServerSettings, SettingsError};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

use skillswap::Trace;
#[cfg(debug_assertions)]
use skillswap::doc::ApiDoc;
use skillswap::inbound::http::configure_api;
use skillswap::inbound::http::health::{HealthState, live, ready};
use skillswap::inbound::http::state::HttpState;
use skillswap::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use state_builders::{Repositories, build_http_state};

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Pick the store: PostgreSQL when a URL is configured, memory otherwise.
async fn build_repositories(settings: &ServerSettings) -> std::io::Result<Repositories> {
    let Some(url) = settings.database_url.as_deref() else {
        warn!("no database_url configured; using the in-memory store");
        return Ok(Repositories::in_memory());
    };
    run_pending_migrations(url)
        .await
        .map_err(|e| std::io::Error::other(format!("database migration failed: {e}")))?;
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .map_err(|e| std::io::Error::other(format!("database pool setup failed: {e}")))?;
    info!("using the PostgreSQL store");
    Ok(Repositories::postgres(&pool))
}

/// Construct the Actix HTTP server and mark it ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when settings are invalid, the store cannot
/// be prepared, or binding the socket fails.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    settings: ServerSettings,
) -> std::io::Result<Server> {
    settings
        .validate()
        .map_err(|e| std::io::Error::other(format!("invalid settings: {e}")))?;
    let repositories = build_repositories(&settings).await?;
    let http_state = web::Data::new(build_http_state(&settings, repositories));
    let bind_addr = settings.bind_addr();

    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "server listening");
    health_state.mark_ready();
    Ok(server)
}
