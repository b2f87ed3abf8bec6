//! # Server Configuration
//!
//! Wires repositories and services into [`AppState`], builds the router and
//! serves it until shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use url::Url;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::analytics::{AnalyticsSink, HttpAnalytics, LogAnalytics};
use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::github::{GithubAppClientFactory, GithubUserClient};
use crate::handlers;
use crate::oauth::{
    OAuth2Exchanger, TokenExchanger, TokenLifecycle, TokenRefresher, UnconfiguredExchanger,
};
use crate::provision::{JobQueueAgent, ProvisionSettings, Provisioner};
use crate::repositories::{
    GcpIntegrationRepository, InfraRepository, InfraStore, InstallationRepository,
    OAuthIntegrationRepository, ProjectRepository, ProvisionJobRepository, UserRepository,
};
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub users: Arc<UserRepository>,
    pub projects: Arc<ProjectRepository>,
    pub installations: Arc<InstallationRepository>,
    pub infras: Arc<dyn InfraStore>,
    pub token_lifecycle: Arc<TokenLifecycle>,
    pub provisioner: Arc<Provisioner>,
    pub github_apps: Arc<GithubAppClientFactory>,
    pub github_users: Arc<GithubUserClient>,
}

impl AppState {
    /// Builds every service from configuration over one connection pool
    pub fn from_config(config: Arc<AppConfig>, db: DatabaseConnection) -> Result<Self> {
        let shared_db = Arc::new(db.clone());

        let exchanger: Arc<dyn TokenExchanger> =
            match OAuth2Exchanger::from_config(&config.github_app, &config.token_refresh) {
                Ok(exchanger) => Arc::new(exchanger),
                Err(err) if config.is_local_profile() => {
                    tracing::warn!(error = %err, "OAuth client not configured; token refresh disabled");
                    Arc::new(UnconfiguredExchanger)
                }
                Err(err) => return Err(err).context("failed to configure OAuth token exchange"),
            };
        let refresher = TokenRefresher::from_config(exchanger, &config.token_refresh);
        let credentials = Arc::new(OAuthIntegrationRepository::new(Arc::clone(&shared_db)));
        let token_lifecycle = Arc::new(TokenLifecycle::new(credentials, refresher));

        let analytics: Arc<dyn AnalyticsSink> = match &config.analytics_endpoint {
            Some(endpoint) => {
                let endpoint = Url::parse(endpoint).context("invalid analytics endpoint")?;
                Arc::new(HttpAnalytics::new(endpoint, Duration::from_secs(5))?)
            }
            None => Arc::new(LogAnalytics),
        };

        let infras: Arc<dyn InfraStore> = Arc::new(InfraRepository::new(Arc::clone(&shared_db)));
        let jobs = Arc::new(ProvisionJobRepository::new(Arc::clone(&shared_db)));
        let provisioner = Arc::new(Provisioner::new(
            Arc::new(GcpIntegrationRepository::new(Arc::clone(&shared_db))),
            Arc::clone(&infras),
            Arc::new(JobQueueAgent::new(jobs)),
            analytics,
            ProvisionSettings::from_config(&config),
        ));

        let github_apps = Arc::new(GithubAppClientFactory::new(&config.github_app));
        let github_users = Arc::new(
            GithubUserClient::new(config.github_app.api_base.clone())
                .context("failed to build GitHub client")?,
        );

        Ok(Self {
            users: Arc::new(UserRepository::new(Arc::clone(&shared_db))),
            projects: Arc::new(ProjectRepository::new(Arc::clone(&shared_db))),
            installations: Arc::new(InstallationRepository::new(Arc::clone(&shared_db))),
            infras,
            token_lifecycle,
            provisioner,
            github_apps,
            github_users,
            config,
            db,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/integrations/github-app/accounts",
            get(handlers::github::list_accounts),
        )
        .route(
            "/api/projects/{project_id}/gitrepos/{installation_id}/repos",
            get(handlers::github::list_repositories),
        )
        .route(
            "/api/projects/{project_id}/gitrepos/{installation_id}/repos/{owner}/{name}/branches",
            get(handlers::github::list_branches),
        )
        .route(
            "/api/projects/{project_id}/provision/{kind}",
            post(handlers::provision::provision_infra),
        )
        .route(
            "/api/projects/{project_id}/infras",
            get(handlers::infra::list_infras),
        )
        .route(
            "/api/projects/{project_id}/infras/{infra_id}",
            get(handlers::infra::get_infra),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until `shutdown` is cancelled
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = config.bind_addr().context("invalid server address")?;
    let config = Arc::new(config);
    let state = AppState::from_config(Arc::clone(&config), db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::github::list_accounts,
        crate::handlers::github::list_repositories,
        crate::handlers::github::list_branches,
        crate::handlers::provision::provision_infra,
        crate::handlers::infra::list_infras,
        crate::handlers::infra::get_infra,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::HealthResponse,
            crate::models::InfraKind,
            crate::models::InfraStatus,
            crate::models::InfraResponse,
            crate::provision::ProvisionRequest,
            crate::github::Repository,
            crate::github::Branch,
            crate::github::InstallationAccount,
            crate::handlers::github::AccountsResponse,
            crate::handlers::github::RepositoriesResponse,
            crate::handlers::github::BranchesResponse,
            crate::handlers::infra::InfrasResponse,
            crate::error::ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Gantry API",
        description = "GitHub App access and cloud infrastructure provisioning for projects",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
