use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tower_http::trace::TraceLayer;
use tracing::{Level, event, instrument};

use crate::{
    configuration::{DatabaseConfig, Settings},
    handlers::{
        dashboard::{self, DashboardResource},
        forgot_password, health_check, list_posts, list_tags, login, register_user,
        reset_password, show_post, show_role_permissions, sync_role_permissions, user_info,
        verify_email,
    },
    repository::{PermissionRepo, PostRepo, RoleRepo, TagRepo, UserRepo},
};

#[derive(Debug)]
pub struct Application {
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    port: u16,
}

impl Application {
    #[instrument(name = "build_server", skip(cfg))]
    pub async fn build(cfg: &Settings) -> anyhow::Result<Self> {
        let host = &cfg.server.host;
        let port = cfg.server.port;

        // Create the TCPListener for further usage
        let lst = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
        let port = lst.local_addr()?.port();

        let pool = connect_pool(&cfg.database).await?;

        // apply migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        let state = AppState {
            db: pool,
            auth: AuthState {
                jwt_secret: cfg.auth.jwt_secret.clone(),
                access_token_ttl: cfg.auth.access_token_ttl(),
                action_token_ttl: cfg.auth.action_token_ttl(),
            },
        };

        Ok(Self {
            listener: lst,
            state: Arc::new(state),
            port,
        })
    }

    #[instrument(name = "mainloop", skip(self))]
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let addr = self.listener.local_addr()?;
        let host = addr.ip().to_string();
        let port = addr.port();

        let router = create_app_router(self.state.clone());

        event!(Level::INFO, "Serving at {}:{}", host, port);

        axum::serve(self.listener, router).await
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

pub async fn connect_pool(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&cfg.url)
        .await?;

    Ok(pool)
}

pub fn create_app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/public", public_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .route("/verify", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(user_info))
}

fn dashboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/roles", resource_routes::<RoleRepo>())
        .nest("/permissions", resource_routes::<PermissionRepo>())
        .nest("/users", resource_routes::<UserRepo>())
        .nest("/tags", resource_routes::<TagRepo>())
        .nest("/posts", resource_routes::<PostRepo>())
        .route(
            "/sync-permissions/{role_id}",
            get(show_role_permissions).put(sync_role_permissions),
        )
}

fn resource_routes<R: DashboardResource + 'static>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard::index::<R>).post(dashboard::store::<R>))
        .route(
            "/{id}",
            get(dashboard::show::<R>)
                .put(dashboard::update::<R>)
                .delete(dashboard::destroy::<R>),
        )
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{slug}", get(show_post))
        .route("/tags", get(list_tags))
}

#[derive(Debug)]
pub struct AppState {
    pub db: PgPool,
    pub auth: AuthState,
}

#[derive(Debug)]
pub struct AuthState {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    /// Lifetime of verification and password reset tokens.
    pub action_token_ttl: Duration,
}
