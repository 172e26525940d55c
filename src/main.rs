use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodie_api::config::Config;
use moodie_api::middleware::auth::JwtSecret;
use moodie_api::middleware::session::{self, SessionRegistry};
use moodie_api::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    db::migrate_all_existing_schools(&pool).await?;
    info!("Database connected and migrations applied");

    let state = AppState {
        db: pool,
        config: config.clone(),
        sessions: SessionRegistry::new(),
    };

    // Build CORS: allow the app base domain and its subdomains (school
    // subdomains). In development (localhost), all origins are allowed.
    let base_url = config.app_base_url.clone();
    let cors_origin = {
        let base = base_url.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let o = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            // Always allow localhost / 127.0.0.1 for local development
            if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
                return true;
            }
            // Exact match of app_base_url
            if o == base {
                return true;
            }
            // Subdomain match: extract domain portion from base URL and allow *.domain
            if let Some(idx) = base.find("://") {
                let after_scheme = &base[idx + 3..];
                let domain = after_scheme.split('/').next().unwrap_or(after_scheme);
                let domain_clean = domain.split(':').next().unwrap_or(domain);
                if o.contains(&format!(".{domain_clean}")) {
                    return true;
                }
            }
            false
        })
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.identity_jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/school/info", get(routes::school::get_school_info))
        // Auth / role resolution
        .route("/auth/resolve", post(routes::auth::resolve))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/set-role", post(routes::auth::set_user_role))
        // Roster
        .route("/students", get(routes::students::list_students).post(routes::students::create_student))
        .route("/students/{student_id}", put(routes::students::update_student).delete(routes::students::delete_student))
        .route("/counselors", get(routes::students::list_counselors))
        .route("/students/{student_id}/notes", get(routes::students::get_notes).put(routes::students::upsert_notes))
        .route("/students/{student_id}/life-events", get(routes::students::list_life_events).post(routes::students::create_life_event))
        .route("/life-events/{id}", put(routes::students::update_life_event).delete(routes::students::delete_life_event))
        // Moods
        .route("/moods", post(routes::moods::record_mood))
        .route("/students/{student_id}/moods", get(routes::moods::list_moods))
        .route("/students/{student_id}/mood-summary", get(routes::moods::mood_summary))
        // Campuses
        .route("/campuses", get(routes::campuses::list_campuses).post(routes::campuses::add_campus))
        // CSV bridge
        .route("/roster/import", post(routes::roster_io::import_students))
        .route("/roster/export", get(routes::roster_io::export_students))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::enforce_idle_timeout,
        ))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("moodie API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
