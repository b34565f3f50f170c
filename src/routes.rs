// src/routes.rs

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeader, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    common::upload::UPLOAD_BODY_LIMIT,
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, subscription::subscription_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Perfil (só exige login)
    let user_routes = Router::new()
        .route(
            "/me",
            get(handlers::auth::get_me).patch(handlers::auth::update_me),
        )
        .route(
            "/me/avatar",
            post(handlers::auth::upload_avatar).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Cobrança: login sim, assinatura não (é aqui que se assina)
    let billing_routes = Router::new()
        .route("/plans", get(handlers::billing::list_plans))
        .route("/checkout", post(handlers::billing::create_checkout_session))
        .route("/portal", post(handlers::billing::create_portal_session))
        .route("/subscription", get(handlers::billing::get_subscription))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // O Stripe assina o corpo; sem JWT
    let webhook_routes = Router::new().route("/webhook", post(handlers::billing::stripe_webhook));

    // Funcionalidades do app: login + assinatura ativa
    let app_routes = Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/barcode/{code}",
            get(handlers::products::find_by_barcode),
        )
        .route(
            "/products/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/products/{id}/photo",
            post(handlers::products::upload_product_photo)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/movements",
            get(handlers::movements::list_movements).post(handlers::movements::record_movement),
        )
        .route("/alerts", get(handlers::alerts::get_alerts))
        .route("/dashboard", get(handlers::alerts::get_dashboard))
        .route(
            "/notifications/tokens",
            post(handlers::notifications::register_token)
                .delete(handlers::notifications::revoke_token),
        )
        .route(
            "/notifications/send-alert",
            post(handlers::notifications::send_alert),
        )
        // A ordem importa: a última camada roda primeiro
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), subscription_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
        .max_age(Duration::from_secs(60 * 60));

    // Fotos enviadas: o navegador não pode adivinhar o tipo nem executar nada
    let uploads = SetResponseHeader::overriding(
        SetResponseHeader::overriding(
            ServeDir::new(&app_state.config.upload_dir),
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; sandbox"),
    );

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/firebase-messaging-sw.js",
            get(handlers::notifications::service_worker),
        )
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/billing", billing_routes.merge(webhook_routes))
        .nest("/api", app_routes)
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
