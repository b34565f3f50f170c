// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "ClinicStock API", description = "Estoque, validade e alertas para clínicas"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::update_me,
        handlers::auth::upload_avatar,

        // --- Products ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::find_by_barcode,
        handlers::products::update_product,
        handlers::products::upload_product_photo,
        handlers::products::delete_product,

        // --- Movements ---
        handlers::movements::record_movement,
        handlers::movements::list_movements,

        // --- Alerts / Dashboard ---
        handlers::alerts::get_alerts,
        handlers::alerts::get_dashboard,

        // --- Billing ---
        handlers::billing::list_plans,
        handlers::billing::create_checkout_session,
        handlers::billing::create_portal_session,
        handlers::billing::get_subscription,
        handlers::billing::stripe_webhook,

        // --- Notifications ---
        handlers::notifications::register_token,
        handlers::notifications::revoke_token,
        handlers::notifications::send_alert,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::UpdateProfilePayload,
            models::auth::AuthResponse,
            models::auth::MeResponse,

            // --- Products ---
            models::product::ProductCategory,
            models::product::ProductUnit,
            models::product::Product,
            models::product::ProductStatus,
            models::product::ProductListEntry,
            handlers::products::ProductPayload,
            common::upload::PhotoUploadForm,

            // --- Movements ---
            models::movement::MovementType,
            models::movement::MovementReason,
            models::movement::StockMovement,
            models::movement::MovementReceipt,
            handlers::movements::MovementPayload,

            // --- Alerts / Dashboard ---
            models::alerts::AlertBuckets,
            models::alerts::AlertsResponse,
            models::alerts::ExpiryEntry,
            models::alerts::DashboardSummary,

            // --- Billing ---
            models::subscription::SubscriptionStatus,
            models::subscription::Subscription,
            models::subscription::SubscriptionSummary,
            models::subscription::SubscriptionOverview,
            models::subscription::PlanInterval,
            models::subscription::Plan,
            models::subscription::CheckoutPayload,
            models::subscription::RedirectUrl,

            // --- Notifications ---
            models::notification::DeviceToken,
            models::notification::DeviceTokenPayload,
            models::notification::SendAlertResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Products", description = "Cadastro de Produtos"),
        (name = "Movements", description = "Entradas e Saídas de Estoque"),
        (name = "Alerts", description = "Vencimentos e Estoque Baixo"),
        (name = "Dashboard", description = "Indicadores do Estoque"),
        (name = "Billing", description = "Planos e Assinatura"),
        (name = "Notifications", description = "Notificações Push")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
