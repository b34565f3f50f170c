// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

const DEFAULT_LANG: &str = "pt";

// (chave, português, inglês)
const MESSAGES: &[(&str, &str, &str)] = &[
    // --- Erros gerais ---
    ("validation_failed", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("product_not_found", "Produto não encontrado.", "Product not found."),
    ("insufficient_stock", "Estoque insuficiente para esta saída.", "Not enough stock for this exit."),
    ("subscription_required", "Sua assinatura não está ativa. Assine um plano para continuar.", "Your subscription is not active. Subscribe to a plan to continue."),
    ("unknown_plan", "Plano de assinatura desconhecido.", "Unknown subscription plan."),
    ("billing_customer_not_found", "Nenhum cliente de cobrança encontrado. Ele é criado no primeiro checkout.", "No billing customer found. It is created during the first checkout."),
    ("invalid_upload", "Arquivo enviado inválido.", "Invalid uploaded file."),
    ("integration_disabled", "Esta integração não está configurada.", "This integration is not configured."),
    ("invalid_webhook_signature", "Assinatura do webhook inválida.", "Invalid webhook signature."),
    ("invalid_webhook_payload", "Evento do webhook em formato inválido.", "Malformed webhook event."),
    ("upstream_error", "Falha ao comunicar com um serviço externo.", "Failed to reach an external service."),
    ("upstream_timeout", "O serviço externo demorou demais para responder.", "The external service took too long to respond."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),

    // --- Mensagens de validação ---
    ("required", "Campo obrigatório.", "This field is required."),
    ("name_too_short", "O nome do produto é obrigatório.", "Product name must have at least 3 characters."),
    ("negative_stock", "O estoque não pode ser negativo.", "Stock cannot be negative."),
    ("negative_minimum_stock", "O estoque mínimo não pode ser negativo.", "Minimum stock cannot be negative."),
    ("negative_cost", "O preço de custo não pode ser negativo.", "Cost price cannot be negative."),
    ("quantity_positive", "A quantidade deve ser maior que zero.", "Quantity must be greater than zero."),
    ("entry_only_field", "Este campo só é aceito em entradas.", "This field is only accepted for entries."),
    ("invalid_email", "O e-mail fornecido é inválido.", "The e-mail provided is invalid."),
    ("password_too_short", "A senha deve ter no mínimo 6 caracteres.", "Password must have at least 6 characters."),
    ("token_required", "O token do dispositivo é obrigatório.", "The device token is required."),
    ("invalid_date_range", "A data inicial deve ser anterior à final.", "The start date must precede the end date."),

    // --- Uploads ---
    ("missing_photo", "Envie o arquivo no campo 'photo'.", "Send the file in the 'photo' field."),
    ("not_an_image", "O arquivo deve ser uma imagem.", "The file must be an image."),
    ("photo_too_large", "A imagem excede 5 MB.", "The image exceeds 5 MB."),
];

/// Catálogo de mensagens por idioma.
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

static SHARED: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

impl I18nStore {
    pub fn new() -> Self {
        let mut pt = HashMap::new();
        let mut en = HashMap::new();
        for (key, pt_msg, en_msg) in MESSAGES {
            pt.insert(*key, *pt_msg);
            en.insert(*key, *en_msg);
        }

        let mut messages = HashMap::new();
        messages.insert("pt", pt);
        messages.insert("en", en);
        Self { messages }
    }

    pub fn shared() -> &'static I18nStore {
        &SHARED
    }

    /// Traduz uma chave. Cai para o português e, por fim, devolve a própria chave.
    pub fn translate<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        self.messages
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|catalog| catalog.get(key)))
            .copied()
            .unwrap_or(key)
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "product_not_found"), "Produto não encontrado.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "something_else"), "something_else");
    }
}
