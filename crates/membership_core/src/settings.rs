//! crates/membership_core/src/settings.rs
//!
//! Global key/value configuration. Values are opaque strings; missing keys
//! fall back to built-in defaults so readers always get something usable.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::AppSetting;
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::session::SessionContext;

pub const WHATSAPP_NUMBER: &str = "whatsapp_number";
pub const WHATSAPP_MESSAGE: &str = "whatsapp_message";
pub const REQUIRE_COMMENT_APPROVAL: &str = "require_comment_approval";
pub const COLOR_PREFIX: &str = "color_";

const DEFAULT_WHATSAPP_NUMBER: &str = "5511999999999";
const DEFAULT_WHATSAPP_MESSAGE: &str = "Olá! Preciso de ajuda.";

/// Support contact shown by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppContact {
    pub number: String,
    pub message: String,
}

/// Branding colors as HSL triplets (`"228 76% 58%"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub primary: String,
    pub background: String,
    pub foreground: String,
    pub card: String,
    pub accent: String,
    pub muted: String,
    pub destructive: String,
    pub border: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: "228 76% 58%".to_string(),
            background: "210 20% 98%".to_string(),
            foreground: "222 47% 11%".to_string(),
            card: "0 0% 100%".to_string(),
            accent: "228 76% 95%".to_string(),
            muted: "220 14% 96%".to_string(),
            destructive: "0 84% 60%".to_string(),
            border: "220 13% 91%".to_string(),
        }
    }
}

impl Palette {
    fn slot(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "primary" => Some(&mut self.primary),
            "background" => Some(&mut self.background),
            "foreground" => Some(&mut self.foreground),
            "card" => Some(&mut self.card),
            "accent" => Some(&mut self.accent),
            "muted" => Some(&mut self.muted),
            "destructive" => Some(&mut self.destructive),
            "border" => Some(&mut self.border),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<dyn DatabaseService>,
}

impl SettingsService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Stored value, or `default` when the key is absent or blank.
    pub async fn get_or(&self, key: &str, default: &str) -> ServiceResult<String> {
        Ok(self
            .db
            .get_setting(key)
            .await?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    pub async fn set(&self, ctx: &SessionContext, key: &str, value: &str) -> ServiceResult<AppSetting> {
        let admin_id = ctx.require_admin()?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::Validation("setting key is required".to_string()));
        }
        let setting = self.db.upsert_setting(key, value).await?;
        info!(%admin_id, key, "setting updated");
        Ok(setting)
    }

    pub async fn list(&self, ctx: &SessionContext) -> ServiceResult<Vec<AppSetting>> {
        ctx.require_admin()?;
        Ok(self.db.list_settings().await?)
    }

    /// Read at content-creation time. Only the literal `"true"` turns it on.
    pub async fn require_comment_approval(&self) -> ServiceResult<bool> {
        Ok(self.db.get_setting(REQUIRE_COMMENT_APPROVAL).await?.as_deref() == Some("true"))
    }

    pub async fn whatsapp_contact(&self) -> ServiceResult<WhatsAppContact> {
        Ok(WhatsAppContact {
            number: self.get_or(WHATSAPP_NUMBER, DEFAULT_WHATSAPP_NUMBER).await?,
            message: self.get_or(WHATSAPP_MESSAGE, DEFAULT_WHATSAPP_MESSAGE).await?,
        })
    }

    /// Stored `color_*` keys layered over the default palette. A store
    /// failure yields the defaults.
    pub async fn palette(&self) -> Palette {
        let mut palette = Palette::default();
        let settings = match self.db.list_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "could not load colors, using defaults");
                return palette;
            }
        };
        for setting in settings {
            let Some(name) = setting.key.strip_prefix(COLOR_PREFIX) else {
                continue;
            };
            if setting.value.trim().is_empty() {
                continue;
            }
            if let Some(slot) = palette.slot(name) {
                *slot = setting.value;
            }
        }
        palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use uuid::Uuid;

    fn admin() -> SessionContext {
        SessionContext { user_id: Some(Uuid::new_v4()), is_admin: true }
    }

    #[tokio::test]
    async fn missing_keys_fall_back_to_defaults() {
        let settings = SettingsService::new(Arc::new(MemoryStore::new()));
        let contact = settings.whatsapp_contact().await.unwrap();
        assert_eq!(contact.number, DEFAULT_WHATSAPP_NUMBER);
        assert_eq!(contact.message, DEFAULT_WHATSAPP_MESSAGE);
        assert_eq!(settings.palette().await, Palette::default());
        assert!(!settings.require_comment_approval().await.unwrap());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let settings = SettingsService::new(Arc::new(MemoryStore::new()));
        let ctx = admin();
        settings.set(&ctx, WHATSAPP_NUMBER, "1").await.unwrap();
        settings.set(&ctx, WHATSAPP_NUMBER, "2").await.unwrap();
        assert_eq!(settings.whatsapp_contact().await.unwrap().number, "2");
        assert_eq!(settings.list(&ctx).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approval_policy_reads_the_string_flag() {
        let settings = SettingsService::new(Arc::new(MemoryStore::new()));
        let ctx = admin();
        settings.set(&ctx, REQUIRE_COMMENT_APPROVAL, "true").await.unwrap();
        assert!(settings.require_comment_approval().await.unwrap());
        settings.set(&ctx, REQUIRE_COMMENT_APPROVAL, "yes").await.unwrap();
        assert!(!settings.require_comment_approval().await.unwrap());
    }

    #[tokio::test]
    async fn palette_merges_color_keys() {
        let settings = SettingsService::new(Arc::new(MemoryStore::new()));
        let ctx = admin();
        settings.set(&ctx, "color_primary", "160 84% 39%").await.unwrap();
        settings.set(&ctx, "color_unknown", "1 1% 1%").await.unwrap();
        let palette = settings.palette().await;
        assert_eq!(palette.primary, "160 84% 39%");
        assert_eq!(palette.border, Palette::default().border);
    }

    #[tokio::test]
    async fn palette_survives_store_outage() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsService::new(store.clone());
        store.set_unavailable(true);
        assert_eq!(settings.palette().await, Palette::default());
    }

    #[tokio::test]
    async fn members_cannot_change_settings() {
        let settings = SettingsService::new(Arc::new(MemoryStore::new()));
        let member = SessionContext { user_id: Some(Uuid::new_v4()), is_admin: false };
        assert!(matches!(
            settings.set(&member, WHATSAPP_NUMBER, "1").await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
    }
}
