//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use membership_core::{
    AccessService, AnnouncementService, CatalogService, CommunityService, DatabaseService,
    NotificationService, ProfileService, SchemaService, SettingsService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Every core service holds a handle to the same store.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub access: AccessService,
    pub catalog: CatalogService,
    pub community: CommunityService,
    pub notifications: NotificationService,
    pub settings: SettingsService,
    pub profiles: ProfileService,
    pub schema: SchemaService,
    pub announcements: AnnouncementService,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        Self {
            access: AccessService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            community: CommunityService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            profiles: ProfileService::new(db.clone()),
            schema: SchemaService::new(db.clone()),
            announcements: AnnouncementService::new(db.clone()),
            db,
            config,
        }
    }
}
