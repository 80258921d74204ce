pub mod access;
pub mod announcements;
pub mod catalog;
pub mod community;
pub mod domain;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod ports;
pub mod profiles;
pub mod retry;
pub mod schema;
pub mod session;
pub mod settings;

pub use access::AccessService;
pub use announcements::AnnouncementService;
pub use catalog::{resolve_content_action, CatalogService, ProductView};
pub use community::CommunityService;
pub use domain::{
    ContentAction, ContentBody, Notification, NotificationType, Product, ProductKind, Profile,
    Role, User, UserCredentials,
};
pub use error::{ServiceError, ServiceResult};
pub use memory::MemoryStore;
pub use notifications::{NotificationService, Recipient};
pub use ports::{DatabaseService, PortError, PortResult};
pub use profiles::ProfileService;
pub use schema::SchemaService;
pub use session::SessionContext;
pub use settings::SettingsService;
