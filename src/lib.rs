//! WCS admin: table-driven REST administration backend.
//!
//! Resources are declared once (columns, defaults, validation) and every declared table
//! gets list/read/create/update/delete endpoints plus schema discovery under `/ddl`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod notify;
pub mod openapi;
pub mod policy;
pub mod record;
pub mod response;
pub mod routes;
pub mod service;
pub mod session;
pub mod sql;
pub mod state;
pub mod store;

pub use catalog::{Catalog, CatalogEntry, CrudApi};
pub use config::{builtin, load_from_path, resolve, FrontEnd, FullConfig, ResourceDescriptor, Settings, StoreKind};
pub use error::{AppError, ConfigError};
pub use notify::{LogNotifier, MailgunNotifier, Notifier};
pub use policy::{Action, AdminGuard, Policy};
pub use record::Record;
pub use routes::{app, Dispatcher, RouteTable};
pub use service::{RecordHooks, RuleHooks};
pub use session::SessionStore;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, MemoryStore, PgStore, RecordStore};
