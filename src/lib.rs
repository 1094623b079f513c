pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod registry;
pub mod server;
pub mod service;

pub use config::LockerdConfig;
pub use dispatch::{DispatchQueue, DispatchStatsSnapshot};
pub use error::{LockerdError, RegistryError, Result, ServerError};
pub use events::{EventBus, LockerEvent};
pub use registry::{Locker, LockerRegistry, LockerStatus};
pub use server::{HttpServer, HttpServerBuilder};
pub use service::{LockerService, ServiceStatsSnapshot};
