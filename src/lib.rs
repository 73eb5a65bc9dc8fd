pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod pipeline;
pub mod registry;
pub mod shutdown;
pub mod supervisor;

pub use config::Settings;
pub use controller::Controller;
pub use entity::{EntityId, FileSpec, WatchEntity};
pub use error::WatchError;
pub use monitor::ExistenceMonitor;
pub use pipeline::FilterPipeline;
pub use registry::{EntryKey, Registry, RegistryError};
pub use shutdown::{RunState, Shutdown, route_interrupt};
pub use supervisor::{WatchEvent, WatcherSupervisor};
