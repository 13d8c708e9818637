//! Worker registry with pause/resume, and the admin command console that
//! drives it.

pub mod admin;
pub mod manager;

pub use {
    admin::AdminConsole,
    manager::{ServiceHandle, ServiceManager, ServiceStatus, Stop},
};
