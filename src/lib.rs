pub mod cli;
pub mod importer;
pub mod manager;
pub mod model;
pub mod parser;
pub mod settings;
pub mod share;
pub mod store;
pub mod sync;

pub use manager::{ManagerError, ProfileManager};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
