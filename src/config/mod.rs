pub mod loader;
pub mod types;

pub use loader::SettingsLoader;
pub use types::{PromptMode, Settings, DEFAULT_TIMEOUT_SECONDS};
