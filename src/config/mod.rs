mod server;

pub use server::{CONFIG_FILE_NAME, ConfigOverrides, FileConfig, ServerConfig};
