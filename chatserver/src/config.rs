use serde_derive::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_clients: u16,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            port: DEFAULT_PORT,
            max_clients: crate::roster::MAX_CLIENTS as u16,
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> chatnet_support::ChatResult<ServerConfig> {
        serdeconv::from_toml_file(path).map_err(|err| chatnet_support::ChatError::Config(err.to_string()))
    }
}
