//! Service settings resolved once at startup.
//!
//! Credentials for the generation backend are read separately by the client
//! (`OpenRouterClient::from_env`), so a missing key aborts startup before any
//! job can run.

use std::env;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TEMPLATE_DIR: &str = "contract_templates";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub template_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("CONTRACT_FORGE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let template_dir = env::var("CONTRACT_FORGE_TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TEMPLATE_DIR));
        Self {
            bind_addr,
            template_dir,
        }
    }
}
