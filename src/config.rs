use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

use crate::api_connection::endpoints::{Provider, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "RECIPE_FINDER_BASE_URL";
pub const MODEL_ENV_VAR: &str = "RECIPE_FINDER_MODEL";
pub const DATA_DIR_ENV_VAR: &str = "RECIPE_FINDER_DATA_DIR";

/// Value some deployments ship in place of a real key.
pub const PLACEHOLDER_API_KEY: &str = "dummy-key";
/// Fixed namespace the pantry snapshot is stored under.
pub const PANTRY_NAMESPACE: &str = "pantry-storage";

#[derive(Debug, Clone)]
pub struct FinderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub data_dir: PathBuf,
}

impl FinderConfig {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self {
            api_key: resolve_api_key(env::var(API_KEY_ENV_VAR).ok()),
            base_url: env::var(BASE_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: env::var(MODEL_ENV_VAR).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            data_dir: env::var(DATA_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
        }
    }

    pub fn pantry_path(&self) -> PathBuf {
        self.data_dir.join(format!("{PANTRY_NAMESPACE}.json"))
    }

    pub fn provider(&self) -> Provider {
        Provider::openai(self.base_url.clone(), self.api_key.clone())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recipe-finder")
}

/// Blank and placeholder keys count as absent.
pub fn resolve_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY)
}
