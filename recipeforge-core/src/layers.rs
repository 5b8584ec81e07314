//! OpenEmbedded layer index query client
//!
//! Last step of the resolution cascade: asks the public layer index whether
//! a recipe with the candidate name exists in any known layer.

use serde::Deserialize;

use crate::{Error, Result};

const LAYER_INDEX_API: &str = "https://layers.openembedded.org/layerindex/api/recipes/";

/// A recipe found in the layer index.
#[derive(Debug, Clone)]
pub struct LayerRecipe {
    pub name: String,
    pub layer: String,
}

/// Remote package-database lookup, mockable for tests.
pub trait RecipeQuery {
    fn query_recipe(&self, name: &str) -> Result<Option<LayerRecipe>>;
}

#[derive(Debug, Deserialize)]
struct RecipeEntry {
    pn: String,
    #[serde(default)]
    layerbranch: Option<u64>,
}

/// Layer index REST client
pub struct LayerIndexClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl LayerIndexClient {
    pub fn new() -> Self {
        Self::with_base_url(LAYER_INDEX_API)
    }

    /// Use a different index endpoint (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .user_agent(concat!("recipeforge/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }
}

impl Default for LayerIndexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeQuery for LayerIndexClient {
    fn query_recipe(&self, name: &str) -> Result<Option<LayerRecipe>> {
        let url = format!("{}?filter=pn:{}&format=json", self.base_url, name);

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "layer index query for '{}' returned {}",
                name,
                response.status()
            )));
        }

        let entries: Vec<RecipeEntry> = response.json()?;
        Ok(entries.into_iter().next().map(|entry| LayerRecipe {
            name: entry.pn,
            layer: entry
                .layerbranch
                .map(|id| format!("layerbranch-{}", id))
                .unwrap_or_else(|| "unknown".to_string()),
        }))
    }
}
