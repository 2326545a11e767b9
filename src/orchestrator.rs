use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::api_connection::endpoints::{first_choice_text, DEFAULT_MODEL};
use crate::api_connection::ChatBackend;
use crate::error::{FinderError, ImageAnalysisError, Result};
use crate::ingredient_extractor::{extract_ingredients, ImagePayload};
use crate::pantry::normalize;
use crate::recipe_parser::{parse_recipes, Recipe};
use crate::recipe_request::{build_prompt, build_recipe_request, Preferences};

/// The two externally invoked operations. Neither touches the pantry;
/// committing ingredients is up to the caller after a successful search.
pub struct RecipeFinder<B: ChatBackend> {
    backend: B,
    model: String,
}

impl<B: ChatBackend> RecipeFinder<B> {
    pub fn new(backend: B) -> Self {
        Self::with_model(backend, DEFAULT_MODEL)
    }

    pub fn with_model(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn analyze_image(&self, image: Option<&ImagePayload>) -> Result<Vec<String>> {
        if !self.backend.is_configured() {
            return Err(FinderError::Unconfigured);
        }
        let image = image
            .filter(|image| !image.bytes.is_empty())
            .ok_or_else(|| FinderError::InvalidInput("No image provided".to_string()))?;

        extract_ingredients(&self.backend, image, &self.model).await
    }

    /// `ingredients` is the already merged pool (ad-hoc plus pantry names).
    /// An unusable reply yields `Ok` with no recipes; transport and auth
    /// failures are errors.
    pub async fn find_recipes(
        &self,
        ingredients: &[String],
        preferences: &Preferences,
    ) -> Result<Vec<Recipe>> {
        if !self.backend.is_configured() {
            return Err(FinderError::Unconfigured);
        }
        let prompt = build_prompt(ingredients, preferences)?;
        debug!(ingredients = ingredients.len(), ?preferences, "requesting recipes");

        let response = self
            .backend
            .call_chat_completion(build_recipe_request(prompt, &self.model))
            .await?;

        let recipes = parse_recipes(&first_choice_text(&response));
        info!(count = recipes.len(), "recipes generated");
        Ok(recipes)
    }
}

/// Ingredients gathered for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientPool {
    /// Typed and detected names, the candidates for a pantry commit.
    pub ad_hoc: Vec<String>,
    /// `ad_hoc` followed by pantry names, deduplicated.
    pub merged: Vec<String>,
}

impl<B: ChatBackend> RecipeFinder<B> {
    /// Builds the pool for a search, adding ingredients detected in `image`.
    ///
    /// A failed analysis only fails the gather when nothing else is left to
    /// cook with; otherwise it is logged and the typed and pantry names are used.
    pub async fn gather_ingredients(
        &self,
        typed: &[String],
        image: Option<&ImagePayload>,
        pantry: &[String],
    ) -> std::result::Result<IngredientPool, ImageAnalysisError> {
        let mut ad_hoc = typed.to_vec();
        if let Some(image) = image {
            match self.analyze_image(Some(image)).await {
                Ok(detected) => {
                    info!(count = detected.len(), "ingredients detected from image");
                    ad_hoc.extend(detected);
                }
                Err(e) => {
                    if merge_ingredient_pool(&ad_hoc, pantry).is_empty() {
                        return Err(ImageAnalysisError(e));
                    }
                    warn!(error = %e, "image analysis failed, continuing with entered ingredients");
                }
            }
        }

        let merged = merge_ingredient_pool(&ad_hoc, pantry);
        Ok(IngredientPool { ad_hoc, merged })
    }
}

/// Ad-hoc names first, then pantry names, skipping names already seen
/// under normalization. Blank names are dropped.
pub fn merge_ingredient_pool(ad_hoc: &[String], pantry: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ad_hoc
        .iter()
        .chain(pantry)
        .filter(|name| {
            let key = normalize(name);
            !key.is_empty() && seen.insert(key)
        })
        .map(|name| name.trim().to_string())
        .collect()
}
