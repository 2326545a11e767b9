pub mod api_connection;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingredient_extractor;
pub mod orchestrator;
pub mod pantry;
pub mod recipe_parser;
pub mod recipe_request;

pub use error::{FinderError, ImageAnalysisError};
pub use orchestrator::{merge_ingredient_pool, IngredientPool, RecipeFinder};
pub use pantry::{normalize, Ingredient, PantryStore};
pub use recipe_parser::{parse_recipes, Recipe};
pub use recipe_request::{build_prompt, Preferences};
