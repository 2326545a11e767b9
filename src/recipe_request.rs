use serde::{Deserialize, Serialize};

use crate::api_connection::endpoints::{ChatCompletionRequest, ChatMessage};
use crate::error::{FinderError, Result};

pub const RECIPE_COUNT: usize = 3;

pub const CHEF_SYSTEM_PROMPT: &str = "You are an expert chef who creates detailed, practical recipes. \
Always respond with valid JSON only, no additional text.";

pub const DIETARY_OPTIONS: &[&str] = &["vegetarian", "vegan", "gluten-free", "keto", "paleo"];
pub const CUISINE_OPTIONS: &[&str] = &[
    "italian",
    "mexican",
    "asian",
    "indian",
    "mediterranean",
    "american",
];

const RECIPE_TEMPERATURE: f32 = 0.8;
const RECIPE_MAX_TOKENS: u32 = 3000;

const OUTPUT_CONTRACT: &str = r#"

For each recipe, provide:
1. Recipe name
2. Brief description (1-2 sentences)
3. Cook time
4. Number of servings
5. Difficulty level (Easy/Medium/Hard)
6. Complete list of ingredients with measurements
7. Step-by-step cooking instructions
8. Nutritional information per serving (calories, protein, carbs, fat)

Format your response as a JSON array with the following structure:
[
  {
    "name": "Recipe Name",
    "description": "Brief description",
    "cookTime": "30 minutes",
    "servings": "4 servings",
    "difficulty": "Easy",
    "ingredients": ["ingredient 1 with measurement", "ingredient 2 with measurement"],
    "instructions": ["step 1", "step 2"],
    "nutrition": {
      "calories": "350 kcal",
      "protein": "25g",
      "carbs": "40g",
      "fat": "12g"
    }
  }
]

Prioritize recipes that maximize the use of the provided ingredients. Be creative but practical."#;

/// Optional constraints on the generated recipes. Blank values mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
}

impl Preferences {
    pub fn new(dietary: Option<String>, cuisine: Option<String>) -> Self {
        Self { dietary, cuisine }
    }

    pub fn dietary(&self) -> Option<&str> {
        non_blank(self.dietary.as_deref())
    }

    pub fn cuisine(&self) -> Option<&str> {
        non_blank(self.cuisine.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Composes the generation prompt. Pure: no model call happens here.
pub fn build_prompt(ingredients: &[String], preferences: &Preferences) -> Result<String> {
    if ingredients.is_empty() {
        return Err(FinderError::InvalidInput("No ingredients provided".to_string()));
    }

    let mut prompt = format!(
        "You are an expert chef and nutritionist. Based on the following ingredients: {}, suggest {} delicious recipes.",
        ingredients.join(", "),
        RECIPE_COUNT
    );

    if let Some(dietary) = preferences.dietary() {
        prompt.push_str(&format!(" The recipes should be {}.", dietary));
    }
    if let Some(cuisine) = preferences.cuisine() {
        prompt.push_str(&format!(" Focus on {} cuisine.", cuisine));
    }

    prompt.push_str(OUTPUT_CONTRACT);
    Ok(prompt)
}

pub fn build_recipe_request(prompt: String, model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(CHEF_SYSTEM_PROMPT), ChatMessage::user(prompt)],
        temperature: Some(RECIPE_TEMPERATURE),
        max_tokens: Some(RECIPE_MAX_TOKENS),
    }
}
