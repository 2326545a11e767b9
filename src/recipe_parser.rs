//! Recovers a recipe array from free-form model text.
//!
//! The candidate JSON is chosen by a fixed priority:
//!
//! 1. the body of the first fenced block tagged `json`;
//! 2. otherwise the body of the first fenced block, tagged or not;
//! 3. otherwise the whole text.
//!
//! Decoding failures degrade to an empty list. Recipes are advisory, so a
//! broken reply means "no recipes found", never an error. Fields inside each
//! recipe object are not validated: missing strings read as empty and a
//! missing or malformed `nutrition` reads as absent.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, deserialize_with = "lenient_string")]
    pub calories: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protein: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub carbs: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fat: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cook_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub servings: String,
    /// Free text as the model wrote it; see [`Recipe::difficulty_level`].
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub instructions: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_nutrition",
        skip_serializing_if = "Option::is_none"
    )]
    pub nutrition: Option<Nutrition>,
}

impl Recipe {
    pub fn difficulty_level(&self) -> Option<Difficulty> {
        Difficulty::parse(&self.difficulty)
    }
}

#[derive(Debug, Error)]
pub enum RecipeDecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of recipes, found {0}")]
    NotAnArray(&'static str),

    #[error("recipe at index {0} is not a JSON object")]
    NotAnObject(usize),
}

/// Picks the JSON candidate out of a model reply.
pub fn extract_json_candidate(text: &str) -> &str {
    fenced_body(text, "json")
        .or_else(|| fenced_body(text, ""))
        .unwrap_or(text)
}

/// Body between the first `FENCE + tag` opener and the next fence marker.
/// A single newline hugging either fence is not part of the body.
fn fenced_body<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let opener = format!("{FENCE}{tag}");
    let body_start = text.find(&opener)? + opener.len();
    let rest = &text[body_start..];
    let body_len = rest.find(FENCE)?;
    let body = &rest[..body_len];

    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    let body = body
        .strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body);
    Some(body)
}

/// Strict decode of a reply. Errors describe why the reply was unusable.
pub fn try_parse_recipes(raw: &str) -> Result<Vec<Recipe>, RecipeDecodeError> {
    let candidate = extract_json_candidate(raw);
    let value: Value = serde_json::from_str(candidate)?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(RecipeDecodeError::NotAnArray(json_kind(&other))),
    };
    if let Some(index) = items.iter().position(|item| !item.is_object()) {
        return Err(RecipeDecodeError::NotAnObject(index));
    }

    items
        .into_iter()
        .map(|item| serde_json::from_value::<Recipe>(item).map_err(RecipeDecodeError::from))
        .collect()
}

/// Never fails: an unusable reply is logged and yields no recipes.
pub fn parse_recipes(raw: &str) -> Vec<Recipe> {
    match try_parse_recipes(raw) {
        Ok(recipes) => {
            debug!(count = recipes.len(), "parsed recipes from model reply");
            recipes
        }
        Err(e) => {
            warn!(error = %e, "recipe reply could not be decoded, returning no recipes");
            debug!(raw, "undecodable recipe reply");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        single => vec![value_to_text(single)],
    })
}

fn lenient_nutrition<'de, D>(deserializer: D) -> Result<Option<Nutrition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_RECIPE: &str = r#"[{"name":"X","description":"d","cookTime":"1m","servings":"1","difficulty":"Easy","ingredients":["a"],"instructions":["b"]}]"#;

    #[test]
    fn tagged_fence_is_unwrapped() {
        let raw = format!("```json\n{ONE_RECIPE}\n```");
        let recipes = parse_recipes(&raw);
        assert_eq!(recipes.len(), 1);
        let recipe = &recipes[0];
        assert_eq!(recipe.name, "X");
        assert_eq!(recipe.cook_time, "1m");
        assert_eq!(recipe.difficulty_level(), Some(Difficulty::Easy));
        assert_eq!(recipe.ingredients, vec!["a"]);
        assert_eq!(recipe.instructions, vec!["b"]);
        assert!(recipe.nutrition.is_none());
    }

    #[test]
    fn prose_around_fences_is_ignored() {
        let raw = format!("Here are your recipes!\n```json\n{ONE_RECIPE}\n```\nEnjoy cooking.");
        assert_eq!(parse_recipes(&raw).len(), 1);

        let untagged = format!("Sure:\n```\n{ONE_RECIPE}\n```\nBye");
        assert_eq!(parse_recipes(&untagged).len(), 1);
    }

    #[test]
    fn tagged_fence_wins_over_earlier_untagged_fence() {
        let raw = format!("```\nnot the payload\n```\nthen\n```json\n{ONE_RECIPE}\n```");
        assert_eq!(extract_json_candidate(&raw), ONE_RECIPE);
        assert_eq!(parse_recipes(&raw).len(), 1);
    }

    #[test]
    fn raw_text_used_when_no_fence() {
        assert_eq!(extract_json_candidate(ONE_RECIPE), ONE_RECIPE);
        assert_eq!(parse_recipes(&format!("  {ONE_RECIPE}  ")).len(), 1);
    }

    #[test]
    fn unclosed_fence_falls_back_to_raw_text() {
        let raw = format!("```json\n{ONE_RECIPE}");
        assert_eq!(extract_json_candidate(&raw), raw);
        assert!(parse_recipes(&raw).is_empty());
    }

    #[test]
    fn garbage_degrades_to_empty() {
        assert!(parse_recipes("not json at all").is_empty());
        assert!(parse_recipes("").is_empty());
        assert!(parse_recipes("[{\"name\": \"cut off").is_empty());
    }

    #[test]
    fn wrong_shapes_degrade_to_empty() {
        assert!(matches!(
            try_parse_recipes("[1,2,3]"),
            Err(RecipeDecodeError::NotAnObject(0))
        ));
        assert!(parse_recipes("[1,2,3]").is_empty());
        assert!(matches!(
            try_parse_recipes(r#"{"name":"X"}"#),
            Err(RecipeDecodeError::NotAnArray("an object"))
        ));
        assert!(parse_recipes(r#"[{"name":"X"}, "stray"]"#).is_empty());
    }

    #[test]
    fn empty_array_is_empty_result() {
        assert!(try_parse_recipes("[]").unwrap().is_empty());
    }

    #[test]
    fn partial_objects_pass_through() {
        let raw = r#"[{"name":"Only a name"},{"description":"no name","nutrition":"n/a"}]"#;
        let recipes = parse_recipes(raw);
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name, "Only a name");
        assert!(recipes[0].ingredients.is_empty());
        assert_eq!(recipes[1].name, "");
        assert!(recipes[1].nutrition.is_none());
    }

    #[test]
    fn scalar_fields_accept_numbers_and_nulls() {
        let raw = r#"[{"name":"Omelette","servings":2,"cookTime":null,"difficulty":"medium",
            "ingredients":["2 eggs", 1],"instructions":"Whisk and fry",
            "nutrition":{"calories":310,"protein":"18g"}}]"#;
        let recipe = &parse_recipes(raw)[0];
        assert_eq!(recipe.servings, "2");
        assert_eq!(recipe.cook_time, "");
        assert_eq!(recipe.difficulty_level(), Some(Difficulty::Medium));
        assert_eq!(recipe.ingredients, vec!["2 eggs", "1"]);
        assert_eq!(recipe.instructions, vec!["Whisk and fry"]);
        let nutrition = recipe.nutrition.as_ref().unwrap();
        assert_eq!(nutrition.calories, "310");
        assert_eq!(nutrition.protein, "18g");
        assert_eq!(nutrition.fat, "");
    }

    #[test]
    fn unknown_difficulty_is_kept_as_text() {
        let recipe = &parse_recipes(r#"[{"name":"Soufflé","difficulty":"Expert"}]"#)[0];
        assert_eq!(recipe.difficulty, "Expert");
        assert_eq!(recipe.difficulty_level(), None);
    }

    #[test]
    fn serializes_back_in_camel_case() {
        let recipe = &parse_recipes(ONE_RECIPE)[0];
        let value = serde_json::to_value(recipe).unwrap();
        assert_eq!(value["cookTime"], "1m");
        assert!(value.get("nutrition").is_none());
    }
}
