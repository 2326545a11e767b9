use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::recipe_parser::Recipe;

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn the ingredients you have into recipes", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect ingredients in a photo
    Analyze {
        /// Path to a JPEG, PNG, WebP or GIF image
        image: PathBuf,

        /// Add the detected ingredients to the pantry
        #[arg(long)]
        save: bool,
    },

    /// Generate recipes from ad-hoc ingredients plus the pantry
    Find {
        /// Comma-separated ingredients; repeatable
        #[arg(short, long = "ingredients", value_name = "LIST")]
        ingredients: Vec<String>,

        /// Also detect ingredients from this image
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,

        /// Dietary constraint, e.g. vegetarian, vegan, gluten-free, keto, paleo
        #[arg(long)]
        dietary: Option<String>,

        /// Cuisine, e.g. italian, mexican, asian, indian, mediterranean, american
        #[arg(long)]
        cuisine: Option<String>,

        /// Ignore the pantry for this search
        #[arg(long)]
        no_pantry: bool,

        /// Do not add the ad-hoc ingredients to the pantry afterwards
        #[arg(long)]
        no_save: bool,

        /// Print recipes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit the pantry
    Pantry {
        #[command(subcommand)]
        action: PantryAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum PantryAction {
    /// List pantry ingredients with their ids
    List,
    /// Add one or more ingredients
    Add {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove an ingredient by id
    Remove { id: String },
    /// Remove every ingredient
    Clear,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Filter directive for a `-v` count.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn format_recipe(index: usize, recipe: &Recipe) -> String {
    let mut out = format!("{}. {}\n", index + 1, display_or(&recipe.name, "Untitled recipe"));
    if !recipe.description.is_empty() {
        out.push_str(&format!("   {}\n", recipe.description));
    }
    out.push_str(&format!(
        "   Time: {} | Serves: {} | Difficulty: {}\n",
        display_or(&recipe.cook_time, "?"),
        display_or(&recipe.servings, "?"),
        display_or(&recipe.difficulty, "?"),
    ));
    if let Some(nutrition) = &recipe.nutrition {
        out.push_str(&format!(
            "   Nutrition: {} | protein {} | carbs {} | fat {}\n",
            display_or(&nutrition.calories, "?"),
            display_or(&nutrition.protein, "?"),
            display_or(&nutrition.carbs, "?"),
            display_or(&nutrition.fat, "?"),
        ));
    }
    if !recipe.ingredients.is_empty() {
        out.push_str("   Ingredients:\n");
        for item in &recipe.ingredients {
            out.push_str(&format!("     - {}\n", item));
        }
    }
    if !recipe.instructions.is_empty() {
        out.push_str("   Instructions:\n");
        for (step, text) in recipe.instructions.iter().enumerate() {
            out.push_str(&format!("     {}. {}\n", step + 1, text));
        }
    }
    out
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe_parser::Nutrition;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn find_accepts_repeated_ingredient_lists() {
        let cli = Cli::try_parse_from([
            "recipe_finder",
            "find",
            "-i",
            "eggs, flour",
            "--ingredients",
            "milk",
            "--dietary",
            "vegetarian",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Find {
                ingredients,
                dietary,
                cuisine,
                ..
            } => {
                assert_eq!(ingredients, vec!["eggs, flour", "milk"]);
                assert_eq!(dietary.as_deref(), Some("vegetarian"));
                assert!(cuisine.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn pantry_add_requires_a_name() {
        assert!(Cli::try_parse_from(["recipe_finder", "pantry", "add"]).is_err());
    }

    #[test]
    fn recipe_formatting_handles_missing_fields() {
        let recipe = Recipe {
            name: "Pancakes".into(),
            ingredients: vec!["1 cup flour".into()],
            instructions: vec!["Mix".into(), "Fry".into()],
            nutrition: Some(Nutrition {
                calories: "250 kcal".into(),
                ..Nutrition::default()
            }),
            ..Recipe::default()
        };
        let text = format_recipe(0, &recipe);
        assert!(text.starts_with("1. Pancakes\n"));
        assert!(text.contains("Time: ? | Serves: ? | Difficulty: ?"));
        assert!(text.contains("Nutrition: 250 kcal | protein ?"));
        assert!(text.contains("     2. Fry\n"));
    }
}
