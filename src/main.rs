use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use recipe_finder::api_connection::Provider;
use recipe_finder::cli::{format_recipe, log_filter, parse_args, Command, PantryAction};
use recipe_finder::config::FinderConfig;
use recipe_finder::ingredient_extractor::{parse_ingredient_list, ImagePayload};
use recipe_finder::pantry::JsonFilePersistence;
use recipe_finder::{FinderError, ImageAnalysisError, PantryStore, Preferences, RecipeFinder};

type Pantry = PantryStore<JsonFilePersistence>;

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .init();
}

async fn load_image(path: &Path) -> Result<ImagePayload> {
    ImagePayload::from_file(path)
        .await
        .with_context(|| format!("Failed to load image '{}'", path.display()))
}

async fn run_analyze(finder: &RecipeFinder<Provider>, pantry: &mut Pantry, image: &Path, save: bool) -> Result<()> {
    let payload = load_image(image).await?;
    let ingredients = finder
        .analyze_image(Some(&payload))
        .await
        .map_err(ImageAnalysisError)?;

    if ingredients.is_empty() {
        println!("No ingredients detected. Try another photo or enter ingredients manually.");
        return Ok(());
    }
    for name in &ingredients {
        println!("{}", name);
    }
    if save {
        let added = ingredients
            .iter()
            .filter(|name| pantry.add_ingredient(name).is_some())
            .count();
        println!("\nAdded {} new ingredient(s) to the pantry.", added);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_find(
    finder: &RecipeFinder<Provider>,
    pantry: &mut Pantry,
    ingredient_lists: &[String],
    image: Option<&Path>,
    preferences: Preferences,
    use_pantry: bool,
    save: bool,
    json: bool,
) -> Result<()> {
    let typed: Vec<String> = ingredient_lists
        .iter()
        .flat_map(|list| parse_ingredient_list(list))
        .collect();
    let payload = match image {
        Some(path) => Some(load_image(path).await?),
        None => None,
    };
    let pantry_names = if use_pantry { pantry.list_names() } else { Vec::new() };

    let pool = finder
        .gather_ingredients(&typed, payload.as_ref(), &pantry_names)
        .await?;
    debug!(pool = ?pool.merged, "ingredient pool");
    if pool.merged.is_empty() {
        return Err(FinderError::InvalidInput("Please add at least one ingredient".to_string()).into());
    }

    let recipes = finder.find_recipes(&pool.merged, &preferences).await?;

    if save {
        for name in &pool.ad_hoc {
            pantry.add_ingredient(name);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else if recipes.is_empty() {
        println!("No recipes found. Try different ingredients or preferences.");
    } else {
        for (index, recipe) in recipes.iter().enumerate() {
            println!("{}", format_recipe(index, recipe));
        }
    }
    Ok(())
}

fn run_pantry(pantry: &mut Pantry, action: PantryAction) {
    match action {
        PantryAction::List => {
            if pantry.is_empty() {
                println!("Your pantry is empty.");
            }
            for ingredient in pantry.ingredients() {
                println!(
                    "{}  {}  (added {})",
                    ingredient.id,
                    ingredient.name,
                    ingredient.added_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        PantryAction::Add { names } => {
            for name in names.iter().flat_map(|entry| parse_ingredient_list(entry)) {
                match pantry.add_ingredient(&name) {
                    Some(ingredient) => println!("Added {} ({})", ingredient.name, ingredient.id),
                    None => println!("Skipped '{}': already in the pantry", name),
                }
            }
        }
        PantryAction::Remove { id } => {
            let before = pantry.len();
            pantry.remove_ingredient(&id);
            if pantry.len() == before {
                println!("No pantry ingredient with id {}", id);
            }
        }
        PantryAction::Clear => {
            pantry.clear_pantry();
            println!("Pantry cleared.");
        }
    }
}

async fn run(command: Command, config: FinderConfig) -> Result<()> {
    let mut pantry = PantryStore::open(JsonFilePersistence::new(config.pantry_path()));
    let finder = RecipeFinder::with_model(config.provider(), config.model.clone());

    match command {
        Command::Analyze { image, save } => run_analyze(&finder, &mut pantry, &image, save).await,
        Command::Find {
            ingredients,
            image,
            dietary,
            cuisine,
            no_pantry,
            no_save,
            json,
        } => {
            run_find(
                &finder,
                &mut pantry,
                &ingredients,
                image.as_deref(),
                Preferences::new(dietary, cuisine),
                !no_pantry,
                !no_save,
                json,
            )
            .await
        }
        Command::Pantry { action } => {
            run_pantry(&mut pantry, action);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_args();
    init_logging(cli.verbose);

    let config = FinderConfig::from_env();
    debug!(model = %config.model, base_url = %config.base_url, pantry = ?config.pantry_path(), "configuration loaded");

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(image_error) = e.downcast_ref::<ImageAnalysisError>() {
                eprintln!("Error: {}", image_error.user_message());
                debug!(status = image_error.status_code(), error = %image_error.0, "image analysis failed");
            } else if let Some(finder_error) = e.downcast_ref::<FinderError>() {
                eprintln!("Error: {}", finder_error.user_message());
                debug!(status = finder_error.status_code(), error = %finder_error, "request failed");
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
