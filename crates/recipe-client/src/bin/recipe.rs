//! Terminal front end: submits one recipe request and prints the recipe as
//! it streams in.

use std::io::Write as _;

use clap::Parser;
use recipe_client::{HttpConnector, RecipeSession, SessionUpdate};
use recipe_core::{Complexity, ConsoleTarget, Cuisine, MealType, RecipeRequest, init_observability_to};

/// Generate a recipe from the ingredients you have.
#[derive(Parser, Debug)]
#[command(name = "recipe", version, about, long_about = None)]
struct Args {
    /// Ingredients, comma-separated or repeated (`-i chicken -i rice`)
    #[arg(short, long, value_delimiter = ',')]
    ingredients: Vec<String>,

    /// Meal type (breakfast, lunch, dinner, snack, dessert)
    #[arg(short, long)]
    meal_type: Option<MealType>,

    /// Cuisine preference (any, italian, mexican, chinese, indian)
    #[arg(short, long)]
    cuisine: Option<Cuisine>,

    /// Maximum cooking time in minutes
    #[arg(short = 't', long)]
    cooking_time: Option<u32>,

    /// Complexity (beginner, intermediate, advanced)
    #[arg(short = 'x', long)]
    complexity: Option<Complexity>,

    /// Dietary restrictions, free text
    #[arg(short, long)]
    dietary_restrictions: Option<String>,

    /// Base URL of the recipe relay
    #[arg(long, env = "RECIPE_BACKEND_URL", default_value = "http://localhost:3001")]
    backend_url: String,
}

impl Args {
    fn to_request(&self) -> RecipeRequest {
        RecipeRequest {
            ingredients: self
                .ingredients
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            meal_type: self.meal_type.clone(),
            cuisine: self.cuisine.clone(),
            cooking_time: self.cooking_time,
            complexity: self.complexity.clone(),
            dietary_restrictions: self.dietary_restrictions.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_observability_to(ConsoleTarget::Stderr);
    let args = Args::parse();

    let mut session = RecipeSession::new(HttpConnector::new(args.backend_url.clone())?);
    if let Err(err) = session.start(&args.to_request()).await {
        anyhow::bail!("{}", err.message());
    }

    let mut stdout = std::io::stdout();
    while let Some(update) = session.next_update().await {
        match update {
            SessionUpdate::Chunk(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            SessionUpdate::Finished => writeln!(stdout)?,
            SessionUpdate::Failed(err) => {
                writeln!(stdout)?;
                anyhow::bail!("{}", err.message());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_the_request() {
        let args = Args::try_parse_from([
            "recipe",
            "-i",
            "Chicken, Tomatoes",
            "-i",
            " ",
            "--meal-type",
            "Dinner",
            "--cooking-time",
            "45",
            "--complexity",
            "intermediate",
            "--backend-url",
            "http://relay.local",
        ])
        .expect("args");
        let request = args.to_request();
        assert_eq!(request.ingredients, vec!["Chicken", "Tomatoes"]);
        assert_eq!(request.meal_type, Some(MealType::Dinner));
        assert_eq!(request.cuisine, None);
        assert_eq!(request.cooking_time, Some(45));
        assert_eq!(request.complexity, Some(Complexity::Intermediate));
        assert_eq!(args.backend_url, "http://relay.local");
    }
}
