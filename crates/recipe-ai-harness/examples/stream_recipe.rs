use std::sync::Arc;

use recipe_ai_harness::prelude::*;
use recipe_ai_harness::vendors::openai_compat::OpenAiCompatProvider;
use recipe_core::{MealType, RecipeRequest, build_prompt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let harness = Harness::builder()
        .register_provider(Arc::new(OpenAiCompatProvider::from_env("groq")?))
        .build()?;

    let request = RecipeRequest::with_ingredients(["Chicken", "Tomatoes", "Garlic"])
        .meal_type(MealType::Dinner)
        .cooking_time(45);

    let mut relay = harness
        .relay(ModelRef::new("groq", "llama-3.1-8b-instant"))
        .prompt(build_prompt(&request))
        .start_stream()
        .await?;

    while let Some(event) = relay.next_event().await {
        match event {
            StreamEvent::Chunk { text } => print!("{text}"),
            StreamEvent::Close => println!(),
            StreamEvent::Error { message } => eprintln!("relay error: {message}"),
        }
    }

    let _ = relay.finish().await?;
    Ok(())
}
