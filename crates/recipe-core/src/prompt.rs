//! Prompt template sent to the model for every recipe request.

use crate::request::RecipeRequest;

pub const DEFAULT_INGREDIENTS: &str = "Not specified";
pub const DEFAULT_MEAL_TYPE: &str = "Any";
pub const DEFAULT_CUISINE: &str = "Any";
pub const DEFAULT_COOKING_TIME: &str = "Flexible";
pub const DEFAULT_COMPLEXITY: &str = "Moderate";

const PREAMBLE: &str = "Generate a recipe that incorporates the following details:";
const INSTRUCTIONS: [&str; 3] = [
    "You are a master chef. Provide a detailed recipe formatted in Markdown.",
    "Include sections for a suitable name, a brief description, ingredients, and step-by-step instructions.",
    "Only use the provided ingredients.",
];

/// Builds the instruction string for a request.
///
/// Absent fields fall back to fixed defaults, so this never fails. Dietary
/// restrictions are only mentioned when the user picked something other than
/// `none`.
pub fn build_prompt(request: &RecipeRequest) -> String {
    let ingredients = if request.ingredients.is_empty() {
        DEFAULT_INGREDIENTS.to_string()
    } else {
        request.ingredients.join(", ")
    };
    let meal_type = request
        .meal_type
        .as_ref()
        .map_or_else(|| DEFAULT_MEAL_TYPE.to_string(), ToString::to_string);
    let cuisine = request
        .cuisine
        .as_ref()
        .map_or_else(|| DEFAULT_CUISINE.to_string(), ToString::to_string);
    let cooking_time = request
        .cooking_time
        .map_or_else(|| DEFAULT_COOKING_TIME.to_string(), |m| m.to_string());
    let complexity = request
        .complexity
        .as_ref()
        .map_or_else(|| DEFAULT_COMPLEXITY.to_string(), ToString::to_string);

    let mut parts = vec![
        PREAMBLE.to_string(),
        format!("[Ingredients: {ingredients}]"),
        format!("[Meal Type: {meal_type}]"),
        format!("[Cuisine Preference: {cuisine}]"),
        format!("[Cooking Time: {cooking_time}]"),
        format!("[Complexity: {complexity}]"),
    ];
    if let Some(restrictions) = request
        .dietary_restrictions
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("none"))
    {
        parts.push(format!("[Dietary Restrictions: {restrictions}]"));
    }
    parts.extend(INSTRUCTIONS.iter().map(|s| s.to_string()));
    parts.join(" ")
}
