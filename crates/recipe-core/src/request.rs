//! Recipe request model shared by the relay server and the stream consumer.
//!
//! Every field is optional from the server's point of view. Values the enums
//! do not know are kept verbatim in `Other` so nothing a form sends is ever
//! rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// Free-form value not covered by the known options.
            Other(String),
        }

        impl $name {
            /// Returns the lowercase wire form of this value.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($wire) {
                        return Ok(Self::$variant);
                    }
                )+
                Ok(Self::Other(trimmed.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// Meal the recipe is meant for.
    MealType {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Dinner => "dinner",
        Snack => "snack",
        Dessert => "dessert",
    }
}

choice_enum! {
    /// Preferred cuisine.
    Cuisine {
        Any => "any",
        Italian => "italian",
        Mexican => "mexican",
        Chinese => "chinese",
        Indian => "indian",
    }
}

choice_enum! {
    /// Requested cooking skill level.
    Complexity {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

/// One user submission. Built once, consumed to build a prompt or a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipeRequest {
    /// Ingredients in the order the user listed them.
    pub ingredients: Vec<String>,
    pub meal_type: Option<MealType>,
    pub cuisine: Option<Cuisine>,
    /// Maximum cooking time in minutes.
    pub cooking_time: Option<u32>,
    pub complexity: Option<Complexity>,
    pub dietary_restrictions: Option<String>,
}

impl RecipeRequest {
    /// Creates a request from a list of ingredients with every other field absent.
    pub fn with_ingredients<I, S>(ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ingredients: ingredients
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.trim().is_empty())
                .collect(),
            ..Self::default()
        }
    }

    pub fn meal_type(mut self, meal_type: MealType) -> Self {
        self.meal_type = Some(meal_type);
        self
    }

    pub fn cuisine(mut self, cuisine: Cuisine) -> Self {
        self.cuisine = Some(cuisine);
        self
    }

    pub fn cooking_time(mut self, minutes: u32) -> Self {
        self.cooking_time = Some(minutes);
        self
    }

    pub fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn dietary_restrictions(mut self, restrictions: impl Into<String>) -> Self {
        self.dietary_restrictions = Some(restrictions.into());
        self
    }

    /// Encodes the request as `/recipeStream` query pairs. Absent fields are omitted.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if !self.ingredients.is_empty() {
            pairs.push(("ingredients", self.ingredients.join(", ")));
        }
        if let Some(meal_type) = &self.meal_type {
            pairs.push(("mealType", meal_type.to_string()));
        }
        if let Some(cuisine) = &self.cuisine {
            pairs.push(("cuisine", cuisine.to_string()));
        }
        if let Some(minutes) = self.cooking_time {
            pairs.push(("cookingTime", minutes.to_string()));
        }
        if let Some(complexity) = &self.complexity {
            pairs.push(("complexity", complexity.to_string()));
        }
        if let Some(restrictions) = &self.dietary_restrictions {
            pairs.push(("dietaryRestrictions", restrictions.clone()));
        }
        pairs
    }
}

/// Raw `/recipeStream` query parameters as sent by the form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeQuery {
    pub ingredients: Option<String>,
    pub meal_type: Option<String>,
    pub cuisine: Option<String>,
    pub cooking_time: Option<String>,
    pub complexity: Option<String>,
    pub dietary_restrictions: Option<String>,
}

impl RecipeQuery {
    /// Folds raw query pairs into a query.
    ///
    /// A repeated `ingredients` key appends to the comma-separated list; for
    /// every other field the last value wins. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            let slot = match key.as_ref() {
                "ingredients" => {
                    query.ingredients = Some(match query.ingredients.take() {
                        Some(prev) => format!("{prev},{value}"),
                        None => value,
                    });
                    continue;
                }
                "mealType" => &mut query.meal_type,
                "cuisine" => &mut query.cuisine,
                "cookingTime" => &mut query.cooking_time,
                "complexity" => &mut query.complexity,
                "dietaryRestrictions" => &mut query.dietary_restrictions,
                other => {
                    tracing::debug!(key = %other, "ignoring unknown query parameter");
                    continue;
                }
            };
            *slot = Some(value);
        }
        query
    }

    /// Converts the raw query into a request. Never fails.
    ///
    /// Empty strings count as absent, ingredients are split on commas, and a
    /// cooking time that is not a whole number of minutes is dropped.
    pub fn into_request(self) -> RecipeRequest {
        let ingredients = self
            .ingredients
            .as_deref()
            .map(split_ingredients)
            .unwrap_or_default();

        let cooking_time = non_empty(self.cooking_time).and_then(|raw| match raw.parse::<u32>() {
            Ok(minutes) => Some(minutes),
            Err(_) => {
                tracing::debug!(cooking_time = %raw, "ignoring non-numeric cooking time");
                None
            }
        });

        RecipeRequest {
            ingredients,
            meal_type: non_empty(self.meal_type).map(|v| parse_choice(&v)),
            cuisine: non_empty(self.cuisine).map(|v| parse_choice(&v)),
            cooking_time,
            complexity: non_empty(self.complexity).map(|v| parse_choice(&v)),
            dietary_restrictions: non_empty(self.dietary_restrictions),
        }
    }
}

/// Splits a comma-separated ingredient list, trimming and dropping empty tokens.
pub fn split_ingredients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_choice<T: FromStr<Err = std::convert::Infallible>>(value: &str) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(never) => match never {},
    }
}
