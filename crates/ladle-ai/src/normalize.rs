//! Normalizes the provider's heterogeneous response shapes into the
//! canonical [`Recipe`].

use ladle_types::models::{Ingredient, NO_UTILITY, Nutrition, Recipe, Step};
use serde::Deserialize;
use serde_json::Value;

use crate::GenerationError;

/// The three payload shapes a provider message may carry, discriminated by
/// which field is present.
#[derive(Debug)]
enum ProviderPayload<'a> {
    /// Function-call arguments: a JSON string with the recipe nested under
    /// `recipe_details`.
    FunctionCall(&'a str),
    /// Raw JSON text in a content field (plain string content or an
    /// assistants-style `content[0].text.value`).
    JsonText(&'a str),
    /// The message itself already is a structured recipe object.
    Structured(&'a Value),
}

/// Single dispatch over the message shape. Returns `None` when no
/// documented shape matches.
fn classify(message: &Value) -> Option<ProviderPayload<'_>> {
    if let Some(args) = message
        .pointer("/tool_calls/0/function/arguments")
        .and_then(Value::as_str)
    {
        return Some(ProviderPayload::FunctionCall(args));
    }

    if let Some(text) = message.get("content").and_then(Value::as_str) {
        return Some(ProviderPayload::JsonText(text));
    }

    // Assistants API: content is a list of typed blocks.
    if let Some(text) = message
        .pointer("/content/0/text/value")
        .and_then(Value::as_str)
    {
        return Some(ProviderPayload::JsonText(text));
    }

    if recipe_value(message).is_some() {
        return Some(ProviderPayload::Structured(message));
    }

    None
}

/// Normalize a provider message into the canonical recipe. All three
/// documented shapes produce the identical result for equivalent content;
/// anything else is an `UnexpectedFormat` error.
pub fn into_recipe(message: &Value) -> Result<Recipe, GenerationError> {
    let payload = classify(message).ok_or(GenerationError::UnexpectedFormat)?;

    let parsed;
    let value = match payload {
        ProviderPayload::FunctionCall(args) | ProviderPayload::JsonText(args) => {
            parsed = serde_json::from_str::<Value>(args)?;
            &parsed
        }
        ProviderPayload::Structured(v) => v,
    };

    let recipe = recipe_value(value).ok_or(GenerationError::UnexpectedFormat)?;
    let wire: WireRecipe = serde_json::from_value(recipe.clone())?;
    Ok(wire.into())
}

/// Locate the recipe object inside a parsed payload: either nested under
/// `recipe_details` (function-argument blobs) or the value itself.
fn recipe_value(v: &Value) -> Option<&Value> {
    if let Some(details) = v.get("recipe_details") {
        return Some(details);
    }
    if v.get("recipe_name").is_some() || v.get("name").is_some() {
        return Some(v);
    }
    None
}

// Wire shape as the function schema names it; aliases accept payloads that
// already use the canonical field names.

#[derive(Debug, Deserialize)]
struct WireRecipe {
    #[serde(alias = "name")]
    recipe_name: String,
    #[serde(alias = "ingredients")]
    ingredients_list: Vec<WireIngredient>,
    #[serde(alias = "nutrition")]
    nutritional_information: Nutrition,
    #[serde(alias = "steps")]
    cooking_steps: Vec<WireStep>,
}

#[derive(Debug, Deserialize)]
struct WireIngredient {
    #[serde(alias = "name")]
    ingredient: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    #[serde(alias = "description")]
    step: String,
    /// Seconds; models occasionally emit floats or negatives.
    #[serde(alias = "waitSeconds", default)]
    time: f64,
    #[serde(default)]
    utility: String,
}

impl From<WireRecipe> for Recipe {
    fn from(wire: WireRecipe) -> Self {
        Recipe {
            name: wire.recipe_name,
            ingredients: wire
                .ingredients_list
                .into_iter()
                .map(|i| Ingredient {
                    name: i.ingredient,
                    quantity: i.quantity,
                })
                .collect(),
            steps: wire
                .cooking_steps
                .into_iter()
                .map(|s| Step {
                    description: s.step,
                    wait_seconds: if s.time.is_finite() && s.time > 0.0 {
                        s.time.round() as u32
                    } else {
                        0
                    },
                    utility: if s.utility.is_empty() {
                        NO_UTILITY.to_string()
                    } else {
                        s.utility
                    },
                })
                .collect(),
            nutrition: wire.nutritional_information,
        }
    }
}
