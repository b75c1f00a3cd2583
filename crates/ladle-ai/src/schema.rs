//! Prompt text and the `create_recipe` function schema sent to the provider.

use serde_json::{Value, json};

pub const SYSTEM_PROMPT: &str = "You are a helpful cooking assistant. Analyze images and text \
     to create recipes. Always respond with valid JSON objects matching the required schema.";

/// Name of the structured-output function the provider is asked to call.
pub const RECIPE_FUNCTION_NAME: &str = "create_recipe";

/// Bake the generation constraints into one instruction string. The provider
/// sees a single enriched prompt whether or not images are attached.
pub fn build_prompt(
    text: &str,
    servings: u32,
    cook_now: bool,
    allergies: &[String],
    utilities: &[String],
) -> String {
    let mut prompt = if text.trim().is_empty() {
        "Create a recipe from the attached ingredients".to_string()
    } else {
        format!("Available ingredients: {}", text.trim())
    };

    prompt.push_str(&format!(". Servings: {servings}."));

    if cook_now {
        prompt.push_str(
            " The meal will be cooked right now: avoid recipes needing advance \
             preparation or long unattended waits such as soaking or marinating.",
        );
    }

    if !allergies.is_empty() {
        prompt.push_str(&format!(" Allergies to avoid: {}.", allergies.join(", ")));
    }

    if !utilities.is_empty() {
        prompt.push_str(&format!(
            " Available cooking utilities: {}.",
            utilities.join(", ")
        ));
    }

    prompt
}

/// JSON schema of the `create_recipe` function. The recipe itself is nested
/// under `recipe_details`; the outer fields echo the request so the model
/// restates what it worked from.
pub fn recipe_function() -> Value {
    json!({
        "name": RECIPE_FUNCTION_NAME,
        "description": "Creates a recipe based on available ingredients, number of servings, allergies, and available cooking utilities.",
        "strict": true,
        "parameters": {
            "type": "object",
            "required": ["ingredients", "servings", "utilities", "allergies", "recipe_details", "cook_now"],
            "properties": {
                "ingredients": {
                    "type": "array",
                    "description": "List of ingredients provided by the user",
                    "items": { "type": "string", "description": "An ingredient available for cooking" }
                },
                "servings": {
                    "type": "number",
                    "description": "The number of people the meal will serve"
                },
                "allergies": {
                    "type": "array",
                    "description": "List of allergies to avoid in the recipe",
                    "items": { "type": "string", "description": "An allergy or dietary restriction" }
                },
                "cook_now": {
                    "type": "boolean",
                    "description": "Whether the user wants to cook now. If true, do not respond with recipes that require preparation beforehand or long unattended waits, for example soaking for an hour."
                },
                "utilities": {
                    "type": "array",
                    "description": "List of available cooking utilities",
                    "items": { "type": "string", "description": "A kitchen utility available for cooking" }
                },
                "recipe_details": {
                    "type": "object",
                    "description": "Details of the created recipe",
                    "required": ["ingredients_list", "nutritional_information", "cooking_steps", "recipe_name"],
                    "additionalProperties": false,
                    "properties": {
                        "ingredients_list": {
                            "type": "array",
                            "description": "List of ingredients used in the recipe with quantities",
                            "items": {
                                "type": "object",
                                "required": ["ingredient", "quantity"],
                                "additionalProperties": false,
                                "properties": {
                                    "ingredient": { "type": "string", "description": "Name of the ingredient, properly capitalized" },
                                    "quantity": { "type": "string", "description": "Quantity of the ingredient needed" }
                                }
                            }
                        },
                        "nutritional_information": {
                            "type": "object",
                            "required": ["calories", "protein", "fat", "carbohydrates"],
                            "additionalProperties": false,
                            "properties": {
                                "calories": { "type": "number", "description": "Total calories per serving" },
                                "protein": { "type": "number", "description": "Total protein content per serving" },
                                "fat": { "type": "number", "description": "Total fat content per serving" },
                                "carbohydrates": { "type": "number", "description": "Total carbohydrates per serving" }
                            }
                        },
                        "cooking_steps": {
                            "type": "array",
                            "description": "Step-by-step instructions to prepare the meal",
                            "items": {
                                "type": "object",
                                "required": ["step", "time", "utility"],
                                "additionalProperties": false,
                                "properties": {
                                    "step": { "type": "string", "description": "Instruction for this cooking step, including wait time and utility" },
                                    "time": { "type": "number", "description": "Wait time in seconds if the step needs one (cooking, baking, resting); respond with 0 for steps with no wait such as plating or serving" },
                                    "utility": { "type": "string", "description": "The utility needed, for example stove, oven, microwave, airfryer; respond with none if no appliance is required" }
                                }
                            }
                        },
                        "recipe_name": { "type": "string", "description": "Name of the recipe, properly capitalized" }
                    }
                }
            },
            "additionalProperties": false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_all_constraints() {
        let prompt = build_prompt(
            "eggs, flour, milk",
            2,
            true,
            &["peanuts".into()],
            &["stove".into(), "oven".into()],
        );
        assert!(prompt.contains("eggs, flour, milk"));
        assert!(prompt.contains("Servings: 2"));
        assert!(prompt.contains("cooked right now"));
        assert!(prompt.contains("peanuts"));
        assert!(prompt.contains("stove, oven"));
    }

    #[test]
    fn empty_text_still_yields_an_instruction() {
        let prompt = build_prompt("  ", 4, false, &[], &[]);
        assert!(prompt.starts_with("Create a recipe"));
        assert!(!prompt.contains("cooked right now"));
    }

    #[test]
    fn function_schema_requires_recipe_details() {
        let f = recipe_function();
        assert_eq!(f["name"], RECIPE_FUNCTION_NAME);
        let required = f["parameters"]["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "recipe_details"));
    }
}
