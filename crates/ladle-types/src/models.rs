use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel utility value meaning no appliance is needed for a step.
/// Clients must not render it as a tag.
pub const NO_UTILITY: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Editor,
    Viewer,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Owner => "owner",
            Permission::Editor => "editor",
            Permission::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Permission::Owner),
            "editor" => Ok(Permission::Editor),
            "viewer" => Ok(Permission::Viewer),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

/// A user's entry in a recipe's member set. Keyed by `user_id`;
/// the store enforces at most one entry per user per recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMember {
    pub user_id: Uuid,
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub description: String,
    /// Wait time in whole seconds. 0 means no wait at all,
    /// not "instantaneous but nonzero".
    pub wait_seconds: u32,
    pub utility: String,
}

impl Step {
    /// The appliance tag for this step, if one is required.
    pub fn utility_tag(&self) -> Option<&str> {
        if self.utility == NO_UTILITY || self.utility.is_empty() {
            None
        } else {
            Some(&self.utility)
        }
    }
}

/// Per-serving nutrition figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

/// Canonical recipe content, as produced by the generation adapter
/// and embedded in every stored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub nutrition: Nutrition,
}

/// A persisted recipe. Invariant: `members` holds at least one
/// entry with `Permission::Owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecipe {
    pub id: Uuid,
    #[serde(flatten)]
    pub recipe: Recipe,
    pub members: Vec<RecipeMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only projection served to share-link visitors:
/// no member list, no share token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedRecipe {
    pub id: Uuid,
    #[serde(flatten)]
    pub recipe: Recipe,
    pub created_at: DateTime<Utc>,
}

impl From<StoredRecipe> for SharedRecipe {
    fn from(stored: StoredRecipe) -> Self {
        Self {
            id: stored.id,
            recipe: stored.recipe,
            created_at: stored.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utility_tag_hides_none_sentinel() {
        let step = Step {
            description: "Plate and serve".into(),
            wait_seconds: 0,
            utility: NO_UTILITY.into(),
        };
        assert_eq!(step.utility_tag(), None);

        let step = Step {
            description: "Bake until golden".into(),
            wait_seconds: 1200,
            utility: "oven".into(),
        };
        assert_eq!(step.utility_tag(), Some("oven"));
    }

    #[test]
    fn permission_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&Permission::Owner).unwrap(),
            "\"owner\""
        );
        let p: Permission = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(p, Permission::Viewer);
    }

    #[test]
    fn shared_recipe_strips_members_and_token() {
        let stored = StoredRecipe {
            id: Uuid::new_v4(),
            recipe: Recipe {
                name: "Test".into(),
                ingredients: vec![],
                steps: vec![],
                nutrition: Nutrition {
                    calories: 0.0,
                    protein: 0.0,
                    fat: 0.0,
                    carbohydrates: 0.0,
                },
            },
            members: vec![RecipeMember {
                user_id: Uuid::new_v4(),
                permission: Permission::Owner,
            }],
            share_token: Some("abc123".into()),
            created_at: Utc::now(),
        };

        let shared: SharedRecipe = stored.into();
        let json = serde_json::to_value(&shared).unwrap();
        assert!(json.get("members").is_none());
        assert!(json.get("shareToken").is_none());
        assert!(json.get("name").is_some());
    }
}
