use std::{fmt, hash::Hash, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub i64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub quantity: f64,
    pub unit: String,
    pub name: String,
}

impl Ingredient {
    pub fn new(quantity: f64, unit: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            quantity,
            unit: unit.into(),
            name: name.into(),
        }
    }

    /// Row text: quantity, unit and name joined by single spaces.
    ///
    /// Whole quantities print without a fractional part (`1 cup water`, not `1.0 cup water`).
    pub fn display_line(&self) -> String {
        [self.quantity.to_string(), self.unit.clone(), self.name.clone()].join(" ")
    }

    fn quantity_bits(&self) -> u64 {
        // 0.0 and -0.0 are the same amount.
        if self.quantity == 0.0 {
            0
        } else {
            self.quantity.to_bits()
        }
    }
}

// Rows are keyed by content, so equality and hashing go through the raw bits.
impl PartialEq for Ingredient {
    fn eq(&self, other: &Self) -> bool {
        self.quantity_bits() == other.quantity_bits()
            && self.unit == other.unit
            && self.name == other.name
    }
}

impl Eq for Ingredient {}

impl Hash for Ingredient {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.quantity_bits().hash(state);
        self.unit.hash(state);
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cook time in minutes.
    pub time: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Url>,
}

impl Recipe {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn samples() -> Vec<Recipe> {
        vec![
            Recipe {
                name: "Tea".into(),
                description: None,
                time: 5,
                ingredients: vec![Ingredient::new(1.0, "cup", "water")],
                steps: vec!["Boil water".into(), "Steep".into()],
                image_url: None,
            },
            Recipe {
                name: "Spaghetti Aglio e Olio".into(),
                description: Some("Garlic, olive oil and chili. Dinner in twenty minutes.".into()),
                time: 20,
                ingredients: vec![
                    Ingredient::new(400.0, "g", "spaghetti"),
                    Ingredient::new(6.0, "cloves", "garlic"),
                    Ingredient::new(0.5, "cup", "olive oil"),
                    Ingredient::new(1.0, "tsp", "chili flakes"),
                    Ingredient::new(2.0, "tbsp", "parsley"),
                ],
                steps: vec![
                    "Cook the spaghetti in salted water until al dente".into(),
                    "Slice the garlic thinly and fry it gently in the olive oil".into(),
                    "Add the chili flakes and a ladle of pasta water".into(),
                    "Toss the drained pasta in the pan and finish with parsley".into(),
                ],
                image_url: Url::parse("https://images.example.com/recipes/aglio-e-olio.jpg").ok(),
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Ingredients,
    Instructions,
}

impl Section {
    /// Display order of the section picker.
    pub const ALL: [Section; 2] = [Section::Ingredients, Section::Instructions];

    pub fn label(self) -> &'static str {
        match self {
            Section::Ingredients => "Ingredients",
            Section::Instructions => "Instructions",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown section '{0}' (expected ingredients or instructions)")]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingredients" => Ok(Section::Ingredients),
            "instructions" | "steps" => Ok(Section::Instructions),
            _ => Err(UnknownSection(s.to_string())),
        }
    }
}
