//! Pure composition of a recipe, the selected section and a flag snapshot into a render tree.
//!
//! Nothing here performs I/O or keeps state between calls: the same inputs always produce the
//! same [`RenderTree`].

use std::fmt;

use remote_config::FlagSnapshot;
use serde::Serialize;
use shared::domain::{Recipe, Section};
use url::Url;

pub const STEPS_STYLE_KEY: &str = "stepsStyle";
pub const STEPS_STYLE_FALLBACK: &str = "square";

const HERO_HEIGHT: u16 = 300;
const DISMISS_ICON: &str = "xmark";
const TIME_ICON: &str = "clock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderTree {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero: Option<HeroImage>,
    pub dismiss: DismissButton,
    pub title: TitleBlock,
    pub picker: SectionPicker,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroImage {
    pub url: Url,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DismissButton {
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleBlock {
    pub name: String,
    pub time_label: String,
    pub time_icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionPicker {
    pub options: Vec<PickerOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerOption {
    pub section: Section,
    pub label: &'static str,
    pub selected: bool,
}

impl SectionPicker {
    pub fn selected(&self) -> Option<Section> {
        self.options
            .iter()
            .find(|option| option.selected)
            .map(|option| option.section)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionBody {
    pub section: Section,
    pub header: SectionHeader,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionHeader {
    pub title: &'static str,
    pub count: usize,
    pub noun: &'static str,
}

impl fmt::Display for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {} {}", self.title, self.count, self.noun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Row {
    Ingredient {
        text: String,
    },
    Step {
        /// 1-based position in the step list.
        index: usize,
        icon: String,
        text: String,
    },
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Ingredient { text } => f.write_str(text),
            Row::Step { icon, text, .. } => write!(f, "{icon} {text}"),
        }
    }
}

impl SectionBody {
    pub fn row_lines(&self) -> Vec<String> {
        self.rows.iter().map(ToString::to_string).collect()
    }
}

pub fn render(recipe: &Recipe, section: Section, flags: &FlagSnapshot) -> RenderTree {
    RenderTree {
        hero: recipe.image_url.as_ref().map(|url| HeroImage {
            url: url.clone(),
            height: HERO_HEIGHT,
        }),
        dismiss: DismissButton { icon: DISMISS_ICON },
        title: render_title(recipe),
        picker: render_picker(section),
        body: match section {
            Section::Ingredients => render_ingredients(recipe),
            Section::Instructions => render_instructions(recipe, flags),
        },
    }
}

fn render_title(recipe: &Recipe) -> TitleBlock {
    TitleBlock {
        name: recipe.name.clone(),
        time_label: format!("{} Min", recipe.time),
        time_icon: TIME_ICON,
        description: recipe.description.clone(),
    }
}

fn render_picker(selected: Section) -> SectionPicker {
    SectionPicker {
        options: Section::ALL
            .iter()
            .map(|&section| PickerOption {
                section,
                label: section.label(),
                selected: section == selected,
            })
            .collect(),
    }
}

fn render_ingredients(recipe: &Recipe) -> SectionBody {
    SectionBody {
        section: Section::Ingredients,
        header: SectionHeader {
            title: Section::Ingredients.label(),
            count: recipe.ingredients.len(),
            noun: "items",
        },
        rows: recipe
            .ingredients
            .iter()
            .map(|ingredient| Row::Ingredient {
                text: ingredient.display_line(),
            })
            .collect(),
    }
}

fn render_instructions(recipe: &Recipe, flags: &FlagSnapshot) -> SectionBody {
    // One read per pass keeps every row on the same style.
    let style = flags.get(STEPS_STYLE_KEY, STEPS_STYLE_FALLBACK);
    SectionBody {
        section: Section::Instructions,
        header: SectionHeader {
            title: Section::Instructions.label(),
            count: recipe.steps.len(),
            noun: "steps",
        },
        rows: recipe
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| Row::Step {
                index: i + 1,
                icon: format!("{}.{style}", i + 1),
                text: step.clone(),
            })
            .collect(),
    }
}

impl fmt::Display for RenderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hero {
            Some(hero) => writeln!(f, "[{}] {} ({}pt)", self.dismiss.icon, hero.url, hero.height)?,
            None => writeln!(f, "[{}]", self.dismiss.icon)?,
        }
        writeln!(
            f,
            "{}  ({} {})",
            self.title.name, self.title.time_icon, self.title.time_label
        )?;
        if let Some(description) = &self.title.description {
            writeln!(f, "{description}")?;
        }

        let picker = self
            .picker
            .options
            .iter()
            .map(|option| {
                if option.selected {
                    format!("[{}]", option.label)
                } else {
                    option.label.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(f, "{picker}")?;

        writeln!(f, "{}", self.body.header)?;
        for row in &self.body.rows {
            writeln!(f, "  {row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
