use shared::domain::Section;

/// Which section of the recipe screen is showing. Starts on ingredients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionSelector {
    current: Section,
}

impl SectionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Section {
        self.current
    }

    pub fn select(&mut self, section: Section) {
        self.current = section;
    }
}
