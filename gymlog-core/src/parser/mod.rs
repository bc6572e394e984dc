// parser module

mod html;

pub use html::{parse_document, parse_file};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Class names that identify the parts of a coach planner document.
///
/// The defaults describe the planner export the loader was written against;
/// other dialects only need a different set of class names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerMarkup {
    pub session: String,
    pub title: String,
    pub day: String,
    pub month: String,
    pub year: String,
    pub body: String,
    /// Exercise entries are direct children of the body whose class starts
    /// with this prefix.
    pub entry_prefix: String,
    /// Field tags in canonical column order: exercise, series, load %,
    /// weight, reps, RPE, rest minutes.
    pub field_tags: [String; 7],
}

impl Default for PlannerMarkup {
    fn default() -> Self {
        Self {
            session: "day".into(),
            title: "title".into(),
            day: "day-number".into(),
            month: "month-number".into(),
            year: "year-number".into(),
            body: "day-body".into(),
            entry_prefix: "exercise".into(),
            field_tags: [
                "name".into(),
                "series".into(),
                "load".into(),
                "weight".into(),
                "reps".into(),
                "rpe".into(),
                "rest".into(),
            ],
        }
    }
}

/// One microcycle: the block name comes from the source file, not the markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBlock {
    pub name: String,
    pub sessions: Vec<ParsedSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSession {
    pub description: String,
    pub date: NaiveDate,
    pub exercises: Vec<RawExercise>,
}

/// Field tag to trimmed text, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawExercise {
    pub fields: Vec<(String, String)>,
}

impl RawExercise {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Later occurrences of a tag replace earlier ones.
    pub fn insert(&mut self, tag: String, value: String) {
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(t, _)| t.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawExercise {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut exercise = RawExercise::default();
        for (tag, value) in iter {
            exercise.insert(tag.into(), value.into());
        }
        exercise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_tags_keep_position_and_last_value() {
        let exercise: RawExercise = [("name", "squat"), ("reps", "5"), ("name", "front squat")]
            .into_iter()
            .collect();
        assert_eq!(exercise.tags().collect::<Vec<_>>(), vec!["name", "reps"]);
        assert_eq!(exercise.get("name"), Some("front squat"));
        assert_eq!(exercise.get("rest"), None);
    }
}
