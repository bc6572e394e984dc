//! Turns the raw field mappings of one planner session into typed rows.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::db::models::SetPrescription;
use crate::errors::{GymError, Result};
use crate::parser::{PlannerMarkup, RawExercise};

pub const CANONICAL_COLUMNS: [&str; 7] =
    ["Exercise", "Series", "Load%", "Weight", "Reps", "RPE", "RestMin"];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct CuratedExercise {
    pub exercise: String,
    pub series: i64,
    pub load_pct: Option<f64>,
    pub weight: Option<f64>,
    pub reps: i64,
    pub rpe: i64,
    pub rest_min: Option<f64>,
}

impl CuratedExercise {
    /// The prescription every expanded set of this row shares. The planner's
    /// single RPE is an upper bound.
    pub fn prescription(&self) -> SetPrescription {
        SetPrescription {
            reps: Some(self.reps),
            weight: self.weight,
            perc_rm: self.load_pct,
            min_rpe: None,
            max_rpe: Some(self.rpe),
            rest_min: self.rest_min,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CuratedTable {
    pub columns: Vec<String>,
    pub rows: Vec<CuratedExercise>,
}

impl CuratedTable {
    pub fn is_canonical(&self) -> bool {
        self.columns.iter().map(String::as_str).eq(CANONICAL_COLUMNS)
    }
}

/// Union of field tags across the session, first-seen order.
fn collect_tags(exercises: &[RawExercise]) -> Vec<String> {
    let mut seen = HashSet::new();
    exercises
        .iter()
        .flat_map(RawExercise::tags)
        .filter(|tag| seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

/// Returns (source tag, label) pairs in the order the positional transforms
/// are applied.
fn label_columns(tags: Vec<String>, markup: &PlannerMarkup) -> Vec<(String, String)> {
    let tagged = {
        let known: HashSet<&str> = markup.field_tags.iter().map(String::as_str).collect();
        let found: HashSet<&str> = tags.iter().map(String::as_str).collect();
        found == known && tags.len() == CANONICAL_COLUMNS.len()
    };

    if tagged {
        return markup
            .field_tags
            .iter()
            .zip(CANONICAL_COLUMNS)
            .map(|(tag, label)| (tag.clone(), label.to_string()))
            .collect();
    }
    if tags.len() == CANONICAL_COLUMNS.len() {
        return tags
            .into_iter()
            .zip(CANONICAL_COLUMNS)
            .map(|(tag, label)| (tag, label.to_string()))
            .collect();
    }
    tags.into_iter().map(|tag| (tag.clone(), tag)).collect()
}

/// The first run of digits in `raw`, so "3 sets" and "8/10" read as 3 and 8.
pub(crate) fn first_number(raw: &str) -> Option<i64> {
    DIGITS.find(raw).and_then(|m| m.as_str().parse().ok())
}

fn leading_number(label: &str, raw: &str) -> Result<i64> {
    first_number(raw).ok_or_else(|| GymError::curation(format!("{label}: no number in '{raw}'")))
}

fn non_zero(value: i64) -> Option<f64> {
    (value != 0).then_some(value as f64)
}

pub fn curate_session(exercises: &[RawExercise], markup: &PlannerMarkup) -> Result<CuratedTable> {
    let columns = label_columns(collect_tags(exercises), markup);
    if !exercises.is_empty() && columns.len() < CANONICAL_COLUMNS.len() {
        return Err(GymError::curation(format!(
            "expected {} columns, found {}",
            CANONICAL_COLUMNS.len(),
            columns.len()
        )));
    }

    let mut rows = Vec::with_capacity(exercises.len());
    for (i, exercise) in exercises.iter().enumerate() {
        let mut values = Vec::with_capacity(CANONICAL_COLUMNS.len());
        for (tag, label) in columns.iter().take(CANONICAL_COLUMNS.len()) {
            let value = exercise.get(tag).ok_or_else(|| {
                GymError::curation(format!("row {}: missing value for {label}", i + 1))
            })?;
            values.push((label.as_str(), value));
        }

        rows.push(CuratedExercise {
            exercise: values[0].1.trim().to_lowercase(),
            series: leading_number(values[1].0, values[1].1)?,
            load_pct: non_zero(leading_number(values[2].0, values[2].1)?),
            weight: non_zero(leading_number(values[3].0, values[3].1)?),
            reps: leading_number(values[4].0, values[4].1)?,
            rpe: leading_number(values[5].0, values[5].1)?,
            rest_min: non_zero(leading_number(values[6].0, values[6].1)?),
        });
    }

    let columns: Vec<String> = columns.into_iter().map(|(_, label)| label).collect();
    debug!("Curated {} rows with columns {:?}", rows.len(), columns);
    Ok(CuratedTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_block;

    fn row(fields: &[(&str, &str)]) -> RawExercise {
        fields.iter().copied().collect()
    }

    #[test]
    fn known_tags_are_relabelled_by_identity() {
        let block = sample_block("week 1");
        let table = curate_session(&block.sessions[0].exercises, &PlannerMarkup::default()).unwrap();

        assert!(table.is_canonical());
        assert_eq!(
            table.rows[0],
            CuratedExercise {
                exercise: "back squat".into(),
                series: 3,
                load_pct: Some(75.0),
                weight: Some(100.0),
                reps: 5,
                rpe: 8,
                rest_min: Some(3.0),
            }
        );
    }

    #[test]
    fn shuffled_known_tags_still_land_in_canonical_columns() {
        let exercises = vec![row(&[
            ("reps", "10"),
            ("name", "Curl"),
            ("rest", "1 min"),
            ("series", "4"),
            ("rpe", "9"),
            ("weight", "12kg"),
            ("load", "0"),
        ])];
        let table = curate_session(&exercises, &PlannerMarkup::default()).unwrap();
        assert!(table.is_canonical());
        assert_eq!(table.rows[0].exercise, "curl");
        assert_eq!(table.rows[0].series, 4);
        assert_eq!(table.rows[0].reps, 10);
        assert_eq!(table.rows[0].weight, Some(12.0));
    }

    #[test]
    fn unknown_seven_columns_are_relabelled_by_position() {
        let exercises = vec![row(&[
            ("a", "Press"),
            ("b", "3"),
            ("c", "60"),
            ("d", "40"),
            ("e", "8"),
            ("f", "7"),
            ("g", "2"),
        ])];
        let table = curate_session(&exercises, &PlannerMarkup::default()).unwrap();
        assert_eq!(table.columns, CANONICAL_COLUMNS);
    }

    #[test]
    fn other_column_counts_keep_their_labels() {
        let exercises = vec![row(&[
            ("a", "Press"),
            ("b", "3"),
            ("c", "60"),
            ("d", "40"),
            ("e", "8"),
            ("f", "7"),
            ("g", "2"),
            ("h", "tempo 3-1-1"),
        ])];
        let table = curate_session(&exercises, &PlannerMarkup::default()).unwrap();
        assert_eq!(table.columns, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
        assert!(!table.is_canonical());
        assert_eq!(table.rows[0].series, 3);
    }

    #[test]
    fn zero_load_weight_and_rest_become_no_value() {
        let block = sample_block("week 1");
        let markup = PlannerMarkup::default();

        let lower = curate_session(&block.sessions[0].exercises, &markup).unwrap();
        assert_eq!(lower.rows[1].load_pct, None);
        assert_eq!(lower.rows[1].weight, Some(80.0));

        let upper = curate_session(&block.sessions[1].exercises, &markup).unwrap();
        assert_eq!(upper.rows[0].rest_min, None);
        assert_eq!(upper.rows[0].load_pct, Some(70.0));

        let bodyweight = vec![row(&[
            ("name", "Pull Up"),
            ("series", "3"),
            ("load", "0"),
            ("weight", "0 kg"),
            ("reps", "8"),
            ("rpe", "8"),
            ("rest", "2"),
        ])];
        let pull_up = curate_session(&bodyweight, &markup).unwrap();
        assert_eq!(pull_up.rows[0].weight, None);
        assert_eq!(pull_up.rows[0].load_pct, None);
        assert_eq!(pull_up.rows[0].rest_min, Some(2.0));
    }

    #[test]
    fn text_without_digits_is_a_curation_error() {
        let exercises = vec![row(&[
            ("name", "Plank"),
            ("series", "three"),
            ("load", "0"),
            ("weight", "0"),
            ("reps", "1"),
            ("rpe", "6"),
            ("rest", "1"),
        ])];
        let err = curate_session(&exercises, &PlannerMarkup::default()).unwrap_err();
        assert!(matches!(err, GymError::Curation(ref msg) if msg.contains("three")));
    }

    #[test]
    fn missing_values_and_short_rows_are_rejected() {
        let markup = PlannerMarkup::default();
        let short = vec![row(&[("name", "Plank"), ("series", "3")])];
        assert!(matches!(
            curate_session(&short, &markup),
            Err(GymError::Curation(_))
        ));

        let mut ragged = sample_block("week 1").sessions[0].exercises.clone();
        ragged[1].fields.retain(|(tag, _)| tag != "rpe");
        let err = curate_session(&ragged, &markup).unwrap_err();
        assert!(matches!(err, GymError::Curation(ref msg) if msg.contains("RPE")));
    }
}
