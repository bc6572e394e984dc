use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// Program models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Program {
    pub id: i64,
    pub description: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub objective: Option<String>,
}

impl Program {
    /// Name used for exported workbooks; programs without a description fall
    /// back to `Program_<id>`.
    pub fn display_name(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => format!("Program_{}", self.id),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dates = match (self.date_start, self.date_end) {
            (Some(start), Some(end)) => format!(" ({start} -> {end})"),
            (Some(start), None) => format!(" (from {start})"),
            (None, Some(end)) => format!(" (until {end})"),
            (None, None) => String::new(),
        };
        write!(f, "#{} {}{}", self.id, self.display_name(), dates)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewProgram {
    pub description: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub objective: Option<String>,
}

// Block models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    pub id: i64,
    pub description: String,
    pub program_id: i64,
}

// Workout models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: i64,
    pub description: Option<String>,
    pub block_id: i64,
    pub date_workout: Option<NaiveDate>,
    pub week: Option<i64>,
    pub day: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkout {
    pub description: Option<String>,
    pub block_id: i64,
    pub date_workout: Option<NaiveDate>,
    pub week: Option<i64>,
    pub day: Option<i64>,
}

// Exercise / muscle lookups
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub description: String,
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Muscle {
    pub id: i64,
    pub description: String,
}

// Set models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutSet {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub set_index: i64,
    pub reps: Option<i64>,
    pub weight: Option<f64>,
    pub perc_rm: Option<f64>,
    pub min_rpe: Option<i64>,
    pub max_rpe: Option<i64>,
    pub rest_min: Option<f64>,
}

/// Prescription shared by every set expanded from one planner row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPrescription {
    pub reps: Option<i64>,
    pub weight: Option<f64>,
    pub perc_rm: Option<f64>,
    pub min_rpe: Option<i64>,
    pub max_rpe: Option<i64>,
    pub rest_min: Option<f64>,
}

/// A workout set joined with its exercise name, in the shape the workbook
/// exporter writes.
#[derive(FromRow, Debug, Clone, PartialEq)]
pub struct SetRow {
    pub id: i64,
    pub exercise: String,
    pub set_index: i64,
    pub reps: Option<i64>,
    pub weight: Option<f64>,
    pub perc_rm: Option<f64>,
    pub min_rpe: Option<i64>,
    pub max_rpe: Option<i64>,
    pub rest_min: Option<f64>,
}

impl fmt::Display for SetRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weight_str = self
            .weight
            .map(|w| format!(" {w:.1}kg"))
            .unwrap_or_default();
        let rpe_str = self.max_rpe.map(|r| format!(" @{r}")).unwrap_or_default();
        write!(
            f,
            "{} #{}: {} reps{}{}",
            self.exercise,
            self.set_index,
            self.reps.unwrap_or(0),
            weight_str,
            rpe_str
        )
    }
}

// Log models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogWorkout {
    pub id: i64,
    pub workout_id: i64,
    pub date_workout_done: Option<NaiveDate>,
    pub duration_min: Option<f64>,
    pub intensity: Option<f64>,
    pub comment: Option<String>,
    pub date_reg: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLogWorkout {
    pub workout_id: i64,
    pub date_workout_done: Option<NaiveDate>,
    pub duration_min: Option<f64>,
    pub intensity: Option<f64>,
    pub comment: Option<String>,
    pub date_reg: NaiveDate,
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogSet {
    pub id: i64,
    pub workout_set_id: i64,
    pub log_workout_id: i64,
    pub reps_done: Option<i64>,
    pub weight_done: Option<f64>,
    pub rpe_done: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLogSet {
    pub workout_set_id: i64,
    pub log_workout_id: i64,
    pub reps_done: Option<i64>,
    pub weight_done: Option<f64>,
    pub rpe_done: Option<i64>,
    pub comment: Option<String>,
}

// Personal records
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoricPr {
    pub id: i64,
    pub exercise_id: i64,
    pub date_pr: NaiveDate,
    pub reps: i64,
    pub weight: f64,
    pub date_reg: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoricPr {
    pub exercise_id: i64,
    pub date_pr: NaiveDate,
    pub reps: i64,
    pub weight: f64,
    pub date_reg: NaiveDate,
}

impl fmt::Display for HistoricPr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}kg x {} reps",
            self.date_pr, self.weight, self.reps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_without_description_falls_back_to_id() {
        let program = Program {
            id: 4,
            description: Some("  ".into()),
            date_start: None,
            date_end: None,
            objective: None,
        };
        assert_eq!(program.display_name(), "Program_4");
        assert_eq!(program.to_string(), "#4 Program_4");
    }

    #[test]
    fn set_row_display() {
        let row = SetRow {
            id: 1,
            exercise: "back squat".into(),
            set_index: 2,
            reps: Some(5),
            weight: Some(100.0),
            perc_rm: None,
            min_rpe: None,
            max_rpe: Some(8),
            rest_min: None,
        };
        assert_eq!(row.to_string(), "back squat #2: 5 reps 100.0kg @8");
    }
}
