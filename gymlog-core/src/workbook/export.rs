use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sqlx::SqlitePool;

use super::{
    BODY_COLUMNS, Cell, HEADER_LABELS, Sheet, read_workbook, sheet_name_problem, write_workbook,
};
use crate::db::models::{SetRow, Workout};
use crate::db::operations::{
    ProgramRef, get_blocks_for_program, get_set_rows_for_workout, get_workouts_for_block,
    resolve_program,
};
use crate::errors::Result;

const HEADER_ROWS: usize = HEADER_LABELS.len();

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    /// Sheets generated by this run.
    pub written: Vec<String>,
    /// Blocks whose sheet was already present in the workbook.
    pub skipped: Vec<String>,
}

fn header_rows(workout: &Workout) -> [[Cell; 2]; HEADER_ROWS] {
    let date = workout
        .date_workout
        .map_or(Cell::Empty, |d| Cell::text(d.format("%Y-%m-%d").to_string()));
    let description = workout.description.clone().map_or(Cell::Empty, Cell::Text);
    let values = [date, description, Cell::Empty, Cell::Empty, Cell::Empty];

    let mut rows: [[Cell; 2]; HEADER_ROWS] = Default::default();
    for ((row, label), value) in rows.iter_mut().zip(HEADER_LABELS).zip(values) {
        *row = [Cell::text(label), value];
    }
    rows
}

fn set_cells(set: &SetRow) -> Vec<Cell> {
    vec![
        Cell::Number(set.id as f64),
        Cell::text(set.exercise.as_str()),
        Cell::Number(set.set_index as f64),
        Cell::opt_number(set.reps.map(|r| r as f64)),
        Cell::opt_number(set.weight),
        Cell::opt_number(set.perc_rm),
        Cell::opt_number(set.min_rpe.map(|r| r as f64)),
        Cell::opt_number(set.max_rpe.map(|r| r as f64)),
        Cell::opt_number(set.rest_min),
    ]
}

/// Lay out one workout at `cursor`, returning the cursor for the next one.
fn write_workout(sheet: &mut Sheet, cursor: usize, workout: &Workout, sets: &[SetRow]) -> usize {
    for (offset, row) in header_rows(workout).into_iter().enumerate() {
        sheet.write_row(cursor + offset, row);
    }
    let mut cursor = cursor + HEADER_ROWS;

    sheet.write_row(cursor, BODY_COLUMNS.map(Cell::text));
    for (i, set) in sets.iter().enumerate() {
        sheet.write_row(cursor + 1 + i, set_cells(set));
    }
    cursor += 1 + sets.len() + 1;
    cursor
}

pub fn workbook_path(output_dir: &Path, program_name: &str) -> PathBuf {
    output_dir.join(format!("{program_name}.xlsx"))
}

/// Render every block of `program` as a sheet of
/// `<output_dir>/<program name>.xlsx`. Sheets already in an existing file
/// are kept as they are.
pub async fn export_program(
    pool: &SqlitePool,
    program: &ProgramRef,
    output_dir: &Path,
) -> Result<ExportReport> {
    let mut conn = pool.acquire().await?;
    let program = resolve_program(&mut conn, program).await?;
    let path = workbook_path(output_dir, &program.display_name());

    let mut sheets = if path.is_file() {
        debug!("Appending to existing workbook {}", path.display());
        read_workbook(&path)?
    } else {
        Vec::new()
    };
    let existing: HashSet<String> = sheets.iter().map(|s| s.name.clone()).collect();

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for block in get_blocks_for_program(&mut *conn, program.id).await? {
        if existing.contains(&block.description) {
            debug!("Sheet '{}' already exported, skipping", block.description);
            skipped.push(block.description);
            continue;
        }
        if let Some(problem) = sheet_name_problem(&block.description) {
            warn!(
                "Block '{}' {} and cannot be exported as a sheet, skipping",
                block.description, problem
            );
            continue;
        }

        let mut sheet = Sheet::new(block.description.as_str());
        let mut cursor = 0;
        for workout in get_workouts_for_block(&mut *conn, block.id).await? {
            let sets = get_set_rows_for_workout(&mut *conn, workout.id).await?;
            for set in &sets {
                debug!("  {set}");
            }
            cursor = write_workout(&mut sheet, cursor, &workout, &sets);
        }
        sheets.push(sheet);
        written.push(block.description);
    }

    if written.is_empty() {
        warn!("Nothing new to export for {program}");
    } else {
        write_workbook(&path, &sheets)?;
        info!(
            "Exported {} sheets of {} to {}",
            written.len(),
            program,
            path.display()
        );
    }

    Ok(ExportReport {
        path,
        written,
        skipped,
    })
}
