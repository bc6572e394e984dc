use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use sqlx::{SqliteConnection, SqlitePool};

use super::{
    COL_COMMENTS, COL_DONE, COL_ID, COL_REPS, COL_RPE, COL_WEIGHT, Cell, HEADER_COMMENT,
    HEADER_DATE, HEADER_DESCRIPTION, HEADER_DURATION, HEADER_RPE, Sheet, read_workbook,
    row_is_blank,
};
use crate::curate::first_number;
use crate::db::models::{NewLogSet, NewLogWorkout, Program, Workout};
use crate::db::operations::{
    find_block, find_programs_by_description, get_program, get_sets_for_workout,
    get_workouts_for_block, upsert_log_set, upsert_log_workout,
};
use crate::errors::{GymError, Result};

/// First column that separates a header row (label, value) from a table row.
const TABLE_ONLY_COLUMN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Registration date written on every log. Workouts still carrying
    /// their planned date are logged as done no later than this day.
    pub date_reg: NaiveDate,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            date_reg: Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub program: Program,
    pub workouts: usize,
    pub sets: usize,
    /// Segments left alone because their overall RPE was empty.
    pub skipped: usize,
}

struct Segment<'a> {
    header: Vec<&'a [Cell]>,
    body: Vec<&'a [Cell]>,
}

impl Segment<'_> {
    fn header_value(&self, label: &str) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.header
            .iter()
            .find(|row| row.first().and_then(Cell::as_text).as_deref() == Some(label))
            .and_then(|row| row.get(1))
            .unwrap_or(&EMPTY)
    }
}

fn is_header_row(cells: &[Cell]) -> bool {
    cells.iter().skip(TABLE_ONLY_COLUMN).all(Cell::is_blank)
}

/// Blank rows separate workouts; inside a workout the leading rows with
/// nothing past column B form the header.
fn split_segments(sheet: &Sheet) -> Vec<Segment<'_>> {
    sheet
        .rows
        .split(|row| row_is_blank(row))
        .filter(|rows| !rows.is_empty())
        .map(|rows| {
            let header_len = rows.iter().take_while(|row| is_header_row(row)).count();
            Segment {
                header: rows[..header_len].iter().map(Vec::as_slice).collect(),
                body: rows[header_len..].iter().map(Vec::as_slice).collect(),
            }
        })
        .collect()
}

async fn resolve_workbook_program(conn: &mut SqliteConnection, stem: &str) -> Result<Program> {
    let mut matches = find_programs_by_description(&mut *conn, stem).await?;
    match matches.len() {
        1 => return Ok(matches.remove(0)),
        0 => {}
        n => {
            return Err(GymError::Ambiguous(format!(
                "program '{stem}' ({n} programs share this description)"
            )));
        }
    }

    if let Some(id) = stem.strip_prefix("Program_").and_then(|id| id.parse::<i64>().ok()) {
        let program = get_program(&mut *conn, id).await?;
        if program.display_name() == stem {
            return Ok(program);
        }
    }
    Err(GymError::not_found(format!("program for workbook '{stem}'")))
}

fn column_index(columns: &HashMap<String, usize>, name: &str, sheet: &str) -> Result<usize> {
    columns
        .get(name)
        .copied()
        .ok_or_else(|| GymError::workbook(format!("sheet '{sheet}': no '{name}' column")))
}

/// Overall RPE as a number; text such as "8/10" keeps its first digit run.
fn overall_rpe(cell: &Cell, sheet: &str, workout_id: i64) -> Option<f64> {
    if let Some(value) = cell.as_f64() {
        return Some(value);
    }
    let raw = cell.as_text()?;
    let value = first_number(&raw).map(|n| n as f64);
    match value {
        Some(value) => debug!("Sheet '{sheet}': overall RPE '{raw}' read as {value}"),
        None => warn!(
            "Sheet '{sheet}': overall RPE '{raw}' of workout #{workout_id} is not a number"
        ),
    }
    value
}

fn cell_at<'a>(row: &'a [Cell], index: usize) -> &'a Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(index).unwrap_or(&EMPTY)
}

/// The date a workout was done. A blank date, or the planned date the
/// export pre-fills, is taken as done on the planned day but never later
/// than the registration date. Dates typed by hand are kept as they are.
fn done_date(
    entered: Option<NaiveDate>,
    workout: &Workout,
    date_reg: NaiveDate,
) -> Option<NaiveDate> {
    let planned = workout.date_workout;
    match entered {
        Some(date) if Some(date) != planned => Some(date),
        _ => planned.map(|date| {
            if date > date_reg {
                debug!(
                    "Workout #{} planned for {date}, logged on {date_reg}",
                    workout.id
                );
            }
            date.min(date_reg)
        }),
    }
}

/// Upsert one set log per annotated body row. Returns the number of rows
/// imported.
async fn import_sets(
    conn: &mut SqliteConnection,
    sheet: &str,
    workout: &Workout,
    log_workout_id: i64,
    body: &[&[Cell]],
) -> Result<usize> {
    let Some((names, rows)) = body.split_first() else {
        return Ok(0);
    };
    let columns: HashMap<String, usize> = names
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| cell.as_text().map(|name| (name, i)))
        .collect();
    let id_col = column_index(&columns, COL_ID, sheet)?;
    let done_col = column_index(&columns, COL_DONE, sheet)?;
    let rpe_col = column_index(&columns, COL_RPE, sheet)?;
    let reps_col = column_index(&columns, COL_REPS, sheet)?;
    let weight_col = column_index(&columns, COL_WEIGHT, sheet)?;
    let comment_col = columns.get(COL_COMMENTS).copied();

    let set_ids: HashSet<i64> = get_sets_for_workout(&mut *conn, workout.id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let mut imported = 0;
    for row in rows {
        let rpe = cell_at(row, rpe_col);
        if cell_at(row, done_col).is_blank() && rpe.is_blank() {
            continue;
        }

        let id_cell = cell_at(row, id_col);
        let set_id = id_cell.as_i64().ok_or_else(|| {
            GymError::workbook(format!("sheet '{sheet}': '{id_cell:?}' is not a set id"))
        })?;
        if !set_ids.contains(&set_id) {
            return Err(GymError::not_found(format!(
                "workout set {set_id} in workout #{}",
                workout.id
            )));
        }

        upsert_log_set(
            &mut *conn,
            &NewLogSet {
                workout_set_id: set_id,
                log_workout_id,
                reps_done: cell_at(row, reps_col).as_i64(),
                weight_done: cell_at(row, weight_col).as_f64(),
                rpe_done: rpe.as_i64(),
                comment: comment_col.and_then(|c| cell_at(row, c).as_text()),
            },
        )
        .await?;
        imported += 1;
    }
    Ok(imported)
}

/// Import the logs recorded in an exported workbook. The program is found
/// from the file name, each sheet's block from the sheet name.
pub async fn import_workbook(
    pool: &SqlitePool,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| GymError::workbook(format!("{} has no usable file name", path.display())))?;
    let sheets = read_workbook(path)?;

    let mut tx = pool.begin().await?;
    let program = resolve_workbook_program(&mut tx, stem).await?;

    let mut report = ImportReport {
        program: program.clone(),
        workouts: 0,
        sets: 0,
        skipped: 0,
    };

    for sheet in &sheets {
        let block = find_block(&mut *tx, program.id, &sheet.name)
            .await?
            .ok_or_else(|| GymError::not_found(format!("block '{}' of {program}", sheet.name)))?;
        let workouts = get_workouts_for_block(&mut *tx, block.id).await?;

        let mut seen: HashMap<Option<String>, usize> = HashMap::new();
        for segment in split_segments(sheet) {
            let description = segment.header_value(HEADER_DESCRIPTION).as_text();
            let occurrence = seen.entry(description.clone()).or_default();
            let nth = *occurrence;
            *occurrence += 1;

            let intensity = segment.header_value(HEADER_RPE);
            if intensity.is_blank() {
                debug!(
                    "Sheet '{}': {:?} #{} has no overall RPE, skipping",
                    sheet.name, description, nth
                );
                report.skipped += 1;
                continue;
            }

            let workout = workouts
                .iter()
                .filter(|w| w.description == description)
                .nth(nth)
                .ok_or_else(|| {
                    GymError::not_found(format!(
                        "workout {:?} #{} in block '{}'",
                        description,
                        nth + 1,
                        block.description
                    ))
                })?;

            let date_done = done_date(
                segment.header_value(HEADER_DATE).as_date()?,
                workout,
                options.date_reg,
            );
            let log = upsert_log_workout(
                &mut *tx,
                &NewLogWorkout {
                    workout_id: workout.id,
                    date_workout_done: date_done,
                    duration_min: segment.header_value(HEADER_DURATION).as_f64(),
                    intensity: overall_rpe(intensity, &sheet.name, workout.id),
                    comment: segment.header_value(HEADER_COMMENT).as_text(),
                    date_reg: options.date_reg,
                },
            )
            .await?;

            let sets = import_sets(&mut tx, &sheet.name, workout, log.id, &segment.body).await?;
            debug!("Workout #{}: {} set logs", workout.id, sets);
            report.workouts += 1;
            report.sets += sets;
        }
    }

    tx.commit().await?;
    info!(
        "Imported {} workouts and {} sets into {} from {}",
        report.workouts,
        report.sets,
        program,
        path.display()
    );
    Ok(report)
}
