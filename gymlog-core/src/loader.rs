use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use sqlx::{SqliteConnection, SqlitePool};

use crate::curate::{CuratedTable, curate_session};
use crate::db::models::{Block, NewProgram, NewWorkout, Program};
use crate::db::operations::{
    add_multiple_sets_to_workout, create_block, create_exercise, create_program, create_workout,
    find_block, find_programs_by_description, get_all_exercises,
};
use crate::errors::{GymError, Result};
use crate::parser::{ParsedBlock, PlannerMarkup};
use crate::workbook::check_sheet_name;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub program: Program,
    pub block: Block,
    /// False when the block already existed and nothing was written.
    pub block_created: bool,
    pub workouts: usize,
    pub sets: usize,
    pub new_exercises: usize,
}

/// Expand directories into their `*.html` files, sorted by name; plain
/// files are kept as given.
pub fn planner_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = fs::read_dir(path)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::result::Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "html"))
                .collect::<Vec<_>>();
            found.sort();
            if found.is_empty() {
                warn!("No .html files in {}", path.display());
            }
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

async fn resolve_or_create_program(
    conn: &mut SqliteConnection,
    description: Option<&str>,
) -> Result<Program> {
    let Some(description) = description else {
        let program = create_program(&mut *conn, &NewProgram::default()).await?;
        info!("Created generic program #{}", program.id);
        return Ok(program);
    };

    let mut matches = find_programs_by_description(&mut *conn, description).await?;
    match matches.len() {
        0 => {
            let program = create_program(
                &mut *conn,
                &NewProgram {
                    description: Some(description.to_string()),
                    ..Default::default()
                },
            )
            .await?;
            info!("Created program {program}");
            Ok(program)
        }
        1 => Ok(matches.remove(0)),
        n => Err(GymError::Ambiguous(format!(
            "program '{description}' ({n} programs share this description)"
        ))),
    }
}

/// Insert the exercises of `tables` missing from the lookup. Returns the
/// full name to id map and the number of inserted rows.
async fn sync_exercises(
    conn: &mut SqliteConnection,
    tables: &[CuratedTable],
) -> Result<(HashMap<String, i64>, usize)> {
    let mut ids: HashMap<String, i64> = get_all_exercises(&mut *conn)
        .await?
        .into_iter()
        .map(|e| (e.description, e.id))
        .collect();

    let wanted: BTreeSet<&str> = tables
        .iter()
        .flat_map(|t| t.rows.iter().map(|r| r.exercise.as_str()))
        .collect();

    let mut inserted = 0;
    for name in wanted {
        if ids.contains_key(name) {
            continue;
        }
        let exercise = create_exercise(&mut *conn, name).await?;
        debug!("New exercise '{}' (#{})", exercise.description, exercise.id);
        ids.insert(exercise.description, exercise.id);
        inserted += 1;
    }
    Ok((ids, inserted))
}

/// Load one parsed microcycle into `program` (created when absent; a new
/// generic program when `None`). An existing block is left untouched.
/// Everything happens in a single transaction.
pub async fn load_block(
    pool: &SqlitePool,
    parsed: &ParsedBlock,
    program: Option<&str>,
    markup: &PlannerMarkup,
) -> Result<LoadReport> {
    check_sheet_name(&parsed.name)?;
    let mut tx = pool.begin().await?;

    let program = resolve_or_create_program(&mut tx, program).await?;

    if let Some(block) = find_block(&mut *tx, program.id, &parsed.name).await? {
        info!(
            "Block '{}' already loaded in {}, skipping",
            block.description, program
        );
        tx.commit().await?;
        return Ok(LoadReport {
            program,
            block,
            block_created: false,
            workouts: 0,
            sets: 0,
            new_exercises: 0,
        });
    }

    let tables = parsed
        .sessions
        .iter()
        .map(|session| {
            let table = curate_session(&session.exercises, markup)?;
            if !session.exercises.is_empty() && !table.is_canonical() {
                return Err(GymError::curation(format!(
                    "session '{}' on {} has non-canonical columns {:?}",
                    session.description, session.date, table.columns
                )));
            }
            Ok(table)
        })
        .collect::<Result<Vec<_>>>()?;

    let block = create_block(&mut *tx, program.id, &parsed.name).await?;
    let (exercise_ids, new_exercises) = sync_exercises(&mut tx, &tables).await?;

    let mut sets = 0;
    for (session, table) in parsed.sessions.iter().zip(&tables) {
        let workout = create_workout(
            &mut *tx,
            &NewWorkout {
                description: Some(session.description.clone()),
                block_id: block.id,
                date_workout: Some(session.date),
                ..Default::default()
            },
        )
        .await?;

        for row in &table.rows {
            let exercise_id = exercise_ids
                .get(&row.exercise)
                .copied()
                .ok_or_else(|| GymError::not_found(format!("exercise '{}'", row.exercise)))?;
            let created = add_multiple_sets_to_workout(
                &mut tx,
                workout.id,
                exercise_id,
                &row.prescription(),
                row.series,
            )
            .await?;
            sets += created.len();
        }
        debug!(
            "Workout #{} '{}' with {} exercises",
            workout.id,
            session.description,
            table.rows.len()
        );
    }

    tx.commit().await?;
    info!(
        "Loaded block '{}' into {}: {} workouts, {} sets",
        block.description,
        program,
        parsed.sessions.len(),
        sets
    );

    Ok(LoadReport {
        program,
        block,
        block_created: true,
        workouts: parsed.sessions.len(),
        sets,
        new_exercises,
    })
}

/// Parse and load every planner file under `paths` into `program`.
pub async fn load_paths(
    pool: &SqlitePool,
    paths: &[PathBuf],
    program: Option<&str>,
    markup: &PlannerMarkup,
) -> Result<Vec<LoadReport>> {
    let mut reports = Vec::new();
    for file in planner_files(paths)? {
        let parsed = crate::parser::parse_file(&file, markup)?;
        reports.push(load_block(pool, &parsed, program, markup).await?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::db::operations::{get_all_programs, get_sets_for_workout, get_workouts_for_block};
    use crate::db::operations::ProgramRef;
    use crate::test_support::{SAMPLE_PLANNER, sample_block};
    use crate::workbook::export_program;

    #[tokio::test]
    async fn series_expand_into_indexed_sets() {
        let pool = connect_in_memory().await.unwrap();
        let report = load_block(
            &pool,
            &sample_block("week 1"),
            Some("macro pisano"),
            &PlannerMarkup::default(),
        )
        .await
        .unwrap();

        assert!(report.block_created);
        assert_eq!(report.workouts, 2);
        assert_eq!(report.sets, 6);
        assert_eq!(report.new_exercises, 3);

        let workouts = get_workouts_for_block(&pool, report.block.id).await.unwrap();
        assert_eq!(workouts[0].description.as_deref(), Some("lower body"));

        let sets = get_sets_for_workout(&pool, workouts[0].id).await.unwrap();
        let squat: Vec<_> = sets.iter().filter(|s| s.reps == Some(5)).collect();
        assert_eq!(
            squat.iter().map(|s| s.set_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(squat.iter().all(|s| {
            s.weight == Some(100.0)
                && s.perc_rm == Some(75.0)
                && s.max_rpe == Some(8)
                && s.min_rpe.is_none()
                && s.rest_min == Some(3.0)
        }));
    }

    #[tokio::test]
    async fn reloading_into_the_same_program_is_a_no_op() {
        let pool = connect_in_memory().await.unwrap();
        let markup = PlannerMarkup::default();
        let block = sample_block("week 1");

        let first = load_block(&pool, &block, Some("macro pisano"), &markup).await.unwrap();
        let second = load_block(&pool, &block, Some("macro pisano"), &markup).await.unwrap();

        assert!(!second.block_created);
        assert_eq!(first.block, second.block);
        let blocks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(blocks, 1);
        let sets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sets")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sets, 6);
    }

    #[tokio::test]
    async fn loading_without_a_program_creates_one_each_time() {
        let pool = connect_in_memory().await.unwrap();
        let markup = PlannerMarkup::default();
        let block = sample_block("week 1");

        let first = load_block(&pool, &block, None, &markup).await.unwrap();
        let second = load_block(&pool, &block, None, &markup).await.unwrap();

        assert_ne!(first.program.id, second.program.id);
        assert!(second.block_created);
        assert_eq!(get_all_programs(&pool).await.unwrap().len(), 2);
        // exercises are shared between the two loads
        assert_eq!(second.new_exercises, 0);
    }

    #[tokio::test]
    async fn failed_load_rolls_back() {
        let pool = connect_in_memory().await.unwrap();
        let broken = SAMPLE_PLANNER.replace("RPE 7", "hard");
        let parsed =
            crate::parser::parse_document(&broken, "week 1", &PlannerMarkup::default()).unwrap();

        let err = load_block(&pool, &parsed, Some("macro pisano"), &PlannerMarkup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GymError::Curation(_)));
        assert!(get_all_programs(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn directories_expand_to_sorted_html_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("week 2.html"), SAMPLE_PLANNER).unwrap();
        fs::write(dir.path().join("week 1.html"), SAMPLE_PLANNER).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = planner_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["week 1.html", "week 2.html"]);

        let pool = connect_in_memory().await.unwrap();
        let reports = load_paths(
            &pool,
            &[dir.path().to_path_buf()],
            Some("macro pisano"),
            &PlannerMarkup::default(),
        )
        .await
        .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].program, reports[1].program);
        assert_eq!(reports[1].block.description, "week 2");
    }

    #[tokio::test]
    async fn blocks_that_cannot_become_sheets_are_not_loaded() {
        let pool = connect_in_memory().await.unwrap();
        let markup = PlannerMarkup::default();
        load_block(&pool, &sample_block("week 1"), Some("macro"), &markup)
            .await
            .unwrap();

        for name in ["mesocycle 1 - microcycle 3 - strength", "week 1 [deload]"] {
            let err = load_block(&pool, &sample_block(name), Some("macro"), &markup)
                .await
                .unwrap_err();
            assert!(matches!(err, GymError::Parse(ref msg) if msg.contains(name)));
        }

        let blocks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(blocks, 1);

        let dir = tempfile::tempdir().unwrap();
        let export = export_program(&pool, &ProgramRef::Description("macro".into()), dir.path())
            .await
            .unwrap();
        assert_eq!(export.written, vec!["week 1".to_string()]);
    }
}
