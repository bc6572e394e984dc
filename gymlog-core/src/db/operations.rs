use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::db::models::{
    Block, Exercise, HistoricPr, LogSet, LogWorkout, Muscle, NewHistoricPr, NewLogSet,
    NewLogWorkout, NewProgram, NewWorkout, Program, SetPrescription, SetRow, Workout, WorkoutSet,
};
use crate::errors::{GymError, Result};

/// How callers name a program: by id or by its (expected unique) description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramRef {
    Id(i64),
    Description(String),
}

impl std::fmt::Display for ProgramRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramRef::Id(id) => write!(f, "program {id}"),
            ProgramRef::Description(desc) => write!(f, "program '{desc}'"),
        }
    }
}

/// Exercise lookup key: lowercase, trimmed description.
pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}

fn program_label(new: &NewProgram) -> String {
    let desc = new.description.as_deref().unwrap_or("<unnamed>");
    match new.date_start {
        Some(start) => format!("program '{desc}' starting {start}"),
        None => format!("program '{desc}'"),
    }
}

fn conflict_as(label: String) -> impl FnOnce(sqlx::Error) -> GymError {
    move |e| match GymError::from(e) {
        GymError::Conflict(_) => GymError::Conflict(label),
        other => other,
    }
}

// Programs
pub async fn create_program<'e, E>(executor: E, new: &NewProgram) -> Result<Program>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Program>(
        "INSERT INTO programs (description, date_start, date_end, objective)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING *",
    )
    .bind(new.description.as_deref())
    .bind(new.date_start)
    .bind(new.date_end)
    .bind(new.objective.as_deref())
    .fetch_one(executor)
    .await
    .map_err(conflict_as(program_label(new)))
}

pub async fn get_program<'e, E>(executor: E, program_id: i64) -> Result<Program>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = ?1")
        .bind(program_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| GymError::not_found(format!("program {program_id}")))
}

pub async fn find_programs_by_description<'e, E>(
    executor: E,
    description: &str,
) -> Result<Vec<Program>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE description = ?1 ORDER BY id")
        .bind(description)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

pub async fn get_all_programs<'e, E>(executor: E) -> Result<Vec<Program>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Program>("SELECT * FROM programs ORDER BY date_start, id")
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

pub async fn update_program<'e, E>(
    executor: E,
    program_id: i64,
    update: &NewProgram,
) -> Result<Program>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Program>(
        "UPDATE programs
         SET description = ?1, date_start = ?2, date_end = ?3, objective = ?4
         WHERE id = ?5
         RETURNING *",
    )
    .bind(update.description.as_deref())
    .bind(update.date_start)
    .bind(update.date_end)
    .bind(update.objective.as_deref())
    .bind(program_id)
    .fetch_optional(executor)
    .await
    .map_err(conflict_as(program_label(update)))?
    .ok_or_else(|| GymError::not_found(format!("program {program_id}")))
}

/// Deletes the program and, through the schema's cascades, everything it owns.
pub async fn delete_program<'e, E>(executor: E, program_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM programs WHERE id = ?1")
        .bind(program_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn resolve_program(conn: &mut SqliteConnection, program: &ProgramRef) -> Result<Program> {
    match program {
        ProgramRef::Id(id) => get_program(&mut *conn, *id).await,
        ProgramRef::Description(desc) => {
            let mut matches = find_programs_by_description(&mut *conn, desc).await?;
            match matches.len() {
                0 => Err(GymError::not_found(program)),
                1 => Ok(matches.remove(0)),
                n => Err(GymError::Ambiguous(format!(
                    "{program} ({n} programs share this description)"
                ))),
            }
        }
    }
}

// Blocks
pub async fn find_block<'e, E>(executor: E, program_id: i64, description: &str) -> Result<Option<Block>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Block>("SELECT * FROM blocks WHERE program_id = ?1 AND description = ?2")
        .bind(program_id)
        .bind(description)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
}

pub async fn create_block<'e, E>(executor: E, program_id: i64, description: &str) -> Result<Block>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Block>(
        "INSERT INTO blocks (description, program_id) VALUES (?1, ?2) RETURNING *",
    )
    .bind(description)
    .bind(program_id)
    .fetch_one(executor)
    .await
    .map_err(Into::into)
}

pub async fn get_blocks_for_program<'e, E>(executor: E, program_id: i64) -> Result<Vec<Block>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Block>("SELECT * FROM blocks WHERE program_id = ?1 ORDER BY id")
        .bind(program_id)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

// Workouts
pub async fn create_workout<'e, E>(executor: E, new: &NewWorkout) -> Result<Workout>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Workout>(
        "INSERT INTO workouts (description, block_id, date_workout, week, day)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING *",
    )
    .bind(new.description.as_deref())
    .bind(new.block_id)
    .bind(new.date_workout)
    .bind(new.week)
    .bind(new.day)
    .fetch_one(executor)
    .await
    .map_err(Into::into)
}

pub async fn get_workouts_for_block<'e, E>(executor: E, block_id: i64) -> Result<Vec<Workout>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Workout>("SELECT * FROM workouts WHERE block_id = ?1 ORDER BY id")
        .bind(block_id)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

// Exercises
pub async fn get_all_exercises<'e, E>(executor: E) -> Result<Vec<Exercise>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Exercise>("SELECT * FROM exercises ORDER BY description")
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

pub async fn find_exercise<'e, E>(executor: E, description: &str) -> Result<Option<Exercise>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE description = ?1")
        .bind(normalize_description(description))
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
}

pub async fn create_exercise<'e, E>(executor: E, description: &str) -> Result<Exercise>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Exercise>("INSERT INTO exercises (description) VALUES (?1) RETURNING *")
        .bind(normalize_description(description))
        .fetch_one(executor)
        .await
        .map_err(Into::into)
}

pub async fn get_or_create_exercise(
    conn: &mut SqliteConnection,
    description: &str,
) -> Result<Exercise> {
    if let Some(exercise) = find_exercise(&mut *conn, description).await? {
        return Ok(exercise);
    }
    create_exercise(&mut *conn, description).await
}

// Sets
/// Expand one prescription into `set_count` sets numbered 1..=set_count.
pub async fn add_multiple_sets_to_workout(
    conn: &mut SqliteConnection,
    workout_id: i64,
    exercise_id: i64,
    prescription: &SetPrescription,
    set_count: i64,
) -> Result<Vec<WorkoutSet>> {
    let mut created = Vec::with_capacity(set_count.max(0) as usize);
    for set_index in 1..=set_count {
        let set = sqlx::query_as::<_, WorkoutSet>(
            "INSERT INTO workout_sets
                (workout_id, exercise_id, set_index, reps, weight, perc_rm, min_rpe, max_rpe, rest_min)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING *",
        )
        .bind(workout_id)
        .bind(exercise_id)
        .bind(set_index)
        .bind(prescription.reps)
        .bind(prescription.weight)
        .bind(prescription.perc_rm)
        .bind(prescription.min_rpe)
        .bind(prescription.max_rpe)
        .bind(prescription.rest_min)
        .fetch_one(&mut *conn)
        .await?;
        created.push(set);
    }
    Ok(created)
}

pub async fn get_sets_for_workout<'e, E>(executor: E, workout_id: i64) -> Result<Vec<WorkoutSet>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, WorkoutSet>("SELECT * FROM workout_sets WHERE workout_id = ?1 ORDER BY id")
        .bind(workout_id)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

pub async fn get_set_rows_for_workout<'e, E>(executor: E, workout_id: i64) -> Result<Vec<SetRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SetRow>(
        "SELECT ws.id, e.description AS exercise, ws.set_index, ws.reps, ws.weight,
                ws.perc_rm, ws.min_rpe, ws.max_rpe, ws.rest_min
         FROM workout_sets ws
         JOIN exercises e ON e.id = ws.exercise_id
         WHERE ws.workout_id = ?1
         ORDER BY ws.id",
    )
    .bind(workout_id)
    .fetch_all(executor)
    .await
    .map_err(Into::into)
}

// Logs
pub async fn upsert_log_workout<'e, E>(executor: E, log: &NewLogWorkout) -> Result<LogWorkout>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LogWorkout>(
        "INSERT INTO log_workouts
            (workout_id, date_workout_done, duration_min, intensity, comment, date_reg)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (workout_id) DO UPDATE SET
            date_workout_done = excluded.date_workout_done,
            duration_min = excluded.duration_min,
            intensity = excluded.intensity,
            comment = excluded.comment,
            date_reg = excluded.date_reg
         RETURNING *",
    )
    .bind(log.workout_id)
    .bind(log.date_workout_done)
    .bind(log.duration_min)
    .bind(log.intensity)
    .bind(log.comment.as_deref())
    .bind(log.date_reg)
    .fetch_one(executor)
    .await
    .map_err(Into::into)
}

pub async fn get_log_workout<'e, E>(executor: E, workout_id: i64) -> Result<Option<LogWorkout>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LogWorkout>("SELECT * FROM log_workouts WHERE workout_id = ?1")
        .bind(workout_id)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
}

pub async fn upsert_log_set<'e, E>(executor: E, log: &NewLogSet) -> Result<LogSet>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LogSet>(
        "INSERT INTO log_sets
            (workout_set_id, log_workout_id, reps_done, weight_done, rpe_done, comment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (workout_set_id) DO UPDATE SET
            log_workout_id = excluded.log_workout_id,
            reps_done = excluded.reps_done,
            weight_done = excluded.weight_done,
            rpe_done = excluded.rpe_done,
            comment = excluded.comment
         RETURNING *",
    )
    .bind(log.workout_set_id)
    .bind(log.log_workout_id)
    .bind(log.reps_done)
    .bind(log.weight_done)
    .bind(log.rpe_done)
    .bind(log.comment.as_deref())
    .fetch_one(executor)
    .await
    .map_err(Into::into)
}

pub async fn get_log_sets_for_workout<'e, E>(executor: E, workout_id: i64) -> Result<Vec<LogSet>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LogSet>(
        "SELECT ls.* FROM log_sets ls
         JOIN workout_sets ws ON ws.id = ls.workout_set_id
         WHERE ws.workout_id = ?1
         ORDER BY ls.workout_set_id",
    )
    .bind(workout_id)
    .fetch_all(executor)
    .await
    .map_err(Into::into)
}

// Muscles
pub async fn get_or_create_muscle(conn: &mut SqliteConnection, description: &str) -> Result<Muscle> {
    let description = normalize_description(description);
    if let Some(muscle) =
        sqlx::query_as::<_, Muscle>("SELECT * FROM muscles WHERE description = ?1")
            .bind(&description)
            .fetch_optional(&mut *conn)
            .await?
    {
        return Ok(muscle);
    }

    sqlx::query_as::<_, Muscle>("INSERT INTO muscles (description) VALUES (?1) RETURNING *")
        .bind(&description)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
}

/// Returns false when the pair was already linked.
pub async fn link_exercise_muscle<'e, E>(executor: E, exercise_id: i64, muscle_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO exercise_muscles (exercise_id, muscle_id) VALUES (?1, ?2)",
    )
    .bind(exercise_id)
    .bind(muscle_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_muscles_for_exercise<'e, E>(executor: E, exercise_id: i64) -> Result<Vec<Muscle>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Muscle>(
        "SELECT m.* FROM muscles m
         JOIN exercise_muscles em ON em.muscle_id = m.id
         WHERE em.exercise_id = ?1
         ORDER BY m.description",
    )
    .bind(exercise_id)
    .fetch_all(executor)
    .await
    .map_err(Into::into)
}

// Personal records
pub async fn add_historic_pr<'e, E>(executor: E, pr: &NewHistoricPr) -> Result<HistoricPr>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, HistoricPr>(
        "INSERT INTO historic_prs (exercise_id, date_pr, reps, weight, date_reg)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING *",
    )
    .bind(pr.exercise_id)
    .bind(pr.date_pr)
    .bind(pr.reps)
    .bind(pr.weight)
    .bind(pr.date_reg)
    .fetch_one(executor)
    .await
    .map_err(Into::into)
}

pub async fn get_historic_prs<'e, E>(executor: E, exercise_id: i64) -> Result<Vec<HistoricPr>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, HistoricPr>(
        "SELECT * FROM historic_prs WHERE exercise_id = ?1 ORDER BY date_pr DESC, id DESC",
    )
    .bind(exercise_id)
    .fetch_all(executor)
    .await
    .map_err(Into::into)
}
