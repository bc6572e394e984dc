use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use gymlog::GymError;
use gymlog::db::SqlitePool;
use gymlog::db::models::NewProgram;
use gymlog::db::operations::{
    create_program, delete_program, get_all_exercises, get_all_programs, get_blocks_for_program,
    get_program, update_program,
};
use log::info;

use crate::errors::AppError;

/// Program routes handler
pub struct ProgramsRoutes;

impl ProgramsRoutes {
    pub fn routes(pool: SqlitePool) -> Router {
        Router::new()
            .route(
                "/api/programs",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/programs/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route("/api/programs/:id/blocks", get(Self::handle_blocks))
            .with_state(pool)
    }

    /// Handle GET /api/programs
    async fn handle_list(State(pool): State<SqlitePool>) -> Result<Response, AppError> {
        let programs = get_all_programs(&pool).await?;
        Ok((StatusCode::OK, Json(programs)).into_response())
    }

    /// Handle POST /api/programs
    async fn handle_create(
        State(pool): State<SqlitePool>,
        Json(body): Json<NewProgram>,
    ) -> Result<Response, AppError> {
        let program = create_program(&pool, &body).await?;
        info!("Created {program}");
        Ok((StatusCode::CREATED, Json(program)).into_response())
    }

    async fn handle_get(
        State(pool): State<SqlitePool>,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        let program = get_program(&pool, id).await?;
        Ok((StatusCode::OK, Json(program)).into_response())
    }

    async fn handle_update(
        State(pool): State<SqlitePool>,
        Path(id): Path<i64>,
        Json(body): Json<NewProgram>,
    ) -> Result<Response, AppError> {
        let program = update_program(&pool, id, &body).await?;
        info!("Updated {program}");
        Ok((StatusCode::OK, Json(program)).into_response())
    }

    /// Handle DELETE /api/programs/:id, cascading to everything it owns
    async fn handle_delete(
        State(pool): State<SqlitePool>,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        if delete_program(&pool, id).await? == 0 {
            return Err(GymError::not_found(format!("program {id}")).into());
        }
        info!("Deleted program {id}");
        Ok((StatusCode::NO_CONTENT, ()).into_response())
    }

    async fn handle_blocks(
        State(pool): State<SqlitePool>,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        let program = get_program(&pool, id).await?;
        let blocks = get_blocks_for_program(&pool, program.id).await?;
        Ok((StatusCode::OK, Json(blocks)).into_response())
    }
}

/// Exercise lookup routes handler
pub struct ExercisesRoutes;

impl ExercisesRoutes {
    pub fn routes(pool: SqlitePool) -> Router {
        Router::new()
            .route("/api/exercises", get(Self::handle_list))
            .with_state(pool)
    }

    async fn handle_list(State(pool): State<SqlitePool>) -> Result<Response, AppError> {
        let exercises = get_all_exercises(&pool).await?;
        Ok((StatusCode::OK, Json(exercises)).into_response())
    }
}
