pub mod errors;
pub mod routes;

use axum::Router;
use gymlog::db::SqlitePool;

use crate::routes::{ExercisesRoutes, ProgramsRoutes};

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .merge(ProgramsRoutes::routes(pool.clone()))
        .merge(ExercisesRoutes::routes(pool))
}
