use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, GymError>;

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum GymError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("curation error: {0}")]
    Curation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} is ambiguous")]
    Ambiguous(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GymError {
    pub fn not_found<D: std::fmt::Display>(d: D) -> Self {
        GymError::NotFound(d.to_string())
    }

    pub fn parse<D: std::fmt::Display>(d: D) -> Self {
        GymError::Parse(d.to_string())
    }

    pub fn curation<D: std::fmt::Display>(d: D) -> Self {
        GymError::Curation(d.to_string())
    }

    pub fn workbook<D: std::fmt::Display>(d: D) -> Self {
        GymError::Workbook(d.to_string())
    }
}

/// Unique violations become `Conflict`; check and foreign key violations
/// become `Constraint`.
impl From<sqlx::Error> for GymError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return GymError::Conflict(db_err.message().to_string());
            }
            if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                return GymError::Constraint(db_err.message().to_string());
            }
        }
        GymError::Database(e)
    }
}

impl From<calamine::XlsxError> for GymError {
    fn from(e: calamine::XlsxError) -> Self {
        GymError::Workbook(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for GymError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        GymError::Workbook(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        assert_eq!(
            GymError::not_found("program 7").to_string(),
            "program 7 not found"
        );
        assert_eq!(
            GymError::Conflict("program 'macro'".into()).to_string(),
            "program 'macro' already exists"
        );
    }

    #[test]
    fn row_not_found_stays_a_database_error() {
        let err = GymError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, GymError::Database(_)));
    }
}
