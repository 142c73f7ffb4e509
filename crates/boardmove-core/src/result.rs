use crate::error::MigrationError;

pub type MigrationResult<T> = Result<T, MigrationError>;
