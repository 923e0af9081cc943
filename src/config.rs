use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const DB_PATH_ENV: &str = "CLIPKEEP_DB";

const APP_DIR: &str = "clipkeep";
const DB_FILE: &str = "history.sqlite3";

// Retention and sound settings live in the database, see `db::Settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn resolve(db_path: Option<PathBuf>) -> AppResult<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => default_db_path()?,
        };
        Ok(Self { db_path })
    }
}

fn default_db_path() -> AppResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(DB_FILE))
        .ok_or_else(|| {
            AppError::Internal(format!(
                "no data directory for this user; set {DB_PATH_ENV} or pass --db"
            ))
        })
}
