//! 儲存層錯誤類型

use cost_core::CostError;
use thiserror::Error;

/// 儲存層錯誤
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("記錄未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("資料庫鎖取得失敗: {0}")]
    LockError(String),

    #[error("資料庫查詢失敗: {0}")]
    QueryError(String),

    #[error("唯一約束違反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外鍵約束違反: {0}")]
    ForeignKeyViolation(String),

    #[error("欄位值錯誤 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    StoreError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    StoreError::ForeignKeyViolation(msg)
                } else {
                    StoreError::QueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => StoreError::QueryError(err.to_string()),
        }
    }
}

/// 引擎端只區分「資料來源失敗」
impl From<StoreError> for CostError {
    fn from(err: StoreError) -> Self {
        CostError::DataSource(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
