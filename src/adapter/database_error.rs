use crate::domain::port::RepositoryError;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// 一意キー違反
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// 保存済みデータの復元に失敗
    #[error("Corrupted row: {0}")]
    CorruptedRow(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DatabaseError {
    /// sqlxのエラーを分類する
    /// 一意キー違反は重複注文の検出に使うため区別する
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::DuplicateKey(format!("{}: {}", context, db))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(format!("{}: {}", context, err))
            }
            _ => DatabaseError::QueryError(format!("{}: {}", context, err)),
        }
    }
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::DuplicateKey(msg) => RepositoryError::UniqueViolation(msg),
            DatabaseError::CorruptedRow(msg) => RepositoryError::FetchFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_maps_to_unique_violation() {
        let err: RepositoryError = DatabaseError::DuplicateKey("orders".to_string()).into();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[test]
    fn test_pool_timeout_is_connection_error() {
        let err = DatabaseError::from_sqlx("注文の取得に失敗しました", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DatabaseError::ConnectionError(_)));
        let err: RepositoryError = err.into();
        assert!(matches!(err, RepositoryError::ConnectionFailed(_)));
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err = DatabaseError::from_sqlx("select", sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::QueryError(_)));
    }
}
