use crate::domain::error::DomainError;
use crate::domain::port::RepositoryError;

/// アプリケーション層のエラー型
/// ドメインエラー、リポジトリエラーをラップする
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    DomainError(DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
    /// エンティティが見つからない
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            // ドメイン層を経由した永続化エラーはリポジトリエラーとして扱う
            DomainError::Repository(RepositoryError::NotFound(msg)) => {
                ApplicationError::NotFound(msg)
            }
            DomainError::Repository(e) => ApplicationError::RepositoryError(e),
            other => ApplicationError::DomainError(other),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ApplicationError::NotFound(msg),
            other => ApplicationError::RepositoryError(other),
        }
    }
}

impl From<crate::domain::service::PlanError> for ApplicationError {
    fn from(err: crate::domain::service::PlanError) -> Self {
        ApplicationError::DomainError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_becomes_not_found() {
        let err: ApplicationError = RepositoryError::NotFound("offer".to_string()).into();
        assert!(matches!(err, ApplicationError::NotFound(_)));

        let err: ApplicationError =
            DomainError::Repository(RepositoryError::NotFound("offer".to_string())).into();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[test]
    fn test_wrapped_repository_error_is_unwrapped() {
        let err: ApplicationError =
            DomainError::Repository(RepositoryError::FetchFailed("boom".to_string())).into();
        assert!(matches!(
            err,
            ApplicationError::RepositoryError(RepositoryError::FetchFailed(_))
        ));
    }
}
