//! # Import Errors
//!
//! 実行全体を中断する致命的エラーの分類
//!
//! レコード単位の問題（無効な入力、重複、サービス側の拒否、リトライ上限）は
//! エラーではなく統計と処理結果ログに記録される

use thiserror::Error;

use super::entities::outcome::IdentityKind;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_FATAL_AUTH: u8 = 2;
pub const EXIT_IO: u8 = 3;
pub const EXIT_DEADLINE: u8 = 4;
pub const EXIT_INTERRUPTED: u8 = 130;

/// 致命的エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("contact service session is not authenticated")]
    NotAuthenticated,

    #[error("session is authenticated as a {0} account; only user accounts may add contacts")]
    WrongIdentity(IdentityKind),

    #[error("authorization rejected by contact service: {0}")]
    FatalAuth(String),

    #[error("cannot read input: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot write output: {0}")]
    Output(String),

    #[error("session store failure: {0}")]
    Persistence(String),

    #[error("run deadline reached while waiting for rate limiter")]
    RateLimitTimeout,

    #[error("import interrupted")]
    Interrupted,

    #[error("submission worker failed: {0}")]
    Worker(String),
}

impl ImportError {
    /// プロセス終了コード
    pub fn exit_code(&self) -> u8 {
        match self {
            ImportError::NotAuthenticated
            | ImportError::WrongIdentity(_)
            | ImportError::FatalAuth(_) => EXIT_FATAL_AUTH,
            ImportError::Input(_)
            | ImportError::Config(_)
            | ImportError::Output(_)
            | ImportError::Persistence(_) => EXIT_IO,
            ImportError::RateLimitTimeout => EXIT_DEADLINE,
            ImportError::Interrupted => EXIT_INTERRUPTED,
            ImportError::Worker(_) => EXIT_FAILURE,
        }
    }

    /// 永続化済みの状態から再開できるかどうか
    ///
    /// 状態の書き込みに失敗した場合は、最後に保存できたバッチまでしか再開できない
    pub fn is_resumable(&self) -> bool {
        !matches!(self, ImportError::Persistence(_))
    }
}

/// Convert error chain to string including all causes
pub fn error_chain_to_string(e: &anyhow::Error) -> String {
    e.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}
