//! 스테이지 에러 타입
//!
//! [`StageError`]는 워커가 태스크 하나를 처리하며 만날 수 있는 모든 실패를
//! 감싸며, [`StageError::disposition`]으로 브로커에 돌려줄 처리 방식을 정합니다.

use logrelay_core::error::{BrokerError, ConfigError, PluginError, RelayError, TaskError};

/// 파이프라인 스테이지 에러
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// 플러그인 해석/실행 에러
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// 브로커 에러
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// 태스크 디코딩 에러
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// 설정 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 태스크가 지정한 파서 목록을 해석할 수 없음
    #[error("invalid parser override: {reason}")]
    InvalidOverride { reason: String },

    /// 워커 태스크가 비정상 종료됨
    #[error("worker aborted: {reason}")]
    WorkerAborted { reason: String },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 실패한 태스크의 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 재전달 요청 (한도 초과 시 dead letter)
    Retry,
    /// 재시도해도 결과가 같음 (dead letter)
    DeadLetter,
    /// 워커 풀 전체를 중단
    Fatal,
}

impl StageError {
    /// 에러의 처리 방식을 반환합니다.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Plugin(err) if err.is_configuration() => Disposition::DeadLetter,
            Self::Plugin(_) | Self::Io(_) => Disposition::Retry,
            Self::Task(_) | Self::InvalidOverride { .. } => Disposition::DeadLetter,
            Self::Broker(_) | Self::Config(_) | Self::WorkerAborted { .. } => Disposition::Fatal,
        }
    }

    /// 재시도해도 결과가 바뀌지 않는 에러인지 확인합니다.
    pub fn is_permanent(&self) -> bool {
        self.disposition() != Disposition::Retry
    }
}

impl From<StageError> for RelayError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Plugin(e) => RelayError::Plugin(e),
            StageError::Broker(e) => RelayError::Broker(e),
            StageError::Task(e) => RelayError::Task(e),
            StageError::Config(e) => RelayError::Config(e),
            StageError::Io(e) => RelayError::Io(e),
            StageError::InvalidOverride { reason } => {
                RelayError::Plugin(PluginError::MalformedSpec { reason })
            }
            StageError::WorkerAborted { reason } => {
                RelayError::Io(std::io::Error::other(format!("worker aborted: {reason}")))
            }
        }
    }
}
