//! 에러 타입 — 도메인별 에러 정의
//!
//! [`RelayError`]는 최상위 에러이며, 각 도메인 에러는 `?` 연산자로
//! 자연스럽게 변환됩니다.

/// logrelay 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 플러그인 해석/실행 에러
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// 브로커(큐) 에러
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// 태스크 인코딩/디코딩 에러
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 플러그인 에러
///
/// `Transform`을 제외한 모든 변형은 정적 설정 오류(ImproperlyConfigured)이며
/// 재시도해도 결과가 바뀌지 않습니다. [`PluginError::is_configuration`] 참고.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// PluginSpec이 단일 엔트리 매핑이 아님
    #[error("improperly configured: malformed plugin spec: {reason}")]
    MalformedSpec { reason: String },

    /// 플러그인 이름이 명명 규칙을 따르지 않음
    #[error("improperly configured: invalid {kind} plugin name '{name}'")]
    InvalidName { kind: String, name: String },

    /// 검색 경로 어디에도 플러그인이 없음
    #[error("improperly configured: {kind} plugin '{name}' not found (searched: {searched})")]
    NotFound {
        kind: String,
        name: String,
        searched: String,
    },

    /// 식별자는 존재하지만 요청한 종류의 구현이 아님
    #[error("improperly configured: '{id}' is a {found} plugin, expected {expected}")]
    KindMismatch {
        id: String,
        expected: String,
        found: String,
    },

    /// 플러그인 생성자가 옵션을 거부함
    #[error("improperly configured: plugin '{plugin}' option '{option}': {reason}")]
    InvalidOption {
        plugin: String,
        option: String,
        reason: String,
    },

    /// 같은 식별자로 이미 등록된 플러그인이 있음
    #[error("improperly configured: plugin '{id}' is already registered")]
    AlreadyRegistered { id: String },

    /// parse/run 실행 중 실패
    #[error("plugin '{plugin}' failed: {reason}")]
    Transform { plugin: String, reason: String },
}

impl PluginError {
    /// 정적 설정 오류인지 확인합니다.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Transform { .. })
    }

    /// 실행 실패 에러를 생성합니다.
    pub fn transform(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transform {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }
}

/// 브로커 에러
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// 지원하지 않는 broker_url 스킴
    #[error("unsupported broker url '{url}'")]
    UnsupportedScheme { url: String },

    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 발행 실패
    #[error("publish to '{queue}' failed: {reason}")]
    Publish { queue: String, reason: String },

    /// 소비 실패
    #[error("consume from '{queue}' failed: {reason}")]
    Consume { queue: String, reason: String },

    /// 큐가 닫힘
    #[error("queue '{0}' closed")]
    Closed(String),
}

/// 태스크 와이어 포맷 에러
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// 직렬화 실패
    #[error("failed to encode task: {0}")]
    Encode(String),

    /// 역직렬화 실패
    #[error("failed to decode task: {0}")]
    Decode(String),

    /// 알 수 없는 엔벨로프 버전
    #[error("unsupported task version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// 스테이지에 맞지 않는 태스크 종류
    #[error("unexpected task kind '{found}', expected '{expected}'")]
    UnexpectedKind { expected: String, found: String },
}
