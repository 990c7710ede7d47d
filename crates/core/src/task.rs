//! 태스크 와이어 포맷 — 큐에 올라가는 작업 단위
//!
//! 모든 태스크는 버전이 붙은 JSON 엔벨로프로 전송됩니다.
//!
//! ```text
//! {"version":1,"task":{"kind":"parse","message":"..."}}
//! {"version":1,"task":{"kind":"output","event":{"message":"..."}}}
//! ```
//!
//! 알 수 없는 버전은 [`TaskError::UnsupportedVersion`]으로 거부되며,
//! 재시도 대상이 아닙니다.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::event::Event;
use crate::plugin::PluginSpec;

/// 현재 엔벨로프 버전
pub const TASK_VERSION: u32 = 1;

/// 파서 스테이지 태스크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTask {
    /// 원시 메시지
    pub message: String,
    /// 워커 기본 파서 목록 대신 사용할 목록 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsers: Option<Vec<PluginSpec>>,
}

impl ParseTask {
    /// 워커 기본 파서 체인을 사용하는 태스크
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parsers: None,
        }
    }

    /// 파서 목록을 지정한 태스크
    pub fn with_parsers(message: impl Into<String>, parsers: Vec<PluginSpec>) -> Self {
        Self {
            message: message.into(),
            parsers: Some(parsers),
        }
    }
}

/// 출력 스테이지 태스크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTask {
    /// 파서 체인이 만든 이벤트
    pub event: Event,
}

/// 큐에 올라가는 태스크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Task {
    /// 파서 스테이지
    Parse(ParseTask),
    /// 출력 스테이지
    Output(OutputTask),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    task: &'a Task,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    task: Value,
}

impl Task {
    /// 태스크 종류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Output(_) => "output",
        }
    }

    /// 엔벨로프로 감싸 직렬화합니다.
    pub fn encode(&self) -> Result<Bytes, TaskError> {
        let envelope = EnvelopeRef {
            version: TASK_VERSION,
            task: self,
        };
        serde_json::to_vec(&envelope)
            .map(Bytes::from)
            .map_err(|e| TaskError::Encode(e.to_string()))
    }

    /// 엔벨로프를 검증하고 역직렬화합니다.
    pub fn decode(payload: &[u8]) -> Result<Self, TaskError> {
        let raw: RawEnvelope =
            serde_json::from_slice(payload).map_err(|e| TaskError::Decode(e.to_string()))?;
        if raw.version != TASK_VERSION {
            return Err(TaskError::UnsupportedVersion {
                found: raw.version,
                supported: TASK_VERSION,
            });
        }
        serde_json::from_value(raw.task).map_err(|e| TaskError::Decode(e.to_string()))
    }

    /// 파서 태스크로 변환합니다.
    pub fn into_parse(self) -> Result<ParseTask, TaskError> {
        match self {
            Self::Parse(task) => Ok(task),
            other => Err(TaskError::UnexpectedKind {
                expected: "parse".to_owned(),
                found: other.kind().to_owned(),
            }),
        }
    }

    /// 출력 태스크로 변환합니다.
    pub fn into_output(self) -> Result<OutputTask, TaskError> {
        match self {
            Self::Output(task) => Ok(task),
            other => Err(TaskError::UnexpectedKind {
                expected: "output".to_owned(),
                found: other.kind().to_owned(),
            }),
        }
    }
}

impl From<ParseTask> for Task {
    fn from(task: ParseTask) -> Self {
        Self::Parse(task)
    }
}

impl From<Event> for Task {
    fn from(event: Event) -> Self {
        Self::Output(OutputTask { event })
    }
}
