//! 이벤트 — 파서가 만들고 아웃푸터가 소비하는 구조화된 로그 레코드
//!
//! [`Event`]는 필드 이름에서 JSON 값으로의 순서 있는 매핑입니다.
//! 필드 외의 식별자는 없으며 값 타입으로 취급됩니다. 큐에 발행된 뒤에는
//! 수정되지 않습니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 메시지 본문 필드명
pub const FIELD_MESSAGE: &str = "message";
/// 이벤트 유형 필드명 (아웃푸터 skip 필터가 참조)
pub const FIELD_TYPE: &str = "type";
/// 호스트 필드명
pub const FIELD_HOST: &str = "host";

/// 구조화된 로그 이벤트
///
/// 필드 삽입 순서가 보존되므로 직렬화 결과가 결정적입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// 빈 이벤트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `message` 필드 하나만 가진 이벤트를 생성합니다.
    pub fn from_message(message: impl Into<String>) -> Self {
        let mut event = Self::new();
        event.insert(FIELD_MESSAGE, Value::String(message.into()));
        event
    }

    /// 필드를 설정합니다. 기존 값이 있으면 위치를 유지한 채 교체됩니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// 빌더 형태의 필드 설정
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// 문자열 필드를 조회합니다. 문자열이 아니면 `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// `message` 필드
    pub fn message(&self) -> Option<&str> {
        self.get_str(FIELD_MESSAGE)
    }

    /// `type` 필드
    pub fn event_type(&self) -> Option<&str> {
        self.get_str(FIELD_TYPE)
    }

    /// 다른 이벤트의 필드를 덮어씁니다 (뒤에 오는 값이 우선).
    pub fn merge(&mut self, other: Event) {
        for (key, value) in other.fields {
            self.fields.insert(key, value);
        }
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 필드를 삽입 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// 한 줄짜리 JSON으로 인코딩합니다.
    pub fn to_json_line(&self) -> String {
        // Map<String, Value>의 직렬화는 실패하지 않음
        Value::Object(self.fields.clone()).to_string()
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_line())
    }
}
