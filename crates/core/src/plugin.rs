//! 플러그인 계약 — 선언적 PluginSpec과 Parser/Outputer/Input trait
//!
//! 설정의 `parsers`, `outputs`, `inputs` 목록은 [`PluginSpec`]의 순서 있는
//! 목록입니다. 각 스펙은 `{이름: 옵션}` 형태의 단일 엔트리 매핑이며,
//! 옵션은 해석 없이 그대로 플러그인 생성자에 [`PluginOptions`]로 전달됩니다.
//!
//! # 플러그인 종류
//! - [`Parser`]: 원시 메시지 → 이벤트 또는 없음
//! - [`Outputer`]: 이벤트 → 싱크 부수효과 (내용 기반 skip 판단 포함)
//! - [`Input`]: 외부 소스 → 원시 메시지 목록

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PluginError;
use crate::event::Event;

/// skip 필터 옵션 키
pub const OPTION_SKIP_TYPES: &str = "skip_types";

// ─── PluginKind ──────────────────────────────────────────────────────

/// 플러그인 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// 입력 수집기
    Input,
    /// 파서
    Parser,
    /// 아웃푸터
    Outputer,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Parser => write!(f, "parser"),
            Self::Outputer => write!(f, "outputer"),
        }
    }
}

// ─── PluginSpec ──────────────────────────────────────────────────────

/// 선언적 플러그인 스펙 (`{name: options}`)
///
/// 설정 파일의 임의 값을 그대로 보관하며, 형태 검증은
/// [`PluginSpec::entry`] 호출 시점(플러그인 해석 시점)에 수행합니다.
/// 잘못된 스펙 하나가 설정 파일 전체를 무효화하지 않도록 하기 위함입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginSpec(Value);

impl PluginSpec {
    /// 이름과 옵션으로 스펙을 생성합니다.
    pub fn new(name: impl Into<String>, options: Map<String, Value>) -> Self {
        let mut entry = Map::new();
        entry.insert(name.into(), Value::Object(options));
        Self(Value::Object(entry))
    }

    /// 옵션 없는 스펙을 생성합니다.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// 원시 값에서 스펙을 생성합니다 (검증하지 않음).
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// 원시 값
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// 단일 엔트리 매핑을 검증하고 이름과 옵션을 반환합니다.
    ///
    /// 옵션 값이 `null`이면 빈 옵션으로 취급합니다 (`- plain:` 형태의 YAML).
    pub fn entry(&self) -> Result<(&str, PluginOptions), PluginError> {
        let map = self.0.as_object().ok_or_else(|| PluginError::MalformedSpec {
            reason: format!("expected a mapping, got {}", value_kind(&self.0)),
        })?;

        if map.len() != 1 {
            return Err(PluginError::MalformedSpec {
                reason: format!("expected exactly one entry, got {}", map.len()),
            });
        }

        let Some((name, options)) = map.iter().next() else {
            return Err(PluginError::MalformedSpec {
                reason: "empty mapping".to_owned(),
            });
        };

        let values = match options {
            Value::Object(values) => values.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(PluginError::MalformedSpec {
                    reason: format!(
                        "options for '{name}' must be a mapping, got {}",
                        value_kind(other)
                    ),
                });
            }
        };

        Ok((name.as_str(), PluginOptions::new(name.as_str(), values)))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

// ─── PluginOptions ───────────────────────────────────────────────────

/// 플러그인 생성자에 전달되는 옵션 묶음
///
/// 타입 접근자는 잘못된 타입에 대해 `InvalidOption`을 반환합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginOptions {
    plugin: String,
    values: Map<String, Value>,
}

impl PluginOptions {
    /// 옵션 묶음을 생성합니다.
    pub fn new(plugin: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            plugin: plugin.into(),
            values,
        }
    }

    /// 옵션을 소유한 플러그인 이름
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// 원시 값 조회
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 원시 옵션 맵
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// 선택적 문자열 옵션
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, PluginError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(key, format!("expected string, got {}", value_kind(other)))),
        }
    }

    /// 필수 문자열 옵션
    pub fn require_str(&self, key: &str) -> Result<&str, PluginError> {
        self.get_str(key)?
            .ok_or_else(|| self.invalid(key, "required option is missing".to_owned()))
    }

    /// 선택적 bool 옵션 (없으면 `default`)
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, PluginError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.invalid(key, format!("expected bool, got {}", value_kind(other)))),
        }
    }

    /// 문자열 하나 또는 문자열 목록 옵션
    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>, PluginError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        self.invalid(key, format!("list items must be strings, got {}", value_kind(item)))
                    })
                })
                .collect(),
            Some(other) => Err(self.invalid(
                key,
                format!("expected string or list, got {}", value_kind(other)),
            )),
        }
    }

    fn invalid(&self, option: &str, reason: String) -> PluginError {
        PluginError::InvalidOption {
            plugin: self.plugin.clone(),
            option: option.to_owned(),
            reason,
        }
    }
}

// ─── SkipFilter ──────────────────────────────────────────────────────

/// 이벤트 `type` 필드 기반 출력 억제 필터
///
/// `skip_types` 옵션(문자열 또는 목록)에 포함된 `type`을 가진 이벤트는
/// 해당 아웃푸터에서 조용히 건너뜁니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipFilter {
    types: Vec<String>,
}

impl SkipFilter {
    /// 유형 목록으로 필터를 생성합니다.
    pub fn new(types: Vec<String>) -> Self {
        Self { types }
    }

    /// 플러그인 옵션의 `skip_types`에서 필터를 생성합니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Ok(Self::new(options.get_str_list(OPTION_SKIP_TYPES)?))
    }

    /// 이벤트를 건너뛰어야 하는지 판단합니다.
    pub fn matches(&self, event: &Event) -> bool {
        match event.event_type() {
            Some(kind) => self.types.iter().any(|t| t == kind),
            None => false,
        }
    }

    /// 설정된 유형 목록
    pub fn types(&self) -> &[String] {
        &self.types
    }
}

// ─── Plugin Traits ───────────────────────────────────────────────────

/// 파서 플러그인
///
/// `parse`는 동기 함수이며, 느린 파서는 자신을 실행하는 워커만 지연시킵니다.
pub trait Parser: Send {
    /// 플러그인 이름
    fn name(&self) -> &str;

    /// 원시 메시지를 이벤트로 변환합니다. 매칭되지 않으면 `None`.
    fn parse(&self, raw: &str) -> Result<Option<Event>, PluginError>;

    /// 체인 중간에서 앞선 파서가 만든 이벤트를 다듬습니다.
    ///
    /// 기본 구현: `message` 필드를 다시 파싱해 결과 필드를 덮어씁니다.
    /// `message`가 없으면 이벤트를 그대로 통과시킵니다.
    fn refine(&self, event: Event) -> Result<Option<Event>, PluginError> {
        let parsed = match event.message() {
            Some(message) => self.parse(message)?,
            None => return Ok(Some(event)),
        };
        Ok(parsed.map(|fields| {
            let mut event = event;
            event.merge(fields);
            event
        }))
    }
}

/// 아웃푸터 플러그인
pub trait Outputer: Send {
    /// 플러그인 이름
    fn name(&self) -> &str;

    /// 이벤트 내용에 따라 출력을 건너뛸지 판단합니다.
    fn should_skip(&self, _event: &Event) -> bool {
        false
    }

    /// 이벤트를 싱크에 기록합니다.
    fn run(&mut self, event: &Event) -> Result<(), PluginError>;
}

/// 입력 수집기 플러그인
pub trait Input: Send {
    /// 플러그인 이름
    fn name(&self) -> &str;

    /// 마지막 호출 이후 새로 들어온 원시 메시지를 반환합니다.
    fn poll(&mut self) -> Result<Vec<String>, PluginError>;
}

// ─── Tests ───────────────────────────────────────────────────────────
