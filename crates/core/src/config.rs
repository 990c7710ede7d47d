//! 설정 관리 — 기본값 테이블 + 오버라이드 파일의 얕은 병합
//!
//! [`Config`]는 프로세스 시작 시 한 번 만들어지는 불변 설정입니다.
//!
//! # 병합 규칙
//! 오버라이드에 존재하는 키는 기본값을 **통째로** 교체합니다.
//! 중첩 구조(`broker_options`, 플러그인 목록 등)도 재귀 병합하지 않습니다.
//! 오버라이드에 없는 키는 기본값을 유지합니다.
//!
//! # 로딩
//! - [`Config::resolve`]: 파일이 없거나, 읽을 수 없거나, 파싱에 실패하면
//!   에러를 로그로 남기고 기본값으로 진행합니다 (치명적이지 않음).
//!   파싱된 파일의 잘못된 값은 그 키만 기본값으로 되돌립니다.
//! - [`Config::load`]: 같은 실패를 [`ConfigError`]로 반환합니다.
//! - [`ConfigCell`]: 첫 접근 시점에 한 번만 해석하고 결과를 캐시합니다.
//!
//! # 사용 예시
//! ```no_run
//! use logrelay_core::config::{Config, ConfigCell};
//!
//! // 명시적 경로
//! let config = Config::resolve(Some("/etc/logrelay/logrelay.yml".as_ref()));
//!
//! // LOGRELAY_CONFIG_FILE 환경변수를 첫 접근 시 참조
//! let cell = ConfigCell::from_env();
//! let queue = cell.get().parser_queue.clone();
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::ConfigError;
use crate::plugin::{PluginKind, PluginSpec};

/// 설정 파일 경로를 지정하는 환경변수
pub const CONFIG_FILE_ENV: &str = "LOGRELAY_CONFIG_FILE";

/// logrelay 통합 설정
///
/// 모든 필드는 `#[serde(default)]`이므로 오버라이드 문서에 없는 키는
/// [`Config::default`]의 값을 유지합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 브로커 연결 문자열 (`spool://<dir>`, `memory://`)
    pub broker_url: String,
    /// 브로커별 고급 옵션 (얕은 병합: 통째로 교체됨)
    pub broker_options: Map<String, Value>,
    /// 파서 스테이지 큐 이름
    pub parser_queue: String,
    /// 출력 스테이지 큐 이름
    pub output_queue: String,
    /// 파서 워커 이름 접두어
    pub parser_worker_name: String,
    /// 출력 워커 이름 접두어
    pub output_worker_name: String,
    /// 파서 워커 수
    pub parser_workers: usize,
    /// 출력 워커 수
    pub output_workers: usize,
    /// 입력 수집기 스펙 목록
    pub inputs: Vec<PluginSpec>,
    /// 파서 스펙 목록 (순서대로 체인 구성)
    pub parsers: Vec<PluginSpec>,
    /// 아웃푸터 스펙 목록 (순서대로 fan-out)
    pub outputs: Vec<PluginSpec>,
    /// 작업 디렉토리 (선택)
    pub home: Option<PathBuf>,
    /// 입력 플러그인 검색 루트
    pub input_packages: Vec<String>,
    /// 파서 플러그인 검색 루트
    pub parser_packages: Vec<String>,
    /// 아웃푸터 플러그인 검색 루트
    pub output_packages: Vec<String>,
    /// 변환 실패 태스크의 최대 재전달 횟수
    pub max_redeliveries: u32,
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// Prometheus 엔드포인트 주소 (없으면 비활성)
    pub metrics_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_url: "spool:///tmp/logrelay/spool".to_owned(),
            broker_options: Map::new(),
            parser_queue: "parsers".to_owned(),
            output_queue: "outputs".to_owned(),
            parser_worker_name: "parser-workers".to_owned(),
            output_worker_name: "output-workers".to_owned(),
            parser_workers: 5,
            output_workers: 1,
            inputs: Vec::new(),
            parsers: Vec::new(),
            outputs: Vec::new(),
            home: None,
            input_packages: vec!["logrelay.inputs".to_owned()],
            parser_packages: vec!["logrelay.parsers".to_owned()],
            output_packages: vec!["logrelay.outputs".to_owned()],
            max_redeliveries: 3,
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            metrics_addr: None,
        }
    }
}

/// 오버라이드 문서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML (기본)
    Yaml,
    /// TOML (`.toml` 확장자)
    Toml,
}

impl ConfigFormat {
    /// 파일 확장자로 형식을 결정합니다.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl Config {
    /// 오버라이드 파일을 병합해 설정을 해석합니다. 실패는 치명적이지 않습니다.
    ///
    /// 경로가 `None`이거나 파일을 읽거나 파싱할 수 없으면 에러를 로그로 남기고
    /// 기본값만으로 구성합니다. 파싱에 성공한 파일의 잘못된 값은
    /// [`Config::repair`]로 해당 키만 기본값으로 되돌립니다.
    pub fn resolve(override_path: Option<&Path>) -> Self {
        let Some(path) = override_path else {
            return Self::default();
        };

        match Self::read(path) {
            Ok(mut config) => {
                for problem in config.repair() {
                    warn!(path = %path.display(), error = %problem, "invalid config value, using default");
                }
                config
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// 오버라이드 파일을 병합해 설정을 로드합니다. 실패 시 에러를 반환합니다.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일을 읽고 병합만 합니다. 값 검증은 하지 않습니다.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ParseFailed {
                    reason: format!("{}: {e}", path.display()),
                }
            }
        })?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    /// 검증에 실패한 키만 기본값으로 되돌리고 발견한 문제를 반환합니다.
    ///
    /// 나머지 오버라이드는 그대로 유지됩니다.
    pub fn repair(&mut self) -> Vec<ConfigError> {
        let defaults = Self::default();
        let mut problems = Vec::new();

        while let Err(e) = self.validate() {
            let field = match &e {
                ConfigError::InvalidValue { field, .. } => Some(field.clone()),
                _ => None,
            };
            match field.as_deref() {
                Some("log_level") => self.log_level = defaults.log_level.clone(),
                Some("log_format") => self.log_format = defaults.log_format.clone(),
                Some("broker_url") => self.broker_url = defaults.broker_url.clone(),
                Some("parser_queue") => self.parser_queue = defaults.parser_queue.clone(),
                Some("output_queue") if self.output_queue != defaults.output_queue => {
                    self.output_queue = defaults.output_queue.clone();
                }
                // output_queue가 이미 기본값이면 충돌 상대인 parser_queue를 되돌림
                Some("output_queue") => self.parser_queue = defaults.parser_queue.clone(),
                _ => {
                    problems.push(e);
                    break;
                }
            }
            problems.push(e);
        }

        problems
    }

    /// 오버라이드 문서를 기본값 위에 병합합니다.
    ///
    /// 빈 문서나 `null` 문서는 오버라이드가 없는 것으로 취급합니다.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                reason: e.to_string(),
            })?,
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                reason: e.to_string(),
            })?,
        };

        match document {
            Value::Null => Ok(Self::default()),
            Value::Object(overrides) => Self::merged(&Self::default(), overrides),
            other => Err(ConfigError::ParseFailed {
                reason: format!("top-level document must be a mapping, got {other}"),
            }),
        }
    }

    /// `defaults` 위에 `overrides`를 키 단위로 얕게 병합합니다.
    pub fn merged(defaults: &Self, overrides: Map<String, Value>) -> Result<Self, ConfigError> {
        let mut base = match serde_json::to_value(defaults) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(ConfigError::ParseFailed {
                    reason: "defaults are not representable as a mapping".to_owned(),
                });
            }
        };

        for (key, value) in overrides {
            if !base.contains_key(&key) {
                warn!(key = key.as_str(), "ignoring unknown config key");
                continue;
            }
            base.insert(key, value);
        }

        serde_json::from_value(Value::Object(base)).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        for (field, value) in [
            ("parser_queue", &self.parser_queue),
            ("output_queue", &self.output_queue),
            ("broker_url", &self.broker_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must not be empty".to_owned(),
                });
            }
        }

        if self.parser_queue == self.output_queue {
            return Err(ConfigError::InvalidValue {
                field: "output_queue".to_owned(),
                reason: "must differ from parser_queue".to_owned(),
            });
        }

        Ok(())
    }

    /// `home`이 설정되어 있으면 작업 디렉터리를 그곳으로 바꿉니다.
    ///
    /// 상대 경로(플러그인 옵션, `spool://` 디렉터리)는 이후 `home` 기준으로
    /// 해석됩니다. 브로커 연결 전에 호출해야 모든 프로세스가 같은 경로를 봅니다.
    pub fn enter_home(&self) -> Result<Option<&Path>, ConfigError> {
        let Some(home) = self.home.as_deref() else {
            return Ok(None);
        };
        std::env::set_current_dir(home).map_err(|e| ConfigError::InvalidValue {
            field: "home".to_owned(),
            reason: format!("cannot enter {}: {e}", home.display()),
        })?;
        Ok(Some(home))
    }

    /// 플러그인 종류별 검색 루트
    pub fn packages(&self, kind: PluginKind) -> &[String] {
        match kind {
            PluginKind::Input => &self.input_packages,
            PluginKind::Parser => &self.parser_packages,
            PluginKind::Outputer => &self.output_packages,
        }
    }

    /// 플러그인 종류별 스펙 목록
    pub fn plugins(&self, kind: PluginKind) -> &[PluginSpec] {
        match kind {
            PluginKind::Input => &self.inputs,
            PluginKind::Parser => &self.parsers,
            PluginKind::Outputer => &self.outputs,
        }
    }
}

// ─── ConfigCell ──────────────────────────────────────────────────────

/// 설정 파일 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// 첫 접근 시 [`CONFIG_FILE_ENV`] 환경변수를 참조
    Env,
    /// 명시적 경로 (CLI `--config`)
    Path(PathBuf),
    /// 기본값만 사용
    Defaults,
}

/// 지연 해석되는 설정 셀
///
/// 첫 [`ConfigCell::get`] 호출에서 설정을 해석하고 `Arc<Config>`로
/// 캐시합니다. 이후 호출은 같은 값을 공유하므로 여러 워커가 동기화 없이
/// 동시에 읽을 수 있습니다. [`ConfigCell::reset`]은 테스트 격리용입니다.
#[derive(Debug)]
pub struct ConfigCell {
    source: ConfigSource,
    resolved: OnceLock<Arc<Config>>,
}

impl ConfigCell {
    /// 설정 위치를 지정해 셀을 생성합니다. 아직 해석하지 않습니다.
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            resolved: OnceLock::new(),
        }
    }

    /// 환경변수에서 경로를 찾는 셀
    pub fn from_env() -> Self {
        Self::new(ConfigSource::Env)
    }

    /// CLI 인자가 있으면 그 경로, 없으면 환경변수를 사용하는 셀
    pub fn with_override(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(ConfigSource::Path(path)),
            None => Self::from_env(),
        }
    }

    /// 설정을 반환합니다. 첫 호출에서만 파일을 읽습니다.
    pub fn get(&self) -> Arc<Config> {
        Arc::clone(self.resolved.get_or_init(|| Arc::new(self.resolve_now())))
    }

    /// 이미 해석되었는지 확인합니다.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// 캐시된 설정을 버립니다. 다음 `get`에서 다시 해석합니다.
    pub fn reset(&mut self) {
        self.resolved = OnceLock::new();
    }

    /// 해석에 사용할 경로 (환경변수 소스는 호출 시점의 값)
    pub fn source_path(&self) -> Option<PathBuf> {
        match &self.source {
            ConfigSource::Env => std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from),
            ConfigSource::Path(path) => Some(path.clone()),
            ConfigSource::Defaults => None,
        }
    }

    fn resolve_now(&self) -> Config {
        let path = self.source_path();
        Config::resolve(path.as_deref())
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp config");
        file.write_all(content.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.parser_queue, "parsers");
        assert_eq!(config.output_queue, "outputs");
        assert_eq!(config.parser_workers, 5);
        assert_eq!(config.output_workers, 1);
        assert_eq!(config.parser_packages, vec!["logrelay.parsers"]);
        assert!(config.parsers.is_empty());
        assert!(config.home.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn empty_and_null_documents_use_defaults() {
        assert_eq!(Config::parse("", ConfigFormat::Yaml).unwrap(), Config::default());
        assert_eq!(Config::parse("~\n", ConfigFormat::Yaml).unwrap(), Config::default());
    }

    #[test]
    fn override_replaces_keys_shallowly() {
        let yaml = r#"
parser_workers: 2
parser_packages:
  - mycorp.parsers
broker_options:
  claim_timeout_secs: 10
"#;
        let config = Config::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.parser_workers, 2);
        // 목록은 병합되지 않고 교체됨
        assert_eq!(config.parser_packages, vec!["mycorp.parsers"]);
        assert_eq!(config.broker_options.get("claim_timeout_secs"), Some(&json!(10)));
        // 없는 키는 기본값 유지
        assert_eq!(config.output_workers, 1);
        assert_eq!(config.output_packages, vec!["logrelay.outputs"]);
    }

    #[test]
    fn nested_override_is_not_deep_merged() {
        let mut defaults = Config::default();
        defaults.broker_options.insert("a".to_owned(), json!(1));
        defaults.broker_options.insert("b".to_owned(), json!(2));

        let overrides = json!({"broker_options": {"b": 3}});
        let merged = Config::merged(&defaults, overrides.as_object().cloned().unwrap()).unwrap();
        assert_eq!(merged.broker_options.len(), 1);
        assert_eq!(merged.broker_options.get("b"), Some(&json!(3)));
    }

    #[test]
    fn empty_list_override_replaces_non_empty_default() {
        let mut defaults = Config::default();
        defaults.parsers = vec![PluginSpec::named("plain")];
        let overrides = json!({"parsers": []});
        let merged = Config::merged(&defaults, overrides.as_object().cloned().unwrap()).unwrap();
        assert!(merged.parsers.is_empty());
    }

    #[test]
    fn plugin_specs_keep_order() {
        let yaml = r#"
parsers:
  - plain: {}
  - regex:
      regex: "(?P<word>\\w+)"
outputs:
  - stdout:
  - file:
      path: /dev/null
"#;
        let config = Config::parse(yaml, ConfigFormat::Yaml).unwrap();
        let names: Vec<_> = config
            .parsers
            .iter()
            .map(|s| s.entry().unwrap().0.to_owned())
            .collect();
        assert_eq!(names, vec!["plain", "regex"]);
        assert_eq!(config.plugins(PluginKind::Outputer).len(), 2);
    }

    #[test]
    fn toml_overrides_are_supported() {
        let toml = r#"
parser_queue = "raw"
output_workers = 4

[[outputs]]
stdout = {}
"#;
        let config = Config::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.parser_queue, "raw");
        assert_eq!(config.output_workers, 4);
        assert_eq!(config.outputs.len(), 1);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let err = Config::parse("parsers: [unclosed", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn wrongly_typed_value_is_a_parse_error() {
        let err = Config::parse("parser_workers: many", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        assert!(Config::parse("- a\n- b\n", ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn validate_rejects_same_queue_names() {
        let config = Config {
            output_queue: "parsers".to_owned(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_queue"));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let config = Config {
            log_format: "xml".to_owned(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_falls_back_to_defaults_on_bad_file() {
        let file = write_config("parser_workers: [", ".yml");
        assert_eq!(Config::resolve(Some(file.path())), Config::default());
        assert_eq!(
            Config::resolve(Some(Path::new("/nonexistent/logrelay.yml"))),
            Config::default()
        );
    }

    #[test]
    fn resolve_keeps_valid_overrides_when_one_value_is_bad() {
        let file = write_config(
            "log_level: verbose\nparser_workers: 2\nparsers:\n  - plain: {}\nbroker_url: spool:///srv/spool\n",
            ".yml",
        );

        let config = Config::resolve(Some(file.path()));

        assert_eq!(config.log_level, "info");
        assert_eq!(config.parser_workers, 2);
        assert_eq!(config.parsers, vec![PluginSpec::named("plain")]);
        assert_eq!(config.broker_url, "spool:///srv/spool");
        // 엄격 로딩은 같은 파일을 거부
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn repair_resolves_queue_collisions() {
        let mut config = Config {
            parser_queue: "outputs".to_owned(),
            log_format: "xml".to_owned(),
            parser_workers: 3,
            ..Config::default()
        };

        let problems = config.repair();

        assert_eq!(problems.len(), 2);
        assert_eq!(config.parser_queue, "parsers");
        assert_eq!(config.output_queue, "outputs");
        assert_eq!(config.log_format, "json");
        assert_eq!(config.parser_workers, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn repair_leaves_valid_config_alone() {
        let mut config = Config {
            output_workers: 4,
            ..Config::default()
        };
        assert!(config.repair().is_empty());
        assert_eq!(config.output_workers, 4);
    }

    #[test]
    #[serial]
    fn enter_home_switches_working_directory() {
        let home = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        let config = Config {
            home: Some(home.path().to_path_buf()),
            ..Config::default()
        };

        let entered = config.enter_home().unwrap().map(Path::to_path_buf);
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(&previous).unwrap();

        assert_eq!(entered.as_deref(), Some(home.path()));
        assert_eq!(cwd.canonicalize().unwrap(), home.path().canonicalize().unwrap());
        assert!(Config::default().enter_home().unwrap().is_none());
    }

    #[test]
    fn enter_home_reports_missing_directory() {
        let config = Config {
            home: Some(PathBuf::from("/nonexistent/logrelay-home")),
            ..Config::default()
        };
        let err = config.enter_home().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "home"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/logrelay.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_reads_toml_by_extension() {
        let file = write_config("parser_workers = 9\n", ".toml");
        assert_eq!(Config::load(file.path()).unwrap().parser_workers, 9);
    }

    #[test]
    fn cell_resolves_lazily_and_caches() {
        let file = write_config("output_workers: 7\n", ".yml");
        let mut cell = ConfigCell::new(ConfigSource::Path(file.path().to_path_buf()));
        assert!(!cell.is_resolved());

        let first = cell.get();
        assert!(cell.is_resolved());
        assert_eq!(first.output_workers, 7);

        // 캐시된 값은 파일이 바뀌어도 유지됨
        std::fs::write(file.path(), "output_workers: 8\n").unwrap();
        assert!(Arc::ptr_eq(&first, &cell.get()));

        cell.reset();
        assert!(!cell.is_resolved());
        assert_eq!(cell.get().output_workers, 8);
    }

    #[test]
    #[serial]
    fn cell_reads_env_on_first_access() {
        let file = write_config("parser_queue: from-env\n", ".yml");
        let cell = ConfigCell::from_env();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var(CONFIG_FILE_ENV, file.path()) };
        let config = cell.get();
        unsafe { std::env::remove_var(CONFIG_FILE_ENV) };
        assert_eq!(config.parser_queue, "from-env");
    }

    #[test]
    #[serial]
    fn explicit_path_overrides_env() {
        let env_file = write_config("parser_queue: env\n", ".yml");
        let cli_file = write_config("parser_queue: cli\n", ".yml");
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var(CONFIG_FILE_ENV, env_file.path()) };
        let cell = ConfigCell::with_override(Some(cli_file.path().to_path_buf()));
        let config = cell.get();
        unsafe { std::env::remove_var(CONFIG_FILE_ENV) };
        assert_eq!(config.parser_queue, "cli");
    }
}
