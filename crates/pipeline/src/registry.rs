//! 플러그인 레지스트리와 리졸버
//!
//! 설정의 [`PluginSpec`] 목록을 실제 플러그인 인스턴스로 바꿉니다.
//!
//! # 해석 절차
//! 1. 스펙이 `{이름: 옵션}` 단일 엔트리 매핑인지 검증
//! 2. 이름이 `[a-z][a-z0-9_]*` 규칙을 따르는지 검증
//! 3. 종류별 검색 경로를 순서대로 돌며 `"{패키지}.{이름}"`을 레지스트리에서 조회
//! 4. 다른 종류로 등록된 식별자면 `KindMismatch`, 어디에도 없으면 `NotFound`
//! 5. 옵션을 유일한 인자로 생성자를 호출
//!
//! 목록 중 하나라도 실패하면 전체가 실패하며, 인스턴스는 하나도 반환되지 않습니다.
//! 호출마다 새 인스턴스를 만들고 캐시하지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use logrelay_core::config::Config;
use logrelay_core::error::PluginError;
use logrelay_core::plugin::{Input, Outputer, Parser, PluginKind, PluginOptions, PluginSpec};

use crate::collector::file::FileInput;
use crate::output::file::FileOutputer;
use crate::output::plain::PlainOutputer;
use crate::output::stdout::StdoutOutputer;
use crate::parser::plain::PlainParser;
use crate::parser::regex::RegexParser;

/// 기본 제공 입력 패키지
pub const BUILTIN_INPUTS: &str = "logrelay.inputs";
/// 기본 제공 파서 패키지
pub const BUILTIN_PARSERS: &str = "logrelay.parsers";
/// 기본 제공 아웃푸터 패키지
pub const BUILTIN_OUTPUTS: &str = "logrelay.outputs";

/// 입력 생성자
pub type InputFactory =
    Arc<dyn Fn(&PluginOptions) -> Result<Box<dyn Input>, PluginError> + Send + Sync>;
/// 파서 생성자
pub type ParserFactory =
    Arc<dyn Fn(&PluginOptions) -> Result<Box<dyn Parser>, PluginError> + Send + Sync>;
/// 아웃푸터 생성자
pub type OutputerFactory =
    Arc<dyn Fn(&PluginOptions) -> Result<Box<dyn Outputer>, PluginError> + Send + Sync>;

#[derive(Clone)]
enum Factory {
    Input(InputFactory),
    Parser(ParserFactory),
    Outputer(OutputerFactory),
}

impl Factory {
    fn kind(&self) -> PluginKind {
        match self {
            Self::Input(_) => PluginKind::Input,
            Self::Parser(_) => PluginKind::Parser,
            Self::Outputer(_) => PluginKind::Outputer,
        }
    }

    fn build(&self, options: &PluginOptions) -> Result<PluginInstance, PluginError> {
        Ok(match self {
            Self::Input(f) => PluginInstance::Input(f(options)?),
            Self::Parser(f) => PluginInstance::Parser(f(options)?),
            Self::Outputer(f) => PluginInstance::Outputer(f(options)?),
        })
    }
}

/// 해석된 플러그인 인스턴스
pub enum PluginInstance {
    /// 입력 수집기
    Input(Box<dyn Input>),
    /// 파서
    Parser(Box<dyn Parser>),
    /// 아웃푸터
    Outputer(Box<dyn Outputer>),
}

impl PluginInstance {
    /// 인스턴스 종류
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::Input(_) => PluginKind::Input,
            Self::Parser(_) => PluginKind::Parser,
            Self::Outputer(_) => PluginKind::Outputer,
        }
    }

    /// 플러그인 이름
    pub fn name(&self) -> &str {
        match self {
            Self::Input(p) => p.name(),
            Self::Parser(p) => p.name(),
            Self::Outputer(p) => p.name(),
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

// ─── PluginRegistry ──────────────────────────────────────────────────

/// 정적 플러그인 레지스트리
///
/// `"{패키지}.{이름}"` 식별자를 생성자에 매핑합니다. 프로세스 초기화 시
/// 구성한 뒤 `Arc`로 공유하며, 이후에는 읽기만 합니다.
///
/// # 사용 예시
/// ```ignore
/// let mut registry = PluginRegistry::with_builtins();
/// registry.register_parser("acme.parsers", "nginx", |opts| {
///     Ok(Box::new(NginxParser::from_options(opts)?) as Box<dyn Parser>)
/// })?;
/// ```
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, Factory>,
}

impl PluginRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 제공 플러그인이 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Self {
        let builtins: [(&str, &str, Factory); 6] = [
            (BUILTIN_PARSERS, "plain", Factory::Parser(Arc::new(plain_parser))),
            (BUILTIN_PARSERS, "regex", Factory::Parser(Arc::new(regex_parser))),
            (BUILTIN_OUTPUTS, "stdout", Factory::Outputer(Arc::new(stdout_outputer))),
            (BUILTIN_OUTPUTS, "file", Factory::Outputer(Arc::new(file_outputer))),
            (BUILTIN_OUTPUTS, "plain", Factory::Outputer(Arc::new(plain_outputer))),
            (BUILTIN_INPUTS, "file", Factory::Input(Arc::new(file_input))),
        ];
        let factories = builtins
            .into_iter()
            .map(|(package, name, factory)| (qualify(package, name), factory))
            .collect();
        Self { factories }
    }

    /// 파서 생성자를 등록합니다.
    ///
    /// 동일한 식별자가 이미 등록되어 있으면 에러를 반환합니다.
    pub fn register_parser<F>(&mut self, package: &str, name: &str, factory: F) -> Result<(), PluginError>
    where
        F: Fn(&PluginOptions) -> Result<Box<dyn Parser>, PluginError> + Send + Sync + 'static,
    {
        self.insert(package, name, Factory::Parser(Arc::new(factory)))
    }

    /// 아웃푸터 생성자를 등록합니다.
    pub fn register_outputer<F>(&mut self, package: &str, name: &str, factory: F) -> Result<(), PluginError>
    where
        F: Fn(&PluginOptions) -> Result<Box<dyn Outputer>, PluginError> + Send + Sync + 'static,
    {
        self.insert(package, name, Factory::Outputer(Arc::new(factory)))
    }

    /// 입력 생성자를 등록합니다.
    pub fn register_input<F>(&mut self, package: &str, name: &str, factory: F) -> Result<(), PluginError>
    where
        F: Fn(&PluginOptions) -> Result<Box<dyn Input>, PluginError> + Send + Sync + 'static,
    {
        self.insert(package, name, Factory::Input(Arc::new(factory)))
    }

    fn insert(&mut self, package: &str, name: &str, factory: Factory) -> Result<(), PluginError> {
        let id = qualify(package, name);
        if self.factories.contains_key(&id) {
            return Err(PluginError::AlreadyRegistered { id });
        }
        tracing::debug!(id = %id, kind = %factory.kind(), "plugin registered");
        self.factories.insert(id, factory);
        Ok(())
    }

    /// 식별자가 등록되어 있는지 확인합니다.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// 등록된 식별자 수
    pub fn count(&self) -> usize {
        self.factories.len()
    }

    /// 등록된 식별자 목록 (정렬됨)
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

fn plain_parser(options: &PluginOptions) -> Result<Box<dyn Parser>, PluginError> {
    Ok(Box::new(PlainParser::from_options(options)?))
}

fn regex_parser(options: &PluginOptions) -> Result<Box<dyn Parser>, PluginError> {
    Ok(Box::new(RegexParser::from_options(options)?))
}

fn stdout_outputer(options: &PluginOptions) -> Result<Box<dyn Outputer>, PluginError> {
    Ok(Box::new(StdoutOutputer::from_options(options)?))
}

fn file_outputer(options: &PluginOptions) -> Result<Box<dyn Outputer>, PluginError> {
    Ok(Box::new(FileOutputer::from_options(options)?))
}

fn plain_outputer(options: &PluginOptions) -> Result<Box<dyn Outputer>, PluginError> {
    Ok(Box::new(PlainOutputer::from_options(options)?))
}

fn file_input(options: &PluginOptions) -> Result<Box<dyn Input>, PluginError> {
    Ok(Box::new(FileInput::from_options(options)?))
}

fn qualify(package: &str, name: &str) -> String {
    format!("{package}.{name}")
}

/// 플러그인 짧은 이름 규칙: `[a-z][a-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// ─── PluginResolver ──────────────────────────────────────────────────

/// 종류별 검색 경로를 가진 플러그인 리졸버
#[derive(Debug, Clone)]
pub struct PluginResolver {
    registry: Arc<PluginRegistry>,
    input_packages: Vec<String>,
    parser_packages: Vec<String>,
    output_packages: Vec<String>,
}

impl PluginResolver {
    /// 설정의 `*_packages` 검색 경로로 리졸버를 생성합니다.
    pub fn new(registry: Arc<PluginRegistry>, config: &Config) -> Self {
        Self {
            registry,
            input_packages: config.input_packages.clone(),
            parser_packages: config.parser_packages.clone(),
            output_packages: config.output_packages.clone(),
        }
    }

    /// 특정 종류의 검색 경로를 교체합니다.
    pub fn with_packages(mut self, kind: PluginKind, packages: Vec<String>) -> Self {
        match kind {
            PluginKind::Input => self.input_packages = packages,
            PluginKind::Parser => self.parser_packages = packages,
            PluginKind::Outputer => self.output_packages = packages,
        }
        self
    }

    /// 종류별 검색 경로
    pub fn packages(&self, kind: PluginKind) -> &[String] {
        match kind {
            PluginKind::Input => &self.input_packages,
            PluginKind::Parser => &self.parser_packages,
            PluginKind::Outputer => &self.output_packages,
        }
    }

    /// 스펙 목록을 입력 순서대로 인스턴스화합니다.
    pub fn resolve(
        &self,
        kind: PluginKind,
        specs: &[PluginSpec],
    ) -> Result<Vec<PluginInstance>, PluginError> {
        let mut plugins = Vec::with_capacity(specs.len());
        for spec in specs {
            plugins.push(self.resolve_one(kind, spec)?);
        }
        Ok(plugins)
    }

    /// 파서 목록을 해석합니다.
    pub fn resolve_parsers(&self, specs: &[PluginSpec]) -> Result<Vec<Box<dyn Parser>>, PluginError> {
        self.resolve(PluginKind::Parser, specs)?
            .into_iter()
            .map(|plugin| match plugin {
                PluginInstance::Parser(p) => Ok(p),
                other => Err(mismatch(other.name(), PluginKind::Parser, other.kind())),
            })
            .collect()
    }

    /// 아웃푸터 목록을 해석합니다.
    pub fn resolve_outputers(
        &self,
        specs: &[PluginSpec],
    ) -> Result<Vec<Box<dyn Outputer>>, PluginError> {
        self.resolve(PluginKind::Outputer, specs)?
            .into_iter()
            .map(|plugin| match plugin {
                PluginInstance::Outputer(p) => Ok(p),
                other => Err(mismatch(other.name(), PluginKind::Outputer, other.kind())),
            })
            .collect()
    }

    /// 입력 목록을 해석합니다.
    pub fn resolve_inputs(&self, specs: &[PluginSpec]) -> Result<Vec<Box<dyn Input>>, PluginError> {
        self.resolve(PluginKind::Input, specs)?
            .into_iter()
            .map(|plugin| match plugin {
                PluginInstance::Input(p) => Ok(p),
                other => Err(mismatch(other.name(), PluginKind::Input, other.kind())),
            })
            .collect()
    }

    fn resolve_one(&self, kind: PluginKind, spec: &PluginSpec) -> Result<PluginInstance, PluginError> {
        let (name, options) = spec.entry()?;
        if !is_valid_name(name) {
            return Err(PluginError::InvalidName {
                kind: kind.to_string(),
                name: name.to_owned(),
            });
        }

        let mut searched = Vec::new();
        for package in self.packages(kind) {
            let id = qualify(package, name);
            if let Some(factory) = self.registry.factories.get(&id) {
                if factory.kind() != kind {
                    return Err(mismatch(&id, kind, factory.kind()));
                }
                let plugin = factory.build(&options)?;
                tracing::debug!(kind = %kind, id = %id, "plugin resolved");
                return Ok(plugin);
            }
            searched.push(id);
        }

        Err(PluginError::NotFound {
            kind: kind.to_string(),
            name: name.to_owned(),
            searched: searched.join(", "),
        })
    }
}

fn mismatch(id: &str, expected: PluginKind, found: PluginKind) -> PluginError {
    PluginError::KindMismatch {
        id: id.to_owned(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
