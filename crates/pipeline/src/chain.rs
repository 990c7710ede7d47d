//! 파서 체인
//!
//! 파이프 방식으로 파서를 적용합니다. 첫 파서는 원시 메시지를 [`Parser::parse`]로
//! 받고, 이후 파서는 직전 결과 이벤트를 [`Parser::refine`]으로 다듬습니다.
//! 어느 단계에서든 `None`이 나오면 체인 전체가 `None`이 되고, 빈 체인도
//! 이벤트를 만들지 않습니다.

use std::fmt;

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::plugin::{Parser, PluginSpec};

use crate::registry::PluginResolver;

/// 순서 있는 파서 목록
#[derive(Default)]
pub struct ParserChain {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserChain {
    /// 파서 목록으로 체인을 생성합니다.
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }

    /// 스펙 목록을 해석해 체인을 생성합니다.
    pub fn from_specs(resolver: &PluginResolver, specs: &[PluginSpec]) -> Result<Self, PluginError> {
        Ok(Self::new(resolver.resolve_parsers(specs)?))
    }

    /// 원시 메시지에 체인을 적용합니다.
    pub fn apply(&self, raw: &str) -> Result<Option<Event>, PluginError> {
        let mut parsers = self.parsers.iter();
        let Some(first) = parsers.next() else {
            return Ok(None);
        };

        let mut event = match first.parse(raw)? {
            Some(event) => event,
            None => {
                tracing::trace!(parser = first.name(), "message not matched");
                return Ok(None);
            }
        };
        for parser in parsers {
            event = match parser.refine(event)? {
                Some(event) => event,
                None => {
                    tracing::trace!(parser = parser.name(), "event dropped by parser");
                    return Ok(None);
                }
            };
        }
        Ok(Some(event))
    }

    /// 파서 수
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// 빈 체인인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// 파서 이름 목록 (순서대로)
    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }
}

impl fmt::Debug for ParserChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserChain")
            .field("parsers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::plain::PlainParser;

    /// 지정한 필드를 붙이거나 메시지를 거르는 테스트 파서
    struct Step {
        name: &'static str,
        reject: Option<&'static str>,
    }

    impl Parser for Step {
        fn name(&self) -> &str {
            self.name
        }

        fn parse(&self, raw: &str) -> Result<Option<Event>, PluginError> {
            if self.reject == Some(raw) {
                return Ok(None);
            }
            Ok(Some(Event::from_message(raw).with(self.name, true)))
        }
    }

    struct Failing;

    impl Parser for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn parse(&self, _raw: &str) -> Result<Option<Event>, PluginError> {
            Err(PluginError::transform("failing", "bad input"))
        }
    }

    fn step(name: &'static str) -> Box<dyn Parser> {
        Box::new(Step { name, reject: None })
    }

    #[test]
    fn empty_chain_yields_nothing() {
        assert!(ParserChain::default().apply("x").unwrap().is_none());
    }

    #[test]
    fn single_parser_result_is_returned() {
        let chain = ParserChain::new(vec![Box::new(PlainParser::new())]);
        let event = chain.apply("test message").unwrap().unwrap();
        assert_eq!(event.to_json_line(), r#"{"message":"test message"}"#);
    }

    #[test]
    fn later_parsers_refine_earlier_result() {
        let chain = ParserChain::new(vec![step("first"), step("second"), step("third")]);
        let event = chain.apply("hello").unwrap().unwrap();
        assert_eq!(event.message(), Some("hello"));
        for field in ["first", "second", "third"] {
            assert_eq!(event.get(field), Some(&serde_json::Value::Bool(true)));
        }
        assert_eq!(chain.names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn nothing_from_any_parser_ends_chain() {
        let chain = ParserChain::new(vec![
            step("first"),
            Box::new(Step {
                name: "picky",
                reject: Some("drop me"),
            }),
            Box::new(Failing),
        ]);
        // picky가 None을 내면 Failing은 호출되지 않음
        assert!(chain.apply("drop me").unwrap().is_none());
        assert!(chain.apply("keep me").is_err());
    }

    #[test]
    fn parser_errors_propagate() {
        let chain = ParserChain::new(vec![Box::new(Failing)]);
        let err = chain.apply("x").unwrap_err();
        assert!(!err.is_configuration());
    }
}
