#![doc = include_str!("../README.md")]

pub mod broker;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod plugin;
pub mod task;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{BrokerError, ConfigError, PluginError, RelayError, TaskError};

// 설정
pub use config::{Config, ConfigCell};

// 이벤트
pub use event::Event;

// 플러그인 계약
pub use plugin::{Input, Outputer, Parser, PluginKind, PluginOptions, PluginSpec, SkipFilter};

// 브로커 / 태스크
pub use broker::{BoxFuture, Broker, Consumer, Delivery};
pub use task::{OutputTask, ParseTask, Task};
