#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`registry`]: 플러그인 레지스트리와 리졸버 (`{패키지}.{이름}` 검색)
//! - [`chain`]: 파서 체인 (파이프 방식)
//! - [`fanout`]: 출력 fan-out (아웃푸터별 에러 격리)
//! - [`worker`]: 큐 소비 워커 풀과 처리 결과 정책
//! - [`dispatcher`]: 스테이지 바인딩과 파서/출력 태스크 핸들러
//! - [`collector`]: 입력 플러그인 폴링 루프
//! - [`broker`]: 브로커 구현체와 URL 기반 연결
//! - [`parser`], [`output`]: 기본 제공 플러그인
//! - [`error`]: 스테이지 에러와 처리 분류

pub mod broker;
pub mod chain;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod output;
pub mod parser;
pub mod registry;
pub mod worker;

// --- 주요 타입 re-export ---

// 플러그인 해석
pub use registry::{PluginInstance, PluginRegistry, PluginResolver};

// 체인 / fan-out
pub use chain::ParserChain;
pub use fanout::{FanoutReport, OutputFanout, OutputStatus};

// 워커 풀 / 디스패처
pub use dispatcher::{OutputHandler, ParseHandler, Stage, StageBinding, StageDispatcher};
pub use worker::{Outcome, PoolReport, TaskHandler, WorkerLimits, WorkerPool, WorkerReport};

// 입력
pub use collector::{InputReport, InputRunner};

// 브로커
pub use broker::{MemoryBroker, SpoolBroker, connect};

// 에러
pub use error::{Disposition, StageError};
