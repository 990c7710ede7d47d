//! 파서 → 출력 전체 흐름 테스트
//!
//! 두 스테이지를 bounded mode로 차례로 실행하여 결과를 확인합니다.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use logrelay_core::config::Config;
use logrelay_core::plugin::{Outputer, PluginSpec};
use logrelay_core::task::ParseTask;
use logrelay_pipeline::collector::InputRunner;
use logrelay_pipeline::output::stdout::StdoutOutputer;
use logrelay_pipeline::{MemoryBroker, PluginRegistry, SpoolBroker, StageDispatcher, WorkerLimits};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// 테스트에서 stdout 대신 쓰는 공유 버퍼
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `test.outputs.stdout`이 기본 stdout보다 먼저 검색되도록 한 레지스트리
fn capturing_registry(captured: &Captured) -> Arc<PluginRegistry> {
    let mut registry = PluginRegistry::with_builtins();
    let sink = captured.clone();
    registry
        .register_outputer("test.outputs", "stdout", move |options| {
            Ok(Box::new(StdoutOutputer::with_writer(options, Box::new(sink.clone()))?)
                as Box<dyn Outputer>)
        })
        .unwrap();
    Arc::new(registry)
}

fn config(parsers: serde_json::Value, outputs: serde_json::Value) -> Config {
    Config {
        broker_url: "memory://".to_owned(),
        parser_workers: 1,
        output_workers: 1,
        parsers: serde_json::from_value::<Vec<PluginSpec>>(parsers).unwrap(),
        outputs: serde_json::from_value::<Vec<PluginSpec>>(outputs).unwrap(),
        output_packages: vec!["test.outputs".to_owned(), "logrelay.outputs".to_owned()],
        ..Config::default()
    }
}

fn one_task() -> WorkerLimits {
    WorkerLimits {
        max_tasks: Some(1),
        max_runtime: Some(Duration::from_secs(5)),
    }
}

#[tokio::test]
async fn test_message_reaches_stdout() {
    let captured = Captured::default();
    let broker = Arc::new(MemoryBroker::new());
    let config = config(json!([{"plain": {}}]), json!([{"stdout": {}}]));
    let dispatcher =
        StageDispatcher::new(Arc::new(config), capturing_registry(&captured), broker.clone())
            .limits(one_task());

    dispatcher.submit(ParseTask::new("test message")).await.unwrap();
    let parsed = dispatcher.run_parsers(CancellationToken::new()).await.unwrap();
    assert_eq!(parsed.total().published, 1);

    let output = dispatcher.run_outputs(CancellationToken::new()).await.unwrap();
    assert_eq!(output.total().fanned_out, 1);
    assert_eq!(captured.text(), "{\"message\":\"test message\"}\n");
}

#[tokio::test]
async fn skip_types_suppresses_output() {
    let captured = Captured::default();
    let broker = Arc::new(MemoryBroker::new());
    let config = config(
        json!([{"plain": {"type": "no out"}}]),
        json!([{"stdout": {"skip_types": "no out"}}]),
    );
    let dispatcher =
        StageDispatcher::new(Arc::new(config), capturing_registry(&captured), broker.clone())
            .limits(one_task());

    dispatcher.submit(ParseTask::new("test message")).await.unwrap();
    dispatcher.run_parsers(CancellationToken::new()).await.unwrap();
    let output = dispatcher.run_outputs(CancellationToken::new()).await.unwrap();

    assert_eq!(output.total().fanned_out, 1);
    assert_eq!(captured.text(), "");
    assert!(broker.dead_letters("outputs").is_empty());
}

#[tokio::test]
async fn every_outputer_writes_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let file_a = dir.path().join("a.jsonl");
    let file_b = dir.path().join("b.jsonl");
    let captured = Captured::default();
    let broker = Arc::new(MemoryBroker::new());
    let config = config(
        json!([{"plain": {}}, {"regex": {"regex": "(?P<word>\\w+)$"}}]),
        json!([
            {"file": {"path": file_a}},
            {"stdout": {"skip_types": ["debug"]}},
            {"file": {"path": file_b}},
        ]),
    );
    let dispatcher =
        StageDispatcher::new(Arc::new(config), capturing_registry(&captured), broker.clone())
            .limits(one_task());

    dispatcher.submit(ParseTask::new("hello world")).await.unwrap();
    dispatcher.run_parsers(CancellationToken::new()).await.unwrap();
    dispatcher.run_outputs(CancellationToken::new()).await.unwrap();

    let expected = "{\"message\":\"hello world\",\"word\":\"world\"}\n";
    assert_eq!(captured.text(), expected);
    assert_eq!(std::fs::read_to_string(&file_a).unwrap(), expected);
    assert_eq!(std::fs::read_to_string(&file_b).unwrap(), expected);
}

#[tokio::test]
async fn task_parser_override_replaces_default_chain() {
    let captured = Captured::default();
    let broker = Arc::new(MemoryBroker::new());
    let config = config(json!([{"regex": {"regex": "^never$"}}]), json!([{"stdout": {}}]));
    let dispatcher =
        StageDispatcher::new(Arc::new(config), capturing_registry(&captured), broker.clone())
            .limits(one_task());

    dispatcher
        .submit(ParseTask::with_parsers(
            "override me",
            vec![PluginSpec::named("plain")],
        ))
        .await
        .unwrap();
    dispatcher.run_parsers(CancellationToken::new()).await.unwrap();
    dispatcher.run_outputs(CancellationToken::new()).await.unwrap();

    assert_eq!(captured.text(), "{\"message\":\"override me\"}\n");
}

#[tokio::test]
async fn unknown_parser_fails_startup_without_consuming() {
    let broker = Arc::new(MemoryBroker::new());
    let config = config(json!([{"plain": {}}, {"nope": {}}]), json!([]));
    let dispatcher = StageDispatcher::new(
        Arc::new(config),
        Arc::new(PluginRegistry::with_builtins()),
        broker.clone(),
    )
    .limits(one_task());

    dispatcher.submit(ParseTask::new("waiting")).await.unwrap();
    let err = dispatcher
        .run_parsers(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("improperly configured"));
    assert_eq!(broker.pending("parsers"), 1);
}

#[tokio::test]
async fn file_input_to_file_output_over_spool() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("app.log");
    let sink = dir.path().join("events.jsonl");
    std::fs::write(&source, "first line\nsecond line\n").unwrap();

    let spool_options = serde_json::from_value(json!({"poll_interval_ms": 5})).unwrap();
    let broker = Arc::new(SpoolBroker::open(dir.path().join("spool"), &spool_options).unwrap());
    let mut config = config(json!([{"plain": {}}]), json!([{"file": {"path": sink}}]));
    config.inputs = serde_json::from_value(json!([{"file": {"path": source, "from_start": true}}])).unwrap();
    config.output_packages = vec!["logrelay.outputs".to_owned()];
    let dispatcher = StageDispatcher::new(
        Arc::new(config),
        Arc::new(PluginRegistry::with_builtins()),
        broker.clone(),
    )
    .limits(WorkerLimits {
        max_tasks: Some(2),
        max_runtime: Some(Duration::from_secs(5)),
    });

    let mut inputs =
        InputRunner::from_config(dispatcher.config(), dispatcher.resolver(), broker.clone())
            .unwrap()
            .interval(Duration::from_millis(1))
            .max_iterations(Some(1));
    let collected = inputs.run(CancellationToken::new()).await.unwrap();
    assert_eq!(collected.published, 2);

    dispatcher.run_parsers(CancellationToken::new()).await.unwrap();
    dispatcher.run_outputs(CancellationToken::new()).await.unwrap();

    let written = std::fs::read_to_string(&sink).unwrap();
    let mut lines: Vec<&str> = written.lines().collect();
    lines.sort_unstable();
    assert_eq!(
        lines,
        vec![
            "{\"message\":\"first line\"}",
            "{\"message\":\"second line\"}"
        ]
    );
}
