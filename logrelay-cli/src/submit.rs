//! `logrelay-cli [message]`: publish one parse task.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use logrelay_core::{ConfigCell, ParseTask, PluginSpec};
use logrelay_pipeline::{PluginRegistry, StageDispatcher, connect};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// What was published, for the user.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub broker: String,
    pub queue: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsers: Option<Vec<String>>,
}

impl Render for Receipt {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "submitted to {} queue '{}'", self.broker, self.queue)?;
        writeln!(w, "  message: {}", self.message)?;
        if let Some(parsers) = &self.parsers {
            writeln!(w, "  parsers: {}", parsers.join(" | "))?;
        }
        Ok(())
    }
}

/// Parse `--parsers` JSON into a spec list.
pub fn parse_override(raw: Option<&str>) -> Result<Option<Vec<PluginSpec>>, CliError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let specs: Vec<PluginSpec> = serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidArgument(format!("--parsers must be a JSON list: {e}")))?;
    if specs.is_empty() {
        return Err(CliError::InvalidArgument(
            "--parsers must name at least one parser".to_owned(),
        ));
    }
    Ok(Some(specs))
}

/// Resolve settings, enter `home`, connect and publish.
///
/// A parser override is resolved locally first so a typo fails here
/// instead of dead-lettering on a worker.
pub async fn execute(cli: &Cli, writer: &OutputWriter) -> Result<Receipt, CliError> {
    let config = ConfigCell::with_override(cli.config.clone()).get();
    let parsers = parse_override(cli.parsers.as_deref())?;

    // Relative spool paths must match what the workers see.
    if let Some(home) = config
        .enter_home()
        .map_err(|e| CliError::Config(e.to_string()))?
    {
        tracing::debug!(home = %home.display(), "working directory set");
    }

    let broker = connect(&config.broker_url, &config.broker_options)
        .map_err(|e| CliError::Broker(e.to_string()))?;
    let broker_name = broker.name().to_owned();
    let dispatcher = StageDispatcher::new(
        Arc::clone(&config),
        Arc::new(PluginRegistry::with_builtins()),
        broker,
    );

    let names = match &parsers {
        Some(specs) => {
            let resolved = dispatcher.resolver().resolve_parsers(specs)?;
            Some(resolved.iter().map(|p| p.name().to_owned()).collect())
        }
        None => None,
    };

    let task = match parsers {
        Some(specs) => ParseTask::with_parsers(cli.message.clone(), specs),
        None => ParseTask::new(cli.message.clone()),
    };
    dispatcher.submit(task).await?;

    tracing::debug!(queue = %config.parser_queue, broker = %broker_name, "task submitted");

    let receipt = Receipt {
        broker: broker_name,
        queue: config.parser_queue.clone(),
        message: cli.message.clone(),
        parsers: names,
    };
    writer.render(&receipt)?;
    Ok(receipt)
}
