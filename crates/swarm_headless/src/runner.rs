//! Stdin/stdout session loop.

use std::io::{BufRead, Write};

use swarm_core::config::EngineConfig;
use swarm_core::engine::DecisionEngine;
use swarm_core::error::Result as EngineResult;

use crate::protocol::{ProtocolError, Request, Response};

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Tick requests answered.
    pub ticks: u64,
    /// Actions emitted over the whole session.
    pub actions: u64,
    /// Lines that could not be parsed.
    pub errors: u64,
}

/// One engine driven by JSON lines.
pub struct SessionRunner {
    config: EngineConfig,
    engine: DecisionEngine,
    summary: SessionSummary,
}

impl SessionRunner {
    /// Create a runner; fails only on an invalid config.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let engine = DecisionEngine::new(config.clone())?;
        Ok(Self {
            config,
            engine,
            summary: SessionSummary::default(),
        })
    }

    /// Counters so far.
    #[must_use]
    pub const fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Answer one request. `quit` is answered with [`Response::Bye`].
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Tick(snapshot) => {
                let actions = self.engine.decide(&snapshot);
                self.summary.ticks += 1;
                self.summary.actions += actions.len() as u64;
                tracing::debug!(tick = snapshot.tick, actions = actions.len(), "Answered tick");
                Response::Actions {
                    tick: snapshot.tick,
                    actions,
                }
            }
            Request::Reset => match DecisionEngine::new(self.config.clone()) {
                Ok(engine) => {
                    self.engine = engine;
                    tracing::info!(seed = self.config.seed, "Engine reset");
                    Response::ack("reset")
                }
                Err(e) => Response::error(e.to_string()),
            },
            Request::Quit => Response::Bye,
        }
    }

    /// Answer one raw line. Blank lines yield nothing.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match Request::from_json(line) {
            Ok(request) => Some(self.handle(request)),
            Err(e) => {
                self.summary.errors += 1;
                tracing::warn!(error = %e, "Rejected request");
                Some(Response::error(e.to_string()))
            }
        }
    }

    /// Run until `quit` or end of input.
    ///
    /// Every response is flushed as soon as it is written so the game never
    /// waits on a buffered answer.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> Result<SessionSummary, ProtocolError> {
        output.write_all(Response::ready().to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let Some(response) = self.handle_line(&line) else {
                continue;
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
            if response == Response::Bye {
                break;
            }
        }

        tracing::info!(
            ticks = self.summary.ticks,
            actions = self.summary.actions,
            errors = self.summary.errors,
            "Session finished"
        );
        Ok(self.summary)
    }
}
