use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::messages::{Decided, Request, Response};
use crate::proposer::{Decision, Proposer};
use crate::quorum::QuorumCollector;
use crate::transport::Transport;
use crate::value::ValueSource;
use std::time::{Duration, Instant};

/// Result of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Iteration of the first decision
    pub first_iteration: u64,
    /// Decisions in iteration order
    pub decisions: Vec<Decision>,
    /// Wall time from the first PREPARE to the last decision
    pub elapsed: Duration,
}

impl RunSummary {
    /// Decided iterations per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.decisions.len() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs the proposer for a bounded number of iterations, one at a time.
pub struct IterationDriver<T, S> {
    collector: QuorumCollector<T>,
    proposer: Proposer<S>,
    iterations: u64,
    max_attempts: u32,
}

impl<T: Transport, S: ValueSource> IterationDriver<T, S> {
    pub fn new(config: &Configuration, transport: T, values: S) -> IterationDriver<T, S> {
        let quorum = config.quorum_size();
        let (index, proposers) = config.identity();
        IterationDriver {
            collector: QuorumCollector::new(transport, config.acceptors(), quorum)
                .with_reply_timeout(config.reply_timeout()),
            proposer: Proposer::new(config.first_iteration(), quorum, values)
                .with_identity(index, proposers),
            iterations: config.iterations(),
            max_attempts: config.max_attempts(),
        }
    }

    pub fn proposer(&self) -> &Proposer<S> {
        &self.proposer
    }

    /// Decides iterations until the configured bound is reached.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let first_iteration = self.proposer.iteration();
        let started = Instant::now();
        let mut decisions = Vec::new();

        info!(
            "Running {} iterations from iteration {}",
            self.iterations, first_iteration
        );
        while (decisions.len() as u64) < self.iterations {
            decisions.push(self.decide().await?);
        }

        let summary = RunSummary {
            first_iteration,
            decisions,
            elapsed: started.elapsed(),
        };
        info!(
            "Decided {} iterations in {:?}",
            summary.decisions.len(),
            summary.elapsed
        );
        Ok(summary)
    }

    /// Runs attempts for the current iteration until one is decided, then
    /// notifies every acceptor of the decision without waiting for them.
    pub async fn decide(&mut self) -> Result<Decision> {
        let iteration = self.proposer.iteration();
        for attempt in 1..=self.max_attempts {
            if let Some(decision) = self.attempt().await? {
                self.broadcast_decided(&decision);
                return Ok(decision);
            }
            warn!(
                "Attempt {} for iteration {} did not reach quorum",
                attempt, iteration
            );
        }

        Err(Error::NoQuorum {
            iteration,
            attempts: self.max_attempts,
        })
    }

    /// One PREPARE/ACCEPT round. `None` when either phase ran out of replies.
    async fn attempt(&mut self) -> Result<Option<Decision>> {
        let proposer = &mut self.proposer;

        let prepare = proposer.prepare();
        let mut accept = None;
        self.collector
            .collect(Request::Prepare(prepare), |node, response| match response {
                Response::Promise(promise) => {
                    accept = proposer.receive_promise(promise);
                    Ok(accept.is_some())
                }
                _ => Err(Error::UnexpectedResponse {
                    node,
                    request: "Prepare",
                }),
            })
            .await?;

        let accept = match accept {
            Some(accept) => accept,
            None => return Ok(None),
        };

        let mut decision = None;
        self.collector
            .collect(Request::Accept(accept), |node, response| match response {
                Response::Accepted(accepted) => {
                    decision = proposer.receive_accepted(accepted);
                    Ok(decision.is_some())
                }
                _ => Err(Error::UnexpectedResponse {
                    node,
                    request: "Accept",
                }),
            })
            .await?;

        Ok(decision)
    }

    fn broadcast_decided(&self, decision: &Decision) {
        for &node in self.collector.targets() {
            let transport = self.collector.transport().clone();
            let request = Request::Decided(Decided(decision.value.clone()));
            tokio::spawn(async move {
                if let Err(e) = transport.call(node, request).await {
                    warn!("Dropped DECIDED notification to acceptor {}: {}", node, e);
                }
            });
        }
    }
}
