use crate::config::types::Config;
use crate::sink::{build_sink, Sink, SinkError};
use crate::source::{source_specs, LogSource, LogSourceSpec, StreamDiscoverer};
use crate::storage::{CheckpointKey, OffsetStore};
use crate::tailer::{StreamTarget, Tailer, TailerError, TailerSettings, TailerStats};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to build destination for service {service}: {source}")]
    Sink {
        service: String,
        #[source]
        source: SinkError,
    },

    #[error("no streams to tail ({failed_sources} source(s) failed discovery)")]
    NothingToTail { failed_sources: usize },
}

/// A logical source whose streams could not be listed.
#[derive(Debug, Clone)]
pub struct FailedSource {
    pub spec: LogSourceSpec,
    pub error: String,
}

/// Outcome of every tailer once the supervisor has stopped.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub completed: Vec<(StreamTarget, TailerStats)>,
    pub failed: Vec<(StreamTarget, String)>,
    pub aborted: usize,
    pub panicked: usize,
}

impl ShutdownReport {
    fn record(&mut self, result: Result<TailerOutcome, tokio::task::JoinError>) {
        match result {
            Ok((target, Ok(stats))) => self.completed.push((target, stats)),
            Ok((target, Err(e))) => self.failed.push((target, e.to_string())),
            Err(e) if e.is_cancelled() => self.aborted += 1,
            Err(e) => {
                error!(error = %e, "Tailer task panicked");
                self.panicked += 1;
            }
        }
    }
}

type TailerOutcome = (StreamTarget, Result<TailerStats, TailerError>);

/// Discovers streams and runs one tailer per stream.
pub struct Supervisor {
    config: Config,
    source: Arc<dyn LogSource>,
    store: Arc<dyn OffsetStore>,
}

impl Supervisor {
    pub fn new(config: Config, source: Arc<dyn LogSource>, store: Arc<dyn OffsetStore>) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    /// Discover every configured source and launch its tailers.
    ///
    /// A source whose discovery fails is skipped; the others still start. Fails only when
    /// nothing at all could be launched.
    pub async fn start(self) -> Result<SupervisorHandle, SupervisorError> {
        let settings = TailerSettings::from_config(&self.config);

        let mut sinks: HashMap<String, Arc<dyn Sink>> = HashMap::new();
        for service in &self.config.services {
            let sink = build_sink(&service.name, &service.destination).map_err(|source| {
                SupervisorError::Sink {
                    service: service.name.clone(),
                    source,
                }
            })?;
            sinks.insert(service.name.clone(), sink);
        }

        let specs = source_specs(&self.config);
        let discoverer = StreamDiscoverer::new(Arc::clone(&self.source));
        let discovered = join_all(specs.iter().map(|spec| discoverer.discover(spec))).await;

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut targets = Vec::new();
        let mut failed_sources = Vec::new();
        let mut keys = HashSet::new();

        for (spec, result) in specs.into_iter().zip(discovered) {
            let streams = match result {
                Ok(streams) => streams,
                Err(e) => {
                    error!(
                        service = %spec.service,
                        log_group = %spec.log_group_name,
                        error = %e,
                        "Stream discovery failed, skipping this source"
                    );
                    failed_sources.push(FailedSource {
                        spec,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if streams.is_empty() {
                warn!(
                    service = %spec.service,
                    log_group = %spec.log_group_name,
                    prefix = %spec.log_stream_prefix,
                    "No streams matched"
                );
            }

            let Some(sink) = sinks.get(&spec.service).cloned() else {
                continue;
            };

            for stream in streams {
                let key = CheckpointKey::new(&spec.checkpoint_namespace, &stream);
                if !keys.insert(key.clone()) {
                    error!(
                        service = %spec.service,
                        log_group = %spec.log_group_name,
                        stream = %stream,
                        key = %key,
                        "Checkpoint key already used by another stream, not starting a second tailer"
                    );
                    continue;
                }

                let target = StreamTarget {
                    service: spec.service.clone(),
                    log_group_name: spec.log_group_name.clone(),
                    stream,
                    key,
                };
                let tailer = Tailer::new(
                    target.clone(),
                    Arc::clone(&self.source),
                    Arc::clone(&sink),
                    Arc::clone(&self.store),
                    settings.clone(),
                );
                let token = cancel.child_token();
                let task_target = target.clone();
                tasks.spawn(async move { (task_target, tailer.run(token).await) });
                targets.push(target);
            }
        }

        if targets.is_empty() {
            return Err(SupervisorError::NothingToTail {
                failed_sources: failed_sources.len(),
            });
        }

        info!(
            tailers = targets.len(),
            failed_sources = failed_sources.len(),
            "All tailers launched"
        );

        Ok(SupervisorHandle {
            tasks,
            targets,
            failed_sources,
            cancel,
            grace: self.config.tailer.shutdown_grace,
        })
    }
}

/// Handle over running tailers.
pub struct SupervisorHandle {
    tasks: JoinSet<TailerOutcome>,
    targets: Vec<StreamTarget>,
    failed_sources: Vec<FailedSource>,
    cancel: CancellationToken,
    grace: Duration,
}

impl SupervisorHandle {
    pub fn tailer_count(&self) -> usize {
        self.targets.len()
    }

    pub fn targets(&self) -> &[StreamTarget] {
        &self.targets
    }

    pub fn failed_sources(&self) -> &[FailedSource] {
        &self.failed_sources
    }

    /// Token that stops every tailer when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cooperative shutdown and wait for the tailers.
    pub async fn shutdown(self) -> ShutdownReport {
        info!(grace_ms = self.grace.as_millis() as u64, "Stopping tailers");
        self.cancel.cancel();
        self.join().await
    }

    /// Wait until every tailer has stopped.
    ///
    /// Once the cancel token fires, tailers get the grace period to finish; any still running
    /// after it are aborted.
    pub async fn join(mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.tasks.join_next() => match next {
                    Some(result) => report.record(result),
                    None => return report,
                },
            }
        }

        let deadline = tokio::time::sleep(self.grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(remaining = self.tasks.len(), "Grace period elapsed, aborting remaining tailers");
                    self.tasks.abort_all();
                    while let Some(result) = self.tasks.join_next().await {
                        report.record(result);
                    }
                    break;
                }
                next = self.tasks.join_next() => match next {
                    Some(result) => report.record(result),
                    None => break,
                },
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            aborted = report.aborted,
            "Supervisor stopped"
        );
        report
    }
}
