use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use onepager_core::{ArtifactRequest, SelectedOperation, TaskId, TaskKind, UploadedFile};
use onepager_logging::{wizard_debug, wizard_info};
use tokio_util::sync::CancellationToken;

use crate::fetch::build_client;
use crate::lookup::CompanyLookup;
use crate::{BackendConfig, EngineEvent, FetchError, OnePagerService, ServiceError, WorkflowRequest};

enum EngineCommand {
    LookupSuggestions {
        generation: TaskId,
        query: String,
    },
    FindCompany {
        task_id: TaskId,
        website_url: String,
    },
    GenerateOperations {
        task_id: TaskId,
        company_name: String,
        website_url: String,
    },
    SaveOperations {
        company_name: String,
        website_url: String,
        selected: Vec<SelectedOperation>,
    },
    ValidateExcel {
        task_id: TaskId,
        file: UploadedFile,
    },
    GenerateArtifact {
        task_id: TaskId,
        request: ArtifactRequest,
    },
    RunWorkflow {
        request: WorkflowRequest,
    },
    Cancel {
        kind: TaskKind,
    },
    ScheduleTimer {
        banner_id: u64,
        after: Duration,
    },
    Shutdown,
}

impl EngineCommand {
    /// The kind this command starts; starting a kind cancels its predecessor.
    fn task_kind(&self) -> Option<TaskKind> {
        match self {
            EngineCommand::LookupSuggestions { .. } => Some(TaskKind::SuggestionLookup),
            EngineCommand::FindCompany { .. } => Some(TaskKind::FindCompany),
            EngineCommand::GenerateOperations { .. } => Some(TaskKind::OperationsGenerate),
            EngineCommand::ValidateExcel { .. } => Some(TaskKind::ExcelValidate),
            EngineCommand::GenerateArtifact { .. } => Some(TaskKind::ArtifactGenerate),
            _ => None,
        }
    }
}

struct Workers {
    service: OnePagerService,
    lookup: CompanyLookup,
}

/// Front-end handle to the engine thread. Clones share the same thread.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(config: BackendConfig) -> Result<Self, FetchError> {
        let client = build_client(&config)?;
        let workers = Arc::new(Workers {
            lookup: CompanyLookup::from_config(client.clone(), &config),
            service: OnePagerService::with_client(client, config),
        });
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let root = CancellationToken::new();
            let mut live: HashMap<TaskKind, CancellationToken> = HashMap::new();

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Shutdown => break,
                    EngineCommand::Cancel { kind } => {
                        if let Some(token) = live.remove(&kind) {
                            wizard_debug!("Cancelling {:?}", kind);
                            token.cancel();
                        }
                    }
                    command => {
                        let cancel = root.child_token();
                        if let Some(kind) = command.task_kind() {
                            if let Some(previous) = live.insert(kind, cancel.clone()) {
                                previous.cancel();
                            }
                        }
                        let workers = workers.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            handle_command(&workers, command, &cancel, &event_tx).await;
                        });
                    }
                }
            }

            root.cancel();
            wizard_info!("Engine stopped");
        });

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn lookup_suggestions(&self, generation: TaskId, query: impl Into<String>) {
        self.send(EngineCommand::LookupSuggestions {
            generation,
            query: query.into(),
        });
    }

    pub fn find_company(&self, task_id: TaskId, website_url: impl Into<String>) {
        self.send(EngineCommand::FindCompany {
            task_id,
            website_url: website_url.into(),
        });
    }

    pub fn generate_operations(&self, task_id: TaskId, company_name: String, website_url: String) {
        self.send(EngineCommand::GenerateOperations {
            task_id,
            company_name,
            website_url,
        });
    }

    pub fn save_operations(
        &self,
        company_name: String,
        website_url: String,
        selected: Vec<SelectedOperation>,
    ) {
        self.send(EngineCommand::SaveOperations {
            company_name,
            website_url,
            selected,
        });
    }

    pub fn validate_excel(&self, task_id: TaskId, file: UploadedFile) {
        self.send(EngineCommand::ValidateExcel { task_id, file });
    }

    pub fn generate_artifact(&self, task_id: TaskId, request: ArtifactRequest) {
        self.send(EngineCommand::GenerateArtifact { task_id, request });
    }

    pub fn run_workflow(&self, request: WorkflowRequest) {
        self.send(EngineCommand::RunWorkflow { request });
    }

    pub fn cancel(&self, kind: TaskKind) {
        self.send(EngineCommand::Cancel { kind });
    }

    pub fn schedule_timer(&self, banner_id: u64, after: Duration) {
        self.send(EngineCommand::ScheduleTimer { banner_id, after });
    }

    /// Stop the engine thread; in-flight work is cancelled and reports nothing.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    /// Block until the next event; `None` once the engine has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }
}

/// Wrap a result for delivery; cancelled work is dropped silently.
fn deliver<T>(
    cancel: &CancellationToken,
    result: Result<T, ServiceError>,
) -> Option<Result<T, ServiceError>> {
    if cancel.is_cancelled() || matches!(result, Err(ServiceError::Cancelled)) {
        return None;
    }
    Some(result)
}

async fn handle_command(
    workers: &Workers,
    command: EngineCommand,
    cancel: &CancellationToken,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::LookupSuggestions { generation, query } => {
            let emit = |source, suggestions| {
                let _ = event_tx.send(EngineEvent::Suggestions {
                    generation,
                    source,
                    suggestions,
                });
            };
            workers.lookup.lookup(&query, cancel, &emit).await;
            None
        }
        EngineCommand::FindCompany {
            task_id,
            website_url,
        } => workers
            .lookup
            .find_company(&website_url, cancel)
            .await
            .map(|matches| EngineEvent::CompanyMatches { task_id, matches }),
        EngineCommand::GenerateOperations {
            task_id,
            company_name,
            website_url,
        } => {
            let result = workers
                .service
                .generate_operations(&company_name, &website_url, cancel)
                .await;
            deliver(cancel, result).map(|result| EngineEvent::OperationsGenerated { task_id, result })
        }
        EngineCommand::SaveOperations {
            company_name,
            website_url,
            selected,
        } => {
            workers
                .service
                .save_operations(&company_name, &website_url, &selected)
                .await;
            None
        }
        EngineCommand::ValidateExcel { task_id, file } => {
            let result = workers.service.validate_excel(&file, cancel).await;
            deliver(cancel, result).map(|result| EngineEvent::ExcelValidated { task_id, result })
        }
        EngineCommand::GenerateArtifact { task_id, request } => {
            let result = workers.service.generate_artifact(&request, cancel).await;
            deliver(cancel, result).map(|result| EngineEvent::ArtifactSaved { task_id, result })
        }
        EngineCommand::RunWorkflow { request } => {
            let result = workers.service.run_workflow(&request, cancel).await;
            deliver(cancel, result).map(|result| EngineEvent::WorkflowFinished { result })
        }
        EngineCommand::ScheduleTimer { banner_id, after } => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                _ = tokio::time::sleep(after) => Some(EngineEvent::TimerFired { banner_id }),
            }
        }
        EngineCommand::Cancel { .. } | EngineCommand::Shutdown => None,
    };
    if let Some(event) = event {
        let _ = event_tx.send(event);
    }
}
