use std::sync::mpsc;
use std::thread;

use onepager_core::{ArtifactFailure, ArtifactReady, Effect, Msg};
use onepager_engine::{EngineEvent, EngineHandle, ServiceError};
use onepager_logging::{wizard_debug, wizard_info, wizard_warn};

use super::app::AppEvent;

/// Executes wizard effects on the engine and feeds engine results back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, event_tx: mpsc::Sender<AppEvent>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(event_tx);
        runner
    }

    pub fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LookupSuggestions { generation, query } => {
                    wizard_debug!("Lookup #{} query_len={}", generation, query.len());
                    self.engine.lookup_suggestions(generation, query);
                }
                Effect::FindCompany {
                    task_id,
                    website_url,
                } => {
                    wizard_info!("FindCompany #{} {}", task_id, website_url);
                    self.engine.find_company(task_id, website_url);
                }
                Effect::GenerateOperations {
                    task_id,
                    company_name,
                    website_url,
                } => {
                    wizard_info!("GenerateOperations #{} for {}", task_id, company_name);
                    self.engine
                        .generate_operations(task_id, company_name, website_url);
                }
                Effect::SaveOperations {
                    company_name,
                    website_url,
                    selected,
                } => self
                    .engine
                    .save_operations(company_name, website_url, selected),
                Effect::ValidateExcel { task_id, file } => {
                    wizard_info!("ValidateExcel #{} {}", task_id, file.name);
                    self.engine.validate_excel(task_id, file);
                }
                Effect::GenerateArtifact { task_id, request } => {
                    wizard_info!(
                        "GenerateArtifact #{} for {} ({} operations)",
                        task_id,
                        request.company_name,
                        request.operations_selected.len()
                    );
                    self.engine.generate_artifact(task_id, request);
                }
                Effect::CancelTask { kind } => self.engine.cancel(kind),
                Effect::DismissBannerAfter { banner_id, after } => {
                    self.engine.schedule_timer(banner_id, after);
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    fn spawn_event_loop(&self, event_tx: mpsc::Sender<AppEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || {
            while let Some(event) = engine.recv() {
                let Some(msg) = event_to_msg(event) else {
                    continue;
                };
                if event_tx.send(AppEvent::Msg(msg)).is_err() {
                    break;
                }
            }
        });
    }
}

pub fn event_to_msg(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::Suggestions {
            generation,
            source,
            suggestions,
        } => Msg::SuggestionsLoaded {
            generation,
            source,
            suggestions,
        },
        EngineEvent::CompanyMatches { task_id, matches } => Msg::CompanyFound { task_id, matches },
        EngineEvent::OperationsGenerated { task_id, result } => Msg::OperationsLoaded {
            task_id,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::ExcelValidated { task_id, result } => Msg::ExcelValidated {
            task_id,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::ArtifactSaved { task_id, result } => Msg::ArtifactFinished {
            task_id,
            result: match result {
                Ok(saved) => Ok(ArtifactReady {
                    path: saved.path,
                    filename: saved.filename,
                    digest: saved.digest,
                    notice: saved.notice,
                }),
                Err(err) => Err(artifact_failure(err)?),
            },
        },
        EngineEvent::TimerFired { banner_id } => Msg::BannerExpired { banner_id },
        EngineEvent::WorkflowFinished { .. } => {
            wizard_warn!("Workflow result arrived during the one-pager wizard");
            return None;
        }
    };
    Some(msg)
}

fn artifact_failure(err: ServiceError) -> Option<ArtifactFailure> {
    let failure = match err {
        ServiceError::Cancelled => return None,
        ServiceError::Rejected { message } => ArtifactFailure::Validation { message },
        ServiceError::Unreachable { attempts } => ArtifactFailure::Connectivity { attempts },
        other => ArtifactFailure::Local {
            message: other.to_string(),
        },
    };
    Some(failure)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn service_errors_map_to_wizard_failures() {
        let rejected = event_to_msg(EngineEvent::ArtifactSaved {
            task_id: 4,
            result: Err(ServiceError::Rejected {
                message: "missing sheets".to_string(),
            }),
        });
        assert_eq!(
            rejected,
            Some(Msg::ArtifactFinished {
                task_id: 4,
                result: Err(ArtifactFailure::Validation {
                    message: "missing sheets".to_string()
                }),
            })
        );

        let persist = event_to_msg(EngineEvent::ArtifactSaved {
            task_id: 5,
            result: Err(ServiceError::Persist("disk full".to_string())),
        });
        assert_eq!(
            persist,
            Some(Msg::ArtifactFinished {
                task_id: 5,
                result: Err(ArtifactFailure::Local {
                    message: "could not save result: disk full".to_string()
                }),
            })
        );

        let cancelled = event_to_msg(EngineEvent::ArtifactSaved {
            task_id: 6,
            result: Err(ServiceError::Cancelled),
        });
        assert_eq!(cancelled, None);
    }

    #[test]
    fn timers_and_workflows() {
        assert_eq!(
            event_to_msg(EngineEvent::TimerFired { banner_id: 9 }),
            Some(Msg::BannerExpired { banner_id: 9 })
        );
        assert_eq!(
            event_to_msg(EngineEvent::WorkflowFinished {
                result: Err(ServiceError::Upload {
                    path: PathBuf::from("x.png"),
                    message: "gone".to_string()
                })
            }),
            None
        );
    }
}
