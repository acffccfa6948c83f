use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use onepager_core::{
    messages, update, ActiveForm, ArtifactFailure, ArtifactReady, BannerKind, Effect, Msg, Role,
    SelectedOperation, StepId, SuggestedOperation, TaskId, TaskKind, TurnCategory, UploadedFile,
    WizardState,
};
use pretty_assertions::assert_eq;

const COMPANY: &str = "Aarti Drugs Limited";
const WEBSITE: &str = "https://www.aartidrugs.co.in";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(onepager_logging::initialize_for_tests);
}

fn apply(state: WizardState, msgs: Vec<Msg>) -> (WizardState, Vec<Effect>) {
    msgs.into_iter().fold((state, Vec::new()), |(state, _), msg| update(state, msg))
}

fn submit_company(state: WizardState, name: &str, url: &str) -> (WizardState, Vec<Effect>) {
    apply(
        state,
        vec![
            Msg::CompanyNameChanged(name.to_string()),
            Msg::WebsiteChanged(url.to_string()),
            Msg::SubmitStep(StepId::CompanyDetails),
        ],
    )
}

fn operations_task(effects: &[Effect]) -> TaskId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::GenerateOperations { task_id, .. } => Some(*task_id),
            _ => None,
        })
        .expect("operations generation requested")
}

fn artifact_task(effects: &[Effect]) -> TaskId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::GenerateArtifact { task_id, .. } => Some(*task_id),
            _ => None,
        })
        .expect("artifact generation requested")
}

fn suggested(count: usize) -> Vec<SuggestedOperation> {
    (1..=count)
        .map(|n| SuggestedOperation {
            key: format!("Operation {n}"),
            value: format!("Detail for operation {n}"),
        })
        .collect()
}

fn workbook(name: &str) -> UploadedFile {
    UploadedFile {
        name: name.to_string(),
        path: PathBuf::from(format!("/tmp/{name}")),
        size: 2048,
    }
}

/// Company submitted, five suggestions loaded, first one selected, upload step reached.
fn at_upload_step() -> WizardState {
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, _) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Ok(suggested(5)),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::OperationToggled(0),
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );
    assert_eq!(state.step(), StepId::FileUpload);
    state
}

fn user_turn(state: &WizardState, category: TurnCategory) -> u64 {
    state
        .transcript()
        .iter()
        .find(|t| t.role == Role::User && t.category == Some(category))
        .map(|t| t.id)
        .expect("user turn present")
}

#[test]
fn new_wizard_shows_welcome_and_company_form() {
    init_logging();
    let state = WizardState::new();
    let view = state.view();

    assert_eq!(view.step, StepId::CompanyDetails);
    assert_eq!(view.turns.len(), 1);
    assert_eq!(view.turns[0].text, messages::WELCOME);
    assert!(view.turns[0].is_active_prompt);
    assert!(matches!(
        view.active_form,
        Some(ActiveForm::CompanyDetails { .. })
    ));
}

#[test]
fn company_submission_appends_request_turn_and_starts_operations() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);

    let user_turns: Vec<_> = state
        .transcript()
        .iter()
        .filter(|t| t.role == Role::User)
        .collect();
    assert_eq!(user_turns.len(), 1);
    assert_eq!(
        user_turns[0].text,
        "I'd like to generate a one-pager for Aarti Drugs Limited (https://www.aartidrugs.co.in)"
    );
    assert_eq!(
        state.transcript().last().map(|t| t.text.as_str()),
        Some(messages::ABOUT_PROMPT)
    );
    assert_eq!(state.step(), StepId::AboutPreferences);
    assert!(state.is_pending(TaskKind::OperationsGenerate));
    assert!(state.operations().loading);
    assert!(effects.contains(&Effect::GenerateOperations {
        task_id: operations_task(&effects),
        company_name: COMPANY.to_string(),
        website_url: WEBSITE.to_string(),
    }));
}

#[test]
fn company_submission_requires_both_fields() {
    init_logging();
    let (state, effects) = apply(
        WizardState::new(),
        vec![
            Msg::WebsiteChanged(WEBSITE.to_string()),
            Msg::SubmitStep(StepId::CompanyDetails),
        ],
    );

    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::CompanyDetails);
    assert_eq!(state.transcript().len(), 1);
    assert_eq!(state.inline_error(), Some(messages::COMPANY_REQUIRED));
}

#[test]
fn submitting_an_inactive_step_is_ignored() {
    init_logging();
    let state = WizardState::new();
    let (next, effects) = update(state.clone(), Msg::SubmitStep(StepId::FileUpload));

    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn full_wizard_reaches_done_with_download_turn() {
    init_logging();
    let state = at_upload_step();

    let (state, effects) = update(state, Msg::FileSelected(workbook("financials.xlsx")));
    assert!(matches!(effects[0], Effect::DismissBannerAfter { after, .. } if after == Duration::from_secs(4)));
    assert!(matches!(effects[1], Effect::ValidateExcel { .. }));

    let (state, effects) = update(state, Msg::SubmitStep(StepId::FileUpload));
    let task_id = artifact_task(&effects);
    match &effects[0] {
        Effect::GenerateArtifact { request, .. } => {
            assert_eq!(request.company_name, COMPANY);
            assert_eq!(
                request.operations_selected,
                vec![SelectedOperation {
                    key: "Operation 1".to_string(),
                    value: "Detail for operation 1".to_string(),
                }]
            );
            assert_eq!(request.excel_file.name, "financials.xlsx");
        }
        other => panic!("unexpected effect {other:?}"),
    }
    assert!(state.generation_started());
    assert!(state.view().generating);
    assert_eq!(
        state.transcript().last().map(|t| t.text.clone()),
        Some(messages::file_uploaded("financials.xlsx"))
    );

    let (state, _) = update(
        state,
        Msg::ArtifactFinished {
            task_id,
            result: Ok(ArtifactReady {
                path: PathBuf::from("/tmp/out/Aarti_Drugs_Limited_one_pager.pptx"),
                filename: "Aarti_Drugs_Limited_one_pager.pptx".to_string(),
                digest: "abc123".to_string(),
                notice: None,
            }),
        },
    );

    let view = state.view();
    assert_eq!(view.step, StepId::Done);
    assert!(view.active_form.is_none());
    assert!(view.turns.iter().all(|t| !t.show_edit));
    let last = view.turns.last().expect("done turn");
    assert_eq!(last.text, messages::GENERATED);
    assert_eq!(
        last.attachment.as_ref().map(|a| a.label.as_str()),
        Some("Aarti_Drugs_Limited_one_pager.pptx")
    );
    assert_eq!(
        state.artifact().map(|a| a.digest.as_str()),
        Some("abc123")
    );
}

#[test]
fn operations_submission_saves_selection() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, effects) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Ok(suggested(3)),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::OperationToggled(2),
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );

    assert_eq!(state.step(), StepId::FileUpload);
    assert_eq!(
        effects,
        vec![Effect::SaveOperations {
            company_name: COMPANY.to_string(),
            website_url: WEBSITE.to_string(),
            selected: vec![SelectedOperation {
                key: "Operation 3".to_string(),
                value: "Detail for operation 3".to_string(),
            }],
        }]
    );
}

#[test]
fn operations_step_requires_a_selection_once_options_exist() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, effects) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Ok(suggested(2)),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );

    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::OperationsPreferences);
    assert_eq!(
        state.operations().selection_error.as_deref(),
        Some(messages::SELECT_ONE_OPERATION)
    );

    let (state, _) = update(state, Msg::OperationToggled(1));
    assert_eq!(state.operations().selection_error, None);
}

#[test]
fn operations_step_waits_while_generation_is_pending() {
    init_logging();
    let (state, _) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let (state, effects) = apply(
        state,
        vec![
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );

    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::OperationsPreferences);
    assert_eq!(
        state.operations().selection_error.as_deref(),
        Some(messages::OPERATIONS_LOADING)
    );
}

#[test]
fn failed_operations_generation_lets_the_wizard_continue() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, effects) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Err("all candidates failed".to_string()),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );

    assert_eq!(state.step(), StepId::FileUpload);
    assert!(effects.is_empty());
    assert_eq!(
        state.operations().notice.as_deref(),
        Some(messages::OPERATIONS_UNAVAILABLE)
    );
}

#[test]
fn user_added_operations_are_validated_and_capped() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, _) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Ok(suggested(1)),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::OperationAdded {
                heading: "  ".to_string(),
                description: "Something".to_string(),
            },
        ],
    );
    assert_eq!(
        state.operations().create_error.as_deref(),
        Some(messages::OPERATION_FIELDS_REQUIRED)
    );

    let (state, _) = update(
        state,
        Msg::OperationAdded {
            heading: "h".repeat(81),
            description: "Something".to_string(),
        },
    );
    assert_eq!(
        state.operations().create_error.as_deref(),
        Some(messages::OPERATION_FIELDS_TOO_LONG)
    );

    let add = |n: usize| Msg::OperationAdded {
        heading: format!("Custom {n}"),
        description: format!("Custom description {n}"),
    };
    let (state, _) = apply(state, vec![add(1), add(2)]);
    assert_eq!(state.operations().create_error, None);
    assert_eq!(state.operations().user_added_count(), 2);
    assert_eq!(state.operations().selected().count(), 2);

    let (state, _) = update(state, add(3));
    assert_eq!(state.operations().user_added_count(), 2);
    assert_eq!(
        state.operations().create_error.as_deref(),
        Some(messages::USER_ADDED_LIMIT)
    );
    match state.view().active_form {
        Some(ActiveForm::OperationsPreferences {
            user_added_remaining,
            options,
            ..
        }) => {
            assert_eq!(user_added_remaining, 0);
            assert_eq!(options.len(), 3);
            assert!(options[2].user_added);
        }
        other => panic!("unexpected form {other:?}"),
    }
}

#[test]
fn editing_company_details_discards_operations_and_restarts_generation() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let first_task = operations_task(&effects);
    let (state, _) = update(
        state,
        Msg::OperationsLoaded {
            task_id: first_task,
            result: Ok(suggested(5)),
        },
    );
    assert_eq!(state.operations().options.len(), 5);

    let company_turn = user_turn(&state, TurnCategory::CompanyDetails);
    let (state, effects) = update(state, Msg::EditTurn(company_turn));

    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::CompanyDetails);
    assert_eq!(state.transcript().len(), 1);
    assert_eq!(state.transcript()[0].text, messages::WELCOME);
    assert!(state.operations().options.is_empty());
    assert_eq!(state.company().company_name, COMPANY);

    let (state, effects) = submit_company(state, "Zomato Limited", "https://www.zomato.com");
    let second_task = operations_task(&effects);
    assert_ne!(first_task, second_task);
    assert!(effects.contains(&Effect::GenerateOperations {
        task_id: second_task,
        company_name: "Zomato Limited".to_string(),
        website_url: "https://www.zomato.com".to_string(),
    }));

    // A late answer for the first company is dropped.
    let (state, _) = update(
        state,
        Msg::OperationsLoaded {
            task_id: first_task,
            result: Ok(suggested(5)),
        },
    );
    assert!(state.operations().options.is_empty());
    assert!(state.is_pending(TaskKind::OperationsGenerate));
}

#[test]
fn editing_keeps_the_edited_step_prompt_as_last_turn() {
    init_logging();
    let state = at_upload_step();

    let about_turn = user_turn(&state, TurnCategory::AboutPreferences);
    let (about, _) = update(state.clone(), Msg::EditTurn(about_turn));
    assert_eq!(about.step(), StepId::AboutPreferences);
    assert_eq!(
        about.transcript().last().map(|t| t.text.as_str()),
        Some(messages::ABOUT_PROMPT)
    );
    assert!(about.view().turns.last().is_some_and(|t| t.is_active_prompt));

    let operations_turn = user_turn(&state, TurnCategory::OperationsPreferences);
    let (operations, effects) = update(state, Msg::EditTurn(operations_turn));
    assert!(effects.is_empty());
    assert_eq!(operations.step(), StepId::OperationsPreferences);
    assert_eq!(
        operations.transcript().last().map(|t| t.text.as_str()),
        Some(messages::OPERATIONS_PROMPT)
    );
    assert_eq!(operations.operations().options.len(), 5);
}

#[test]
fn operation_edits_survive_revisiting_the_step() {
    init_logging();
    let (state, effects) = submit_company(WizardState::new(), COMPANY, WEBSITE);
    let task_id = operations_task(&effects);
    let (state, effects) = apply(
        state,
        vec![
            Msg::OperationsLoaded {
                task_id,
                result: Ok(suggested(3)),
            },
            Msg::SubmitStep(StepId::AboutPreferences),
            Msg::OperationToggled(1),
            Msg::OperationKeyEdited {
                index: 1,
                text: "API manufacturing".to_string(),
            },
            Msg::OperationKeyCommitted(1),
            Msg::OperationValueEdited {
                index: 1,
                text: "Four USFDA approved plants".to_string(),
            },
            Msg::SubmitStep(StepId::OperationsPreferences),
        ],
    );
    assert_eq!(
        effects,
        vec![Effect::SaveOperations {
            company_name: COMPANY.to_string(),
            website_url: WEBSITE.to_string(),
            selected: vec![SelectedOperation {
                key: "API manufacturing".to_string(),
                value: "Four USFDA approved plants".to_string(),
            }],
        }]
    );

    let operations_turn = user_turn(&state, TurnCategory::OperationsPreferences);
    let (state, _) = update(state, Msg::EditTurn(operations_turn));
    let option = &state.operations().options[1];
    assert_eq!(option.effective_key(), "API manufacturing");
    assert_eq!(option.effective_value(), "Four USFDA approved plants");
    assert_eq!(option.key, "Operation 2");
    assert!(option.selected);
}

#[test]
fn editing_is_locked_once_generation_started() {
    init_logging();
    let (state, _) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let company_turn = user_turn(&state, TurnCategory::CompanyDetails);

    let (next, effects) = update(state.clone(), Msg::EditTurn(company_turn));

    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn marking_generation_started_is_idempotent() {
    let mut once = WizardState::new();
    once.mark_generation_started();
    let mut twice = WizardState::new();
    twice.mark_generation_started();
    twice.mark_generation_started();

    assert_eq!(once, twice);
    assert!(twice.generation_started());
}

#[test]
fn missing_file_blocks_with_the_same_message_on_every_visit() {
    init_logging();
    let (first, effects) = update(at_upload_step(), Msg::SubmitStep(StepId::FileUpload));
    assert!(effects.is_empty());
    assert_eq!(first.excel_error(), Some(messages::FILE_REQUIRED));
    assert!(!first.generation_started());

    let operations_turn = user_turn(&first, TurnCategory::OperationsPreferences);
    let (revisited, _) = apply(
        first,
        vec![
            Msg::EditTurn(operations_turn),
            Msg::SubmitStep(StepId::OperationsPreferences),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    assert_eq!(revisited.step(), StepId::FileUpload);
    assert_eq!(revisited.excel_error(), Some(messages::FILE_REQUIRED));

    let (failed, effects) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let task_id = artifact_task(&effects);
    let (failed, _) = apply(
        failed,
        vec![
            Msg::ArtifactFinished {
                task_id,
                result: Err(ArtifactFailure::Validation {
                    message: "missing sheets".to_string(),
                }),
            },
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    assert_eq!(failed.excel_error(), Some(messages::FILE_REQUIRED));
}

#[test]
fn wrong_file_type_is_rejected_locally() {
    init_logging();
    let (state, effects) = update(at_upload_step(), Msg::FileSelected(workbook("notes.pdf")));

    assert!(effects.is_empty());
    assert!(state.upload().is_none());
    assert_eq!(state.excel_error(), Some(messages::INVALID_FILE_TYPE));
}

#[test]
fn validation_failure_keeps_the_error_until_a_new_file_is_attached() {
    init_logging();
    let (state, effects) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let task_id = artifact_task(&effects);
    let (state, effects) = update(
        state,
        Msg::ArtifactFinished {
            task_id,
            result: Err(ArtifactFailure::Validation {
                message: "missing sheets".to_string(),
            }),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::Failed);
    assert_eq!(state.active_step(), Some(StepId::FileUpload));
    assert!(state.upload().is_none());
    let expected = messages::excel_rejected("missing sheets");
    assert_eq!(state.excel_error(), Some(expected.as_str()));
    match state.view().active_form {
        Some(ActiveForm::FileUpload { error, .. }) => assert_eq!(error, Some(expected)),
        other => panic!("unexpected form {other:?}"),
    }

    let (state, effects) = apply(
        state,
        vec![
            Msg::FileSelected(workbook("fixed.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    assert_eq!(state.excel_error(), None);
    assert_eq!(state.step(), StepId::Generating);
    assert_ne!(artifact_task(&effects), task_id);
}

#[test]
fn connectivity_failure_shows_transient_banner_and_allows_resubmit() {
    init_logging();
    let (state, effects) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let task_id = artifact_task(&effects);
    let (state, effects) = update(
        state,
        Msg::ArtifactFinished {
            task_id,
            result: Err(ArtifactFailure::Connectivity { attempts: 8 }),
        },
    );

    assert_eq!(state.step(), StepId::Failed);
    let banner = state.banner().cloned().expect("error banner");
    assert_eq!(banner.text, messages::CONNECTIVITY_FAILURE);
    assert_eq!(
        effects,
        vec![Effect::DismissBannerAfter {
            banner_id: banner.id,
            after: Duration::from_secs(5),
        }]
    );
    assert!(state.upload().is_some());

    let (state, _) = update(
        state,
        Msg::BannerExpired {
            banner_id: banner.id,
        },
    );
    assert!(state.banner().is_none());

    let (state, effects) = update(state, Msg::SubmitStep(StepId::FileUpload));
    assert_eq!(state.step(), StepId::Generating);
    assert!(artifact_task(&effects) > task_id);
}

#[test]
fn local_failure_keeps_the_upload_and_explains_itself() {
    init_logging();
    let (state, effects) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let task_id = artifact_task(&effects);
    let (state, _) = update(
        state,
        Msg::ArtifactFinished {
            task_id,
            result: Err(ArtifactFailure::Local {
                message: "disk full".to_string(),
            }),
        },
    );

    assert_eq!(state.step(), StepId::Failed);
    assert_eq!(state.excel_error(), None);
    assert!(state.upload().is_some());
    let banner = state.banner().cloned().expect("error banner");
    assert_eq!(banner.kind, BannerKind::Error);
    assert_eq!(banner.text, messages::generation_failed("disk full"));
}

#[test]
fn cancelled_generation_never_applies_its_result() {
    init_logging();
    let (state, effects) = apply(
        at_upload_step(),
        vec![
            Msg::FileSelected(workbook("financials.xlsx")),
            Msg::SubmitStep(StepId::FileUpload),
        ],
    );
    let task_id = artifact_task(&effects);

    let (state, effects) = update(state, Msg::CancelGeneration);
    assert_eq!(
        effects,
        vec![Effect::CancelTask {
            kind: TaskKind::ArtifactGenerate
        }]
    );
    assert_eq!(state.step(), StepId::FileUpload);
    assert!(state.banner().is_none_or(|b| b.kind != BannerKind::Error));
    assert_eq!(state.excel_error(), None);

    let (state, effects) = update(
        state,
        Msg::ArtifactFinished {
            task_id,
            result: Ok(ArtifactReady {
                path: PathBuf::from("/tmp/late.pptx"),
                filename: "late.pptx".to_string(),
                digest: "ff".to_string(),
                notice: None,
            }),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.step(), StepId::FileUpload);
    assert!(state.artifact().is_none());

    let (_, effects) = update(state, Msg::CancelGeneration);
    assert!(effects.is_empty());
}
