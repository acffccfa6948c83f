use std::time::Duration;

use onepager_logging::{wizard_debug, wizard_info, wizard_warn};

use crate::operations::{
    truncate_chars, OperationOption, OperationOrigin, MAX_DESCRIPTION_CHARS, MAX_HEADING_CHARS,
    MAX_USER_ADDED_OPERATIONS,
};
use crate::state::{ArtifactSummary, Attachment};
use crate::{
    ArtifactFailure, ArtifactReady, ArtifactRequest, BannerKind, CompanySuggestion, Effect, Msg,
    Role, SelectedOperation, StepId, SuggestedOperation, TaskId, TaskKind, TaskStatus, TurnCategory,
    TurnId, UploadedFile, WizardState,
};

const SUCCESS_BANNER_TTL: Duration = Duration::from_secs(4);
const ERROR_BANNER_TTL: Duration = Duration::from_secs(5);
const ACCEPTED_UPLOAD_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

/// User-facing texts of the wizard.
pub mod messages {
    pub const WELCOME: &str = "Welcome to the Company One-Pager workflow. You can either enter the company name directly or find the company using its website URL. You will also need to upload a financial Excel file with the required data.";
    pub const ABOUT_PROMPT: &str = "Great! Now let's customize what information you'd like to include in the about section of your one-pager.";
    pub const OPERATIONS_PROMPT: &str = "Now choose which operations to include in your one-pager.";
    pub const UPLOAD_PROMPT: &str = "Please upload the detailed version of the company's financials (Excel from PrivateCircle) that includes shareholding and financial data. We use this file to accurately fill out your output one-pager.";
    pub const GENERATED: &str =
        "One-pager generated successfully! You can download the PowerPoint file below.";
    pub const ABOUT_CONFIGURED: &str = "I've configured my about section preferences";
    pub const OPERATIONS_CONFIGURED: &str = "I've configured operations preferences";
    pub const COMPANY_REQUIRED: &str = "Please enter both the company name and the website URL.";
    pub const SELECT_ONE_OPERATION: &str = "Please select at least one operation.";
    pub const OPERATIONS_LOADING: &str =
        "Operation options are still loading. Please wait a moment.";
    pub const OPERATIONS_UNAVAILABLE: &str =
        "Could not load operations options. You can continue without them.";
    pub const USER_ADDED_LIMIT: &str = "You have reached the max limit of 2 manually added operations. If you want to add more, please edit from the options above.";
    pub const OPERATION_FIELDS_REQUIRED: &str =
        "Heading and Description are required to add an operation.";
    pub const OPERATION_FIELDS_TOO_LONG: &str =
        "One or more fields exceed their maximum length (80 for heading, 300 for description).";
    pub const FILE_REQUIRED: &str = "Excel file upload is required. Please upload a financial Excel file with the required data.";
    pub const INVALID_FILE_TYPE: &str =
        "Please upload a valid Excel file (.xlsx, .xls) or CSV file.";
    pub const COMPANY_WITHOUT_NAME: &str =
        "Company found but no name available. Please enter manually.";
    pub const CONNECTIVITY_FAILURE: &str =
        "We couldn't reach the one-pager service. Please try again.";

    pub fn company_request(company_name: &str, website_url: &str) -> String {
        format!("I'd like to generate a one-pager for {company_name} ({website_url})")
    }

    pub fn file_uploaded(file_name: &str) -> String {
        format!("I've uploaded the financial file: {file_name}")
    }

    pub fn upload_accepted(file_name: &str) -> String {
        format!("Successfully uploaded: {file_name}")
    }

    pub fn company_found(company_name: &str) -> String {
        format!("Successfully found: {company_name}")
    }

    pub fn company_not_found(website_url: &str) -> String {
        format!("No company found for \"{website_url}\". Please enter the company name manually.")
    }

    pub fn generation_failed(detail: &str) -> String {
        format!("Generating the one-pager failed: {detail}")
    }

    pub fn excel_rejected(detail: &str) -> String {
        format!("The Excel file failed validation: {detail}. Please upload an Excel file with correct financials from Private Circle.")
    }
}

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WizardState, msg: Msg) -> (WizardState, Vec<Effect>) {
    let effects = match msg {
        Msg::CompanyNameChanged(text) => company_name_changed(&mut state, text),
        Msg::WebsiteChanged(text) => {
            if state.active_step == Some(StepId::CompanyDetails) {
                state.company.website_url = text;
                state.inline_error = None;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SuggestionPicked(index) => suggestion_picked(&mut state, index),
        Msg::SuggestionsDismissed => {
            state.suggestions.hide();
            state.mark_dirty();
            Vec::new()
        }
        Msg::FindCompanyClicked => find_company_clicked(&mut state),
        Msg::CompanyFound { task_id, matches } => company_found(&mut state, task_id, matches),
        Msg::SuggestionsLoaded {
            generation,
            source,
            suggestions,
        } => {
            if state.accepts(TaskKind::SuggestionLookup, generation) {
                state.settle_task(TaskKind::SuggestionLookup, generation, TaskStatus::Resolved);
                state.suggestions.apply(generation, source, suggestions);
                state.mark_dirty();
            } else {
                wizard_debug!("Dropping stale suggestions from lookup {}", generation);
            }
            Vec::new()
        }
        Msg::AboutToggled(field) => {
            if state.active_step == Some(StepId::AboutPreferences) {
                state.about.toggle(field);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::OperationToggled(index) => {
            with_operation(&mut state, index, |opt| opt.selected = !opt.selected);
            if state.operations.selected().next().is_some() {
                state.operations.selection_error = None;
            }
            Vec::new()
        }
        Msg::OperationKeyEdited { index, text } => {
            with_operation(&mut state, index, |opt| opt.draft_key(&text));
            Vec::new()
        }
        Msg::OperationKeyCommitted(index) => {
            with_operation(&mut state, index, OperationOption::commit_key);
            Vec::new()
        }
        Msg::OperationKeyReverted(index) => {
            with_operation(&mut state, index, OperationOption::revert_key);
            Vec::new()
        }
        Msg::OperationValueEdited { index, text } => {
            with_operation(&mut state, index, |opt| opt.edit_value(&text));
            Vec::new()
        }
        Msg::OperationAdded {
            heading,
            description,
        } => {
            operation_added(&mut state, &heading, &description);
            Vec::new()
        }
        Msg::OperationsQueryChanged(text) => {
            if state.active_step == Some(StepId::OperationsPreferences) {
                state.operations.query = text;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::OperationsLoaded { task_id, result } => operations_loaded(&mut state, task_id, result),
        Msg::FileSelected(file) => file_selected(&mut state, file),
        Msg::ExcelValidated { task_id, result } => {
            if state.accepts(TaskKind::ExcelValidate, task_id) {
                match result {
                    Ok(notice) => {
                        state.settle_task(TaskKind::ExcelValidate, task_id, TaskStatus::Resolved);
                        state.excel_notice = Some(notice);
                    }
                    Err(reason) => {
                        // Generation validates again; a failed pre-check never blocks.
                        wizard_warn!("Excel pre-validation unavailable: {}", reason);
                        state.settle_task(TaskKind::ExcelValidate, task_id, TaskStatus::Rejected);
                    }
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmitStep(step) => submit_step(&mut state, step),
        Msg::EditTurn(turn_id) => edit_turn(&mut state, turn_id),
        Msg::ArtifactFinished { task_id, result } => artifact_finished(&mut state, task_id, result),
        Msg::CancelGeneration => {
            if state.abort_task(TaskKind::ArtifactGenerate) {
                wizard_info!("Generation cancelled by user");
                state.step = StepId::FileUpload;
                state.active_step = Some(StepId::FileUpload);
                state.mark_dirty();
                vec![Effect::CancelTask {
                    kind: TaskKind::ArtifactGenerate,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::Restart => {
            let effects = abort_tasks(&mut state, |_| true);
            state.restart();
            effects
        }
        Msg::BannerExpired { banner_id } => {
            state.dismiss_banner(banner_id);
            Vec::new()
        }
    };

    (state, effects)
}

fn company_name_changed(state: &mut WizardState, text: String) -> Vec<Effect> {
    if state.active_step != Some(StepId::CompanyDetails) {
        return Vec::new();
    }
    let query = text.trim().to_string();
    state.company.company_name = text;
    state.company.logo_url = None;
    state.inline_error = None;
    state.mark_dirty();

    if query.is_empty() {
        state.suggestions.clear();
        return abort_tasks(state, |kind| kind == TaskKind::SuggestionLookup);
    }
    // Superseded lookups are not cancelled here: their requests may finish,
    // but `accepts` rejects anything but the newest generation.
    let (generation, _) = state.start_task(TaskKind::SuggestionLookup);
    vec![Effect::LookupSuggestions { generation, query }]
}

fn suggestion_picked(state: &mut WizardState, index: usize) -> Vec<Effect> {
    if state.active_step != Some(StepId::CompanyDetails) || !state.suggestions.is_visible() {
        return Vec::new();
    }
    let Some(picked) = state.suggestions.items().get(index).cloned() else {
        return Vec::new();
    };
    fill_company(state, &picked);
    state.suggestions.clear();
    abort_tasks(state, |kind| kind == TaskKind::SuggestionLookup)
}

fn fill_company(state: &mut WizardState, company: &CompanySuggestion) {
    state.company.company_name = if company.display_name.trim().is_empty() {
        company.domain.clone()
    } else {
        company.display_name.clone()
    };
    if !company.resolved_website_url.is_empty() {
        state.company.website_url = company.resolved_website_url.clone();
    }
    state.company.logo_url = company.logo_url.clone();
    state.inline_error = None;
    state.mark_dirty();
}

fn find_company_clicked(state: &mut WizardState) -> Vec<Effect> {
    let website_url = state.company.website_url.trim().to_string();
    if state.active_step != Some(StepId::CompanyDetails)
        || website_url.is_empty()
        || state.is_pending(TaskKind::FindCompany)
    {
        return Vec::new();
    }
    state.banner = None;
    let (task_id, _) = state.start_task(TaskKind::FindCompany);
    state.mark_dirty();
    vec![Effect::FindCompany {
        task_id,
        website_url,
    }]
}

fn company_found(
    state: &mut WizardState,
    task_id: TaskId,
    matches: Vec<CompanySuggestion>,
) -> Vec<Effect> {
    if !state.accepts(TaskKind::FindCompany, task_id) {
        wizard_debug!("Dropping stale find-company result {}", task_id);
        return Vec::new();
    }
    state.settle_task(TaskKind::FindCompany, task_id, TaskStatus::Resolved);
    state.mark_dirty();
    // The website answer replaces whatever the name lookup would still add.
    let mut effects = abort_tasks(state, |kind| kind == TaskKind::SuggestionLookup);

    let shown = match matches.len() {
        0 => {
            state.suggestions.clear();
            let text = messages::company_not_found(state.company.website_url.trim());
            banner(state, BannerKind::Error, text)
        }
        1 => {
            let only = &matches[0];
            let name = if only.display_name.trim().is_empty() {
                only.domain.trim()
            } else {
                only.display_name.trim()
            };
            if name.is_empty() {
                effects.extend(banner(state, BannerKind::Error, messages::COMPANY_WITHOUT_NAME));
                return effects;
            }
            let text = messages::company_found(name);
            state.company.company_name = name.to_string();
            state.company.logo_url = only.logo_url.clone();
            state.suggestions.clear();
            banner(state, BannerKind::Success, text)
        }
        _ => {
            state.suggestions.replace(task_id, matches);
            Vec::new()
        }
    };
    effects.extend(shown);
    effects
}

fn with_operation(state: &mut WizardState, index: usize, edit: impl FnOnce(&mut OperationOption)) {
    if state.active_step != Some(StepId::OperationsPreferences) {
        return;
    }
    if let Some(option) = state.operations.options.get_mut(index) {
        edit(option);
        state.mark_dirty();
    }
}

fn operation_added(state: &mut WizardState, heading: &str, description: &str) {
    if state.active_step != Some(StepId::OperationsPreferences) {
        return;
    }
    state.mark_dirty();
    let heading = heading.trim();
    let description = description.trim();
    let error = if state.operations.user_added_count() >= MAX_USER_ADDED_OPERATIONS {
        Some(messages::USER_ADDED_LIMIT)
    } else if heading.is_empty() || description.is_empty() {
        Some(messages::OPERATION_FIELDS_REQUIRED)
    } else if heading.chars().count() > MAX_HEADING_CHARS
        || description.chars().count() > MAX_DESCRIPTION_CHARS
    {
        Some(messages::OPERATION_FIELDS_TOO_LONG)
    } else {
        None
    };
    if let Some(error) = error {
        state.operations.create_error = Some(error.to_string());
        return;
    }
    state.operations.options.push(OperationOption::user_added(
        truncate_chars(heading, MAX_HEADING_CHARS),
        truncate_chars(description, MAX_DESCRIPTION_CHARS),
    ));
    state.operations.clear_errors();
}

fn operations_loaded(
    state: &mut WizardState,
    task_id: TaskId,
    result: Result<Vec<SuggestedOperation>, String>,
) -> Vec<Effect> {
    if !state.accepts(TaskKind::OperationsGenerate, task_id) {
        wizard_debug!("Dropping stale operations result {}", task_id);
        return Vec::new();
    }
    let user_added: Vec<_> = state
        .operations
        .options
        .drain(..)
        .filter(|o| o.origin == OperationOrigin::UserAdded)
        .collect();
    state.operations.loading = false;
    match result {
        Ok(items) => {
            wizard_info!("Loaded {} operation suggestions", items.len());
            state.settle_task(TaskKind::OperationsGenerate, task_id, TaskStatus::Resolved);
            state.operations.notice = None;
            state.operations.selection_error = None;
            state.operations.options = items
                .into_iter()
                .map(OperationOption::suggested)
                .chain(user_added)
                .collect();
        }
        Err(reason) => {
            wizard_warn!("Operations generation failed: {}", reason);
            state.settle_task(TaskKind::OperationsGenerate, task_id, TaskStatus::Rejected);
            state.operations.notice = Some(messages::OPERATIONS_UNAVAILABLE.to_string());
            state.operations.options = user_added;
        }
    }
    state.mark_dirty();
    Vec::new()
}

fn file_selected(state: &mut WizardState, file: UploadedFile) -> Vec<Effect> {
    if state.active_step != Some(StepId::FileUpload) {
        return Vec::new();
    }
    if state.step == StepId::Failed {
        state.step = StepId::FileUpload;
    }
    state.excel_error = None;
    state.excel_notice = None;
    state.mark_dirty();

    let lowered = file.name.to_lowercase();
    if !ACCEPTED_UPLOAD_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(ext))
    {
        state.excel_error = Some(messages::INVALID_FILE_TYPE.to_string());
        return Vec::new();
    }

    wizard_info!("Attached {} ({} bytes)", file.name, file.size);
    state.upload = Some(file.clone());
    let mut effects = banner(
        state,
        BannerKind::Success,
        messages::upload_accepted(&file.name),
    );
    let (task_id, superseded) = state.start_task(TaskKind::ExcelValidate);
    if superseded {
        effects.push(Effect::CancelTask {
            kind: TaskKind::ExcelValidate,
        });
    }
    effects.push(Effect::ValidateExcel { task_id, file });
    effects
}

fn submit_step(state: &mut WizardState, step: StepId) -> Vec<Effect> {
    if state.active_step != Some(step) {
        wizard_debug!("Ignoring submit for inactive step {:?}", step);
        return Vec::new();
    }
    state.mark_dirty();
    match step {
        StepId::CompanyDetails => submit_company(state),
        StepId::AboutPreferences => {
            state.push_turn(
                Role::User,
                messages::ABOUT_CONFIGURED,
                Some(TurnCategory::AboutPreferences),
            );
            state.push_turn(
                Role::System,
                messages::OPERATIONS_PROMPT,
                Some(TurnCategory::OperationsPreferences),
            );
            enter_step(state, StepId::OperationsPreferences);
            Vec::new()
        }
        StepId::OperationsPreferences => submit_operations(state),
        StepId::FileUpload => submit_file(state),
        StepId::Generating | StepId::Done | StepId::Failed => Vec::new(),
    }
}

fn enter_step(state: &mut WizardState, step: StepId) {
    state.step = step;
    state.active_step = TurnCategory::for_step(step).map(TurnCategory::step);
    state.inline_error = None;
}

fn submit_company(state: &mut WizardState) -> Vec<Effect> {
    let company_name = state.company.company_name.trim().to_string();
    let website_url = state.company.website_url.trim().to_string();
    if company_name.is_empty() || website_url.is_empty() {
        state.inline_error = Some(messages::COMPANY_REQUIRED.to_string());
        return Vec::new();
    }
    state.company.company_name = company_name.clone();
    state.company.website_url = website_url.clone();

    state.push_turn(
        Role::User,
        messages::company_request(&company_name, &website_url),
        Some(TurnCategory::CompanyDetails),
    );
    state.push_turn(
        Role::System,
        messages::ABOUT_PROMPT,
        Some(TurnCategory::AboutPreferences),
    );
    enter_step(state, StepId::AboutPreferences);
    state.suggestions.clear();

    let mut effects = abort_tasks(state, |kind| {
        matches!(kind, TaskKind::SuggestionLookup | TaskKind::FindCompany)
    });
    effects.extend(start_operations(state));
    effects
}

/// Operations are generated as soon as the company is known so the request
/// overlaps with the about step.
fn start_operations(state: &mut WizardState) -> Vec<Effect> {
    let mut effects = Vec::new();
    let (task_id, superseded) = state.start_task(TaskKind::OperationsGenerate);
    if superseded {
        effects.push(Effect::CancelTask {
            kind: TaskKind::OperationsGenerate,
        });
    }
    state.operations.loading = true;
    state.operations.notice = None;
    effects.push(Effect::GenerateOperations {
        task_id,
        company_name: state.company.company_name.clone(),
        website_url: state.company.website_url.clone(),
    });
    effects
}

fn submit_operations(state: &mut WizardState) -> Vec<Effect> {
    let still_loading = state.is_pending(TaskKind::OperationsGenerate);
    let panel = &mut state.operations;
    if panel.options.is_empty() && still_loading {
        panel.selection_error = Some(messages::OPERATIONS_LOADING.to_string());
        return Vec::new();
    }
    if !panel.options.is_empty() && panel.selected().next().is_none() {
        panel.selection_error = Some(messages::SELECT_ONE_OPERATION.to_string());
        return Vec::new();
    }
    panel.clear_errors();

    let selected = selected_operations(state);
    let mut effects = Vec::new();
    if !selected.is_empty() {
        effects.push(Effect::SaveOperations {
            company_name: state.company.company_name.clone(),
            website_url: state.company.website_url.clone(),
            selected,
        });
    }
    state.push_turn(
        Role::User,
        messages::OPERATIONS_CONFIGURED,
        Some(TurnCategory::OperationsPreferences),
    );
    state.push_turn(
        Role::System,
        messages::UPLOAD_PROMPT,
        Some(TurnCategory::FileUpload),
    );
    enter_step(state, StepId::FileUpload);
    effects
}

fn selected_operations(state: &WizardState) -> Vec<SelectedOperation> {
    state
        .operations
        .selected()
        .map(|o| SelectedOperation {
            key: o.effective_key().to_string(),
            value: o.effective_value().to_string(),
        })
        .collect()
}

fn submit_file(state: &mut WizardState) -> Vec<Effect> {
    let Some(file) = state.upload.clone() else {
        state.excel_error = Some(messages::FILE_REQUIRED.to_string());
        return Vec::new();
    };

    state.mark_generation_started();
    state.excel_error = None;
    state.artifact = None;
    state.push_turn(
        Role::User,
        messages::file_uploaded(&file.name),
        Some(TurnCategory::FileUpload),
    );
    enter_step(state, StepId::Generating);

    let request = ArtifactRequest {
        company_name: state.company.company_name.clone(),
        website_url: state.company.website_url.clone(),
        about: state.about,
        operations_selected: selected_operations(state),
        operations_query: state.operations.query.clone(),
        excel_file: file,
    };
    let mut effects = Vec::new();
    let (task_id, superseded) = state.start_task(TaskKind::ArtifactGenerate);
    if superseded {
        effects.push(Effect::CancelTask {
            kind: TaskKind::ArtifactGenerate,
        });
    }
    wizard_info!("Starting one-pager generation for {}", request.company_name);
    effects.push(Effect::GenerateArtifact { task_id, request });
    effects
}

fn artifact_finished(
    state: &mut WizardState,
    task_id: TaskId,
    result: Result<ArtifactReady, ArtifactFailure>,
) -> Vec<Effect> {
    if !state.accepts(TaskKind::ArtifactGenerate, task_id) {
        wizard_debug!("Dropping stale artifact result {}", task_id);
        return Vec::new();
    }
    state.mark_dirty();
    match result {
        Ok(ready) => {
            state.settle_task(TaskKind::ArtifactGenerate, task_id, TaskStatus::Resolved);
            enter_step(state, StepId::Done);
            if ready.notice.is_some() {
                state.excel_notice = ready.notice;
            }
            let attachment = Attachment {
                download_ref: ready.path.display().to_string(),
                label: ready.filename.clone(),
            };
            state.artifact = Some(ArtifactSummary {
                path: ready.path,
                filename: ready.filename,
                digest: ready.digest,
            });
            state.push_turn_with(Role::System, messages::GENERATED, None, Some(attachment));
            Vec::new()
        }
        Err(failure) => {
            state.settle_task(TaskKind::ArtifactGenerate, task_id, TaskStatus::Rejected);
            state.step = StepId::Failed;
            state.active_step = Some(StepId::FileUpload);
            match failure {
                ArtifactFailure::Validation { message } => {
                    // Stays until another file is attached.
                    state.excel_error = Some(messages::excel_rejected(&message));
                    state.upload = None;
                    Vec::new()
                }
                ArtifactFailure::Connectivity { attempts } => {
                    wizard_warn!("Generation failed after {} backend attempts", attempts);
                    banner(state, BannerKind::Error, messages::CONNECTIVITY_FAILURE)
                }
                ArtifactFailure::Local { message } => {
                    wizard_warn!("Generation failed locally: {}", message);
                    banner(state, BannerKind::Error, messages::generation_failed(&message))
                }
            }
        }
    }
}

fn edit_turn(state: &mut WizardState, turn_id: TurnId) -> Vec<Effect> {
    if state.generation_started {
        wizard_debug!("Editing is locked once generation has started");
        return Vec::new();
    }
    let Some((index, category)) = state
        .transcript
        .iter()
        .enumerate()
        .find(|(_, turn)| turn.id == turn_id && turn.role == Role::User)
        .and_then(|(index, turn)| turn.category.map(|category| (index, category)))
    else {
        return Vec::new();
    };

    wizard_info!("Editing {:?} (turn {})", category, turn_id);
    state.transcript.truncate(index);
    enter_step(state, category.step());
    state.mark_dirty();

    let mut effects = abort_tasks(state, |kind| kind.introduced_at() >= category);

    state.upload = None;
    state.excel_error = None;
    state.excel_notice = None;
    state.artifact = None;
    state.operations.clear_errors();

    match category {
        TurnCategory::CompanyDetails => {
            state.operations.reset();
            state.suggestions.clear();
        }
        TurnCategory::OperationsPreferences => {
            let missing = state.operations.options.is_empty()
                && !state.is_pending(TaskKind::OperationsGenerate);
            if missing {
                effects.extend(start_operations(state));
            }
        }
        TurnCategory::AboutPreferences | TurnCategory::FileUpload => {}
    }
    effects
}

fn abort_tasks(state: &mut WizardState, which: impl Fn(TaskKind) -> bool) -> Vec<Effect> {
    TaskKind::ALL
        .into_iter()
        .filter(|kind| which(*kind))
        .filter(|kind| state.abort_task(*kind))
        .map(|kind| Effect::CancelTask { kind })
        .collect()
}

fn banner(state: &mut WizardState, kind: BannerKind, text: impl Into<String>) -> Vec<Effect> {
    let banner_id = state.show_banner(kind, text);
    let after = match kind {
        BannerKind::Success => SUCCESS_BANNER_TTL,
        BannerKind::Error => ERROR_BANNER_TTL,
    };
    vec![Effect::DismissBannerAfter { banner_id, after }]
}
