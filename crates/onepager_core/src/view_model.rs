use crate::{
    AboutPreferences, ArtifactSummary, Attachment, Banner, CompanySuggestion, ExcelNotice,
    OperationOrigin, Role, StepId, TaskKind, TurnId, WizardState, MAX_USER_ADDED_OPERATIONS,
};

/// Descriptions at or above this length are flagged as close to the limit.
pub const DESCRIPTION_WARN_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardViewModel {
    pub step: StepId,
    pub turns: Vec<TurnView>,
    /// Form attached to the newest prompt, if any step is awaiting input.
    pub active_form: Option<ActiveForm>,
    pub banner: Option<Banner>,
    pub generating: bool,
    pub artifact: Option<ArtifactSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnView {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub show_edit: bool,
    pub is_active_prompt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveForm {
    CompanyDetails {
        company_name: String,
        website_url: String,
        logo_url: Option<String>,
        suggestions: Vec<CompanySuggestion>,
        finding_company: bool,
        error: Option<String>,
    },
    AboutPreferences {
        prefs: AboutPreferences,
    },
    OperationsPreferences {
        loading: bool,
        notice: Option<String>,
        options: Vec<OperationRowView>,
        query: String,
        selection_error: Option<String>,
        create_error: Option<String>,
        user_added_remaining: usize,
    },
    FileUpload {
        file_name: Option<String>,
        validating: bool,
        notice: Option<ExcelNotice>,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRowView {
    pub index: usize,
    pub heading: String,
    pub description: String,
    pub selected: bool,
    pub edited: bool,
    pub user_added: bool,
    pub near_limit: bool,
}

/// Project the state into what a front end draws.
pub fn render(state: &WizardState) -> WizardViewModel {
    let active_prompt = state
        .active_step
        .and_then(|_| state.transcript.iter().rposition(|t| t.role == Role::System));

    let turns = state
        .transcript
        .iter()
        .enumerate()
        .map(|(index, turn)| TurnView {
            id: turn.id,
            role: turn.role,
            text: turn.text.clone(),
            attachment: turn.attachment.clone(),
            show_edit: turn.editable && !state.generation_started,
            is_active_prompt: Some(index) == active_prompt,
        })
        .collect();

    WizardViewModel {
        step: state.step,
        turns,
        active_form: state.active_step.and_then(|step| active_form(state, step)),
        banner: state.banner.clone(),
        generating: state.step == StepId::Generating,
        artifact: state.artifact.clone(),
    }
}

fn active_form(state: &WizardState, step: StepId) -> Option<ActiveForm> {
    let form = match step {
        StepId::CompanyDetails => ActiveForm::CompanyDetails {
            company_name: state.company.company_name.clone(),
            website_url: state.company.website_url.clone(),
            logo_url: state.company.logo_url.clone(),
            suggestions: if state.suggestions.is_visible() {
                state.suggestions.items().to_vec()
            } else {
                Vec::new()
            },
            finding_company: state.is_pending(TaskKind::FindCompany),
            error: state.inline_error.clone(),
        },
        StepId::AboutPreferences => ActiveForm::AboutPreferences { prefs: state.about },
        StepId::OperationsPreferences => {
            let panel = &state.operations;
            ActiveForm::OperationsPreferences {
                loading: panel.loading,
                notice: panel.notice.clone(),
                options: panel
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, option)| OperationRowView {
                        index,
                        heading: option.effective_key().to_string(),
                        description: option.effective_value().to_string(),
                        selected: option.selected,
                        edited: option.is_edited(),
                        user_added: option.origin == OperationOrigin::UserAdded,
                        near_limit: option.effective_value().chars().count()
                            >= DESCRIPTION_WARN_CHARS,
                    })
                    .collect(),
                query: panel.query.clone(),
                selection_error: panel.selection_error.clone(),
                create_error: panel.create_error.clone(),
                user_added_remaining: MAX_USER_ADDED_OPERATIONS
                    .saturating_sub(panel.user_added_count()),
            }
        }
        StepId::FileUpload => ActiveForm::FileUpload {
            file_name: state.upload.as_ref().map(|f| f.name.clone()),
            validating: state.is_pending(TaskKind::ExcelValidate),
            notice: state.excel_notice.clone(),
            error: state.excel_error.clone(),
        },
        StepId::Generating | StepId::Done | StepId::Failed => return None,
    };
    Some(form)
}
