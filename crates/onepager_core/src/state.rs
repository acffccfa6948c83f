use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::operations::OperationsPanel;
use crate::suggestions::SuggestionList;
use crate::update::messages;
use crate::view_model::{self, WizardViewModel};

pub type TurnId = u64;
pub type TaskId = u64;

/// Position of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepId {
    #[default]
    CompanyDetails,
    AboutPreferences,
    OperationsPreferences,
    FileUpload,
    Generating,
    Done,
    Failed,
}

/// Which input step a turn belongs to. Set when the turn is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TurnCategory {
    CompanyDetails,
    AboutPreferences,
    OperationsPreferences,
    FileUpload,
}

impl TurnCategory {
    pub fn step(self) -> StepId {
        match self {
            TurnCategory::CompanyDetails => StepId::CompanyDetails,
            TurnCategory::AboutPreferences => StepId::AboutPreferences,
            TurnCategory::OperationsPreferences => StepId::OperationsPreferences,
            TurnCategory::FileUpload => StepId::FileUpload,
        }
    }

    pub fn for_step(step: StepId) -> Option<Self> {
        match step {
            StepId::CompanyDetails => Some(TurnCategory::CompanyDetails),
            StepId::AboutPreferences => Some(TurnCategory::AboutPreferences),
            StepId::OperationsPreferences => Some(TurnCategory::OperationsPreferences),
            StepId::FileUpload => Some(TurnCategory::FileUpload),
            StepId::Generating | StepId::Done | StepId::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub download_ref: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub category: Option<TurnCategory>,
    pub attachment: Option<Attachment>,
    pub editable: bool,
}

/// Kinds of asynchronous work the coordinator runs. At most one per kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKind {
    SuggestionLookup,
    FindCompany,
    OperationsGenerate,
    ExcelValidate,
    ArtifactGenerate,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::SuggestionLookup,
        TaskKind::FindCompany,
        TaskKind::OperationsGenerate,
        TaskKind::ExcelValidate,
        TaskKind::ArtifactGenerate,
    ];

    /// The step whose input starts this kind of task.
    pub fn introduced_at(self) -> TurnCategory {
        match self {
            TaskKind::SuggestionLookup | TaskKind::FindCompany | TaskKind::OperationsGenerate => {
                TurnCategory::CompanyDetails
            }
            TaskKind::ExcelValidate | TaskKind::ArtifactGenerate => TurnCategory::FileUpload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Resolved,
    Rejected,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompanyForm {
    pub company_name: String,
    pub website_url: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AboutField {
    FoundingYear,
    FounderName,
    HeadquarterCity,
    ShareholdingPattern,
}

/// Which facts the about section of the one-pager should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AboutPreferences {
    pub founding_year: bool,
    pub founder_name: bool,
    pub headquarter_city: bool,
    pub shareholding_pattern: bool,
}

impl Default for AboutPreferences {
    fn default() -> Self {
        Self {
            founding_year: true,
            founder_name: false,
            headquarter_city: true,
            shareholding_pattern: false,
        }
    }
}

impl AboutPreferences {
    pub(crate) fn toggle(&mut self, field: AboutField) {
        let flag = match field {
            AboutField::FoundingYear => &mut self.founding_year,
            AboutField::FounderName => &mut self.founder_name,
            AboutField::HeadquarterCity => &mut self.headquarter_city,
            AboutField::ShareholdingPattern => &mut self.shareholding_pattern,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Outcome of checking a financial workbook against the service's expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcelNotice {
    Valid { message: String },
    PartialWarning { message: String, missing: Option<String> },
    Invalid { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient message that dismisses itself after a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: u64,
    pub kind: BannerKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub path: PathBuf,
    pub filename: String,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub(crate) step: StepId,
    pub(crate) active_step: Option<StepId>,
    pub(crate) company: CompanyForm,
    pub(crate) about: AboutPreferences,
    pub(crate) operations: OperationsPanel,
    pub(crate) upload: Option<UploadedFile>,
    pub(crate) excel_notice: Option<ExcelNotice>,
    pub(crate) excel_error: Option<String>,
    pub(crate) inline_error: Option<String>,
    pub(crate) suggestions: SuggestionList,
    pub(crate) banner: Option<Banner>,
    pub(crate) artifact: Option<ArtifactSummary>,
    pub(crate) transcript: Vec<Turn>,
    pub(crate) tasks: BTreeMap<TaskKind, TaskRecord>,
    pub(crate) generation_started: bool,
    next_turn_id: TurnId,
    next_task_id: TaskId,
    next_banner_id: u64,
    dirty: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        let mut state = Self {
            step: StepId::CompanyDetails,
            active_step: Some(StepId::CompanyDetails),
            company: CompanyForm::default(),
            about: AboutPreferences::default(),
            operations: OperationsPanel::default(),
            upload: None,
            excel_notice: None,
            excel_error: None,
            inline_error: None,
            suggestions: SuggestionList::default(),
            banner: None,
            artifact: None,
            transcript: Vec::new(),
            tasks: BTreeMap::new(),
            generation_started: false,
            next_turn_id: 1,
            next_task_id: 1,
            next_banner_id: 1,
            dirty: false,
        };
        state.push_turn(
            Role::System,
            messages::WELCOME,
            Some(TurnCategory::CompanyDetails),
        );
        state
    }

    /// Start over while keeping id counters monotonic, so results of tasks
    /// issued before the restart can never match a new task.
    pub(crate) fn restart(&mut self) {
        let next_turn_id = self.next_turn_id;
        let next_task_id = self.next_task_id;
        let next_banner_id = self.next_banner_id;
        *self = Self {
            next_turn_id,
            next_task_id,
            next_banner_id,
            transcript: Vec::new(),
            ..Self::new()
        };
        self.push_turn(
            Role::System,
            messages::WELCOME,
            Some(TurnCategory::CompanyDetails),
        );
        self.mark_dirty();
    }

    pub fn view(&self) -> WizardViewModel {
        view_model::render(self)
    }

    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn active_step(&self) -> Option<StepId> {
        self.active_step
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn company(&self) -> &CompanyForm {
        &self.company
    }

    pub fn about(&self) -> AboutPreferences {
        self.about
    }

    pub fn operations(&self) -> &OperationsPanel {
        &self.operations
    }

    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    pub fn suggestions(&self) -> &SuggestionList {
        &self.suggestions
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn excel_error(&self) -> Option<&str> {
        self.excel_error.as_deref()
    }

    pub fn excel_notice(&self) -> Option<&ExcelNotice> {
        self.excel_notice.as_ref()
    }

    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    pub fn artifact(&self) -> Option<&ArtifactSummary> {
        self.artifact.as_ref()
    }

    pub fn generation_started(&self) -> bool {
        self.generation_started
    }

    /// Lock editing for good once final generation has begun. Idempotent.
    pub fn mark_generation_started(&mut self) {
        if !self.generation_started {
            self.generation_started = true;
            self.mark_dirty();
        }
    }

    pub fn task(&self, kind: TaskKind) -> Option<TaskRecord> {
        self.tasks.get(&kind).copied()
    }

    pub fn task_status(&self, kind: TaskKind) -> Option<TaskStatus> {
        self.task(kind).map(|record| record.status)
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.task_status(kind) == Some(TaskStatus::Pending)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn push_turn(
        &mut self,
        role: Role,
        text: impl Into<String>,
        category: Option<TurnCategory>,
    ) -> TurnId {
        self.push_turn_with(role, text, category, None)
    }

    pub(crate) fn push_turn_with(
        &mut self,
        role: Role,
        text: impl Into<String>,
        category: Option<TurnCategory>,
        attachment: Option<Attachment>,
    ) -> TurnId {
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.transcript.push(Turn {
            id,
            role,
            text: text.into(),
            category,
            attachment,
            editable: role == Role::User && category.is_some(),
        });
        self.mark_dirty();
        id
    }

    /// Register a new task of `kind`. Returns its id and whether a pending
    /// predecessor was aborted.
    pub(crate) fn start_task(&mut self, kind: TaskKind) -> (TaskId, bool) {
        let superseded = self.abort_task(kind);
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.insert(
            kind,
            TaskRecord {
                id,
                status: TaskStatus::Pending,
            },
        );
        (id, superseded)
    }

    /// Mark the live task of `kind` aborted. Returns false if nothing could
    /// still deliver a result.
    ///
    /// A lookup settles on its first provider answer but may still deliver
    /// the other one, so a resolved lookup is aborted too.
    pub(crate) fn abort_task(&mut self, kind: TaskKind) -> bool {
        match self.tasks.get_mut(&kind) {
            Some(record)
                if record.status == TaskStatus::Pending
                    || (kind == TaskKind::SuggestionLookup
                        && record.status == TaskStatus::Resolved) =>
            {
                record.status = TaskStatus::Aborted;
                true
            }
            _ => false,
        }
    }

    /// Whether a result from task `id` may still mutate state.
    pub(crate) fn accepts(&self, kind: TaskKind, id: TaskId) -> bool {
        match self.tasks.get(&kind) {
            Some(record) if record.id == id => match kind {
                // Lookups deliver one answer per provider.
                TaskKind::SuggestionLookup => record.status != TaskStatus::Aborted,
                _ => record.status == TaskStatus::Pending,
            },
            _ => false,
        }
    }

    pub(crate) fn settle_task(&mut self, kind: TaskKind, id: TaskId, status: TaskStatus) {
        if let Some(record) = self.tasks.get_mut(&kind) {
            if record.id == id && record.status != TaskStatus::Aborted {
                record.status = status;
            }
        }
    }

    pub(crate) fn show_banner(&mut self, kind: BannerKind, text: impl Into<String>) -> u64 {
        let id = self.next_banner_id;
        self.next_banner_id += 1;
        self.banner = Some(Banner {
            id,
            kind,
            text: text.into(),
        });
        self.mark_dirty();
        id
    }

    pub(crate) fn dismiss_banner(&mut self, id: u64) {
        if self.banner.as_ref().is_some_and(|b| b.id == id) {
            self.banner = None;
            self.mark_dirty();
        }
    }
}
