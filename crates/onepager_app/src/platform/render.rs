use std::fmt::Write as _;

use chrono::Local;
use onepager_core::{
    ActiveForm, BannerKind, ExcelNotice, Role, StepId, TurnId, TurnView, WizardViewModel,
};

/// Prints only what changed since the previous frame.
#[derive(Debug, Default)]
pub struct Renderer {
    shown_turns: Vec<TurnId>,
    last_form: String,
    last_banner: Option<u64>,
}

impl Renderer {
    pub fn frame(&mut self, view: &WizardViewModel) -> String {
        let mut out = String::new();
        let ids: Vec<TurnId> = view.turns.iter().map(|t| t.id).collect();

        let new_turns = if ids.starts_with(&self.shown_turns) {
            &view.turns[self.shown_turns.len()..]
        } else {
            out.push_str("-- conversation rewound --\n");
            &view.turns[..]
        };
        let stamp = Local::now().format("%H:%M:%S");
        for turn in new_turns {
            let _ = writeln!(out, "[{stamp}] {}", turn_line(turn));
        }
        self.shown_turns = ids;

        match &view.banner {
            Some(banner) if self.last_banner != Some(banner.id) => {
                let tag = match banner.kind {
                    BannerKind::Success => "ok",
                    BannerKind::Error => "error",
                };
                let _ = writeln!(out, "[{tag}] {}", banner.text);
            }
            _ => {}
        }
        self.last_banner = view.banner.as_ref().map(|b| b.id);

        let form = form_text(view);
        if form != self.last_form {
            out.push_str(&form);
            self.last_form = form;
        }
        out
    }
}

fn turn_line(turn: &TurnView) -> String {
    let who = match turn.role {
        Role::System => "assistant",
        Role::User => "you",
    };
    let mut line = format!("{who}: {}", turn.text);
    if let Some(attachment) = &turn.attachment {
        let _ = write!(line, "\n    saved {} -> {}", attachment.label, attachment.download_ref);
    }
    if turn.show_edit {
        let _ = write!(line, "  (edit {})", turn.id);
    }
    line
}

fn form_text(view: &WizardViewModel) -> String {
    let mut out = String::new();
    match view.step {
        StepId::Generating => out.push_str("  generating... (`cancel` to stop)\n"),
        StepId::Done => out.push_str("  done. `restart` for another company, `quit` to leave\n"),
        _ => {}
    }
    let Some(form) = &view.active_form else {
        return out;
    };
    match form {
        ActiveForm::CompanyDetails {
            company_name,
            website_url,
            logo_url,
            suggestions,
            finding_company,
            error,
        } => {
            let _ = writeln!(out, "  name: {company_name:?}  url: {website_url:?}");
            if let Some(logo) = logo_url {
                let _ = writeln!(out, "  logo: {logo}");
            }
            for (n, s) in suggestions.iter().enumerate() {
                let _ = writeln!(out, "    {}. {} ({})", n + 1, s.display_name, s.domain);
            }
            if *finding_company {
                out.push_str("  finding company...\n");
            }
            push_error(&mut out, error.as_deref());
        }
        ActiveForm::AboutPreferences { prefs } => {
            for (label, on) in [
                ("year", prefs.founding_year),
                ("founder", prefs.founder_name),
                ("city", prefs.headquarter_city),
                ("shareholding", prefs.shareholding_pattern),
            ] {
                let _ = writeln!(out, "  [{}] {label}", if on { "x" } else { " " });
            }
        }
        ActiveForm::OperationsPreferences {
            loading,
            notice,
            options,
            query,
            selection_error,
            create_error,
            user_added_remaining,
        } => {
            if *loading {
                out.push_str("  loading operations...\n");
            }
            if let Some(notice) = notice {
                let _ = writeln!(out, "  {notice}");
            }
            for row in options {
                let mut marks = String::new();
                if row.user_added {
                    marks.push_str(" [yours]");
                }
                if row.edited {
                    marks.push_str(" [edited]");
                }
                if row.near_limit {
                    marks.push_str(" [near limit]");
                }
                let _ = writeln!(
                    out,
                    "  {}. [{}] {}{marks}\n       {}",
                    row.index + 1,
                    if row.selected { "x" } else { " " },
                    row.heading,
                    row.description
                );
            }
            if !query.is_empty() {
                let _ = writeln!(out, "  query: {query}");
            }
            let _ = writeln!(out, "  you can add {user_added_remaining} more");
            push_error(&mut out, selection_error.as_deref());
            push_error(&mut out, create_error.as_deref());
        }
        ActiveForm::FileUpload {
            file_name,
            validating,
            notice,
            error,
        } => {
            let _ = writeln!(out, "  file: {}", file_name.as_deref().unwrap_or("(none)"));
            if *validating {
                out.push_str("  checking workbook...\n");
            }
            match notice {
                Some(ExcelNotice::Valid { message }) => {
                    let _ = writeln!(out, "  {message}");
                }
                Some(ExcelNotice::PartialWarning { message, .. }) => {
                    let _ = writeln!(out, "  warning: {message}");
                }
                Some(ExcelNotice::Invalid { message }) => {
                    let _ = writeln!(out, "  problem: {message}");
                }
                None => {}
            }
            push_error(&mut out, error.as_deref());
        }
    }
    out
}

fn push_error(out: &mut String, error: Option<&str>) {
    if let Some(error) = error {
        let _ = writeln!(out, "  ! {error}");
    }
}
