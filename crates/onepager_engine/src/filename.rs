use once_cell::sync::Lazy;
use regex::Regex;

static DISPOSITION_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).expect("filename pattern compiles")
});

/// Filename announced by a `Content-Disposition` header, made safe to write.
pub fn disposition_filename(header: &str) -> Option<String> {
    let raw = DISPOSITION_FILENAME.captures(header)?.get(1)?.as_str();
    sanitize_filename(raw)
}

/// `{company}_one_pager.pptx` with every run of non-alphanumerics collapsed to `_`.
pub fn default_artifact_name(company_name: &str) -> String {
    format!("{}_one_pager.pptx", underscore_runs(company_name))
}

pub fn peer_analysis_name(company_name: &str) -> String {
    let name = sanitize_filename(company_name.trim()).unwrap_or_else(|| "company".to_string());
    format!("{name}_peer_analysis.xlsx")
}

fn underscore_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Strip directories and characters no filesystem accepts; `None` if nothing is left.
pub fn sanitize_filename(input: &str) -> Option<String> {
    let base = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let mut cleaned = String::with_capacity(base.len());
    let mut prev_underscore = false;
    for c in base.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        cleaned.push(c);
    }
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        return None;
    }
    let stem = cleaned.split('.').next().unwrap_or(&cleaned);
    if is_reserved_windows_name(stem) {
        return Some(format!("_{cleaned}"));
    }
    Some(cleaned)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
