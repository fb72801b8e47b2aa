//! Sanitizing and redacting untrusted trace content before display.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Fixed marker substituted for sensitive header values.
pub const REDACTED: &str = "<redacted>";

fn osc_hyperlink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1B\]8;[^\x07]*\x07[^\x1B]*\x1B\]8;;\x07").expect("valid OSC-8 regex")
    })
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\x1B\x{9B}][\[\]()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]")
            .expect("valid CSI/ESC regex")
    })
}

fn control_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid control-char regex")
    })
}

fn sensitive_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(authorization|proxy-authorization|cookie|set-cookie|x-api-key|x-auth-token|x-access-token|api-key|bearer|token)$",
        )
        .expect("valid sensitive-header regex")
    })
}

/// Strips OSC-8 hyperlink wrappers, CSI/ESC sequences, and raw C0 control
/// characters. Newlines, tabs, and carriage returns are preserved.
pub fn strip_control_sequences(input: &str) -> String {
    let out = osc_hyperlink_re().replace_all(input, "");
    let out = ansi_re().replace_all(&out, "");
    control_chars_re().replace_all(&out, "").into_owned()
}

/// Truncates to at most `max` characters, replacing the tail with a single
/// ellipsis. Idempotent: already-short (or already-truncated) input passes
/// through unchanged.
pub fn truncate(input: &str, max: usize) -> Cow<'_, str> {
    if max == 0 {
        return Cow::Owned(String::new());
    }
    if input.chars().count() <= max {
        return Cow::Borrowed(input);
    }
    let mut out: String = input.chars().take(max - 1).collect();
    out.push('…');
    Cow::Owned(out)
}

/// Shallow copy of a header map with sensitive values replaced by
/// [`REDACTED`]. Key order is preserved; non-sensitive entries pass through
/// untouched.
pub fn redact_headers(headers: &Map<String, Value>) -> Map<String, Value> {
    headers
        .iter()
        .map(|(key, value)| {
            if sensitive_header_re().is_match(key) {
                (key.clone(), Value::String(REDACTED.to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Strip-then-truncate convenience used by every renderer.
pub fn clean(input: &str, max: usize) -> String {
    truncate(&strip_control_sequences(input), max).into_owned()
}
