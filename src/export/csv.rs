//! Two-column `Field,Value` CSV rendering.

use crate::models::CaseRecord;

/// Quote a cell when it contains a separator, quote or line break.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_csv(record: &CaseRecord) -> String {
    let mut out = String::from("Field,Value\n");
    for (field, value) in record.fields() {
        out.push_str(&escape_csv(field));
        out.push(',');
        out.push_str(&escape_csv(&value));
        out.push('\n');
    }
    out
}
