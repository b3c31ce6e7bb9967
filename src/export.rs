//! Export rendering for the operator: audit history as deterministic
//! JSON and roster reports as CSV.

use crate::audit::StatusRecord;
use crate::roster::{COLUMN_ID, COLUMN_MAIL, COLUMN_MANAGER, COLUMN_NAME, Employee, Roster};

/// Render the audit snapshot as pretty-printed JSON bytes.
///
/// Field names and insertion order are preserved, and identical input
/// always renders to identical bytes, so the export can be diffed and
/// re-parsed.
pub fn render_audit_json(records: &[StatusRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse bytes produced by [`render_audit_json`] back into records.
#[allow(dead_code)]
pub fn parse_audit_json(bytes: &[u8]) -> Result<Vec<StatusRecord>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Pick the rows for a roster report: the filtered set when the filter
/// matched anything, the full roster otherwise.
pub fn report_selection<'a>(filtered: Vec<&'a Employee>, roster: &'a Roster) -> Vec<&'a Employee> {
    if filtered.is_empty() {
        roster.iter().collect()
    } else {
        filtered
    }
}

/// Render employees as CSV with the same header columns the roster is
/// ingested with, so a report can be re-ingested unchanged.
pub fn render_roster_csv<'a, I>(employees: I) -> String
where
    I: IntoIterator<Item = &'a Employee>,
{
    let mut out = format!("{COLUMN_ID},{COLUMN_NAME},{COLUMN_MANAGER},{COLUMN_MAIL}\n");
    for employee in employees {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&employee.id),
            csv_field(&employee.name),
            csv_field(&employee.manager_name),
            csv_field(&employee.email),
        ));
    }
    out
}

// Quote a field only when it needs it.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
