//! Roster ingestion and the in-memory roster index.
//!
//! The roster arrives as a tabular CSV payload with a fixed set of
//! required columns. Parsing is all-or-nothing: a missing column or an
//! unparsable row fails with [`FormatError`] and the index is never
//! partially populated. Once built, the roster is an immutable snapshot
//! queried through [`Roster::search`].

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Required header columns, in the order they are exported again.
pub const COLUMN_ID: &str = "Employee ID";
pub const COLUMN_NAME: &str = "Employee Name";
pub const COLUMN_MANAGER: &str = "Reporting Manager";
pub const COLUMN_MAIL: &str = "Mail ID";

/// One employee from the roster snapshot. Read-only within the
/// pipeline; identity key is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub manager_name: String,
    pub email: String,
}

/// Immutable in-memory roster index.
#[derive(Debug, Clone)]
pub struct Roster {
    employees: Vec<Employee>,
}

impl Roster {
    /// Build a roster from a list of employees, preserving order.
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    /// Parse a CSV payload into a roster.
    ///
    /// The header row must contain the four required columns (any extra
    /// columns are ignored). Rows with fewer fields than the header fail
    /// the whole ingestion.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FormatError::Encoding)?;
        let mut lines = text.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break split_csv_line(line),
                None => return Err(FormatError::MissingHeader),
            }
        };

        let col = |name: &str| -> Result<usize, FormatError> {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| FormatError::MissingColumn(name.to_string()))
        };
        let id_col = col(COLUMN_ID)?;
        let name_col = col(COLUMN_NAME)?;
        let manager_col = col(COLUMN_MANAGER)?;
        let mail_col = col(COLUMN_MAIL)?;

        let mut employees = Vec::new();
        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            if fields.len() < header.len() {
                return Err(FormatError::Row {
                    line: idx + 1,
                    reason: format!(
                        "expected {} fields, found {}",
                        header.len(),
                        fields.len()
                    ),
                });
            }
            let id = fields[id_col].trim().to_string();
            if id.is_empty() {
                return Err(FormatError::Row {
                    line: idx + 1,
                    reason: "empty Employee ID".to_string(),
                });
            }
            employees.push(Employee {
                id,
                name: fields[name_col].trim().to_string(),
                manager_name: fields[manager_col].trim().to_string(),
                email: fields[mail_col].trim().to_string(),
            });
        }

        log::debug!("roster loaded: {} employees", employees.len());
        Ok(Self { employees })
    }

    /// Search the roster by name (case-insensitive substring) or by id
    /// (exact-or-substring).
    ///
    /// An empty query matches everything. Results come back in roster
    /// order; an empty result is a valid "no match" outcome, not an
    /// error.
    pub fn search(&self, query: &str) -> Vec<&Employee> {
        let needle = query.to_lowercase();
        self.employees
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle) || e.id.contains(query))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}

/// Split one CSV line into fields, honoring double-quoted fields and
/// `""` escapes inside them.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(ch),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Employee ID,Employee Name,Reporting Manager,Mail ID
123,John Doe,Jane Smith,john.doe@company.com
456,Mary Major,Jane Smith,mary.major@company.com
789,Jo Dalton,,jo.dalton@company.com
";

    fn sample_roster() -> Roster {
        Roster::from_csv_bytes(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn parses_all_rows_in_order() {
        let roster = sample_roster();
        assert_eq!(roster.len(), 3);
        let ids: Vec<_> = roster.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["123", "456", "789"]);
    }

    #[test]
    fn missing_column_fails_ingestion() {
        let csv = "Employee ID,Employee Name,Mail ID\n123,John,j@x.com\n";
        let err = Roster::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingColumn("Reporting Manager".to_string())
        );
    }

    #[test]
    fn short_row_fails_ingestion() {
        let csv = "Employee ID,Employee Name,Reporting Manager,Mail ID\n123,John\n";
        let err = Roster::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, FormatError::Row { line: 2, .. }));
    }

    #[test]
    fn empty_payload_has_no_header() {
        let err = Roster::from_csv_bytes(b"").unwrap_err();
        assert_eq!(err, FormatError::MissingHeader);
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let err = Roster::from_csv_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err, FormatError::Encoding);
    }

    #[test]
    fn search_by_name_is_case_insensitive() {
        let roster = sample_roster();
        let hits = roster.search("john");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "123");
    }

    #[test]
    fn search_by_id_substring() {
        let roster = sample_roster();
        let hits = roster.search("45");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Mary Major");
    }

    #[test]
    fn empty_query_returns_full_roster_in_order() {
        let roster = sample_roster();
        let hits = roster.search("");
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "123");
        assert_eq!(hits[2].id, "789");
    }

    #[test]
    fn no_match_is_empty_not_an_error() {
        let roster = sample_roster();
        assert!(roster.search("zzz-no-such").is_empty());
    }

    #[test]
    fn multiple_matches_preserve_roster_order() {
        let roster = sample_roster();
        // "Jo" matches John Doe and Jo Dalton.
        let hits = roster.search("jo");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "123");
        assert_eq!(hits[1].id, "789");
    }

    #[test]
    fn quoted_fields_with_commas() {
        let csv = "\
Employee ID,Employee Name,Reporting Manager,Mail ID
321,\"Doe, John\",\"Smith, Jane\",jd@company.com
";
        let roster = Roster::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(roster.iter().next().unwrap().name, "Doe, John");
        assert_eq!(roster.iter().next().unwrap().manager_name, "Smith, Jane");
    }

    #[test]
    fn split_csv_line_handles_escaped_quotes() {
        let fields = split_csv_line(r#"a,"b ""quoted"" c",d"#);
        assert_eq!(fields, vec!["a", r#"b "quoted" c"#, "d"]);
    }
}
