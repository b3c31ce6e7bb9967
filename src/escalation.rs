//! The escalation policy: a pure mapping from a committed status
//! record to the set of notification recipients.
//!
//! The rule set is fixed (spelled out in [`EscalationPolicy::resolve`]),
//! not pluggable. Identical input always yields an identical,
//! identically-ordered target list, so re-dispatching for the same
//! record is idempotent on intent.

use serde::Serialize;

use crate::audit::{RagStatus, StatusRecord};
use crate::config::RagtrackConfig;
use crate::roster::Employee;

/// Who a resolved address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscalationRole {
    Manager,
    Hr,
    HrManager,
    HrHead,
    Employee,
}

impl std::fmt::Display for EscalationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationRole::Manager => write!(f, "Manager"),
            EscalationRole::Hr => write!(f, "HR"),
            EscalationRole::HrManager => write!(f, "HR Manager"),
            EscalationRole::HrHead => write!(f, "HR Head"),
            EscalationRole::Employee => write!(f, "Employee"),
        }
    }
}

/// A resolved recipient. Derived on demand from a record and an
/// employee; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationTarget {
    pub role: EscalationRole,
    pub address: String,
}

/// Non-fatal policy findings. Attached to the submission outcome; the
/// submission still completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PolicyWarning {
    /// The employee has no reporting manager on record, so the Manager
    /// target was omitted rather than fabricated.
    MissingManagerName { employee_id: String },
}

impl std::fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyWarning::MissingManagerName { employee_id } => write!(
                f,
                "employee {employee_id} has no reporting manager; Manager target omitted"
            ),
        }
    }
}

/// Output of [`EscalationPolicy::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub targets: Vec<EscalationTarget>,
    pub warnings: Vec<PolicyWarning>,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            targets: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// The fixed escalation rule set, parameterized only by the
/// organizational addresses from configuration.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    mail_domain: String,
    hr_mail: String,
    hr_manager_mail: String,
    hr_head_mail: String,
}

impl EscalationPolicy {
    pub fn from_config(config: &RagtrackConfig) -> Self {
        Self {
            mail_domain: config.mail_domain.clone(),
            hr_mail: config.hr_mail.clone(),
            hr_manager_mail: config.hr_manager_mail.clone(),
            hr_head_mail: config.hr_head_mail.clone(),
        }
    }

    /// Resolve the recipients for a committed record.
    ///
    /// Non-Red records resolve to an empty list. Red records resolve,
    /// in this fixed order, to: Manager (derived address), HR,
    /// HR Manager, HR Head, Employee (email verbatim). An empty
    /// manager name omits the Manager target and reports a
    /// [`PolicyWarning`] instead.
    pub fn resolve(&self, record: &StatusRecord, employee: &Employee) -> Resolution {
        if record.status != RagStatus::Red {
            return Resolution::empty();
        }

        let mut targets = Vec::with_capacity(5);
        let mut warnings = Vec::new();

        match manager_address(&employee.manager_name, &self.mail_domain) {
            Some(address) => targets.push(EscalationTarget {
                role: EscalationRole::Manager,
                address,
            }),
            None => warnings.push(PolicyWarning::MissingManagerName {
                employee_id: employee.id.clone(),
            }),
        }
        targets.push(EscalationTarget {
            role: EscalationRole::Hr,
            address: self.hr_mail.clone(),
        });
        targets.push(EscalationTarget {
            role: EscalationRole::HrManager,
            address: self.hr_manager_mail.clone(),
        });
        targets.push(EscalationTarget {
            role: EscalationRole::HrHead,
            address: self.hr_head_mail.clone(),
        });
        targets.push(EscalationTarget {
            role: EscalationRole::Employee,
            address: employee.email.clone(),
        });

        Resolution { targets, warnings }
    }
}

/// Derive a manager mail address from a display name: lower-case,
/// spaces become dots, then the organizational domain. Returns `None`
/// for an empty name.
pub fn manager_address(manager_name: &str, domain: &str) -> Option<String> {
    let name = manager_name.trim();
    if name.is_empty() {
        return None;
    }
    Some(format!("{}@{domain}", name.to_lowercase().replace(' ', ".")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::from_config(&RagtrackConfig::default())
    }

    fn employee() -> Employee {
        Employee {
            id: "123".into(),
            name: "John Doe".into(),
            manager_name: "Jane Smith".into(),
            email: "john.doe@company.com".into(),
        }
    }

    fn record(status: RagStatus) -> StatusRecord {
        StatusRecord {
            sequence_id: 1,
            employee_id: "123".into(),
            employee_name: "John Doe".into(),
            status,
            comment: "needs support".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn red_resolves_fixed_role_order() {
        let resolution = policy().resolve(&record(RagStatus::Red), &employee());
        let roles: Vec<_> = resolution.targets.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                EscalationRole::Manager,
                EscalationRole::Hr,
                EscalationRole::HrManager,
                EscalationRole::HrHead,
                EscalationRole::Employee,
            ]
        );
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn red_resolves_expected_addresses() {
        let resolution = policy().resolve(&record(RagStatus::Red), &employee());
        let addresses: Vec<_> = resolution
            .targets
            .iter()
            .map(|t| t.address.as_str())
            .collect();
        assert_eq!(
            addresses,
            vec![
                "jane.smith@company.com",
                "hr@company.com",
                "hrmanager@company.com",
                "hrhead@company.com",
                "john.doe@company.com",
            ]
        );
    }

    #[test]
    fn amber_and_green_resolve_to_nothing() {
        for status in [RagStatus::Amber, RagStatus::Green] {
            let resolution = policy().resolve(&record(status), &employee());
            assert!(resolution.targets.is_empty());
            assert!(resolution.warnings.is_empty());
        }
    }

    #[test]
    fn missing_manager_omits_target_and_warns() {
        let mut employee = employee();
        employee.manager_name = String::new();

        let resolution = policy().resolve(&record(RagStatus::Red), &employee);
        assert_eq!(resolution.targets.len(), 4);
        assert!(
            resolution
                .targets
                .iter()
                .all(|t| t.role != EscalationRole::Manager)
        );
        assert_eq!(
            resolution.warnings,
            vec![PolicyWarning::MissingManagerName {
                employee_id: "123".into()
            }]
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let record = record(RagStatus::Red);
        let employee = employee();
        let first = policy().resolve(&record, &employee);
        let second = policy().resolve(&record, &employee);
        assert_eq!(first, second);
    }

    #[test]
    fn manager_address_derivation() {
        assert_eq!(
            manager_address("Jane Smith", "company.com").as_deref(),
            Some("jane.smith@company.com")
        );
        assert_eq!(
            manager_address("Ana Maria Souza", "example.org").as_deref(),
            Some("ana.maria.souza@example.org")
        );
        assert_eq!(manager_address("", "company.com"), None);
        assert_eq!(manager_address("   ", "company.com"), None);
    }

    #[test]
    fn employee_address_is_verbatim() {
        let mut employee = employee();
        employee.email = "John.DOE+x@Company.Com".into();
        let resolution = policy().resolve(&record(RagStatus::Red), &employee);
        assert_eq!(
            resolution.targets.last().unwrap().address,
            "John.DOE+x@Company.Com"
        );
    }
}
