//! Interface de terminal do RAGTRACK — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`SubmitProgress`] acompanha visualmente
//! uma submissão de status no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::audit::{RagStatus, StatusRecord};
use crate::dispatch::DispatchReport;
use crate::roster::Employee;
use crate::workflow::{Stage, SubmissionOutcome};

/// Indicador visual de progresso para uma submissão de status.
///
/// Exibe um spinner animado durante o pipeline e mensagens coloridas
/// para sucesso (verde), falha (vermelho) e avisos (amarelo).
pub struct SubmitProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para avisos.
    yellow: Style,
}

impl SubmitProgress {
    /// Inicia o spinner com a busca da submissão e retorna a instância de progresso.
    pub fn start(query: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("{}: {query}", Stage::Received));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner para refletir o estágio atual.
    #[allow(dead_code)]
    pub fn update_stage(&self, stage: Stage) {
        self.pb.set_message(format!("{stage}"));
    }

    /// Finaliza o spinner e exibe o resultado final da submissão.
    pub fn complete(&self, outcome: &SubmissionOutcome) {
        self.pb.finish_and_clear();
        println!(
            "  {} Status {} recorded for {} (record #{})",
            self.green.apply_to("✓"),
            outcome.record.status,
            outcome.record.employee_name,
            outcome.record.sequence_id
        );
        if let Some(note) = &outcome.ambiguity {
            println!("  {} {note}", self.yellow.apply_to("!"));
        }
        for warning in &outcome.warnings {
            println!("  {} {warning}", self.yellow.apply_to("!"));
        }
        if let Some(report) = &outcome.dispatch {
            self.print_dispatch(report);
        }
    }

    /// Finaliza o spinner com uma mensagem de falha.
    pub fn fail(&self, error: &dyn std::fmt::Display) {
        self.pb.finish_and_clear();
        println!("  {} Submission failed: {error}", self.red.apply_to("✗"));
    }

    /// Exibe o resultado de entrega por destinatário.
    fn print_dispatch(&self, report: &DispatchReport) {
        for address in &report.delivered {
            println!("  {} notified {address}", self.green.apply_to("✓"));
        }
        for (address, reason) in &report.failed {
            println!("  {} {address}: {reason}", self.red.apply_to("✗"));
        }
        if !report.all_delivered() {
            println!(
                "  {} partial delivery: {} of {} recipients notified",
                self.yellow.apply_to("!"),
                report.delivered.len(),
                report.delivered.len() + report.failed.len()
            );
        }
    }

    /// Imprime o resultado completo formatado em JSON.
    pub fn print_outcome(&self, outcome: &SubmissionOutcome) {
        println!();
        println!("{}", self.green.apply_to("─── Submission Outcome ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(outcome).unwrap_or_default()
        );
    }
}

/// Imprime os resultados de busca em formato tabular.
pub fn print_employees<'a, I>(employees: I)
where
    I: IntoIterator<Item = &'a Employee>,
{
    let bold = Style::new().bold();
    println!(
        "{:<12} {:<24} {:<24} {}",
        bold.apply_to("ID"),
        bold.apply_to("Name"),
        bold.apply_to("Manager"),
        bold.apply_to("Mail")
    );
    for e in employees {
        println!(
            "{:<12} {:<24} {:<24} {}",
            e.id, e.name, e.manager_name, e.email
        );
    }
}

/// Imprime a trilha de auditoria em ordem de inserção.
pub fn print_history(records: &[StatusRecord]) {
    if records.is_empty() {
        println!("Audit log is empty.");
        return;
    }
    for record in records {
        let style = match record.status {
            RagStatus::Red => Style::new().red().bold(),
            RagStatus::Amber => Style::new().yellow(),
            RagStatus::Green => Style::new().green(),
        };
        println!(
            "#{:<4} {} {:<6} {:<24} {}",
            record.sequence_id,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            style.apply_to(record.status.to_string()),
            record.employee_name,
            record.comment
        );
    }
}
