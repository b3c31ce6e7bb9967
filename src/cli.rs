//! Interface de linha de comando do RAGTRACK baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (search, submit,
//! history, export, report, demo) e flags globais (--roster, --verbose).

use clap::{Parser, Subcommand, ValueEnum};

use crate::audit::RagStatus;

/// RAGTRACK — Acompanhamento de status RAG com trilha de auditoria e escalonamento.
#[derive(Debug, Parser)]
#[command(name = "ragtrack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo CSV do roster de funcionários.
    #[arg(long, global = true, default_value = "roster.csv")]
    pub roster: String,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Status RAG aceito pela CLI, mapeado para [`RagStatus`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    /// Situação crítica; dispara escalonamento.
    Red,
    /// Situação de atenção.
    Amber,
    /// Situação normal.
    Green,
}

impl From<StatusArg> for RagStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Red => RagStatus::Red,
            StatusArg::Amber => RagStatus::Amber,
            StatusArg::Green => RagStatus::Green,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca funcionários por nome ou ID.
    Search {
        /// Texto de busca (vazio lista o roster inteiro).
        #[arg(default_value = "")]
        query: String,
    },

    /// Registra um status RAG para um funcionário.
    Submit {
        /// Busca que identifica o funcionário alvo.
        query: String,

        /// Status RAG a registrar.
        #[arg(long, value_enum)]
        status: StatusArg,

        /// Comentário obrigatório sobre o status.
        #[arg(long)]
        comment: String,

        /// Usa o primeiro resultado quando a busca é ambígua.
        #[arg(long, default_value_t = false)]
        use_first: bool,
    },

    /// Mostra a trilha de auditoria completa.
    History,

    /// Exporta a trilha de auditoria como JSON.
    Export {
        /// Arquivo de saída.
        #[arg(long, default_value = "rag_audit_export.json")]
        out: String,
    },

    /// Gera um relatório CSV do roster (filtrado quando a busca casa).
    Report {
        /// Filtro opcional por nome ou ID.
        #[arg(default_value = "")]
        query: String,

        /// Arquivo de saída.
        #[arg(long, default_value = "employee_report.csv")]
        out: String,
    },

    /// Executa a demonstração embutida do pipeline de submissão.
    Demo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_search_subcommand() {
        let cli = Cli::parse_from(["ragtrack", "search", "john"]);
        match cli.command {
            Command::Search { query } => assert_eq!(query, "john"),
            _ => panic!("expected Search command"),
        }
    }

    #[test]
    fn cli_parses_submit_with_flags() {
        let cli = Cli::parse_from([
            "ragtrack",
            "submit",
            "John Doe",
            "--status",
            "red",
            "--comment",
            "needs support",
            "--use-first",
        ]);
        match cli.command {
            Command::Submit {
                query,
                status,
                comment,
                use_first,
            } => {
                assert_eq!(query, "John Doe");
                assert!(matches!(status, StatusArg::Red));
                assert_eq!(comment, "needs support");
                assert!(use_first);
            }
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["ragtrack", "--roster", "team.csv", "--verbose", "history"]);
        assert!(cli.verbose);
        assert_eq!(cli.roster, "team.csv");
        assert!(matches!(cli.command, Command::History));
    }

    #[test]
    fn status_arg_maps_to_rag_status() {
        assert_eq!(RagStatus::from(StatusArg::Red), RagStatus::Red);
        assert_eq!(RagStatus::from(StatusArg::Amber), RagStatus::Amber);
        assert_eq!(RagStatus::from(StatusArg::Green), RagStatus::Green);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
