//! Configuração do RAGTRACK carregada a partir de `ragtrack.toml`.
//!
//! A struct [`RagtrackConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `RAGTRACK_WEBHOOK_URL` tem precedência sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuração de nível superior carregada de `ragtrack.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RagtrackConfig {
    /// Domínio de e-mail organizacional usado para derivar o endereço do gerente.
    #[serde(default = "default_mail_domain")]
    pub mail_domain: String,

    /// Endereço fixo do RH.
    #[serde(default = "default_hr_mail")]
    pub hr_mail: String,

    /// Endereço fixo do gerente de RH.
    #[serde(default = "default_hr_manager_mail")]
    pub hr_manager_mail: String,

    /// Endereço fixo do chefe de RH.
    #[serde(default = "default_hr_head_mail")]
    pub hr_head_mail: String,

    /// Caminho do log de auditoria (JSON lines).
    #[serde(default = "default_audit_path")]
    pub audit_path: String,

    /// Número máximo de entregas de notificação em paralelo.
    #[serde(default = "default_dispatch_workers")]
    pub dispatch_workers: usize,

    /// Tempo limite por destinatário, em milissegundos.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// URL do webhook de notificação. Vazio usa entrega simulada no console.
    #[serde(default)]
    pub webhook_url: String,
}

// Valor padrão para o domínio de e-mail: "company.com".
fn default_mail_domain() -> String {
    "company.com".to_string()
}

fn default_hr_mail() -> String {
    "hr@company.com".to_string()
}

fn default_hr_manager_mail() -> String {
    "hrmanager@company.com".to_string()
}

fn default_hr_head_mail() -> String {
    "hrhead@company.com".to_string()
}

// Valor padrão para o caminho do log de auditoria.
fn default_audit_path() -> String {
    "rag_audit.jsonl".to_string()
}

// Valor padrão para entregas em paralelo: 4.
fn default_dispatch_workers() -> usize {
    4
}

// Valor padrão para o tempo limite por destinatário: 5000ms.
fn default_dispatch_timeout_ms() -> u64 {
    5000
}

impl Default for RagtrackConfig {
    fn default() -> Self {
        Self {
            mail_domain: default_mail_domain(),
            hr_mail: default_hr_mail(),
            hr_manager_mail: default_hr_manager_mail(),
            hr_head_mail: default_hr_head_mail(),
            audit_path: default_audit_path(),
            dispatch_workers: default_dispatch_workers(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            webhook_url: String::new(),
        }
    }
}

impl RagtrackConfig {
    /// Carrega a configuração de `ragtrack.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("ragtrack.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<RagtrackConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para o webhook.
        if let Ok(url) = std::env::var("RAGTRACK_WEBHOOK_URL")
            && !url.is_empty()
        {
            config.webhook_url = url;
        }

        Ok(config)
    }
}
