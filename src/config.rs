//! Configuração do commander carregada a partir de `commander.toml`.
//!
//! A struct [`CommanderConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `COMMANDER_PAUSE_TIMEOUT_SECS` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CommanderError;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "commander.toml";

/// Configuração de nível superior carregada de `commander.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommanderConfig {
    /// Prazo, em segundos, para uma pausa ser retomada antes do goal ser cancelado.
    #[serde(default = "default_pause_timeout_secs")]
    pub pause_timeout_secs: u64,

    /// Quantas vezes a admissão reverifica um goal ainda ativo antes de rejeitar.
    #[serde(default = "default_still_active_max_tries")]
    pub command_still_active_max_tries: u32,

    /// Intervalo entre essas reverificações, em milissegundos.
    #[serde(default = "default_still_active_retry_delay_ms")]
    pub still_active_retry_delay_ms: u64,

    /// Período de publicação do estado "ativo", em segundos.
    #[serde(default = "default_active_publish_rate_sec")]
    pub active_publish_rate_sec: f64,

    /// Tempo máximo de espera pelo serviço de learning mode, em milissegundos.
    #[serde(default = "default_learning_mode_timeout_ms")]
    pub learning_mode_timeout_ms: u64,

    /// Limite de ciclos pausa/retomada de um mesmo goal antes de abortá-lo.
    #[serde(default = "default_max_resume_cycles")]
    pub max_resume_cycles: u32,

    /// Duração de um movimento simulado, em milissegundos.
    #[serde(default = "default_simulated_motion_ms")]
    pub simulated_motion_ms: u64,
}

// Valor padrão do prazo de pausa: 60s.
fn default_pause_timeout_secs() -> u64 {
    60
}

// Valor padrão de reverificações: 3.
fn default_still_active_max_tries() -> u32 {
    3
}

// Valor padrão do intervalo entre reverificações: 200ms.
fn default_still_active_retry_delay_ms() -> u64 {
    200
}

// Valor padrão do período de publicação: 0.5s.
fn default_active_publish_rate_sec() -> f64 {
    0.5
}

// Valor padrão do timeout do learning mode: 1000ms.
fn default_learning_mode_timeout_ms() -> u64 {
    1000
}

// Valor padrão do limite de retomadas: 32.
fn default_max_resume_cycles() -> u32 {
    32
}

// Valor padrão da duração simulada: 1500ms.
fn default_simulated_motion_ms() -> u64 {
    1500
}

impl Default for CommanderConfig {
    fn default() -> Self {
        Self {
            pause_timeout_secs: default_pause_timeout_secs(),
            command_still_active_max_tries: default_still_active_max_tries(),
            still_active_retry_delay_ms: default_still_active_retry_delay_ms(),
            active_publish_rate_sec: default_active_publish_rate_sec(),
            learning_mode_timeout_ms: default_learning_mode_timeout_ms(),
            max_resume_cycles: default_max_resume_cycles(),
            simulated_motion_ms: default_simulated_motion_ms(),
        }
    }
}

impl CommanderConfig {
    /// Carrega a configuração de `commander.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, CommanderError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Carrega a configuração do caminho informado, aplica a variável de
    /// ambiente e valida o resultado.
    pub fn load_from(path: &Path) -> Result<Self, CommanderError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<CommanderConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para o prazo de pausa.
        if let Ok(raw) = std::env::var("COMMANDER_PAUSE_TIMEOUT_SECS")
            && !raw.is_empty()
        {
            config.pause_timeout_secs = raw.parse().map_err(|_| {
                CommanderError::Config(format!("COMMANDER_PAUSE_TIMEOUT_SECS is not an integer: {raw}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita combinações que fariam o nó entrar em pânico em tempo de execução.
    pub fn validate(&self) -> Result<(), CommanderError> {
        if publish_interval(self.active_publish_rate_sec).is_none() {
            return Err(CommanderError::Config(format!(
                "active_publish_rate_sec must be a positive number of seconds that fits a timer, got {}",
                self.active_publish_rate_sec
            )));
        }
        Ok(())
    }

    pub fn pause_timeout(&self) -> Duration {
        Duration::from_secs(self.pause_timeout_secs)
    }

    pub fn still_active_retry_delay(&self) -> Duration {
        Duration::from_millis(self.still_active_retry_delay_ms)
    }

    pub fn active_publish_interval(&self) -> Duration {
        publish_interval(self.active_publish_rate_sec)
            .unwrap_or_else(|| Duration::from_secs_f64(default_active_publish_rate_sec()))
    }

    pub fn learning_mode_timeout(&self) -> Duration {
        Duration::from_millis(self.learning_mode_timeout_ms)
    }

    pub fn simulated_motion(&self) -> Duration {
        Duration::from_millis(self.simulated_motion_ms)
    }
}

/// Converte o período de publicação; `None` se for zero, negativo ou grande demais.
fn publish_interval(rate_sec: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(rate_sec)
        .ok()
        .filter(|interval| !interval.is_zero())
}
