//! Interface de linha de comando do commander baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, demo, config)
//! e flags globais (--config, --pause-timeout, --max-tries, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CommanderConfig;

/// robot-commander: admissão e execução de comandos de braço e ferramenta.
#[derive(Debug, Parser)]
#[command(name = "robot-commander", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./commander.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Prazo, em segundos, para uma pausa ser retomada.
    #[arg(long, global = true)]
    pub pause_timeout: Option<u64>,

    /// Número de reverificações de um goal ainda ativo.
    #[arg(long, global = true)]
    pub max_tries: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Aplica as flags da linha de comando sobre a configuração carregada.
    pub fn apply_overrides(&self, config: &mut CommanderConfig) {
        if let Some(secs) = self.pause_timeout {
            config.pause_timeout_secs = secs;
        }
        if let Some(tries) = self.max_tries {
            config.command_still_active_max_tries = tries;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o nó com colaboradores simulados, lendo sinais JSON da entrada padrão.
    Run,

    /// Executa a demonstração embutida do ciclo de vida de goals.
    Demo,

    /// Mostra a configuração efetiva em JSON.
    Config,
}
