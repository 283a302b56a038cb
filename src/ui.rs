//! Interface de terminal do commander: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`GoalProgress`] acompanha visualmente
//! a execução de um goal no terminal durante a demonstração.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::command::RobotCommand;
use crate::readiness::Rejection;
use crate::state_machine::{GoalResult, TerminalStatus};

/// Indicador visual de progresso para a execução de um goal no terminal.
///
/// Exibe um spinner animado enquanto o comando executa e mensagens
/// coloridas para sucesso (verde), aborto/rejeição (vermelho) e
/// cancelamento ou pausa (amarelo).
pub struct GoalProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para abortos e rejeições.
    red: Style,
    // Estilo amarelo para cancelamentos e eventos de pausa.
    yellow: Style,
}

impl GoalProgress {
    /// Inicia o spinner com a descrição do comando e retorna a instância de progresso.
    pub fn start(command: &RobotCommand) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("SUBMIT: {command}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner.
    pub fn update(&self, msg: impl Into<String>) {
        self.pb.set_message(msg.into());
    }

    /// Exibe um evento intermediário (pausa, retomada) sem parar o spinner.
    pub fn event(&self, msg: &str) {
        self.pb
            .println(format!("  {} {msg}", self.yellow.apply_to("⏸")));
    }

    /// Finaliza o spinner e mostra a rejeição na admissão.
    pub fn rejected(&self, rejection: &Rejection) {
        self.pb.finish_and_clear();
        println!(
            "  {} Rejected {}: {}",
            self.red.apply_to("✗"),
            rejection.status,
            rejection.message
        );
    }

    /// Finaliza o spinner e exibe o estado terminal do goal.
    pub fn complete(&self, result: &GoalResult) {
        self.pb.finish_and_clear();
        let (mark, style) = match result.status {
            TerminalStatus::Succeeded => ("✓", &self.green),
            TerminalStatus::Canceled => ("↺", &self.yellow),
            TerminalStatus::Aborted => ("✗", &self.red),
        };
        println!(
            "  {} {} after {} attempt(s) in {}ms: {}",
            style.apply_to(mark),
            result.status,
            result.attempts,
            result.duration_ms,
            result.outcome
        );
    }
}
