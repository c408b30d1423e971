use anyhow::Context;
use bjcount::simulation::{
    agent::{Agent, AgentReport},
    Table, TableEventHandler,
};
use bjcount_drivers::Config;
use tracing::{debug, info, warn};

/// Logs a dashboard line per agent every `log_interval` rounds.
#[derive(Debug, Clone, Default)]
struct Handler {
    log_interval: u64,
    broke_agents: Vec<String>,
}

impl TableEventHandler for Handler {
    fn on_reshuffle(&mut self, round: u64, reshuffles: u64) {
        debug!(round, reshuffles, "new shoe");
    }

    fn on_agent_broke(&mut self, agent: &Agent) {
        warn!(agent = agent.name(), "out of money");
        self.broke_agents.push(agent.name().to_string());
    }

    fn on_round_end(&mut self, table: &Table) {
        let round = table.rounds_played();
        if self.log_interval == 0 || round % self.log_interval != 0 {
            return;
        }
        info!(
            round,
            true_count = table.counter().true_count(),
            penetration = table.shoe().penetration(),
            active_agents = table.active_agents(),
            "progress"
        );
        for agent in table.agents() {
            let stats = agent.bankroll().stats();
            let record = agent.stats();
            info!(
                agent = agent.name(),
                bankroll = %format!("{:.2}", stats.current_bankroll),
                roi = %format!("{:.1}%", stats.roi_percentage),
                record = %format!("{}W-{}L-{}P", record.wins, record.losses, record.pushes),
                max_drawdown = %format!("{:.1}%", stats.max_drawdown),
                sharpe = %format!("{:.2}", stats.sharpe_ratio),
                avg_recent_bet = %format!("{:.2}", stats.avg_recent_bet),
                risk_reductions = record.risk_reductions,
            );
        }
    }
}

/// Plays the configured number of rounds and returns the final reports, best first.
pub fn run(config: &Config) -> anyhow::Result<Vec<AgentReport>> {
    let table_config = config
        .table_config()
        .context("invalid table section in config")?;
    let agents = config.agents().context("invalid agents section in config")?;
    if agents.is_empty() {
        anyhow::bail!("config has no agents");
    }

    let mut handler = Handler {
        log_interval: config.simulator.log_interval,
        ..Default::default()
    };
    let mut table = Table::new(table_config, agents);
    info!(
        rounds = config.simulator.rounds,
        agents = table.agents().len(),
        seed = ?config.simulator.seed,
        "starting simulation"
    );

    for _ in 0..config.simulator.rounds {
        if table.active_agents() == 0 {
            warn!(round = table.rounds_played(), "every agent is broke, stopping early");
            break;
        }
        table.play_round(&mut handler)?;
    }

    info!(
        rounds = table.rounds_played(),
        reshuffles = table.reshuffles(),
        broke = handler.broke_agents.len(),
        "simulation finished"
    );
    Ok(table.reports())
}

pub fn print_rankings(reports: &[AgentReport]) {
    println!("Final ranking by risk-adjusted return");
    for (rank, report) in reports.iter().enumerate() {
        let bankroll = &report.bankroll;
        let stats = &report.stats;
        println!();
        println!("#{} {} ({:?})", rank + 1, report.name, report.style);
        println!(
            "  Bankroll: {:.2}  P/L: {:.2} ({:.2}% ROI)",
            bankroll.current_bankroll, bankroll.profit_loss, bankroll.roi_percentage
        );
        println!(
            "  Sharpe: {:.3}  Max drawdown: {:.2}%  Volatility: {:.2}%",
            bankroll.sharpe_ratio, bankroll.max_drawdown, bankroll.volatility
        );
        println!(
            "  Hands: {}  Win rate: {:.2}%  Blackjacks: {}  Busts: {}",
            stats.hands_played, report.win_rate, stats.blackjacks, stats.busts
        );
        if stats.deviations > 0 {
            println!("  Count deviations: {}", stats.deviations);
        }
        if stats.risk_reductions > 0 {
            println!("  Risk reductions: {}", stats.risk_reductions);
        }
    }
}
