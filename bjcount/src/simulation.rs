//! A shared table where several agents play against one dealer out of one shoe.
//!
//! The table owns the shoe and the counter and advances them sequentially. Agents only
//! ever see the counter by reference while deciding. A round goes through three
//! phases in order; calling a phase method out of turn is an error rather than a
//! silent no-op.

pub mod agent;
pub mod shoe;

use bjcount_macros::allowed_phase;
use thiserror::Error;
use tracing::{debug, info, warn};

use self::{
    agent::{Agent, AgentReport, PlayStyle},
    shoe::{Shoe, DEFAULT_PENETRATION_THRESHOLD},
};
use crate::{
    bankroll::{HandResult, HandType, DEFAULT_BROKE_THRESHOLD},
    counter::{Counter, TrueCountPolicy},
    deviation::{DeviationConfig, DeviationEngine},
    strategy::{Strategy, StrategyTable},
    Action, BlackjackError, DealerUpcard, DecisionRecord, HandState, Permissions, Rank,
};

const DEALER_STANDS_ON: u8 = 17;
const RISK_REDUCTION_FACTOR: f64 = 0.7;

/// One decision per hand: no splits, no surrender.
const TABLE_PERMISSIONS: Permissions = Permissions {
    can_double: true,
    can_split: false,
    can_surrender: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Deal,
    Play,
    Settle,
}

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("{method} is only allowed in {expected:?} phase, table is in {actual:?}")]
    WrongPhase {
        method: &'static str,
        expected: RoundPhase,
        actual: RoundPhase,
    },
    #[error(transparent)]
    Blackjack(#[from] BlackjackError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    pub number_of_decks: u8,
    pub penetration_threshold: f64,
    pub true_count_policy: TrueCountPolicy,
    pub deviation: DeviationConfig,
    /// Agents whose bankroll falls below this leave the table for good.
    pub broke_threshold: f64,
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            number_of_decks: 6,
            penetration_threshold: DEFAULT_PENETRATION_THRESHOLD,
            true_count_policy: TrueCountPolicy::default(),
            deviation: DeviationConfig::default(),
            broke_threshold: DEFAULT_BROKE_THRESHOLD,
            seed: None,
        }
    }
}

/// What happened to one agent's hand in a round.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSummary {
    pub round: u64,
    pub player: HandState,
    pub dealer: HandState,
    pub decision: DecisionRecord,
    pub bet: f64,
    pub result: HandResult,
    pub hand_type: HandType,
}

/// Callbacks fired while a round is played. Every method defaults to doing nothing.
pub trait TableEventHandler {
    fn on_reshuffle(&mut self, _round: u64, _reshuffles: u64) {}
    fn on_hand_settled(&mut self, _agent: &Agent, _summary: &HandSummary) {}
    fn on_agent_broke(&mut self, _agent: &Agent) {}
    fn on_round_end(&mut self, _table: &Table) {}
}

impl TableEventHandler for () {}

#[derive(Debug, Clone)]
struct PendingHand {
    agent: usize,
    hand: HandState,
    decision: DecisionRecord,
    bet: f64,
    doubled: bool,
}

pub struct Table {
    config: TableConfig,
    shoe: Shoe,
    counter: Counter,
    engine: DeviationEngine,
    agents: Vec<Agent>,

    // Round state
    phase: RoundPhase,
    dealer: Vec<Rank>,
    pending: Vec<PendingHand>,
    rounds_played: u64,
    reshuffles: u64,
}

impl Table {
    pub fn new(config: TableConfig, agents: Vec<Agent>) -> Self {
        let shoe = match config.seed {
            Some(seed) => {
                Shoe::with_seed(config.number_of_decks, config.penetration_threshold, seed)
            }
            None => Shoe::new(config.number_of_decks, config.penetration_threshold),
        };
        let counter = Counter::with_policy(shoe.number_of_decks(), config.true_count_policy);
        Table {
            engine: DeviationEngine::new(StrategyTable::new(), config.deviation),
            config,
            shoe,
            counter,
            agents,
            phase: RoundPhase::Deal,
            dealer: Vec::new(),
            pending: Vec::new(),
            rounds_played: 0,
            reshuffles: 0,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    pub fn reshuffles(&self) -> u64 {
        self.reshuffles
    }

    pub fn active_agents(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_broke()).count()
    }

    /// Agent reports, best Sharpe-style ratio first.
    pub fn reports(&self) -> Vec<AgentReport> {
        let mut reports: Vec<AgentReport> = self.agents.iter().map(Agent::report).collect();
        reports.sort_by(|a, b| b.bankroll.sharpe_ratio.total_cmp(&a.bankroll.sharpe_ratio));
        reports
    }

    /// Plays a whole round: deal, let every solvent agent act, then settle.
    pub fn play_round<H: TableEventHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<(), SimulationError> {
        let reshuffles = self.reshuffles;
        self.deal_upcard()?;
        self.announce_reshuffle(reshuffles, handler);
        self.play_agents(handler)?;
        self.settle(handler)?;
        handler.on_round_end(self);
        Ok(())
    }

    /// Tells `handler` about a shoe rebuilt since the counter read `before`.
    fn announce_reshuffle<H: TableEventHandler>(&self, before: u64, handler: &mut H) {
        if self.reshuffles != before {
            handler.on_reshuffle(self.rounds_played + 1, self.reshuffles);
        }
    }

    /// Draws an exposed card and counts it. A shoe rebuilt on exhaustion resets the
    /// counter in the same step.
    fn draw(&mut self) -> Result<Rank, SimulationError> {
        let exhausted = self.shoe.cards_remaining() == 0;
        let card = self.shoe.draw_card()?;
        if exhausted {
            self.counter.reset();
            self.reshuffles += 1;
        }
        self.counter.update_count(&[card]);
        Ok(card)
    }

    /// Can be called at Deal phase.
    /// Reshuffles first if the cut card has been passed, then deals the dealer's upcard.
    #[allowed_phase(Deal)]
    pub fn deal_upcard(&mut self) -> Result<DealerUpcard, SimulationError> {
        if self.shoe.needs_reshuffle() {
            info!(
                penetration = self.shoe.penetration(),
                running_count = self.counter.running_count(),
                "cut card reached, reshuffling"
            );
            self.shoe.shuffle();
            self.counter.reset();
            self.reshuffles += 1;
        }

        self.dealer.clear();
        self.pending.clear();
        let upcard = self.draw()?;
        self.dealer.push(upcard);
        self.phase = RoundPhase::Play;
        Ok(DealerUpcard::from(upcard))
    }

    fn strategy_for(&self, style: PlayStyle) -> &dyn Strategy {
        match style {
            PlayStyle::Basic => self.engine.table(),
            PlayStyle::Counting => &self.engine,
        }
    }

    /// Can be called at Play phase.
    /// Every solvent agent is dealt two cards, decides, bets and acts once.
    /// Returns the number of hands in play.
    #[allowed_phase(Play)]
    pub fn play_agents<H: TableEventHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<usize, SimulationError> {
        // Deal always leaves the upcard in place.
        let upcard = DealerUpcard::from(self.dealer[0]);
        let reshuffles = self.reshuffles;

        for index in 0..self.agents.len() {
            if self.agents[index].broke {
                continue;
            }
            if self.agents[index]
                .bankroll
                .is_broke(self.config.broke_threshold)
            {
                let agent = &mut self.agents[index];
                agent.broke = true;
                warn!(
                    agent = agent.name(),
                    bankroll = agent.bankroll.current_bankroll(),
                    "agent is broke, leaving the table"
                );
                handler.on_agent_broke(agent);
                continue;
            }

            let first = self.draw()?;
            let second = self.draw()?;
            let mut hand = HandState::new(vec![first, second])?;

            let style = self.agents[index].style();
            let decision =
                self.strategy_for(style)
                    .decide(&hand, upcard, &self.counter, TABLE_PERMISSIONS);
            let remaining_ratio =
                self.shoe.cards_remaining() as f64 / self.shoe.total_cards().max(1) as f64;

            let agent = &mut self.agents[index];
            let mut bet = agent.bankroll.get_bet_size_with_volatility_control(
                decision.true_count,
                decision.confidence,
                remaining_ratio,
            );
            if agent.bankroll.should_reduce_risk() {
                bet *= RISK_REDUCTION_FACTOR;
                agent.stats.risk_reductions += 1;
            }
            agent.stats.hands_played += 1;
            if decision.deviation {
                agent.stats.deviations += 1;
            }

            let doubled = match decision.action {
                Action::Hit => {
                    let card = self.draw()?;
                    hand.receive_card(card);
                    false
                }
                Action::Double => {
                    let card = self.draw()?;
                    hand.receive_card(card);
                    true
                }
                // Neither is offered at this table; treat them as standing.
                Action::Stand | Action::Split | Action::Surrender => false,
            };
            if hand.is_bust() {
                self.agents[index].stats.busts += 1;
            }

            self.pending.push(PendingHand {
                agent: index,
                hand,
                decision,
                bet,
                doubled,
            });
        }

        self.announce_reshuffle(reshuffles, handler);
        self.phase = RoundPhase::Settle;
        Ok(self.pending.len())
    }

    /// Can be called at Settle phase.
    /// The dealer draws to 17 and every pending hand is paid or collected.
    #[allowed_phase(Settle)]
    pub fn settle<H: TableEventHandler>(&mut self, handler: &mut H) -> Result<(), SimulationError> {
        let reshuffles = self.reshuffles;
        let dealer = loop {
            let dealer = HandState::new(self.dealer.clone())?;
            if self.dealer.len() >= 2 && dealer.total() >= DEALER_STANDS_ON {
                break dealer;
            }
            let card = self.draw()?;
            self.dealer.push(card);
        };
        self.announce_reshuffle(reshuffles, handler);

        let round = self.rounds_played + 1;
        for pending in std::mem::take(&mut self.pending) {
            let result = resolve(&pending.hand, &dealer);
            let hand_type = if pending.doubled {
                HandType::Double
            } else if pending.hand.is_blackjack() && result == HandResult::Win {
                HandType::Blackjack
            } else {
                HandType::Normal
            };

            let agent = &mut self.agents[pending.agent];
            agent.stats.record(result);
            if hand_type == HandType::Blackjack {
                agent.stats.blackjacks += 1;
            }
            agent
                .bankroll
                .update_bankroll(result, pending.bet, hand_type);

            debug!(
                round,
                agent = agent.name(),
                player = pending.hand.total(),
                dealer = dealer.total(),
                action = ?pending.decision.action,
                true_count = pending.decision.true_count,
                bet = pending.bet,
                ?result,
                bankroll = agent.bankroll.current_bankroll(),
                "hand settled"
            );

            let summary = HandSummary {
                round,
                player: pending.hand,
                dealer: dealer.clone(),
                decision: pending.decision,
                bet: pending.bet,
                result,
                hand_type,
            };
            handler.on_hand_settled(agent, &summary);
        }

        self.rounds_played = round;
        self.phase = RoundPhase::Deal;
        Ok(())
    }
}

/// Outcome of a finished player hand against a finished dealer hand.
pub fn resolve(player: &HandState, dealer: &HandState) -> HandResult {
    if player.is_bust() {
        HandResult::Loss
    } else if player.is_blackjack() && !dealer.is_blackjack() {
        HandResult::Win
    } else if dealer.is_blackjack() && !player.is_blackjack() {
        HandResult::Loss
    } else if dealer.is_bust() || player.total() > dealer.total() {
        HandResult::Win
    } else if player.total() < dealer.total() {
        HandResult::Loss
    } else {
        HandResult::Push
    }
}
