//! Action executor - runs the action approved for this turn.
//!
//! Every action walks the same lifecycle:
//!
//! ```text
//! Idle -> PendingConfirmation -> Confirmed -> Executing -> Succeeded | Failed
//!                              \-> Declined
//! Idle -> Executing -> Succeeded | Failed        (no confirmation needed)
//! Idle -> Failed                                 (precondition not met)
//! ```
//!
//! Failures never escape: they are recorded in the [`ActionReport`] together
//! with the phase trace.

mod rules;

pub use rules::*;

use game_rules::{transfer, Character, Inventory, TransactionError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DialogueSettings;
use crate::confirmation::{ask, ConfirmationPrompt, ConfirmationRequest};
use crate::knowledge::{get_visible_knowledge, KnowledgeBase, KnowledgeEntry};
use crate::machine::{ActionDef, ActionKind, State};
use crate::trade::{TradeNegotiator, TradeSession, TradeSummary};

/// Acknowledgement recorded instead of the player's words when they decline.
pub const DECLINED_UTTERANCE: &str = "No, I decline.";

/// Where an action is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPhase {
    Idle,
    PendingConfirmation,
    Confirmed,
    Declined,
    Executing,
    Succeeded,
    Failed,
}

impl ActionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionPhase::Declined | ActionPhase::Succeeded | ActionPhase::Failed
        )
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(&self, next: ActionPhase) -> bool {
        use ActionPhase::*;
        matches!(
            (self, next),
            (Idle, PendingConfirmation)
                | (Idle, Executing)
                | (Idle, Failed)
                | (PendingConfirmation, Confirmed)
                | (PendingConfirmation, Declined)
                | (Confirmed, Executing)
                | (Executing, Succeeded)
                | (Executing, Failed)
        )
    }
}

/// Why an action did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFailure {
    #[error("the player declined")]
    Declined,

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("no quest is available to offer")]
    NoQuestAvailable,

    #[error("{0} trade request(s) were refused")]
    TradeIncomplete(usize),
}

/// Result of running (or not running) an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub action: Option<ActionKind>,
    pub succeeded: bool,
    pub failure: Option<ActionFailure>,
    pub phases: Vec<ActionPhase>,
    /// Canonical player line replacing the raw utterance.
    pub overridden_utterance: Option<String>,
    /// Knowledge the action revealed.
    pub surfaced_knowledge: Vec<KnowledgeEntry>,
    pub trade: Option<TradeSummary>,
}

impl ActionReport {
    /// No action this turn: an automatic success.
    pub fn none() -> Self {
        Self {
            action: None,
            succeeded: true,
            failure: None,
            phases: vec![ActionPhase::Idle],
            overridden_utterance: None,
            surfaced_knowledge: Vec::new(),
            trade: None,
        }
    }

    pub fn outcome(&self) -> ActionOutcome {
        ActionOutcome::from_success(self.succeeded)
    }
}

/// Everything an action may read or change.
pub struct ActionContext<'a> {
    pub npc_name: &'a str,
    /// State the NPC is in when the action runs.
    pub state: &'a State,
    pub settings: &'a DialogueSettings,
    pub npc_inventory: &'a mut Inventory,
    pub knowledge: &'a mut KnowledgeBase,
    pub player: &'a mut Character,
    pub confirmation: &'a mut dyn ConfirmationPrompt,
    pub negotiator: &'a mut dyn TradeNegotiator,
}

/// Runs one action against an [`ActionContext`], recording its phases.
pub struct ActionExecutor<'a, 'c> {
    ctx: &'c mut ActionContext<'a>,
    report: ActionReport,
}

impl<'a, 'c> ActionExecutor<'a, 'c> {
    pub fn new(ctx: &'c mut ActionContext<'a>) -> Self {
        Self {
            ctx,
            report: ActionReport::none(),
        }
    }

    /// Execute `action`, or report an automatic success for `None`.
    pub fn execute(mut self, action: Option<&ActionDef>) -> ActionReport {
        let Some(action) = action else {
            return self.report;
        };
        self.report.action = Some(action.kind);
        debug!(action = %action.name, state = %self.ctx.state.name, "executing action");

        match action.kind {
            ActionKind::BasicInfo => {
                self.enter(ActionPhase::Executing);
                self.report.surfaced_knowledge = get_visible_knowledge(self.ctx.state, self.ctx.knowledge).facts;
                self.succeed();
            }
            ActionKind::ShareSecret => {
                self.enter(ActionPhase::Executing);
                self.report.surfaced_knowledge = get_visible_knowledge(self.ctx.state, self.ctx.knowledge).secrets;
                self.succeed();
            }
            ActionKind::QuestionPlayer => {
                self.enter(ActionPhase::Executing);
                self.succeed();
            }
            ActionKind::TakeBribe => self.take_bribe(action),
            ActionKind::GiveQuest => self.give_quest(action),
            ActionKind::Trade => self.trade(action),
        }

        info!(
            action = %action.name,
            succeeded = self.report.succeeded,
            failure = ?self.report.failure,
            "action finished"
        );
        self.report
    }

    fn take_bribe(&mut self, action: &ActionDef) {
        let price = self.ctx.settings.bribe_price;
        let request = ConfirmationRequest::bribe(self.ctx.npc_name, price);
        if !self.confirm(action, &request) {
            return;
        }

        self.enter(ActionPhase::Executing);
        match transfer(&mut self.ctx.player.inventory, self.ctx.npc_inventory, price, None) {
            Ok(_) => {
                self.report.overridden_utterance = Some("I have paid the bribe.".to_string());
                self.succeed();
            }
            Err(error) => {
                self.report.overridden_utterance = Some("I cannot afford the bribe.".to_string());
                self.fail(error.into());
            }
        }
    }

    fn give_quest(&mut self, action: &ActionDef) {
        let Some(record) = self.ctx.knowledge.next_offerable_quest(&self.ctx.state.name) else {
            self.fail(ActionFailure::NoQuestAvailable);
            return;
        };
        let quest = record.quest();

        let request = ConfirmationRequest::quest(self.ctx.npc_name, &quest.name);
        if !self.confirm(action, &request) {
            return;
        }

        self.enter(ActionPhase::Executing);
        self.ctx.knowledge.mark_quest_given(quest.id);
        self.report.overridden_utterance = Some(format!("I accept the quest: {}.", quest.name));
        if !self.ctx.player.accept_quest(quest) {
            debug!("player already holds the quest");
        }
        self.succeed();
    }

    fn trade(&mut self, action: &ActionDef) {
        let request = ConfirmationRequest::trade(self.ctx.npc_name);
        if !self.confirm(action, &request) {
            return;
        }

        self.enter(ActionPhase::Executing);
        let summary = TradeSession::new(
            self.ctx.npc_name,
            self.ctx.npc_inventory,
            &mut self.ctx.player.inventory,
            self.ctx.settings.max_trade_rounds,
        )
        .run(self.ctx.negotiator);

        let failures = summary.failures();
        self.report.overridden_utterance = Some("I am done trading.".to_string());
        self.report.trade = Some(summary);
        if failures == 0 {
            self.succeed();
        } else {
            self.fail(ActionFailure::TradeIncomplete(failures));
        }
    }

    /// Ask for confirmation when the action requires it. Returns whether the
    /// action may go ahead; a decline is recorded as the action's failure.
    fn confirm(&mut self, action: &ActionDef, request: &ConfirmationRequest) -> bool {
        if !action.requires_confirmation {
            return true;
        }

        self.enter(ActionPhase::PendingConfirmation);
        if ask(self.ctx.confirmation, request) {
            self.enter(ActionPhase::Confirmed);
            true
        } else {
            self.enter(ActionPhase::Declined);
            self.report.succeeded = false;
            self.report.failure = Some(ActionFailure::Declined);
            self.report.overridden_utterance = Some(DECLINED_UTTERANCE.to_string());
            false
        }
    }

    fn succeed(&mut self) {
        self.enter(ActionPhase::Succeeded);
        self.report.succeeded = true;
    }

    fn fail(&mut self, failure: ActionFailure) {
        debug!(%failure, "action failed");
        self.enter(ActionPhase::Failed);
        self.report.succeeded = false;
        self.report.failure = Some(failure);
    }

    fn enter(&mut self, phase: ActionPhase) {
        debug_assert!(
            self.report
                .phases
                .last()
                .map_or(true, |current| current.can_advance_to(phase)),
            "illegal action phase change to {phase:?}"
        );
        self.report.phases.push(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NpcDefinition;
    use crate::knowledge::QuestRecord;
    use crate::machine::MachineConfig;
    use crate::trade::{TradeRequest, TradeView};
    use game_rules::Inventory;

    struct Fixture {
        config: MachineConfig,
        settings: DialogueSettings,
        npc_inventory: Inventory,
        knowledge: KnowledgeBase,
        player: Character,
    }

    impl Fixture {
        fn merchant(player_gold: u32) -> Self {
            let definition = NpcDefinition::merchant().unwrap();
            Self {
                config: MachineConfig::from_spec(&definition.machine).unwrap(),
                settings: definition.settings,
                npc_inventory: definition.inventory,
                knowledge: definition.knowledge,
                player: Character::new("Stephen").with_inventory(Inventory::with_gold(player_gold)),
            }
        }

        fn run(&mut self, state: &str, action: &str, answer: &str, trades: Vec<TradeRequest>) -> ActionReport {
            let state = self.config.state(state).unwrap();
            let action = state.action(action).unwrap();
            let answer = answer.to_string();
            let mut confirmation = move |_: &ConfirmationRequest| Some(answer.clone());
            let mut trades = trades.into_iter();
            let mut negotiator = negotiator(move |_| trades.next().unwrap_or(TradeRequest::Exit));

            let mut ctx = ActionContext {
                npc_name: "Magnus",
                state,
                settings: &self.settings,
                npc_inventory: &mut self.npc_inventory,
                knowledge: &mut self.knowledge,
                player: &mut self.player,
                confirmation: &mut confirmation,
                negotiator: &mut negotiator,
            };
            ActionExecutor::new(&mut ctx).execute(Some(action))
        }
    }

    fn negotiator<F>(f: F) -> F
    where
        F: FnMut(&TradeView<'_>) -> TradeRequest,
    {
        f
    }

    #[test]
    fn test_no_action_is_success() {
        let report = ActionReport::none();
        assert!(report.succeeded);
        assert_eq!(report.phases, vec![ActionPhase::Idle]);
        assert_eq!(report.outcome(), ActionOutcome::Succeeded);
    }

    #[test]
    fn test_bribe_paid() {
        let mut fixture = Fixture::merchant(20);

        let report = fixture.run("untrusting", "take_bribe", "y", vec![]);

        assert!(report.succeeded);
        assert_eq!(
            report.phases,
            vec![
                ActionPhase::Idle,
                ActionPhase::PendingConfirmation,
                ActionPhase::Confirmed,
                ActionPhase::Executing,
                ActionPhase::Succeeded,
            ]
        );
        assert_eq!(report.overridden_utterance.as_deref(), Some("I have paid the bribe."));
        assert_eq!(fixture.player.inventory.gold, 15);
        assert_eq!(fixture.npc_inventory.gold, 1528);
    }

    #[test]
    fn test_bribe_declined() {
        let mut fixture = Fixture::merchant(20);

        let report = fixture.run("untrusting", "take_bribe", "no thanks", vec![]);

        assert!(!report.succeeded);
        assert_eq!(report.failure, Some(ActionFailure::Declined));
        assert_eq!(report.phases.last(), Some(&ActionPhase::Declined));
        assert_eq!(report.overridden_utterance.as_deref(), Some(DECLINED_UTTERANCE));
        assert_eq!(fixture.player.inventory.gold, 20);
        assert_eq!(fixture.npc_inventory.gold, 1523);
    }

    #[test]
    fn test_bribe_without_gold() {
        let mut fixture = Fixture::merchant(0);

        let report = fixture.run("untrusting", "take_bribe", "yes", vec![]);

        assert!(!report.succeeded);
        assert_eq!(
            report.failure,
            Some(ActionFailure::Transaction(TransactionError::InsufficientGold {
                required: 5,
                available: 0,
            }))
        );
        assert_eq!(report.phases.last(), Some(&ActionPhase::Failed));
        assert_eq!(fixture.npc_inventory.gold, 1523);
    }

    #[test]
    fn test_give_quest() {
        let mut fixture = Fixture::merchant(0);

        let report = fixture.run("trusting", "give_quest", "YES", vec![]);

        assert!(report.succeeded);
        assert_eq!(
            report.overridden_utterance.as_deref(),
            Some("I accept the quest: Defeat the Dragon.")
        );
        assert_eq!(fixture.player.quest_log.len(), 1);
        assert!(fixture.knowledge.quests()[0].is_given());

        // The only quest is gone now.
        let again = fixture.run("trusting", "give_quest", "y", vec![]);
        assert_eq!(again.failure, Some(ActionFailure::NoQuestAvailable));
        assert_eq!(again.phases, vec![ActionPhase::Idle, ActionPhase::Failed]);
        assert_eq!(fixture.player.quest_log.len(), 1);
    }

    #[test]
    fn test_declined_quest_stays_offerable() {
        let mut fixture = Fixture::merchant(0);

        let report = fixture.run("trusting", "give_quest", "n", vec![]);

        assert_eq!(report.failure, Some(ActionFailure::Declined));
        assert!(fixture.player.quest_log.is_empty());
        assert!(!fixture.knowledge.quests()[0].is_given());
    }

    #[test]
    fn test_quest_not_prompted_when_hidden() {
        let mut fixture = Fixture::merchant(0);
        fixture.knowledge = KnowledgeBase::new().with_quest(QuestRecord::new("Secret", "Hidden").with_visibility("helpful"));

        let report = fixture.run("trusting", "give_quest", "y", vec![]);

        assert_eq!(report.failure, Some(ActionFailure::NoQuestAvailable));
        assert!(!report.phases.contains(&ActionPhase::PendingConfirmation));
    }

    #[test]
    fn test_trade_sword() {
        let mut fixture = Fixture::merchant(50);

        let report = fixture.run(
            "trusting",
            "trade",
            "y",
            vec![TradeRequest::Buy {
                item: "Sword".to_string(),
            }],
        );

        assert!(report.succeeded);
        let summary = report.trade.unwrap();
        assert!(summary.exited);
        assert_eq!(fixture.player.inventory.gold, 40);
        assert_eq!(fixture.npc_inventory.gold, 1533);
        assert!(fixture.player.inventory.find_by_name("Sword").is_some());
        assert!(fixture.npc_inventory.find_by_name("Sword").is_none());
    }

    #[test]
    fn test_trade_with_refusal_fails() {
        let mut fixture = Fixture::merchant(0);

        let report = fixture.run(
            "trusting",
            "trade",
            "y",
            vec![TradeRequest::Buy {
                item: "Shield".to_string(),
            }],
        );

        assert_eq!(report.failure, Some(ActionFailure::TradeIncomplete(1)));
        assert_eq!(fixture.npc_inventory.item_count(), 3);
    }

    #[test]
    fn test_knowledge_actions_surface_by_state() {
        let mut fixture = Fixture::merchant(0);

        let facts = fixture.run("untrusting", "basic_info", "", vec![]);
        assert!(facts.succeeded);
        assert_eq!(facts.phases, vec![ActionPhase::Idle, ActionPhase::Executing, ActionPhase::Succeeded]);
        let names: Vec<_> = facts.surfaced_knowledge.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["shop"]);

        let secrets = fixture.run("helpful", "share_secret", "", vec![]);
        assert_eq!(secrets.surfaced_knowledge.len(), 2);
        assert!(secrets.surfaced_knowledge.iter().all(|e| e.is_visible_in("helpful")));

        let question = fixture.run("untrusting", "question_player", "", vec![]);
        assert!(question.succeeded);
        assert!(question.surfaced_knowledge.is_empty());
    }

    #[test]
    fn test_phase_transitions() {
        assert!(ActionPhase::Idle.can_advance_to(ActionPhase::PendingConfirmation));
        assert!(ActionPhase::PendingConfirmation.can_advance_to(ActionPhase::Declined));
        assert!(!ActionPhase::Declined.can_advance_to(ActionPhase::Executing));
        assert!(!ActionPhase::Idle.can_advance_to(ActionPhase::Succeeded));
        assert!(ActionPhase::Failed.is_terminal());
    }
}
