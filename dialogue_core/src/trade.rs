//! Trade mode - a bounded buy/sell sub-negotiation.
//!
//! Once the player agrees to trade, a [`TradeSession`] repeatedly asks a
//! [`TradeNegotiator`] for the next request until the player leaves or the
//! round limit is reached. Every buy or sell is an atomic
//! [`exchange`](game_rules::exchange); a refused exchange is recorded and
//! the session carries on.

use game_rules::{exchange, Inventory, Item, Receipt, TransactionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One request from the player while trading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum TradeRequest {
    /// Look at the merchant's wares.
    Browse,
    /// Buy an item from the merchant.
    Buy { item: String },
    /// Sell an item to the merchant.
    Sell { item: String },
    /// Stop trading.
    Exit,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TradeLine {
    Browsed { items: Vec<Item> },
    Bought { receipt: Receipt },
    Sold { receipt: Receipt },
    Refused { request: TradeRequest, error: TransactionError },
    Left,
}

/// State of the negotiation handed to the negotiator before each request.
#[derive(Debug, Clone, Serialize)]
pub struct TradeView<'a> {
    pub npc: &'a str,
    /// Zero-based round number.
    pub round: usize,
    pub merchant: &'a Inventory,
    pub player: &'a Inventory,
    pub last: Option<&'a TradeLine>,
}

/// Produces the player's trade requests.
pub trait TradeNegotiator {
    fn next_request(&mut self, view: &TradeView<'_>) -> TradeRequest;
}

impl<F> TradeNegotiator for F
where
    F: FnMut(&TradeView<'_>) -> TradeRequest,
{
    fn next_request(&mut self, view: &TradeView<'_>) -> TradeRequest {
        self(view)
    }
}

/// Record of a finished trade session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradeSummary {
    pub lines: Vec<TradeLine>,
    /// False when the session was closed by the round limit.
    pub exited: bool,
}

impl TradeSummary {
    pub fn rounds(&self) -> usize {
        self.lines.len()
    }

    /// Number of refused buy or sell requests.
    pub fn failures(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, TradeLine::Refused { .. }))
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.failures() == 0
    }

    /// Short plain-text account of the session.
    pub fn to_context(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let text = match line {
                TradeLine::Browsed { items } => format!("browsed {} item(s)", items.len()),
                TradeLine::Bought { receipt } => {
                    format!("player bought {} for {} gold", receipt_item(receipt), receipt.gold)
                }
                TradeLine::Sold { receipt } => {
                    format!("player sold {} for {} gold", receipt_item(receipt), receipt.gold)
                }
                TradeLine::Refused { error, .. } => format!("refused: {error}"),
                TradeLine::Left => "player left".to_string(),
            };
            out.push_str("- ");
            out.push_str(&text);
            out.push('\n');
        }
        out
    }
}

fn receipt_item(receipt: &Receipt) -> &str {
    receipt.item.as_ref().map(|item| item.name.as_str()).unwrap_or("nothing")
}

/// A single trade between an NPC and the player.
pub struct TradeSession<'a> {
    npc: &'a str,
    merchant: &'a mut Inventory,
    player: &'a mut Inventory,
    max_rounds: usize,
}

impl<'a> TradeSession<'a> {
    pub fn new(
        npc: &'a str,
        merchant: &'a mut Inventory,
        player: &'a mut Inventory,
        max_rounds: usize,
    ) -> Self {
        Self {
            npc,
            merchant,
            player,
            max_rounds,
        }
    }

    /// Run requests until the player exits or the round limit is hit.
    pub fn run(mut self, negotiator: &mut dyn TradeNegotiator) -> TradeSummary {
        let mut summary = TradeSummary::default();

        for round in 0..self.max_rounds {
            let request = negotiator.next_request(&TradeView {
                npc: self.npc,
                round,
                merchant: self.merchant,
                player: self.player,
                last: summary.lines.last(),
            });
            debug!(round, ?request, "trade request");

            let line = self.apply(request);
            let left = matches!(line, TradeLine::Left);
            summary.lines.push(line);
            if left {
                summary.exited = true;
                return summary;
            }
        }

        warn!(npc = self.npc, rounds = self.max_rounds, "trade closed by round limit");
        summary
    }

    fn apply(&mut self, request: TradeRequest) -> TradeLine {
        let result = match &request {
            TradeRequest::Browse => {
                return TradeLine::Browsed {
                    items: self.merchant.items.clone(),
                }
            }
            TradeRequest::Exit => return TradeLine::Left,
            TradeRequest::Buy { item } => {
                exchange(self.merchant, self.player, item).map(|receipt| TradeLine::Bought { receipt })
            }
            TradeRequest::Sell { item } => {
                exchange(self.player, self.merchant, item).map(|receipt| TradeLine::Sold { receipt })
            }
        };

        result.unwrap_or_else(|error| {
            debug!(%error, "trade request refused");
            TradeLine::Refused { request, error }
        })
    }
}
