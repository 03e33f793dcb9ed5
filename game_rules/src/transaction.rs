//! Transaction engine - moves gold and items between two inventories.
//!
//! Every operation validates first and mutates second. Validation failures
//! leave both inventories untouched; once validation passes nothing can fail,
//! so either every mutation of a transaction happens or none does.
//!
//! Both sides are taken as `&mut Inventory`, which gives the caller exclusive
//! access to the pair for the duration of the update.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::entities::{Inventory, Item};

/// Reasons a transaction is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransactionError {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("insufficient gold: {required} required, {available} available")]
    InsufficientGold { required: u32, available: u32 },

    #[error("gold overflow: receiver holds {held} and cannot take {amount} more")]
    GoldOverflow { held: u32, amount: u32 },
}

/// What a completed transaction moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Gold that changed hands.
    pub gold: u32,
    /// Item that changed hands, if any.
    pub item: Option<Item>,
}

/// Result of a transaction.
pub type TransactionResult = Result<Receipt, TransactionError>;

/// One-way transfer of gold and optionally one item from `from` to `to`.
///
/// Checks run in order: the item must be held by the source, the source must
/// hold at least `gold`, and the destination must be able to take it.
pub fn transfer(
    from: &mut Inventory,
    to: &mut Inventory,
    gold: u32,
    item: Option<&Item>,
) -> TransactionResult {
    let index = item
        .map(|item| {
            from.position(item)
                .ok_or_else(|| TransactionError::ItemNotFound(item.name.clone()))
        })
        .transpose()?;

    if gold > from.gold {
        return Err(TransactionError::InsufficientGold {
            required: gold,
            available: from.gold,
        });
    }

    let credited = to
        .gold
        .checked_add(gold)
        .ok_or(TransactionError::GoldOverflow {
            held: to.gold,
            amount: gold,
        })?;

    from.gold -= gold;
    to.gold = credited;
    let moved = index.map(|i| from.items.remove(i));
    if let Some(item) = &moved {
        to.items.push(item.clone());
    }

    debug!(
        gold,
        item = moved.as_ref().map(|i| i.name.as_str()),
        "transfer completed"
    );

    Ok(Receipt { gold, item: moved })
}

/// Sell the first item named `item_name` from `seller` to `buyer` at its price.
///
/// The item moves seller -> buyer and the price moves buyer -> seller as a
/// single swap.
pub fn exchange(seller: &mut Inventory, buyer: &mut Inventory, item_name: &str) -> TransactionResult {
    let index = seller
        .items
        .iter()
        .position(|item| item.is_named(item_name))
        .ok_or_else(|| TransactionError::ItemNotFound(item_name.trim().to_string()))?;
    let price = seller.items[index].price;

    if price > buyer.gold {
        return Err(TransactionError::InsufficientGold {
            required: price,
            available: buyer.gold,
        });
    }

    let credited = seller
        .gold
        .checked_add(price)
        .ok_or(TransactionError::GoldOverflow {
            held: seller.gold,
            amount: price,
        })?;

    buyer.gold -= price;
    seller.gold = credited;
    let item = seller.items.remove(index);
    buyer.items.push(item.clone());

    debug!(item = %item.name, price, "exchange completed");

    Ok(Receipt {
        gold: price,
        item: Some(item),
    })
}
