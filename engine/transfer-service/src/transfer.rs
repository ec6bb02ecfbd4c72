//! Transfer records: the append-only audit trail of buys and sells

use crate::money::Money;
use crate::player::{PlayerId, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    Buy,
    Sell,
}

impl TransferType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferType::Buy => "buy",
            TransferType::Sell => "sell",
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TransferType::Buy),
            "sell" => Ok(TransferType::Sell),
            other => Err(format!("Unknown transfer type '{other}'")),
        }
    }
}

/// A completed buy or sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: i64,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub transfer_type: TransferType,
    /// Market price at the time of the transfer
    pub price: Money,
    pub week: u32,
    pub season: i32,
    pub transfer_date: chrono::NaiveDateTime,
}

impl TransferRecord {
    /// Budget impact of this record: buys spend, sells free
    pub fn cash_impact(&self) -> Money {
        match self.transfer_type {
            TransferType::Buy => -self.price,
            TransferType::Sell => self.price,
        }
    }
}

/// Transfer details for recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub transfer_type: TransferType,
    pub price: Money,
    pub week: u32,
    pub season: i32,
}

impl NewTransfer {
    pub fn into_record(self, id: i64) -> TransferRecord {
        TransferRecord {
            id,
            team_id: self.team_id,
            player_id: self.player_id,
            transfer_type: self.transfer_type,
            price: self.price,
            week: self.week,
            season: self.season,
            transfer_date: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Query over the transfer history, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHistoryFilter {
    pub season: i32,
    pub team_id: Option<TeamId>,
    pub week: Option<u32>,
    pub limit: u32,
}

impl TransferHistoryFilter {
    pub fn matches(&self, record: &TransferRecord) -> bool {
        record.season == self.season
            && self.team_id.map_or(true, |team| record.team_id == team)
            && self.week.map_or(true, |week| record.week == week)
    }
}
