use crate::common::types::SequenceId;
use serde::{Deserialize, Serialize};

/// One simulated market update for a card.
///
/// Serialized with the field names the browser client expects:
/// `{"id":..,"name":..,"listingPrice":..,"currentPrice":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Dispatch position in the pool run, unique within a session.
    #[serde(rename = "id")]
    pub sequence_id: SequenceId,
    pub name: String,
    pub listing_price: u32,
    pub current_price: u32,
}

impl Record {
    /// Whether the card currently trades above its listing price.
    pub const fn is_profitable(&self) -> bool {
        self.current_price > self.listing_price
    }
}
