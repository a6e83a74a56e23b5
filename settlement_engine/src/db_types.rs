use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lps_common::Reais;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and no payment has been confirmed yet.
    Pending,
    /// Payment was confirmed and settlement has run. Terminal.
    Paid,
    /// The payment was rejected or cancelled before being paid. A later approval of the same payment
    /// still moves the order to `Paid`.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: String,
    pub total: Reais,
    pub status: OrderStatusType,
    pub external_payment_id: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder       --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub photo_id: String,
    pub photo_title: String,
    pub seller_id: String,
    pub price_paid: Reais,
}

impl NewOrder {
    pub fn new(order_id: OrderId, buyer_id: String) -> Self {
        Self { order_id, buyer_id, items: Vec::new() }
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// The order total is the sum of the item prices, fixed at order-creation time.
    pub fn total(&self) -> Reais {
        self.items.iter().map(|i| i.price_paid).sum()
    }
}

//--------------------------------------      OrderItem       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub photo_id: String,
    pub photo_title: String,
    pub seller_id: String,
    pub price_paid: Reais,
}

//--------------------------------------        Seller        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seller {
    pub id: String,
    pub payout_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seller {
    pub fn has_payout_key(&self) -> bool {
        self.payout_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false)
    }
}

//--------------------------------------        Balance       --------------------------------------------------------
/// A seller's ledger balance. `available` may be withdrawn now; `blocked` is reserved against in-flight
/// withdrawal requests. Withdrawals never overdraw `available`, but a refund that lands after the funds
/// were withdrawn can leave it negative.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub seller_id: String,
    pub available: Reais,
    pub blocked: Reais,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     LedgerEntryKind   -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LedgerEntryKind {
    Sale,
    Withdrawal,
    Refund,
}

impl Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryKind::Sale => write!(f, "Sale"),
            LedgerEntryKind::Withdrawal => write!(f, "Withdrawal"),
            LedgerEntryKind::Refund => write!(f, "Refund"),
        }
    }
}

impl FromStr for LedgerEntryKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sale" => Ok(Self::Sale),
            "Withdrawal" => Ok(Self::Withdrawal),
            "Refund" => Ok(Self::Refund),
            s => Err(ConversionError(format!("Invalid ledger entry kind: {s}"))),
        }
    }
}

//--------------------------------------    LedgerEntryStatus  -------------------------------------------------------
/// Only `Withdrawal` entries ever leave `Processed`-less limbo: sale and refund rows are final the moment
/// they are written, while a withdrawal row starts `Pending` and transitions exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LedgerEntryStatus {
    Pending,
    Processed,
    Failed,
}

impl Display for LedgerEntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryStatus::Pending => write!(f, "Pending"),
            LedgerEntryStatus::Processed => write!(f, "Processed"),
            LedgerEntryStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------      LedgerEntry      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub seller_id: String,
    pub kind: LedgerEntryKind,
    /// Signed centavos: positive for `Sale`, negative for `Withdrawal` and `Refund`.
    pub amount: Reais,
    pub description: String,
    pub withdrawal_id: Option<String>,
    pub status: LedgerEntryStatus,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   WithdrawalStatus    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Funds reserved, payout not yet confirmed. The only non-terminal state.
    Pending,
    /// Payout confirmed. Blocked funds were released permanently.
    Processed,
    /// Payout rejected, failed or cancelled. Blocked funds were returned to available.
    Failed,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "Pending"),
            WithdrawalStatus::Processed => write!(f, "Processed"),
            WithdrawalStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processed" => Ok(Self::Processed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid withdrawal status: {s}"))),
        }
    }
}

//--------------------------------------   WithdrawalRequest   -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: String,
    pub seller_id: String,
    pub amount: Reais,
    pub payout_key: String,
    pub status: WithdrawalStatus,
    pub note: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

//--------------------------------------    PendingTransfer    -------------------------------------------------------
/// A settlement credit that could not be routed because the seller had no payout destination configured at
/// sale time. A reconciliation pass replays these once the seller completes setup.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub id: i64,
    pub seller_id: String,
    pub amount: Reais,
    pub source_charge_id: String,
    pub order_id: OrderId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
