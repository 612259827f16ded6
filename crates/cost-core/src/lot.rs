//! 庫存異動（估價層）與採購行模型

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CostError;

/// 庫存異動（一筆估價層記錄）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLot {
    /// 帶正負號的數量（正 = 入庫，負 = 耗用）
    pub quantity: Decimal,

    /// 單位成本
    pub unit_cost: Decimal,

    /// 建立時間
    pub created_at: NaiveDateTime,
}

impl CostLot {
    /// 創建新的異動記錄
    pub fn new(quantity: Decimal, unit_cost: Decimal, created_at: NaiveDateTime) -> Self {
        Self {
            quantity,
            unit_cost,
            created_at,
        }
    }

    /// 是否為入庫
    pub fn is_receipt(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// 是否為耗用
    pub fn is_consumption(&self) -> bool {
        self.quantity < Decimal::ZERO
    }
}

/// 採購行狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseLineState {
    /// 草稿
    Draft,
    /// 已送出詢價
    Sent,
    /// 待核准
    ToApprove,
    /// 已確認（採購單）
    Purchase,
    /// 已完成
    Done,
    /// 已取消
    Cancel,
}

impl PurchaseLineState {
    /// 資料庫中的字串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseLineState::Draft => "draft",
            PurchaseLineState::Sent => "sent",
            PurchaseLineState::ToApprove => "to approve",
            PurchaseLineState::Purchase => "purchase",
            PurchaseLineState::Done => "done",
            PurchaseLineState::Cancel => "cancel",
        }
    }
}

impl fmt::Display for PurchaseLineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseLineState {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PurchaseLineState::Draft),
            "sent" => Ok(PurchaseLineState::Sent),
            "to approve" | "to_approve" => Ok(PurchaseLineState::ToApprove),
            "purchase" => Ok(PurchaseLineState::Purchase),
            "done" => Ok(PurchaseLineState::Done),
            "cancel" => Ok(PurchaseLineState::Cancel),
            other => Err(CostError::Other(format!("未知的採購行狀態: {}", other))),
        }
    }
}

/// 採購行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLine {
    /// 物料ID
    pub component_id: String,

    /// 單價
    pub price_unit: Decimal,

    /// 採購數量
    pub quantity: Decimal,

    /// 狀態
    pub state: PurchaseLineState,

    /// 建立時間
    pub created_at: NaiveDateTime,
}

impl PurchaseLine {
    /// 創建新的採購行（預設已確認）
    pub fn new(component_id: String, price_unit: Decimal, created_at: NaiveDateTime) -> Self {
        Self {
            component_id,
            price_unit,
            quantity: Decimal::ONE,
            state: PurchaseLineState::Purchase,
            created_at,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: PurchaseLineState) -> Self {
        self.state = state;
        self
    }

    /// 建構器模式：設置數量
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }
}
