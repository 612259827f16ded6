//! 成本來源、日期區間與解析結果

use chrono::{Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CostError;

/// 日期區間（起訖日皆包含）
///
/// 訖日整天都計入：時間戳比較用 `< 訖日次日零時`。
/// 與 `create_date <= 訖日` 的寫法不同，後者只涵蓋到訖日零時，
/// 訖日當天稍後建立的紀錄會被排除。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// 創建日期區間，起日不得晚於訖日
    pub fn new(start: NaiveDate, end: NaiveDate) -> crate::Result<Self> {
        if start > end {
            return Err(CostError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// 截至 `today` 的最近 N 個月（例如 12 / 6 / 3 個月）
    pub fn last_months(today: NaiveDate, months: u32) -> crate::Result<Self> {
        let start = today
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| CostError::Other(format!("日期溢出: {} - {} 個月", today, months)))?;
        Self::new(start, today)
    }

    /// 整個年度
    pub fn calendar_year(year: i32) -> crate::Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| CostError::Other(format!("無效的年度: {}", year)))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| CostError::Other(format!("無效的年度: {}", year)))?;
        Self::new(start, end)
    }

    /// 區間起點（含）
    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start.and_time(chrono::NaiveTime::MIN)
    }

    /// 區間終點（不含）：訖日的次日零時
    pub fn end_datetime_exclusive(&self) -> NaiveDateTime {
        self.end
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN)
    }

    /// 檢查時間點是否落在區間內
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let date = at.date();
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// 單位成本來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    /// 區間內採購行平均單價
    PurchasePrice,
    /// 區間內估價層平均單位成本
    ValuationLayer,
    /// 目前 FIFO 成本
    Fifo,
    /// 無任何成本資料（以 0 計）
    None,
}

impl CostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostSource::PurchasePrice => "purchase_price",
            CostSource::ValuationLayer => "valuation_layer",
            CostSource::Fifo => "fifo",
            CostSource::None => "none",
        }
    }
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已解析的單位成本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCost {
    /// 物料ID
    pub component_id: String,

    /// 單位成本（未四捨五入）
    pub unit_cost: Decimal,

    /// 成本來源
    pub source: CostSource,

    /// 使用的日期區間（FIFO 為全歷史，無區間）
    pub window: Option<DateWindow>,
}

impl ResolvedCost {
    /// 創建新的解析結果
    pub fn new(
        component_id: String,
        unit_cost: Decimal,
        source: CostSource,
        window: Option<DateWindow>,
    ) -> Self {
        Self {
            component_id,
            unit_cost,
            source,
            window,
        }
    }

    /// 查無成本：以 0 計並標記來源為 `none`
    pub fn missing(component_id: String, window: Option<DateWindow>) -> Self {
        Self::new(component_id, Decimal::ZERO, CostSource::None, window)
    }

    /// 是否查無成本
    pub fn is_missing(&self) -> bool {
        self.source == CostSource::None
    }
}

/// 成本檢視方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostView {
    /// 區間平均（採購價優先，其次估價層）
    PointInTime(DateWindow),
    /// 目前 FIFO 成本
    CurrentFifo,
}

impl CostView {
    /// 取得區間（FIFO 無區間）
    pub fn window(&self) -> Option<DateWindow> {
        match self {
            CostView::PointInTime(window) => Some(*window),
            CostView::CurrentFifo => None,
        }
    }
}
