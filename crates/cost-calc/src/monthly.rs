//! 月度加權平均成本趨勢
//!
//! 以 BOM 的直接子件（不遞迴）為範圍，取每筆入庫估價層，
//! 依 BOM 行數量加權後按月分桶，再做移動平均平滑。

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use cost_core::{BillOfMaterials, CostConfig, CostDataSource};
use rust_decimal::Decimal;
use serde::Serialize;

/// 單一月份的成本點
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCostPoint {
    /// 月份（當月第一天）
    pub month: NaiveDate,

    /// Σ(單位成本 × 權重)
    pub total_cost: Decimal,

    /// Σ權重
    pub total_quantity: Decimal,

    /// total_cost / total_quantity
    pub weighted_average: Decimal,

    /// 移動平均（資料點不足最少數量時為 `None`）
    pub rolling_average: Option<Decimal>,
}

/// 加權成本樣本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSample {
    pub at: NaiveDateTime,
    pub unit_cost: Decimal,
    /// 入庫數量 × BOM 行數量
    pub weight: Decimal,
}

/// 月度成本計算器
pub struct MonthlyCostCalculator<'a> {
    source: &'a dyn CostDataSource,
    start_date: NaiveDate,
    rolling_window: usize,
    rolling_min_periods: usize,
}

impl<'a> MonthlyCostCalculator<'a> {
    pub fn new(source: &'a dyn CostDataSource, config: &CostConfig) -> Self {
        Self {
            source,
            start_date: config.monthly_start_date,
            rolling_window: config.rolling_window,
            rolling_min_periods: config.rolling_min_periods,
        }
    }

    /// 指定 BOM 的月度序列，BOM 不存在時返回空序列
    pub fn series_for_bom(&self, bom_id: &str) -> cost_core::Result<Vec<MonthlyCostPoint>> {
        match self.source.find_bom(bom_id)? {
            Some(bom) => self.series(&bom),
            None => {
                tracing::warn!("找不到 BOM: {}", bom_id);
                Ok(Vec::new())
            }
        }
    }

    /// BOM 直接子件的月度序列
    ///
    /// 權重使用 BOM 行上的原始數量，不除以 BOM 產出數量
    pub fn series(&self, bom: &BillOfMaterials) -> cost_core::Result<Vec<MonthlyCostPoint>> {
        let mut samples = Vec::new();

        for line in &bom.lines {
            let history = self.source.valuation_history(&line.component_id)?;
            samples.extend(history.iter().filter(|lot| lot.is_receipt()).map(|lot| {
                CostSample {
                    at: lot.created_at,
                    unit_cost: lot.unit_cost,
                    weight: lot.quantity * line.quantity,
                }
            }));
        }

        tracing::debug!(
            "BOM {} 月度趨勢：直接子件 {} 個，入庫樣本 {} 筆",
            bom.bom_id,
            bom.lines.len(),
            samples.len()
        );

        Ok(self.aggregate(&samples))
    }

    /// 分桶、過濾並計算移動平均
    pub fn aggregate(&self, samples: &[CostSample]) -> Vec<MonthlyCostPoint> {
        let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
        for sample in samples {
            let Some(month) = month_start(sample.at.date()) else {
                continue;
            };
            let bucket = buckets.entry(month).or_default();
            bucket.0 += sample.unit_cost * sample.weight;
            bucket.1 += sample.weight;
        }

        let mut points: Vec<MonthlyCostPoint> = buckets
            .into_iter()
            .filter(|(month, _)| {
                month_end(*month).is_some_and(|end| end >= self.start_date)
            })
            .filter_map(|(month, (total_cost, total_quantity))| {
                let weighted_average = total_cost.checked_div(total_quantity)?;
                Some(MonthlyCostPoint {
                    month,
                    total_cost,
                    total_quantity,
                    weighted_average,
                    rolling_average: None,
                })
            })
            .collect();

        let averages: Vec<Decimal> = points.iter().map(|p| p.weighted_average).collect();
        let rolling = rolling_mean(&averages, self.rolling_window, self.rolling_min_periods);
        for (point, value) in points.iter_mut().zip(rolling) {
            point.rolling_average = value;
        }

        points
    }
}

/// 以列為單位的尾隨移動平均
///
/// 第 i 列取最近 `window` 列（含自身）；可用列數少於 `min_periods` 時為 `None`
pub fn rolling_mean(values: &[Decimal], window: usize, min_periods: usize) -> Vec<Option<Decimal>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let slice = &values[from..=i];
            if slice.len() < min_periods {
                return None;
            }
            let sum: Decimal = slice.iter().sum();
            sum.checked_div(Decimal::from(slice.len()))
        })
        .collect()
}

fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn month_end(month: NaiveDate) -> Option<NaiveDate> {
    month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
}
