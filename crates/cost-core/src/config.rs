//! 成本計算配置

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{BomType, CostError, PurchaseLineState};

/// 成本展開與彙總參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// 參與展開的 BOM 類型
    pub bom_type: BomType,

    /// 採購價訊號納入的採購行狀態
    pub purchase_states: Vec<PurchaseLineState>,

    /// 月度趨勢的起始基準日（早於此日的月份一律排除）
    pub monthly_start_date: NaiveDate,

    /// 移動平均視窗（月）
    pub rolling_window: usize,

    /// 移動平均最少資料點
    pub rolling_min_periods: usize,

    /// 是否在單次計算內記憶物料成本
    pub memoize_costs: bool,
}

impl CostConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            bom_type: BomType::Normal,
            purchase_states: vec![PurchaseLineState::Purchase, PurchaseLineState::Done],
            // 2025-01-01 恆為有效日期
            monthly_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            rolling_window: 3,
            rolling_min_periods: 1,
            memoize_costs: true,
        }
    }

    /// 從 JSON 載入配置（缺少的欄位使用預設值）
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: CostConfig = serde_json::from_str(json)
            .map_err(|e| CostError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        tracing::debug!("載入成本配置: {:?}", config);
        Ok(config)
    }

    /// 建構器模式：設置 BOM 類型
    pub fn with_bom_type(mut self, bom_type: BomType) -> Self {
        self.bom_type = bom_type;
        self
    }

    /// 建構器模式：設置採購行狀態
    pub fn with_purchase_states(mut self, states: Vec<PurchaseLineState>) -> Self {
        self.purchase_states = states;
        self
    }

    /// 建構器模式：設置月度起始基準日
    pub fn with_monthly_start_date(mut self, date: NaiveDate) -> Self {
        self.monthly_start_date = date;
        self
    }

    /// 建構器模式：設置移動平均參數
    pub fn with_rolling(mut self, window: usize, min_periods: usize) -> Self {
        self.rolling_window = window;
        self.rolling_min_periods = min_periods;
        self
    }

    /// 建構器模式：設置是否記憶成本
    pub fn with_memoize_costs(mut self, memoize: bool) -> Self {
        self.memoize_costs = memoize;
        self
    }

    /// 驗證配置
    pub fn validate(&self) -> crate::Result<()> {
        if self.rolling_window == 0 {
            return Err(CostError::InvalidConfig("rolling_window 必須大於 0".to_string()));
        }
        if self.rolling_min_periods == 0 || self.rolling_min_periods > self.rolling_window {
            return Err(CostError::InvalidConfig(format!(
                "rolling_min_periods 必須介於 1 與 {} 之間",
                self.rolling_window
            )));
        }
        if self.purchase_states.is_empty() {
            return Err(CostError::InvalidConfig("purchase_states 不可為空".to_string()));
        }
        Ok(())
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CostConfig::default();

        assert_eq!(config.bom_type, BomType::Normal);
        assert_eq!(
            config.purchase_states,
            vec![PurchaseLineState::Purchase, PurchaseLineState::Done]
        );
        assert_eq!(
            config.monthly_start_date,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(config.rolling_window, 3);
        assert_eq!(config.rolling_min_periods, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CostConfig::new()
            .with_bom_type(BomType::Phantom)
            .with_rolling(6, 2)
            .with_memoize_costs(false);

        assert_eq!(config.bom_type, BomType::Phantom);
        assert_eq!(config.rolling_window, 6);
        assert_eq!(config.rolling_min_periods, 2);
        assert!(!config.memoize_costs);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CostConfig::from_json(
            r#"{ "monthly_start_date": "2024-07-01", "purchase_states": ["done"] }"#,
        )
        .unwrap();

        assert_eq!(
            config.monthly_start_date,
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        assert_eq!(config.purchase_states, vec![PurchaseLineState::Done]);
        assert_eq!(config.rolling_window, 3);
    }

    #[test]
    fn test_invalid_config() {
        assert!(CostConfig::new().with_rolling(0, 1).validate().is_err());
        assert!(CostConfig::new().with_rolling(3, 4).validate().is_err());
        assert!(CostConfig::from_json(r#"{ "rolling_window": 0 }"#).is_err());
        assert!(CostConfig::from_json("not json").is_err());
    }
}
