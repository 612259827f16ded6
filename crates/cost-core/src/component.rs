//! 物料模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 物料（可採購 / 可生產）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// 物料ID
    pub component_id: String,

    /// 料號（ERP default code）
    pub code: Option<String>,

    /// 顯示名稱
    pub name: String,

    /// 單位
    pub uom: String,

    /// 單位換算係數（相對於參考單位）
    pub uom_factor: Decimal,

    /// 分類路徑，以 `/` 分隔，例如 `Finished Goods / Snacks / Factory`
    pub category_path: String,
}

impl Component {
    /// 創建新的物料
    pub fn new(component_id: String, name: String, uom: String) -> Self {
        Self {
            component_id,
            code: None,
            name,
            uom,
            uom_factor: Decimal::ONE,
            category_path: String::new(),
        }
    }

    /// 建構器模式：設置料號
    pub fn with_code(mut self, code: String) -> Self {
        self.code = Some(code);
        self
    }

    /// 建構器模式：設置分類路徑
    pub fn with_category_path(mut self, category_path: String) -> Self {
        self.category_path = category_path;
        self
    }

    /// 建構器模式：設置單位換算係數
    pub fn with_uom_factor(mut self, uom_factor: Decimal) -> Self {
        self.uom_factor = uom_factor;
        self
    }

    /// 分類層級（去除前後空白）
    ///
    /// `"Finished Goods / Snacks / Factory"` → `["Finished Goods", "Snacks", "Factory"]`
    pub fn category_levels(&self) -> Vec<&str> {
        if self.category_path.trim().is_empty() {
            return Vec::new();
        }
        self.category_path.split('/').map(str::trim).collect()
    }

    /// 取得第 N 層分類（從 1 開始）
    pub fn category_level(&self, level: usize) -> Option<&str> {
        if level == 0 {
            return None;
        }
        self.category_levels()
            .get(level - 1)
            .copied()
            .filter(|s| !s.is_empty())
    }

    /// 基礎品名：移除結尾的變體括號，例如 `Chips (12 Pack, EN)` → `Chips`
    pub fn base_name(&self) -> &str {
        let trimmed = self.name.trim_end();
        if trimmed.ends_with(')') {
            if let Some(open) = trimmed.rfind('(') {
                return trimmed[..open].trim_end();
            }
        }
        trimmed
    }
}
