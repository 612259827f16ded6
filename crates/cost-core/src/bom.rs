//! BOM 模型與展開節點

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Component, CostError};

/// BOM 類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BomType {
    /// 一般製造
    Normal,
    /// 虛擬件（套件）
    Phantom,
    /// 委外加工
    Subcontract,
}

impl BomType {
    /// 資料庫中的字串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            BomType::Normal => "normal",
            BomType::Phantom => "phantom",
            BomType::Subcontract => "subcontract",
        }
    }
}

impl fmt::Display for BomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BomType {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(BomType::Normal),
            "phantom" | "kit" => Ok(BomType::Phantom),
            "subcontract" => Ok(BomType::Subcontract),
            other => Err(CostError::Other(format!("未知的 BOM 類型: {}", other))),
        }
    }
}

/// BOM 行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    /// 子件物料ID
    pub component_id: String,

    /// 每單位 BOM 產出所需數量
    pub quantity: Decimal,

    /// 排序
    pub sequence: u32,
}

impl BomLine {
    /// 創建新的 BOM 行
    pub fn new(component_id: String, quantity: Decimal) -> Self {
        Self {
            component_id,
            quantity,
            sequence: 0,
        }
    }

    /// 建構器模式：設置排序
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }
}

/// 物料清單（BOM）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    /// BOM ID
    pub bom_id: String,

    /// BOM 代碼
    pub code: Option<String>,

    /// 父件物料ID
    pub product_id: String,

    /// 產出數量（比例分母）
    pub product_qty: Decimal,

    /// 是否啟用
    pub active: bool,

    /// BOM 類型
    pub bom_type: BomType,

    /// BOM 行（依 sequence 排序）
    pub lines: Vec<BomLine>,
}

impl BillOfMaterials {
    /// 創建新的 BOM（預設啟用、一般製造、產出 1）
    pub fn new(bom_id: String, product_id: String) -> Self {
        Self {
            bom_id,
            code: None,
            product_id,
            product_qty: Decimal::ONE,
            active: true,
            bom_type: BomType::Normal,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置 BOM 代碼
    pub fn with_code(mut self, code: String) -> Self {
        self.code = Some(code);
        self
    }

    /// 建構器模式：設置產出數量
    pub fn with_product_qty(mut self, product_qty: Decimal) -> Self {
        self.product_qty = product_qty;
        self
    }

    /// 建構器模式：設置 BOM 類型
    pub fn with_bom_type(mut self, bom_type: BomType) -> Self {
        self.bom_type = bom_type;
        self
    }

    /// 建構器模式：設置為停用
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// 建構器模式：添加 BOM 行
    pub fn with_line(mut self, component_id: &str, quantity: Decimal) -> Self {
        let sequence = (self.lines.len() as u32 + 1) * 10;
        self.lines
            .push(BomLine::new(component_id.to_string(), quantity).with_sequence(sequence));
        self
    }

    /// 檢查是否符合展開條件
    pub fn matches(&self, bom_type: BomType) -> bool {
        self.active && self.bom_type == bom_type
    }

    /// 單行比例 = 行數量 / 產出數量
    ///
    /// 產出數量為 0 時返回 `None`（比例未定義）
    pub fn line_ratio(&self, line: &BomLine) -> Option<Decimal> {
        if self.product_qty.is_zero() {
            return None;
        }
        line.quantity.checked_div(self.product_qty)
    }

    /// 依 sequence 排序 BOM 行
    pub fn sort_lines(&mut self) {
        self.lines.sort_by_key(|line| line.sequence);
    }
}

/// BOM 展開節點
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionNode {
    /// 物料ID
    pub component_id: String,

    /// 物料名稱
    pub component_name: String,

    /// 單位
    pub uom: String,

    /// 單位換算係數
    pub uom_factor: Decimal,

    /// 層級（根 = 0）
    pub level: u32,

    /// 每單位根產品所需的累積數量
    pub multiplier: Decimal,

    /// 從根到本節點的路徑
    pub path: Vec<String>,

    /// 父件物料ID（僅作查找鍵）
    pub parent_id: Option<String>,

    /// 來源 BOM ID
    pub bom_id: Option<String>,

    /// BOM 行上的原始數量
    pub line_qty: Decimal,

    /// 是否經過產出數量為 0 的 BOM（比例未定義）
    pub degenerate: bool,

    /// 是否為葉節點
    pub is_leaf: bool,
}

impl ExpansionNode {
    /// 創建根節點
    pub fn root(component: &Component) -> Self {
        Self {
            path: vec![component.component_id.clone()],
            component_id: component.component_id.clone(),
            component_name: component.name.clone(),
            uom: component.uom.clone(),
            uom_factor: component.uom_factor,
            level: 0,
            multiplier: Decimal::ONE,
            parent_id: None,
            bom_id: None,
            line_qty: Decimal::ONE,
            degenerate: false,
            is_leaf: true,
        }
    }

    /// 由父節點派生子節點
    pub fn child(
        parent: &ExpansionNode,
        component: &Component,
        bom: &BillOfMaterials,
        line: &BomLine,
    ) -> Self {
        // 產出數量為零或乘積溢位時，倍數記為 0 並標記
        let product = bom
            .line_ratio(line)
            .and_then(|r| parent.multiplier.checked_mul(r));
        let degenerate = parent.degenerate || product.is_none();
        let multiplier = product.unwrap_or(Decimal::ZERO);

        let mut path = parent.path.clone();
        path.push(component.component_id.clone());

        Self {
            component_id: component.component_id.clone(),
            component_name: component.name.clone(),
            uom: component.uom.clone(),
            uom_factor: component.uom_factor,
            level: parent.level + 1,
            multiplier,
            path,
            parent_id: Some(parent.component_id.clone()),
            bom_id: Some(bom.bom_id.clone()),
            line_qty: line.quantity,
            degenerate,
            is_leaf: true,
        }
    }

    /// 檢查物料是否已在祖先路徑中
    pub fn has_ancestor(&self, component_id: &str) -> bool {
        self.path.iter().any(|id| id == component_id)
    }

    /// 換算到參考單位後的累積數量
    pub fn normalized_qty(&self) -> Decimal {
        self.multiplier * self.uom_factor
    }

    /// 路徑顯示字串，例如 `BIKE > FRAME > TUBE`
    pub fn path_display(&self) -> String {
        self.path.join(" > ")
    }
}
