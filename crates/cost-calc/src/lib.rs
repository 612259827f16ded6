//! # Cost Calculation Engine
//!
//! BOM 展開、成本解析與彙總引擎

pub mod catalog;
pub mod expander;
pub mod fifo;
pub mod monthly;
pub mod resolver;
pub mod rollup;
pub mod verification;

#[cfg(test)]
mod testing;

use std::collections::BTreeMap;

use cost_core::{CostSource, CostView, ExpansionNode, ResolvedCost};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

// Re-export 主要類型
pub use catalog::{CatalogFilter, ProductCatalog};
pub use expander::{BomExpander, BomExpansion, CycleCut};
pub use fifo::{FifoQueue, FifoTracker, OpenLot};
pub use monthly::{CostSample, MonthlyCostCalculator, MonthlyCostPoint};
pub use resolver::{CostResolver, CostSignal, PurchasePriceSignal, ValuationLayerSignal};
pub use rollup::RollupCalculator;
pub use verification::{DirectBreakdown, DirectBreakdownCalculator, DirectLineCost};

/// 成本彙總結果
#[derive(Debug, Clone, Serialize)]
pub struct RollupResult {
    /// 計算批次ID（對應日誌 span）
    pub run_id: Uuid,

    /// 根物料ID
    pub root_id: String,

    /// 成本檢視方式
    pub view: CostView,

    /// 完整展開樹（含中間件）
    pub nodes: Vec<ExpansionNode>,

    /// 葉節點成本（僅葉節點計入總成本）
    pub leaf_costs: Vec<LeafCost>,

    /// 總成本
    pub total_cost: Decimal,

    /// 各層小計
    pub per_level_subtotal: BTreeMap<u32, Decimal>,

    /// 各父件小計
    pub per_parent_subtotal: BTreeMap<String, Decimal>,

    /// 根物料在 ERP 中的記錄成本（第一筆入庫估價層）
    pub root_recorded_cost: Option<Decimal>,

    /// 警告信息
    pub warnings: Vec<RollupWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl RollupResult {
    /// 創建空的彙總結果（找不到根物料或 BOM）
    pub fn empty(run_id: Uuid, root_id: String, view: CostView) -> Self {
        Self {
            run_id,
            root_id,
            view,
            nodes: Vec::new(),
            leaf_costs: Vec::new(),
            total_cost: Decimal::ZERO,
            per_level_subtotal: BTreeMap::new(),
            per_parent_subtotal: BTreeMap::new(),
            root_recorded_cost: None,
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 是否為空結果
    pub fn is_empty(&self) -> bool {
        self.leaf_costs.is_empty()
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: RollupWarning) {
        self.warnings.push(warning);
    }

    /// 查無成本的葉節點數
    pub fn missing_cost_count(&self) -> usize {
        self.leaf_costs
            .iter()
            .filter(|leaf| leaf.source == CostSource::None)
            .count()
    }

    /// 所有葉節點皆有成本來源
    pub fn is_complete(&self) -> bool {
        self.missing_cost_count() == 0
    }

    /// 指定層級的葉節點成本
    pub fn leaves_at_level(&self, level: u32) -> impl Iterator<Item = &LeafCost> {
        self.leaf_costs.iter().filter(move |leaf| leaf.level == level)
    }

    /// 指定類型的警告
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &RollupWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// 葉節點成本
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafCost {
    pub component_id: String,
    pub component_name: String,
    pub level: u32,
    pub path: Vec<String>,
    pub parent_id: Option<String>,
    pub uom: String,
    /// 每單位根產品所需數量
    pub multiplier: Decimal,
    /// 換算到參考單位後的數量
    pub normalized_qty: Decimal,
    pub unit_cost: Decimal,
    pub source: CostSource,
    /// multiplier × unit_cost
    pub line_cost: Decimal,
    pub degenerate: bool,
}

impl LeafCost {
    /// 由展開節點與解析成本組合
    pub fn from_node(node: &ExpansionNode, cost: &ResolvedCost) -> Self {
        Self {
            component_id: node.component_id.clone(),
            component_name: node.component_name.clone(),
            level: node.level,
            path: node.path.clone(),
            parent_id: node.parent_id.clone(),
            uom: node.uom.clone(),
            multiplier: node.multiplier,
            normalized_qty: node.normalized_qty(),
            unit_cost: cost.unit_cost,
            source: cost.source,
            line_cost: node.multiplier * cost.unit_cost,
            degenerate: node.degenerate,
        }
    }
}

/// 彙總警告
#[derive(Debug, Clone, Serialize)]
pub struct RollupWarning {
    pub component_id: String,
    pub message: String,
    pub kind: WarningKind,
    pub severity: WarningSeverity,
}

impl RollupWarning {
    pub fn new(
        component_id: String,
        message: String,
        kind: WarningKind,
        severity: WarningSeverity,
    ) -> Self {
        Self {
            component_id,
            message,
            kind,
            severity,
        }
    }

    /// 葉節點查無成本
    pub fn missing_cost(component_id: String) -> Self {
        let message = format!("物料 {} 無採購或估價成本，以 0 計", component_id);
        Self::new(
            component_id,
            message,
            WarningKind::MissingCost,
            WarningSeverity::Warning,
        )
    }

    /// BOM 產出數量為 0
    pub fn degenerate_bom(component_id: String, bom_id: &str) -> Self {
        let message = format!("BOM {} 產出數量為 0，子件成本貢獻以 0 計", bom_id);
        Self::new(
            component_id,
            message,
            WarningKind::DegenerateBom,
            WarningSeverity::Warning,
        )
    }

    /// 循環引用被截斷
    pub fn cycle_cut(cut: &CycleCut) -> Self {
        let message = format!(
            "{} 已在路徑 {} 中，略過以避免循環",
            cut.component_id,
            cut.path.join(" > ")
        );
        Self::new(
            cut.parent_id.clone(),
            message,
            WarningKind::CycleCut,
            WarningSeverity::Info,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    MissingCost,
    DegenerateBom,
    CycleCut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
