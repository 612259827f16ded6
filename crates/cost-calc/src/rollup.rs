//! 成本彙總計算器

use std::collections::{HashMap, HashSet};

use cost_core::{CostConfig, CostDataSource, CostView, ResolvedCost};
use uuid::Uuid;

use crate::expander::{BomExpander, BomExpansion};
use crate::fifo::FifoTracker;
use crate::resolver::CostResolver;
use crate::{LeafCost, RollupResult, RollupWarning};

/// 成本彙總計算器
pub struct RollupCalculator<'a> {
    /// 資料來源
    source: &'a dyn CostDataSource,

    /// 計算配置
    config: CostConfig,
}

impl<'a> RollupCalculator<'a> {
    /// 創建新的彙總計算器
    pub fn new(source: &'a dyn CostDataSource, config: CostConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// 從根物料展開並彙總成本
    pub fn rollup(&self, root_id: &str, view: CostView) -> cost_core::Result<RollupResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("rollup", %run_id, root = %root_id);
        let _guard = span.enter();

        let expansion = BomExpander::new(self.source, &self.config).expand(root_id)?;
        self.aggregate(run_id, root_id.to_string(), view, expansion)
    }

    /// 從指定 BOM 展開並彙總成本
    pub fn rollup_bom(&self, bom_id: &str, view: CostView) -> cost_core::Result<RollupResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("rollup", %run_id, bom = %bom_id);
        let _guard = span.enter();

        let expansion = BomExpander::new(self.source, &self.config).expand_bom(bom_id)?;
        let root_id = expansion
            .root()
            .map(|root| root.component_id.clone())
            .unwrap_or_else(|| bom_id.to_string());
        self.aggregate(run_id, root_id, view, expansion)
    }

    fn aggregate(
        &self,
        run_id: Uuid,
        root_id: String,
        view: CostView,
        expansion: BomExpansion,
    ) -> cost_core::Result<RollupResult> {
        let start_time = std::time::Instant::now();
        tracing::info!(
            "開始成本彙總：{} 節點 {} 個 ({:?})",
            root_id,
            expansion.nodes.len(),
            view
        );

        let mut result = RollupResult::empty(run_id, root_id, view);

        // Step 1: 展開過程的警告
        for cut in &expansion.cycle_cuts {
            result.add_warning(RollupWarning::cycle_cut(cut));
        }
        for (component_id, bom_id) in &expansion.degenerate_boms {
            result.add_warning(RollupWarning::degenerate_bom(component_id.clone(), bom_id));
        }

        // 只有根節點（無 BOM、BOM 行全被截斷）或根物料不存在
        if expansion.nodes.len() <= 1 {
            tracing::info!("{} 無可展開的 BOM，返回空結果", result.root_id);
            result.nodes = expansion.nodes;
            result.calculation_time_ms = Some(start_time.elapsed().as_millis());
            return Ok(result);
        }

        // Step 2: 葉節點計價
        tracing::debug!("Step 2: 葉節點計價");
        let resolver = CostResolver::new(self.source, &self.config);
        let tracker = FifoTracker::new(self.source);
        let mut memo: HashMap<String, ResolvedCost> = HashMap::new();
        let mut reported_missing: HashSet<String> = HashSet::new();

        for node in expansion.leaves() {
            let cost = match memo.get(&node.component_id) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = match view {
                        CostView::PointInTime(window) => {
                            resolver.resolve(&node.component_id, &window)?
                        }
                        CostView::CurrentFifo => tracker.resolve(&node.component_id)?,
                    };
                    if self.config.memoize_costs {
                        memo.insert(node.component_id.clone(), resolved.clone());
                    }
                    resolved
                }
            };

            if cost.is_missing() && reported_missing.insert(node.component_id.clone()) {
                result.add_warning(RollupWarning::missing_cost(node.component_id.clone()));
            }

            result.leaf_costs.push(LeafCost::from_node(node, &cost));
        }

        // Step 3: 加總（各層與各父件小計都只計葉節點）
        tracing::debug!("Step 3: 加總");
        for leaf in &result.leaf_costs {
            result.total_cost += leaf.line_cost;
            *result.per_level_subtotal.entry(leaf.level).or_default() += leaf.line_cost;
            if let Some(parent_id) = &leaf.parent_id {
                *result
                    .per_parent_subtotal
                    .entry(parent_id.clone())
                    .or_default() += leaf.line_cost;
            }
        }

        // Step 4: 根物料的 ERP 記錄成本
        result.root_recorded_cost = tracker.first_receipt_cost(&result.root_id)?;

        result.nodes = expansion.nodes;
        let elapsed = start_time.elapsed();
        result.calculation_time_ms = Some(elapsed.as_millis());

        tracing::info!(
            "成本彙總完成：葉節點 {} 個，總成本 {}，警告 {} 筆，耗時 {:?}",
            result.leaf_costs.len(),
            result.total_cost,
            result.warnings.len(),
            elapsed
        );

        Ok(result)
    }
}
