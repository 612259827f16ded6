//! BOM 樹展開
//!
//! 以工作佇列逐層展開，每個分支攜帶自己的祖先路徑，
//! 子件只有在不在父件路徑上時才會產生。

use std::collections::VecDeque;

use cost_core::{BillOfMaterials, BomType, Component, CostConfig, CostDataSource, ExpansionNode};

/// 因循環而被略過的 BOM 行
#[derive(Debug, Clone, PartialEq)]
pub struct CycleCut {
    /// 擁有該 BOM 行的父件
    pub parent_id: String,
    /// 被略過的子件
    pub component_id: String,
    /// 父件的祖先路徑
    pub path: Vec<String>,
}

/// 展開結果
#[derive(Debug, Clone, Default)]
pub struct BomExpansion {
    /// 依層級順序排列的節點，第一個為根
    pub nodes: Vec<ExpansionNode>,
    pub cycle_cuts: Vec<CycleCut>,
    /// (父件ID, BOM ID)：產出數量為 0 的 BOM
    pub degenerate_boms: Vec<(String, String)>,
}

impl BomExpansion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&ExpansionNode> {
        self.nodes.first()
    }

    /// 葉節點（不含根）
    pub fn leaves(&self) -> impl Iterator<Item = &ExpansionNode> {
        self.nodes.iter().filter(|node| node.is_leaf && node.level > 0)
    }

    /// 最大層級
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.level).max().unwrap_or(0)
    }
}

/// BOM 展開器
pub struct BomExpander<'a> {
    source: &'a dyn CostDataSource,
    bom_type: BomType,
}

impl<'a> BomExpander<'a> {
    pub fn new(source: &'a dyn CostDataSource, config: &CostConfig) -> Self {
        Self {
            source,
            bom_type: config.bom_type,
        }
    }

    /// 建構器模式：設置展開的 BOM 類型
    pub fn with_bom_type(mut self, bom_type: BomType) -> Self {
        self.bom_type = bom_type;
        self
    }

    /// 從根物料展開，根物料的 BOM 由資料來源查找
    ///
    /// 根物料不存在時返回空的展開結果
    pub fn expand(&self, root_id: &str) -> cost_core::Result<BomExpansion> {
        let Some(root) = self.source.find_component(root_id)? else {
            tracing::warn!("找不到根物料: {}", root_id);
            return Ok(BomExpansion::empty());
        };

        let root_bom = self.source.find_active_bom(root_id, self.bom_type)?;
        self.expand_from(&root, root_bom)
    }

    /// 從指定 BOM 展開（不查找根物料的啟用 BOM）
    ///
    /// BOM 不存在時返回空的展開結果
    pub fn expand_bom(&self, bom_id: &str) -> cost_core::Result<BomExpansion> {
        let Some(bom) = self.source.find_bom(bom_id)? else {
            tracing::warn!("找不到 BOM: {}", bom_id);
            return Ok(BomExpansion::empty());
        };

        let root = self.component_or_placeholder(&bom.product_id)?;
        self.expand_from(&root, Some(bom))
    }

    fn expand_from(
        &self,
        root: &Component,
        root_bom: Option<BillOfMaterials>,
    ) -> cost_core::Result<BomExpansion> {
        let mut expansion = BomExpansion::empty();
        expansion.nodes.push(ExpansionNode::root(root));

        let mut worklist: VecDeque<usize> = VecDeque::from([0]);
        let mut first_bom = root_bom;

        while let Some(index) = worklist.pop_front() {
            let parent = expansion.nodes[index].clone();

            let bom = if index == 0 {
                first_bom.take()
            } else {
                self.source
                    .find_active_bom(&parent.component_id, self.bom_type)?
            };
            let Some(mut bom) = bom else {
                continue;
            };
            bom.sort_lines();

            if bom.product_qty.is_zero() {
                tracing::warn!(
                    "BOM {} ({}) 產出數量為 0，子件乘數以 0 計",
                    bom.bom_id,
                    parent.component_id
                );
                expansion
                    .degenerate_boms
                    .push((parent.component_id.clone(), bom.bom_id.clone()));
            }

            let mut emitted = 0usize;
            for line in &bom.lines {
                if parent.has_ancestor(&line.component_id) {
                    tracing::debug!(
                        "略過 {}：已在路徑 {} 中",
                        line.component_id,
                        parent.path_display()
                    );
                    expansion.cycle_cuts.push(CycleCut {
                        parent_id: parent.component_id.clone(),
                        component_id: line.component_id.clone(),
                        path: parent.path.clone(),
                    });
                    continue;
                }

                let component = self.component_or_placeholder(&line.component_id)?;
                let child = ExpansionNode::child(&parent, &component, &bom, line);
                tracing::debug!(
                    "L{} {} 乘數 {}",
                    child.level,
                    child.path_display(),
                    child.multiplier
                );

                expansion.nodes.push(child);
                worklist.push_back(expansion.nodes.len() - 1);
                emitted += 1;
            }

            if emitted > 0 {
                expansion.nodes[index].is_leaf = false;
            }
        }

        tracing::debug!(
            "{} 展開完成：節點 {} 個，葉節點 {} 個，最大層級 {}",
            root.component_id,
            expansion.nodes.len(),
            expansion.leaves().count(),
            expansion.depth()
        );

        Ok(expansion)
    }

    /// BOM 行指向的物料若查無記錄，仍以ID展開
    fn component_or_placeholder(&self, component_id: &str) -> cost_core::Result<Component> {
        Ok(self
            .source
            .find_component(component_id)?
            .unwrap_or_else(|| {
                tracing::debug!("物料 {} 無主檔記錄，以ID代替名稱", component_id);
                Component::new(component_id.to_string(), component_id.to_string(), String::new())
            }))
    }
}
