//! FIFO 批次追蹤

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use cost_core::{CostDataSource, CostLot, CostSource, ResolvedCost};
use rust_decimal::Decimal;

/// 尚未耗用完的入庫批次
#[derive(Debug, Clone, PartialEq)]
pub struct OpenLot {
    /// 剩餘數量（恆 > 0）
    pub remaining: Decimal,
    pub unit_cost: Decimal,
    pub received_at: NaiveDateTime,
}

/// FIFO 批次佇列（單次計算內的暫存狀態）
#[derive(Debug, Clone, Default)]
pub struct FifoQueue {
    lots: VecDeque<OpenLot>,
}

impl FifoQueue {
    /// 創建空佇列
    pub fn new() -> Self {
        Self::default()
    }

    /// 依時間升冪重播所有異動
    ///
    /// 排序為穩定排序，同一時間的異動保持來源順序
    pub fn replay(movements: &[CostLot]) -> Self {
        let mut ordered: Vec<&CostLot> = movements.iter().collect();
        ordered.sort_by_key(|lot| lot.created_at);

        let mut queue = Self::new();
        for movement in ordered {
            queue.apply(movement);
        }
        queue
    }

    /// 套用一筆異動
    pub fn apply(&mut self, movement: &CostLot) {
        if movement.is_receipt() {
            self.receive(movement.quantity, movement.unit_cost, movement.created_at);
        } else if movement.is_consumption() {
            let unfilled = self.consume(-movement.quantity);
            if unfilled > Decimal::ZERO {
                tracing::debug!(
                    "耗用超過現有批次：未滿足數量 {} ({})",
                    unfilled,
                    movement.created_at
                );
            }
        }
    }

    /// 入庫：新增一個批次
    pub fn receive(&mut self, quantity: Decimal, unit_cost: Decimal, received_at: NaiveDateTime) {
        if quantity <= Decimal::ZERO {
            return;
        }
        self.lots.push_back(OpenLot {
            remaining: quantity,
            unit_cost,
            received_at,
        });
    }

    /// 耗用：從最舊的批次開始扣減
    ///
    /// 返回無法滿足的數量（佇列已空時），超出部分直接捨棄
    pub fn consume(&mut self, quantity: Decimal) -> Decimal {
        let mut outstanding = quantity.abs();

        while outstanding > Decimal::ZERO {
            let Some(front) = self.lots.front_mut() else {
                break;
            };

            if front.remaining > outstanding {
                front.remaining -= outstanding;
                outstanding = Decimal::ZERO;
            } else {
                // 剛好耗盡也要彈出，佇列中不會出現剩餘 0 或負數的批次
                outstanding -= front.remaining;
                self.lots.pop_front();
            }
        }

        outstanding
    }

    /// 目前 FIFO 成本：最舊剩餘批次的單位成本，佇列為空時為 0
    pub fn current_cost(&self) -> Decimal {
        self.lots
            .front()
            .map(|lot| lot.unit_cost)
            .unwrap_or(Decimal::ZERO)
    }

    /// 剩餘總數量
    pub fn remaining_quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.remaining).sum()
    }

    /// 剩餘批次（由舊到新）
    pub fn open_lots(&self) -> impl Iterator<Item = &OpenLot> {
        self.lots.iter()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

/// FIFO 成本追蹤器
pub struct FifoTracker<'a> {
    source: &'a dyn CostDataSource,
}

impl<'a> FifoTracker<'a> {
    /// 創建新的追蹤器
    pub fn new(source: &'a dyn CostDataSource) -> Self {
        Self { source }
    }

    /// 重播物料的完整異動歷史
    pub fn replay(&self, component_id: &str) -> cost_core::Result<FifoQueue> {
        let movements = self.source.valuation_history(component_id)?;
        let queue = FifoQueue::replay(&movements);

        tracing::debug!(
            "物料 {} FIFO 重播：異動 {} 筆，剩餘批次 {} 個，剩餘數量 {}",
            component_id,
            movements.len(),
            queue.len(),
            queue.remaining_quantity()
        );

        Ok(queue)
    }

    /// 目前 FIFO 單位成本（無剩餘批次時為 0）
    pub fn fifo_cost(&self, component_id: &str) -> cost_core::Result<Decimal> {
        Ok(self.replay(component_id)?.current_cost())
    }

    /// 以 [`ResolvedCost`] 形式返回，無剩餘批次時來源標記為 `none`
    pub fn resolve(&self, component_id: &str) -> cost_core::Result<ResolvedCost> {
        let queue = self.replay(component_id)?;
        if queue.is_empty() {
            return Ok(ResolvedCost::missing(component_id.to_string(), None));
        }
        Ok(ResolvedCost::new(
            component_id.to_string(),
            queue.current_cost(),
            CostSource::Fifo,
            None,
        ))
    }

    /// 第一筆入庫估價層的單位成本（ERP 記錄成本）
    pub fn first_receipt_cost(&self, component_id: &str) -> cost_core::Result<Option<Decimal>> {
        let mut movements = self.source.valuation_history(component_id)?;
        movements.sort_by_key(|lot| lot.created_at);
        Ok(movements
            .iter()
            .find(|lot| lot.is_receipt())
            .map(|lot| lot.unit_cost))
    }
}
