//! # BOM Cost
//!
//! 多層 BOM 成本彙總引擎：
//! - [`cost_core`]：資料模型、配置與資料來源契約
//! - [`cost_calc`]：FIFO、成本解析、BOM 展開、彙總與月度趨勢
//! - [`cost_store`]：SQLite 資料來源
//!
//! ```no_run
//! use bomcost::prelude::*;
//!
//! # fn main() -> bomcost::Result<()> {
//! let source = InMemorySource::new();
//! let calculator = RollupCalculator::new(&source, CostConfig::default());
//! let result = calculator.rollup("BIKE-001", CostView::CurrentFifo)?;
//! println!("total = {}", result.total_cost);
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use cost_calc;
pub use cost_core;
pub use cost_store;

pub use cost_core::{CostError, Result};

/// 常用類型
pub mod prelude {
    pub use cost_calc::{
        BomExpander, CatalogFilter, DirectBreakdownCalculator, FifoTracker,
        MonthlyCostCalculator, ProductCatalog, RollupCalculator, RollupResult, WarningKind,
    };
    pub use cost_core::{
        BillOfMaterials, BomType, Component, CostConfig, CostDataSource, CostLot, CostSource,
        CostView, DateWindow, InMemorySource, PurchaseLine, PurchaseLineState,
    };
    pub use cost_store::SqliteSource;
}
