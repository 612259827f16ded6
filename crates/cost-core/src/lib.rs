//! # Cost Core
//!
//! 核心資料模型、資料來源契約與類型定義

pub mod bom;
pub mod component;
pub mod config;
pub mod cost;
pub mod lot;
pub mod memory;
pub mod source;

// Re-export 主要類型
pub use bom::{BillOfMaterials, BomLine, BomType, ExpansionNode};
pub use component::Component;
pub use config::CostConfig;
pub use cost::{CostSource, CostView, DateWindow, ResolvedCost};
pub use lot::{CostLot, PurchaseLine, PurchaseLineState};
pub use memory::InMemorySource;
pub use source::CostDataSource;

/// 成本引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CostError {
    /// 外部資料來源不可用或查詢失敗（整個計算中止）
    #[error("資料來源錯誤: {0}")]
    DataSource(String),

    #[error("找不到物料: {0}")]
    ComponentNotFound(String),

    #[error("找不到 BOM: {0}")]
    BomNotFound(String),

    #[error("無效的日期區間: {start} ~ {end}")]
    InvalidWindow {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CostError>;
