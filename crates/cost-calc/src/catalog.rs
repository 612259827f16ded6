//! 產品目錄查詢

use cost_core::{Component, CostDataSource};

/// 目錄篩選條件（所有條件皆須符合）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// (層級, 值)，層級從 1 開始
    pub category_levels: Vec<(usize, String)>,
    pub uom: Option<String>,
    /// 名稱包含（不分大小寫）
    pub name_contains: Option<String>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 成品目錄：第一層分類為 `Finished Goods`
    pub fn finished_goods() -> Self {
        Self::new().with_category_level(1, "Finished Goods")
    }

    /// 建構器模式：指定分類層級的值
    pub fn with_category_level(mut self, level: usize, value: &str) -> Self {
        self.category_levels.push((level, value.to_string()));
        self
    }

    /// 建構器模式：指定單位（不分大小寫）
    pub fn with_uom(mut self, uom: &str) -> Self {
        self.uom = Some(uom.to_string());
        self
    }

    /// 建構器模式：名稱關鍵字
    pub fn with_name_contains(mut self, needle: &str) -> Self {
        self.name_contains = Some(needle.to_string());
        self
    }

    /// 檢查物料是否符合條件
    pub fn matches(&self, component: &Component) -> bool {
        let categories_match = self
            .category_levels
            .iter()
            .all(|(level, value)| component.category_level(*level) == Some(value.as_str()));

        let uom_match = self
            .uom
            .as_ref()
            .map_or(true, |uom| component.uom.eq_ignore_ascii_case(uom));

        let name_match = self
            .name_contains
            .as_ref()
            .map_or(true, |needle| {
                component
                    .name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            });

        categories_match && uom_match && name_match
    }
}

/// 產品目錄
pub struct ProductCatalog<'a> {
    source: &'a dyn CostDataSource,
}

impl<'a> ProductCatalog<'a> {
    pub fn new(source: &'a dyn CostDataSource) -> Self {
        Self { source }
    }

    /// 列出符合條件的物料（依名稱排序）
    pub fn list(&self, filter: &CatalogFilter) -> cost_core::Result<Vec<Component>> {
        let mut components: Vec<Component> = self
            .source
            .list_components()?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!("目錄篩選結果 {} 筆 ({:?})", components.len(), filter);
        Ok(components)
    }

    /// 以料號查找
    pub fn find_by_code(&self, code: &str) -> cost_core::Result<Option<Component>> {
        self.source.find_component_by_code(code)
    }

    /// 指定層級出現過的分類值（去重、排序），供篩選選單使用
    pub fn category_values(&self, level: usize) -> cost_core::Result<Vec<String>> {
        let mut values: Vec<String> = self
            .source
            .list_components()?
            .iter()
            .filter_map(|c| c.category_level(level).map(str::to_string))
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// 依基礎名稱分組的變體數量
    pub fn base_names(&self, filter: &CatalogFilter) -> cost_core::Result<Vec<(String, usize)>> {
        let mut grouped: std::collections::BTreeMap<String, usize> = Default::default();
        for component in self.list(filter)? {
            *grouped.entry(component.base_name().to_string()).or_default() += 1;
        }
        Ok(grouped.into_iter().collect())
    }
}
