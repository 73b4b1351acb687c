use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::log::SeverityLevel;
use crate::filter::{FilterRecord, FilterValue};

/// Shared catalog entry; not owned by any user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffectType {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub severity_level: Option<SeverityLevel>,
    pub is_common: bool,
    pub requires_medical_attention: bool,
    pub symptoms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SideEffectType {
    pub fn new(name: &str, category: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            description: Some(description.to_string()),
            severity_level: None,
            is_common: false,
            requires_medical_attention: false,
            symptoms: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

impl FilterRecord for SideEffectType {
    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "name" => Some(self.name.as_str().into()),
            "category" => Some(self.category.as_str().into()),
            _ => None,
        }
    }
}

/// Default catalog loaded by `medtrack seed` and by the in-memory store.
const DEFAULT_CATALOG: &[(&str, &str, &str)] = &[
    // 消化器系
    ("吐き気", "消化器系", "胃の不快感や嘔吐感"),
    ("下痢", "消化器系", "軟便や水様便"),
    ("便秘", "消化器系", "排便困難"),
    ("腹痛", "消化器系", "腹部の痛みや不快感"),
    ("食欲不振", "消化器系", "食欲の減退"),
    // 神経系
    ("頭痛", "神経系", "頭部の痛み"),
    ("めまい", "神経系", "ふらつきや平衡感覚の異常"),
    ("眠気", "神経系", "強い眠気や倦怠感"),
    ("不眠", "神経系", "睡眠障害"),
    ("集中力低下", "神経系", "注意力や集中力の低下"),
    // 皮膚系
    ("発疹", "皮膚系", "皮膚の赤みやかゆみ"),
    ("かゆみ", "皮膚系", "皮膚のかゆみ"),
    ("乾燥", "皮膚系", "皮膚の乾燥"),
    // 循環器系
    ("動悸", "循環器系", "心拍数の増加や不整脈"),
    ("血圧低下", "循環器系", "血圧の低下"),
    ("血圧上昇", "循環器系", "血圧の上昇"),
    // その他
    ("疲労感", "その他", "体のだるさや疲れ"),
    ("発熱", "その他", "体温の上昇"),
    ("筋肉痛", "その他", "筋肉の痛みやこわばり"),
    ("関節痛", "その他", "関節の痛みや腫れ"),
];

pub fn default_catalog() -> Vec<SideEffectType> {
    DEFAULT_CATALOG
        .iter()
        .map(|(name, category, description)| SideEffectType::new(name, category, description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_unique_names() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 20);
        let mut names: Vec<&str> = catalog.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 20);
    }
}
