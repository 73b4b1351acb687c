use std::cmp::Ordering;

use super::types::{FilterOrderInfo, FilterRecord, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Comparator matching `generate`; equal keys compare equal so a stable
    /// sort keeps the input order for ties.
    pub fn compare<R: FilterRecord + ?Sized>(infos: &[FilterOrderInfo], a: &R, b: &R) -> Ordering {
        for info in infos {
            let ordering = match (a.column(info.column), b.column(info.column)) {
                (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
                // Postgres default: NULLS LAST ascending, NULLS FIRST descending.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
