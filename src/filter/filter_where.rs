use super::types::{Condition, FilterOp, FilterRecord, FilterValue, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<FilterValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Renders `conditions` joined with AND, numbering parameters from
    /// `starting_param_index + 1`.
    pub fn generate(conditions: &[Condition], starting_param_index: usize) -> (String, Vec<FilterValue>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql_conditions: Vec<String> = conditions
            .iter()
            .map(|condition| filter_where.build_condition(condition))
            .collect();

        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        (where_clause, filter_where.param_values)
    }

    /// In-memory evaluation of the same conditions `generate` renders.
    pub fn matches<R: FilterRecord + ?Sized>(conditions: &[Condition], record: &R) -> bool {
        conditions.iter().all(|condition| match condition {
            Condition::Field(info) => Self::matches_field(info, record),
            Condition::Any(group) => group.iter().any(|info| Self::matches_field(info, record)),
        })
    }

    fn matches_field<R: FilterRecord + ?Sized>(info: &FilterWhereInfo, record: &R) -> bool {
        // NULL columns never satisfy a predicate, as in SQL.
        let Some(value) = record.column(info.column) else {
            return false;
        };
        match info.operator {
            FilterOp::Eq => value == info.data,
            FilterOp::ILike => match (&value, &info.data) {
                (FilterValue::Text(haystack), FilterValue::Text(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            FilterOp::Gte => value.compare(&info.data).map_or(false, |o| o.is_ge()),
            FilterOp::Lt => value.compare(&info.data).map_or(false, |o| o.is_lt()),
        }
    }

    fn build_condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Field(info) => self.build_sql_condition(info),
            Condition::Any(group) => {
                let parts: Vec<String> = group.iter().map(|info| self.build_sql_condition(info)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let quoted_column = format!("\"{}\"", condition.column);
        match condition.operator {
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::ILike => {
                let pattern = match &condition.data {
                    FilterValue::Text(term) => FilterValue::Text(format!("%{}%", escape_like(term))),
                    other => other.clone(),
                };
                format!("{} ILIKE {} ESCAPE '\\'", quoted_column, self.param(pattern))
            }
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(condition.data.clone())),
        }
    }

    fn param(&mut self, value: FilterValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Escapes LIKE metacharacters so the term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
