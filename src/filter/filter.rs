use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::page::PageRequest;
use super::types::{
    Condition, FilterOp, FilterOrderInfo, FilterRecord, FilterValue, FilterWhereInfo, SortDirection, SqlResult,
};

/// A list query against one table: AND-ed conditions, ordering and an
/// optional page window. Renders to SQL for Postgres and evaluates directly
/// against in-memory rows.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: &'static str,
    conditions: Vec<Condition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u32>,
    offset: Option<u64>,
}

impl Filter {
    pub fn new(table_name: &'static str) -> Result<Self, FilterError> {
        validate_identifier(table_name).map_err(|_| FilterError::InvalidTableName(table_name.to_string()))?;
        Ok(Self {
            table_name,
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn where_field(
        &mut self,
        column: &'static str,
        operator: FilterOp,
        data: impl Into<FilterValue>,
    ) -> Result<&mut Self, FilterError> {
        validate_identifier(column)?;
        self.conditions.push(Condition::Field(FilterWhereInfo {
            column,
            operator,
            data: data.into(),
        }));
        Ok(self)
    }

    pub fn where_eq(&mut self, column: &'static str, data: impl Into<FilterValue>) -> Result<&mut Self, FilterError> {
        self.where_field(column, FilterOp::Eq, data)
    }

    /// Case-insensitive literal substring match on any of `columns`.
    pub fn where_contains_any(&mut self, columns: &[&'static str], term: &str) -> Result<&mut Self, FilterError> {
        if columns.is_empty() {
            return Err(FilterError::EmptyGroup);
        }
        let mut group = Vec::with_capacity(columns.len());
        for column in columns {
            validate_identifier(column)?;
            group.push(FilterWhereInfo {
                column,
                operator: FilterOp::ILike,
                data: FilterValue::Text(term.to_string()),
            });
        }
        self.conditions.push(Condition::Any(group));
        Ok(self)
    }

    pub fn order_by(&mut self, column: &'static str, sort: SortDirection) -> Result<&mut Self, FilterError> {
        validate_identifier(column)?;
        self.order_data.push(FilterOrderInfo { column, sort });
        Ok(self)
    }

    pub fn page(&mut self, page: PageRequest) -> &mut Self {
        self.limit = Some(page.per_page);
        self.offset = Some(page.offset());
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.table_name, where_clause
            ),
            params,
        }
    }

    pub fn matches<R: FilterRecord + ?Sized>(&self, record: &R) -> bool {
        FilterWhere::matches(&self.conditions, record)
    }

    /// Stable sort by the filter's ordering.
    pub fn sort<R: FilterRecord>(&self, records: &mut [R]) {
        records.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
    }

    /// Applies the page window to an already filtered and sorted list.
    pub fn window<T>(&self, records: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map_or(usize::MAX, |l| l as usize);
        records.into_iter().skip(offset).take(limit).collect()
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

fn validate_identifier(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid_start = chars.next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidColumn(name.to_string()));
    }
    Ok(())
}
