//! Table-scoped row queries.
//!
//! Column names here are always the store's (`snake_case`) names.

use itertools::Itertools;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive equality on a text column (no wildcards).
    EqIgnoreCase(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _)
            | Filter::In(column, _)
            | Filter::EqIgnoreCase(column, _) => column,
        }
    }

    /// Evaluates the filter against a stored row.
    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, value) => field == value,
            Filter::In(_, values) => values.contains(field),
            Filter::EqIgnoreCase(_, value) => field
                .as_str()
                .map(|s| s.to_lowercase() == value.to_lowercase())
                .unwrap_or(false),
        }
    }

    /// The PostgREST operator expression, e.g. `eq.abc` or `in.("a","b")`.
    pub fn operator_expr(&self) -> String {
        match self {
            Filter::Eq(_, Value::Null) => "is.null".to_string(),
            Filter::Eq(_, value) => format!("eq.{}", scalar(value)),
            Filter::In(_, values) => format!(
                "in.({})",
                values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => {
                            format!("\"{}\"", s.replace('"', "\\\""))
                        }
                        other => scalar(other),
                    })
                    .join(",")
            ),
            Filter::EqIgnoreCase(_, value) => format!(
                "ilike.{}",
                value
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_")
                    .replace('*', "\\*")
            ),
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fetch the row together with its parent row (many-to-one), stored under
/// the parent table's name.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub table: &'static str,
    pub foreign_key: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: &'static str,
    pub filters: Vec<Filter>,
    pub embed: Option<Embed>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Query {
            table,
            filters: Vec::new(),
            embed: None,
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn eq_ignore_case(mut self, column: &str, value: &str) -> Self {
        self.filters.push(Filter::EqIgnoreCase(
            column.to_string(),
            value.to_string(),
        ));
        self
    }

    pub fn embed(
        mut self,
        table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.embed = Some(Embed { table, foreign_key });
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether every filter accepts the row.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Query-string pairs in PostgREST form.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 3);
        let select = match &self.embed {
            Some(embed) => format!("*,{}(*)", embed.table),
            None => "*".to_string(),
        };
        pairs.push(("select".to_string(), select));
        for filter in &self.filters {
            pairs.push((filter.column().to_string(), filter.operator_expr()));
        }
        if let Some(order) = &self.order {
            let direction = if order.descending { "desc" } else { "asc" };
            pairs.push((
                "order".to_string(),
                format!("{}.{direction}", order.column),
            ));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}
