//! Query specification for listing cached capabilities
//!
//! A [`QuerySpec`] is the wire-level descriptor: free-form field paths, operator strings
//! and JSON operands. [`QuerySpec::compile`] checks it structurally and produces a
//! [`CompiledQuery`] that cache implementations evaluate.

use crate::errors::QueryError;
use serde::{Deserialize, Serialize};

/// Default page size
pub const DEFAULT_LIMIT: usize = 50;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// One filter predicate: `operand_left operator operand_right`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Field path
    pub operand_left: String,
    /// Operator, `=` when omitted
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Value to compare against
    pub operand_right: serde_json::Value,
}

fn default_operator() -> String {
    "=".to_string()
}

impl Criterion {
    /// Create a criterion with an explicit operator
    pub fn new(
        operand_left: impl Into<String>,
        operator: impl Into<String>,
        operand_right: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            operand_left: operand_left.into(),
            operator: operator.into(),
            operand_right: operand_right.into(),
        }
    }

    /// Create an equality criterion
    pub fn equals(operand_left: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(operand_left, "=", serde_json::Value::String(value.into()))
    }
}

/// Filter, sort and paging descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySpec {
    /// Predicates, all of which must hold
    pub filter_expression: Vec<Criterion>,
    /// Field to sort by
    pub sort_field: Option<String>,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Number of matches to skip
    pub offset: usize,
    /// Maximum number of matches to return
    pub limit: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filter_expression: Vec::new(),
            sort_field: None,
            sort_order: SortOrder::Asc,
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QuerySpec {
    /// Query everything with default paging
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a filter criterion
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.filter_expression.push(criterion);
        self
    }

    /// Sort by a field
    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = order;
        self
    }

    /// Set paging
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Validate and compile, accepting at most `max_limit` results per page
    pub fn compile(&self, max_limit: usize) -> Result<CompiledQuery, QueryError> {
        if self.limit == 0 || self.limit > max_limit {
            return Err(QueryError::InvalidLimit {
                limit: self.limit,
                max: max_limit,
            });
        }

        let predicates = self
            .filter_expression
            .iter()
            .map(Predicate::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let sort_field = self
            .sort_field
            .as_deref()
            .map(|field| {
                QueryField::parse(field).ok_or_else(|| QueryError::UnknownField {
                    field: field.to_string(),
                })
            })
            .transpose()?;

        Ok(CompiledQuery {
            predicates,
            sort_field,
            sort_order: self.sort_order,
            offset: self.offset,
            limit: self.limit,
        })
    }
}

/// Queryable field of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryField {
    /// Cache key
    TransferProcessId,
    /// Capability id
    Id,
    /// Contract id
    ContractId,
    /// Endpoint URL
    Endpoint,
    /// Credential header name
    AuthKey,
    /// Extension property under the given key
    Property(String),
}

impl QueryField {
    /// Parse a field path; credential material is not queryable
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            "transferProcessId" => Some(Self::TransferProcessId),
            "id" => Some(Self::Id),
            "contractId" => Some(Self::ContractId),
            "endpoint" => Some(Self::Endpoint),
            "authKey" => Some(Self::AuthKey),
            _ => path
                .strip_prefix("properties.")
                .filter(|key| !key.is_empty())
                .map(|key| Self::Property(key.to_string())),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Exact equality
    Eq,
    /// Inequality
    NotEq,
    /// Membership in a list
    In,
    /// SQL-style pattern with `%` wildcards
    Like,
    /// Lexicographically less than
    Lt,
    /// Lexicographically less than or equal
    Le,
    /// Lexicographically greater than
    Gt,
    /// Lexicographically greater than or equal
    Ge,
}

impl Operator {
    /// Parse an operator string
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim().to_ascii_lowercase().as_str() {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "in" => Some(Self::In),
            "like" => Some(Self::Like),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// Right operand after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Single scalar rendered as a string
    Single(String),
    /// List of scalars for `in`
    List(Vec<String>),
}

/// A validated criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Field to read
    pub field: QueryField,
    /// Comparison
    pub operator: Operator,
    /// Value to compare against
    pub operand: Operand,
}

impl Predicate {
    fn compile(criterion: &Criterion) -> Result<Self, QueryError> {
        let field_path = criterion.operand_left.as_str();
        let field = QueryField::parse(field_path).ok_or_else(|| QueryError::UnknownField {
            field: field_path.to_string(),
        })?;
        let operator =
            Operator::parse(&criterion.operator).ok_or_else(|| QueryError::UnsupportedOperator {
                field: field_path.to_string(),
                operator: criterion.operator.clone(),
            })?;

        let invalid = |message: &str| QueryError::InvalidOperand {
            field: field_path.to_string(),
            message: message.to_string(),
        };

        let operand = match (operator, &criterion.operand_right) {
            (Operator::In, serde_json::Value::Array(items)) => Operand::List(
                items
                    .iter()
                    .map(|item| scalar(item).ok_or_else(|| invalid("list items must be scalars")))
                    .collect::<Result<_, _>>()?,
            ),
            (Operator::In, _) => return Err(invalid("'in' expects a list")),
            (_, value) => Operand::Single(scalar(value).ok_or_else(|| invalid("expected a scalar"))?),
        };

        Ok(Self {
            field,
            operator,
            operand,
        })
    }
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A structurally valid query ready for evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    /// Predicates, all of which must hold
    pub predicates: Vec<Predicate>,
    /// Field to sort by
    pub sort_field: Option<QueryField>,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Number of matches to skip
    pub offset: usize,
    /// Maximum number of matches to return
    pub limit: usize,
}
