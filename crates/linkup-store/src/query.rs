//! Builder for structured queries.

use crate::types::{
    CollectionSelector, CompositeFilter, FieldFilter, FieldReference, Filter, Order,
    StructuredQuery, Value,
};

/// Sort direction for `orderBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

/// Field filter operators understood by every backend.
pub mod ops {
    pub const EQUAL: &str = "EQUAL";
    pub const NOT_EQUAL: &str = "NOT_EQUAL";
    pub const LESS_THAN: &str = "LESS_THAN";
    pub const LESS_THAN_OR_EQUAL: &str = "LESS_THAN_OR_EQUAL";
    pub const GREATER_THAN: &str = "GREATER_THAN";
    pub const GREATER_THAN_OR_EQUAL: &str = "GREATER_THAN_OR_EQUAL";
    pub const ARRAY_CONTAINS: &str = "ARRAY_CONTAINS";
    pub const AND: &str = "AND";
}

impl StructuredQuery {
    /// Query every document of a collection.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.into(),
                all_descendants: None,
            }],
            r#where: None,
            order_by: None,
            limit: None,
        }
    }

    /// Add a field filter. Several filters are combined with AND.
    pub fn filter(mut self, field: &str, op: &str, value: Value) -> Self {
        let new = Filter {
            composite_filter: None,
            field_filter: Some(FieldFilter {
                field: FieldReference {
                    field_path: field.to_string(),
                },
                op: op.to_string(),
                value,
            }),
        };

        self.r#where = Some(match self.r#where.take() {
            None => new,
            Some(Filter {
                composite_filter: Some(mut composite),
                ..
            }) if composite.op == ops::AND => {
                composite.filters.push(new);
                Filter {
                    composite_filter: Some(composite),
                    field_filter: None,
                }
            }
            Some(existing) => Filter {
                composite_filter: Some(CompositeFilter {
                    op: ops::AND.to_string(),
                    filters: vec![existing, new],
                }),
                field_filter: None,
            },
        });
        self
    }

    pub fn where_eq(self, field: &str, value: Value) -> Self {
        self.filter(field, ops::EQUAL, value)
    }

    pub fn where_array_contains(self, field: &str, value: Value) -> Self {
        self.filter(field, ops::ARRAY_CONTAINS, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.get_or_insert_with(Vec::new).push(Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction: direction.as_str().to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Collection id this query reads from.
    pub fn collection_id(&self) -> Option<&str> {
        self.from.first().map(|c| c.collection_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_filters_combine_with_and() {
        let query = StructuredQuery::collection("notifications")
            .where_eq("recipient", Value::StringValue("u1".into()))
            .where_eq("read", Value::BooleanValue(false))
            .where_eq("type", Value::StringValue("like".into()));

        let composite = query.r#where.unwrap().composite_filter.unwrap();
        assert_eq!(composite.op, "AND");
        assert_eq!(composite.filters.len(), 3);
    }

    #[test]
    fn test_single_filter_is_field_filter() {
        let query = StructuredQuery::collection("posts")
            .where_eq("author", Value::StringValue("u1".into()))
            .order_by("created_at", Direction::Descending)
            .limit(5);

        let filter = query.r#where.as_ref().unwrap();
        assert!(filter.field_filter.is_some());
        assert_eq!(query.order_by.as_ref().unwrap()[0].direction, "DESCENDING");
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.collection_id(), Some("posts"));
    }
}
