//! List/query builder
//!
//! Translates caller listing options plus engine-built predicates into store
//! list options. Every predicate is parenthesized before being joined with
//! `AND`, so a caller filter containing `OR` cannot escape the structural
//! filters around it.

use crate::core::{Error, Result};
use crate::store::{ListOperationOptions, OrderBy, OrderField};
use crate::types::{ListOptions, SortOrder};

/// Quote a string literal for the filter language
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Parse an order-by field name
pub fn parse_order_field(value: &str) -> Result<OrderField> {
    match value {
        "ID" => Ok(OrderField::Id),
        "CREATE_TIME" => Ok(OrderField::CreateTime),
        "LAST_UPDATE_TIME" => Ok(OrderField::LastUpdateTime),
        "NAME" => Ok(OrderField::Name),
        other => Err(Error::bad_request(format!(
            "invalid orderBy '{}', expected one of ID, CREATE_TIME, LAST_UPDATE_TIME, NAME",
            other
        ))),
    }
}

/// Build listing options from raw query parameters
///
/// Empty strings count as absent.
pub fn build_list_options(
    page_size: Option<&str>,
    order_by: Option<&str>,
    sort_order: Option<&str>,
    next_page_token: Option<&str>,
    filter_query: Option<&str>,
) -> Result<ListOptions> {
    fn present(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    let page_size = present(page_size)
        .map(|v| {
            v.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::bad_request(format!("invalid pageSize '{}'", v)))
        })
        .transpose()?;

    Ok(ListOptions {
        page_size,
        order_by: present(order_by).map(parse_order_field).transpose()?,
        sort_order: present(sort_order).map(str::parse::<SortOrder>).transpose()?,
        next_page_token: present(next_page_token).map(str::to_string),
        filter_query: present(filter_query).map(str::to_string),
    })
}

/// Accumulates predicates for one store listing
#[derive(Debug, Default, Clone)]
pub struct QueryBuilder {
    predicates: Vec<String>,
}

impl QueryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; blank predicates are ignored
    pub fn and(mut self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        if !predicate.trim().is_empty() {
            self.predicates.push(predicate);
        }
        self
    }

    /// Add a predicate if present
    pub fn and_opt(self, predicate: Option<String>) -> Self {
        match predicate {
            Some(p) => self.and(p),
            None => self,
        }
    }

    /// Combined filter, or `None` without predicates
    pub fn filter(&self) -> Option<String> {
        match self.predicates.len() {
            0 => None,
            _ => Some(
                self.predicates
                    .iter()
                    .map(|p| format!("({})", p))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }

    /// Store options for the caller options plus the accumulated predicates
    pub fn build(self, options: &ListOptions) -> ListOperationOptions {
        let order_by = match (options.order_by, options.sort_order) {
            (None, None) => None,
            (field, order) => Some(OrderBy {
                field: field.unwrap_or(OrderField::Id),
                is_asc: order != Some(SortOrder::Desc),
            }),
        };

        self.and_opt(options.filter_query.clone()).into_options(options, order_by)
    }

    fn into_options(self, options: &ListOptions, order_by: Option<OrderBy>) -> ListOperationOptions {
        ListOperationOptions {
            max_result_size: options.page_size,
            order_by,
            filter_query: self.filter(),
            next_page_token: options.next_page_token.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// Structural predicate selecting contexts owned by a parent context
pub fn child_context_of(parent_id: i64) -> String {
    format!("parent_contexts_a.id = {}", parent_id)
}

/// Structural predicate selecting artifacts or executions linked to a context
pub fn linked_to_context(context_id: i64) -> String {
    format!("contexts_a.id = {}", context_id)
}

/// Lookup query for a by-params call
///
/// `stored_name` is the full stored name (already prefixed for owned kinds).
pub fn by_params(stored_name: Option<String>, external_id: Option<&str>) -> Result<QueryBuilder> {
    if stored_name.is_none() && external_id.is_none() {
        return Err(Error::bad_request("either name or externalId must be provided"));
    }
    Ok(QueryBuilder::new()
        .and_opt(stored_name.map(|n| format!("name = {}", quote(&n))))
        .and_opt(external_id.map(|e| format!("external_id = {}", quote(e)))))
}

/// Stored name of an owned entity looked up by local name
///
/// The parent id is required whenever a name is given.
pub fn owned_name(name: Option<&str>, parent_id: Option<&str>, parent_label: &str) -> Result<Option<String>> {
    match (name, parent_id) {
        (None, _) => Ok(None),
        (Some(_), None) => Err(Error::bad_request(format!(
            "{} id is required when looking up by name",
            parent_label
        ))),
        (Some(name), Some(parent)) => {
            let parent = crate::registry::mapper::parse_id(parent, parent_label)?;
            Ok(Some(crate::registry::mapper::prefixed_name(parent, name)))
        }
    }
}

/// Predicate selecting one of several store types
pub fn type_in(type_names: &[&str]) -> String {
    match type_names {
        [single] => format!("type = {}", quote(single)),
        many => format!(
            "type IN ({})",
            many.iter().map(|t| quote(t)).collect::<Vec<_>>().join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_options_mean_store_defaults() {
        let options = QueryBuilder::new().build(&ListOptions::default());
        assert_eq!(options, ListOperationOptions::default());
    }

    #[test]
    fn test_predicates_are_parenthesized() {
        let options = ListOptions {
            filter_query: Some("name = 'a' OR name = 'b'".to_string()),
            ..Default::default()
        };
        let built = QueryBuilder::new().and(child_context_of(3)).build(&options);
        assert_eq!(
            built.filter_query.as_deref(),
            Some("(parent_contexts_a.id = 3) AND (name = 'a' OR name = 'b')")
        );
    }

    #[test]
    fn test_direction_without_field_orders_by_id() {
        let options = ListOptions {
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        };
        let built = QueryBuilder::new().build(&options);
        assert_eq!(
            built.order_by,
            Some(OrderBy {
                field: OrderField::Id,
                is_asc: false
            })
        );
    }

    #[test]
    fn test_field_without_direction_is_ascending() {
        let options = ListOptions {
            order_by: Some(OrderField::Name),
            ..Default::default()
        };
        assert!(QueryBuilder::new().build(&options).order_by.unwrap().is_asc);
    }

    #[test]
    fn test_build_list_options_from_strings() {
        let options =
            build_list_options(Some("10"), Some("LAST_UPDATE_TIME"), Some("DESC"), Some(""), None).unwrap();
        assert_eq!(options.page_size, Some(10));
        assert_eq!(options.order_by, Some(OrderField::LastUpdateTime));
        assert_eq!(options.sort_order, Some(SortOrder::Desc));
        assert_eq!(options.next_page_token, None);

        assert_eq!(build_list_options(None, None, None, None, None).unwrap(), ListOptions::default());

        let padded = build_list_options(Some(" 5 "), Some("  "), None, None, Some(" name = 'a' ")).unwrap();
        assert_eq!(padded.page_size, Some(5));
        assert_eq!(padded.order_by, None);
        assert_eq!(padded.filter_query.as_deref(), Some("name = 'a'"));
    }

    #[test]
    fn test_build_list_options_rejects_garbage() {
        assert!(matches!(build_list_options(Some("ten"), None, None, None, None), Err(Error::BadRequest(_))));
        assert!(build_list_options(Some("0"), None, None, None, None).is_err());
        assert!(build_list_options(None, Some("SIZE"), None, None, None).is_err());
        assert!(build_list_options(None, None, Some("UP"), None, None).is_err());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), "'it''s'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
        assert_eq!(type_in(&["kf.A"]), "type = 'kf.A'");
        assert_eq!(type_in(&["kf.A", "kf.B"]), "type IN ('kf.A', 'kf.B')");
    }

    proptest! {
        #[test]
        fn prop_combined_filter_parses(names in proptest::collection::vec("[a-z' ]{0,8}", 0..4)) {
            let mut builder = QueryBuilder::new();
            for name in &names {
                builder = builder.and(format!("name = {} OR id = 1", quote(name)));
            }
            if let Some(filter) = builder.filter() {
                prop_assert!(crate::store::filter::parse(&filter).is_ok());
            }
        }
    }
}
