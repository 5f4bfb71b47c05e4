//! Builds the table query from the applied filters and sort key.

use crate::models::{FilterMap, FilterOp, Predicate, SelectQuery, SortSpec, ROW_LIMIT};

/// Turns filter text and a sort key into a [`SelectQuery`].
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build `SELECT * FROM table [WHERE ...] [ORDER BY ...] LIMIT 100`.
    ///
    /// Every column with non-blank filter text contributes one predicate, in column order.
    pub fn build(table: &str, filters: &FilterMap, sort: Option<&SortSpec>) -> SelectQuery {
        let predicates =
            filters.active().map(|(column, text)| Self::predicate(column, text)).collect();

        SelectQuery {
            table: table.to_string(),
            predicates,
            sort: sort.cloned(),
            limit: ROW_LIMIT,
        }
    }

    /// Predicate for one column's filter text.
    ///
    /// Digits-only text is an exact numeric match; anything else is a case-insensitive
    /// substring match. Negative numbers and decimals therefore fall into the substring case.
    pub fn predicate(column: &str, text: &str) -> Predicate {
        let value = text.trim();
        if Self::is_numeric_filter(value) {
            Predicate { column: column.to_string(), op: FilterOp::Equals, value: value.to_string() }
        } else {
            Predicate {
                column: column.to_string(),
                op: FilterOp::ContainsIgnoreCase,
                value: format!("%{value}%"),
            }
        }
    }

    /// Check whether filter text selects exact numeric matching.
    pub fn is_numeric_filter(text: &str) -> bool {
        !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_query() {
        let query = QueryBuilder::build("medals", &FilterMap::new(), None);
        assert_eq!(query.sql(), "SELECT * FROM \"medals\" LIMIT 100");
        assert!(!query.sql().contains("WHERE"));
        assert!(!query.sql().contains("ORDER BY"));
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let mut filters = FilterMap::for_columns(["country", "year"]);
        filters.set("country", "   ");
        let query = QueryBuilder::build("medals", &filters, None);
        assert_eq!(query.sql(), "SELECT * FROM \"medals\" LIMIT 100");
    }

    #[test]
    fn test_numeric_filter_is_equality() {
        let mut filters = FilterMap::new();
        filters.set("year", " 2021 ");
        let query = QueryBuilder::build("medals", &filters, None);

        assert!(query.sql().contains("\"year\" = $1::text::numeric"));
        assert_eq!(query.params(), vec!["2021".to_string()]);
        assert!(!query.sql().contains('\''));
    }

    #[test]
    fn test_text_filter_is_wildcard_ilike() {
        let mut filters = FilterMap::new();
        filters.set("country", "fra");
        let query = QueryBuilder::build("medals", &filters, None);

        assert!(query.sql().contains("\"country\" ILIKE $1"));
        assert_eq!(query.params(), vec!["%fra%".to_string()]);
    }

    #[test]
    fn test_quotes_in_filter_never_reach_sql_text() {
        let mut filters = FilterMap::new();
        filters.set("country", "x'; DROP TABLE medals; --");
        let query = QueryBuilder::build("medals", &filters, None);

        assert!(!query.sql().contains("DROP"));
        assert_eq!(query.params(), vec!["%x'; DROP TABLE medals; --%".to_string()]);
    }

    #[test]
    fn test_numeric_detection_limits() {
        assert!(QueryBuilder::is_numeric_filter("2021"));
        assert!(QueryBuilder::is_numeric_filter("007"));
        assert!(!QueryBuilder::is_numeric_filter("-5"));
        assert!(!QueryBuilder::is_numeric_filter("1.5"));
        assert!(!QueryBuilder::is_numeric_filter(""));
        assert!(!QueryBuilder::is_numeric_filter("٣"));

        assert_eq!(QueryBuilder::predicate("delta", "-5").op, FilterOp::ContainsIgnoreCase);
    }

    #[test]
    fn test_sort_direction() {
        let asc = QueryBuilder::build("medals", &FilterMap::new(), Some(&SortSpec::new("count", false)));
        assert!(asc.sql().ends_with("ORDER BY \"count\" LIMIT 100"));

        let desc = QueryBuilder::build("medals", &FilterMap::new(), Some(&SortSpec::new("count", true)));
        assert!(desc.sql().ends_with("ORDER BY \"count\" DESC LIMIT 100"));
    }

    #[test]
    fn test_medals_scenario() {
        let mut filters = FilterMap::for_columns(["country", "year", "count"]);
        filters.set("country", "fra");
        filters.set("year", "2021");
        let query =
            QueryBuilder::build("medals", &filters, Some(&SortSpec::new("count", true)));

        assert_eq!(
            query.sql(),
            "SELECT * FROM \"medals\" WHERE \"country\" ILIKE $1 AND \"year\" = $2::text::numeric \
             ORDER BY \"count\" DESC LIMIT 100"
        );
        assert_eq!(query.params(), vec!["%fra%".to_string(), "2021".to_string()]);
        assert_eq!(query.limit, ROW_LIMIT);
    }
}
