use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{FilterOrderInfo, ListingSchema, SortDirection};
use crate::database::models::ListingRecord;

pub struct FilterOrder;

impl FilterOrder {
    /// Resolve `_sort` / `_order` against the schema's allow-list.
    /// `_order` without `_sort` is ignored.
    pub fn resolve(
        schema: &ListingSchema,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Result<Option<FilterOrderInfo>, FilterError> {
        let field = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(field) => field,
            None => return Ok(None),
        };

        let column = schema
            .column_for(field)
            .ok_or_else(|| FilterError::InvalidSortField(field.to_string()))?;

        let sort = match order.map(str::trim).filter(|s| !s.is_empty()) {
            None => SortDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(other) => return Err(FilterError::InvalidOrder(other.to_string())),
        };

        Ok(Some(FilterOrderInfo { field: field.to_string(), column, sort }))
    }

    /// ORDER BY clause. Ties always fall back to creation time then id.
    pub fn generate(info: Option<&FilterOrderInfo>) -> String {
        let mut parts = Vec::new();
        if let Some(i) = info {
            parts.push(format!("\"{}\" {}", i.column, i.sort.to_sql()));
        }
        parts.push("\"created_at\" ASC".to_string());
        parts.push("\"id\" ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-process equivalent of `generate`.
    pub fn compare<T: ListingRecord>(info: Option<&FilterOrderInfo>, a: &T, b: &T) -> Ordering {
        let primary = match info {
            Some(i) => {
                let ord = a.sort_value(&i.field).compare(&b.sort_value(&i.field));
                match i.sort {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        primary
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{PROPERTY_SCHEMA, REQUIREMENT_SCHEMA};

    #[test]
    fn resolves_known_fields_per_schema() {
        let info = FilterOrder::resolve(&PROPERTY_SCHEMA, Some("price"), Some("DESC"))
            .unwrap()
            .unwrap();
        assert_eq!(info.column, "price");
        assert_eq!(info.sort, SortDirection::Desc);

        let info = FilterOrder::resolve(&REQUIREMENT_SCHEMA, Some("askedPrice"), None)
            .unwrap()
            .unwrap();
        assert_eq!(info.column, "asked_price");
        assert_eq!(info.sort, SortDirection::Asc);
    }

    #[test]
    fn rejects_fields_outside_allow_list() {
        assert_eq!(
            FilterOrder::resolve(&REQUIREMENT_SCHEMA, Some("price"), None).unwrap_err(),
            FilterError::InvalidSortField("price".into())
        );
        assert!(FilterOrder::resolve(&PROPERTY_SCHEMA, Some("price; DROP TABLE users"), None).is_err());
    }

    #[test]
    fn rejects_unknown_direction() {
        assert_eq!(
            FilterOrder::resolve(&PROPERTY_SCHEMA, Some("title"), Some("sideways")).unwrap_err(),
            FilterError::InvalidOrder("sideways".into())
        );
    }

    #[test]
    fn order_without_sort_is_ignored() {
        assert!(FilterOrder::resolve(&PROPERTY_SCHEMA, None, Some("desc")).unwrap().is_none());
        assert!(FilterOrder::resolve(&PROPERTY_SCHEMA, Some(""), Some("bogus")).unwrap().is_none());
    }

    #[test]
    fn generate_appends_tie_breakers() {
        let info = FilterOrder::resolve(&PROPERTY_SCHEMA, Some("createdAt"), Some("desc"))
            .unwrap();
        assert_eq!(
            FilterOrder::generate(info.as_ref()),
            "ORDER BY \"created_at\" DESC, \"created_at\" ASC, \"id\" ASC"
        );
        assert_eq!(FilterOrder::generate(None), "ORDER BY \"created_at\" ASC, \"id\" ASC");
    }
}
