use serde_json::Value;

use crate::database::models::ListingRecord;

/// WHERE generation for the two listing filters: free-text search over
/// title/location and an exact property type.
pub struct FilterWhere {
    param_values: Vec<Value>,
    conditions: Vec<String>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self {
            param_values: vec![],
            conditions: vec![],
        }
    }

    /// Returns the clause (without `WHERE`, empty when unconstrained) and its parameters.
    pub fn generate(search: Option<&str>, property_type: Option<&str>) -> (String, Vec<Value>) {
        let mut filter_where = Self::new();
        if let Some(term) = search {
            filter_where.push_search(term);
        }
        if let Some(kind) = property_type {
            filter_where.push_property_type(kind);
        }
        (filter_where.conditions.join(" AND "), filter_where.param_values)
    }

    fn next_param(&mut self, value: Value) -> usize {
        self.param_values.push(value);
        self.param_values.len()
    }

    fn push_search(&mut self, term: &str) {
        let idx = self.next_param(Value::String(format!("%{}%", escape_like(term))));
        self.conditions.push(format!(
            "(\"title\" ILIKE ${idx} ESCAPE '\\' OR \"location\" ILIKE ${idx} ESCAPE '\\')"
        ));
    }

    fn push_property_type(&mut self, kind: &str) {
        let idx = self.next_param(Value::String(kind.to_lowercase()));
        self.conditions.push(format!("LOWER(\"property_type\") = ${idx}"));
    }

    /// In-process equivalent of the generated clause.
    pub fn matches<T: ListingRecord>(record: &T, search: Option<&str>, property_type: Option<&str>) -> bool {
        if let Some(term) = search {
            let needle = term.to_lowercase();
            let hit = record.title().to_lowercase().contains(&needle)
                || record.location().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(kind) = property_type {
            if record.property_type().to_lowercase() != kind.to_lowercase() {
                return false;
            }
        }
        true
    }
}

impl Default for FilterWhere {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape LIKE wildcards so user input matches literally.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_produce_no_clause() {
        let (sql, params) = FilterWhere::generate(None, None);
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn search_binds_one_parameter_for_both_columns() {
        let (sql, params) = FilterWhere::generate(Some("Pune"), None);
        assert_eq!(
            sql,
            "(\"title\" ILIKE $1 ESCAPE '\\' OR \"location\" ILIKE $1 ESCAPE '\\')"
        );
        assert_eq!(params, vec![Value::String("%Pune%".into())]);
    }

    #[test]
    fn combines_search_and_type() {
        let (sql, params) = FilterWhere::generate(Some("villa"), Some("Apartment"));
        assert!(sql.contains(" AND LOWER(\"property_type\") = $2"));
        assert_eq!(params[1], Value::String("apartment".into()));
    }

    #[test]
    fn escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
