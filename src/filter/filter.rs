use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, ListParams, ListingSchema, SqlResult};
use crate::config::FilterConfig;
use crate::database::models::ListingRecord;

/// A validated list query: search, type filter, ordering and a window.
#[derive(Debug, Clone)]
pub struct Filter {
    schema: &'static ListingSchema,
    search: Option<String>,
    property_type: Option<String>,
    order: Option<FilterOrderInfo>,
    offset: i64,
    limit: i64,
}

impl Filter {
    pub fn new(schema: &'static ListingSchema, config: &FilterConfig) -> Self {
        Self {
            schema,
            search: None,
            property_type: None,
            order: None,
            offset: 0,
            limit: config.default_limit,
        }
    }

    pub fn from_params(
        schema: &'static ListingSchema,
        params: &ListParams,
        config: &FilterConfig,
    ) -> Result<Self, FilterError> {
        let mut filter = Self::new(schema, config);

        filter.search = non_empty(params.title_like.as_deref());
        filter.property_type = non_empty(params.property_type.as_deref()).map(|t| t.to_lowercase());
        filter.order = FilterOrder::resolve(schema, params.sort.as_deref(), params.order.as_deref())?;

        let start = match non_empty(params.start.as_deref()) {
            Some(raw) => parse_bound(&raw).ok_or(FilterError::InvalidOffset(raw))?,
            None => 0,
        };
        let limit = match non_empty(params.end.as_deref()) {
            Some(raw) => {
                let end = parse_bound(&raw).ok_or_else(|| FilterError::InvalidLimit(raw.clone()))?;
                if end < start {
                    return Err(FilterError::InvalidLimit(format!("{} is before _start {}", raw, start)));
                }
                end - start
            }
            None => config.default_limit,
        };
        filter.window(start, limit, config);
        if config.debug_logging {
            tracing::debug!(?filter, "Resolved list filter");
        }
        Ok(filter)
    }

    fn window(&mut self, offset: i64, limit: i64, config: &FilterConfig) {
        let max_limit = config.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };
        self.offset = offset;
        self.limit = applied_limit;
    }

    pub fn table(&self) -> &'static str {
        self.schema.table
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn property_type(&self) -> Option<&str> {
        self.property_type.as_deref()
    }

    pub fn order(&self) -> Option<&FilterOrderInfo> {
        self.order.as_ref()
    }

    pub fn to_sql(&self) -> SqlResult {
        let SqlResult { query: where_sql, params } = self.to_where_sql();
        let query = format!(
            "SELECT * FROM \"{}\"{} {} LIMIT {} OFFSET {}",
            self.schema.table,
            where_sql,
            FilterOrder::generate(self.order.as_ref()),
            self.limit,
            self.offset
        );
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let SqlResult { query: where_sql, params } = self.to_where_sql();
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\"{}", self.schema.table, where_sql),
            params,
        }
    }

    /// ` WHERE ...` with a leading space, or an empty string.
    pub fn to_where_sql(&self) -> SqlResult {
        let (clause, params) = FilterWhere::generate(self.search(), self.property_type());
        let query = if clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clause)
        };
        SqlResult { query, params }
    }

    pub fn matches<T: ListingRecord>(&self, record: &T) -> bool {
        FilterWhere::matches(record, self.search(), self.property_type())
    }

    /// Apply the filter to an in-memory collection, returning the page and
    /// the total number of matches before windowing.
    pub fn apply<T: ListingRecord>(&self, records: impl IntoIterator<Item = T>) -> (Vec<T>, i64) {
        let mut matched: Vec<T> = records.into_iter().filter(|r| self.matches(r)).collect();
        let total = matched.len() as i64;
        matched.sort_by(|a, b| FilterOrder::compare(self.order(), a, b));
        let page = matched
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        (page, total)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_bound(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|n| *n >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::models::Property;
    use crate::filter::types::{PROPERTY_SCHEMA, REQUIREMENT_SCHEMA};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "_start" => p.start = v,
                "_end" => p.end = v,
                "_sort" => p.sort = v,
                "_order" => p.order = v,
                "title_like" => p.title_like = v,
                "propertyType" => p.property_type = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    fn property(title: &str, location: &str, kind: &str, price: i64, minutes: i64) -> Property {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        Property {
            id: Uuid::new_v4(),
            title: title.into(),
            description: "desc".into(),
            property_type: kind.into(),
            deal_type: "Direct".into(),
            location: location.into(),
            price,
            total_square_feet: None,
            phone: "9999999999".into(),
            photo: None,
            creator: Uuid::new_v4(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn window_from_start_and_end() {
        let cfg = AppConfig::development().filter;
        let f = Filter::from_params(&PROPERTY_SCHEMA, &params(&[("_start", "10"), ("_end", "20")]), &cfg).unwrap();
        assert_eq!((f.offset(), f.limit()), (10, 10));

        let f = Filter::from_params(&PROPERTY_SCHEMA, &ListParams::default(), &cfg).unwrap();
        assert_eq!((f.offset(), f.limit()), (0, cfg.default_limit));
    }

    #[test]
    fn rejects_bad_bounds() {
        let cfg = AppConfig::development().filter;
        for bad in [
            params(&[("_start", "-1")]),
            params(&[("_start", "abc")]),
            params(&[("_end", "ten")]),
            params(&[("_start", "5"), ("_end", "2")]),
        ] {
            assert!(Filter::from_params(&PROPERTY_SCHEMA, &bad, &cfg).is_err(), "{:?}", bad);
        }
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn caps_limit_at_max_and_logs_it() {
        let cfg = AppConfig::production().filter;
        assert!(!cfg.debug_logging);

        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let f = tracing::subscriber::with_default(subscriber, || {
            Filter::from_params(&PROPERTY_SCHEMA, &params(&[("_start", "0"), ("_end", "100000")]), &cfg).unwrap()
        });

        assert_eq!(f.limit(), cfg.max_limit.unwrap());
        let logged = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("Limit 100000 exceeds max"), "{}", logged);
    }

    #[test]
    fn sql_uses_schema_table_and_binds_filters() {
        let cfg = AppConfig::development().filter;
        let f = Filter::from_params(
            &REQUIREMENT_SCHEMA,
            &params(&[("title_like", "pune"), ("propertyType", "Plot"), ("_sort", "askedPrice"), ("_order", "desc"), ("_end", "5")]),
            &cfg,
        )
        .unwrap();
        let sql = f.to_sql();
        assert!(sql.query.starts_with("SELECT * FROM \"requirements\" WHERE "));
        assert!(sql.query.contains("ORDER BY \"asked_price\" DESC, \"created_at\" ASC, \"id\" ASC LIMIT 5 OFFSET 0"));
        assert_eq!(sql.params.len(), 2);

        let count = f.to_count_sql();
        assert!(count.query.starts_with("SELECT COUNT(*) AS count FROM \"requirements\" WHERE "));
        assert!(!count.query.contains("LIMIT"));
    }

    #[test]
    fn apply_filters_sorts_and_pages() {
        let cfg = AppConfig::development().filter;
        let records = vec![
            property("Sea view flat", "Mumbai", "apartment", 300, 0),
            property("Farm plot", "Pune", "plot", 100, 1),
            property("City flat", "Pune", "apartment", 200, 2),
            property("Office", "PUNE camp", "commercial", 500, 3),
        ];

        let f = Filter::from_params(&PROPERTY_SCHEMA, &params(&[("title_like", "pune"), ("_sort", "price"), ("_order", "desc"), ("_start", "0"), ("_end", "2")]), &cfg).unwrap();
        let (page, total) = f.apply(records.clone());
        assert_eq!(total, 3);
        assert_eq!(page.iter().map(|p| p.price).collect::<Vec<_>>(), vec![500, 200]);

        let f = Filter::from_params(&PROPERTY_SCHEMA, &params(&[("propertyType", "APARTMENT")]), &cfg).unwrap();
        let (page, total) = f.apply(records);
        assert_eq!(total, 2);
        assert_eq!(page[0].title, "Sea view flat");
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let cfg = AppConfig::development().filter;
        let records = vec![
            property("100% new", "Goa", "room", 1, 0),
            property("Brand new", "Goa", "room", 1, 1),
        ];
        let f = Filter::from_params(&PROPERTY_SCHEMA, &params(&[("title_like", "0%")]), &cfg).unwrap();
        let (page, total) = f.apply(records);
        assert_eq!(total, 1);
        assert_eq!(page[0].title, "100% new");
    }
}
