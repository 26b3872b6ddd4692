use sqlx::{Postgres, QueryBuilder};

const DEFAULT_PER_PAGE: u32 = 15;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`.
    pub sort: Option<String>,
}

/// `(parameter, column)` pairs, the first one is the default.
pub struct SortColumns(pub &'static [(&'static str, &'static str)]);

impl SortColumns {
    fn resolve(&self, requested: Option<&str>) -> &'static str {
        requested
            .and_then(|name| self.0.iter().find(|(param, _)| *param == name))
            .or_else(|| self.0.first())
            .map(|(_, column)| *column)
            .unwrap_or("1")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }

        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }

    /// Append `WHERE <conditions> [AND (<col> ILIKE $n OR ...)]`.
    pub fn push_filter(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        conditions: &[&str],
        search_columns: &[&str],
    ) {
        qb.push(" WHERE ");
        qb.push(conditions.join(" AND "));

        let Some(pattern) = self.search_pattern() else {
            return;
        };
        if search_columns.is_empty() {
            return;
        }

        qb.push(" AND (");
        let mut separated = qb.separated(" OR ");
        for column in search_columns {
            separated.push(format!("{column} ILIKE "));
            separated.push_bind_unseparated(pattern.clone());
        }
        separated.push_unseparated(")");
    }

    pub fn push_order_and_page(&self, qb: &mut QueryBuilder<'_, Postgres>, columns: &SortColumns) {
        let column = columns.resolve(self.sort_by.as_deref());
        let direction = match self.sort.as_deref() {
            Some(sort) if sort.eq_ignore_ascii_case("desc") => "DESC",
            _ => "ASC",
        };

        qb.push(format!(" ORDER BY {column} {direction}"));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(self.per_page()));
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
    }

    pub fn into_page<T>(&self, data: Vec<T>, total: i64) -> Page<T> {
        Page {
            data,
            total,
            page: self.page(),
            per_page: self.per_page(),
        }
    }
}
