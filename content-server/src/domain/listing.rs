//! Listing filter for posts.
//!
//! Query-string values arrive untyped. [`ListFilter::from_query`] turns them
//! into a bounded filter whose sort column can only ever be one of the
//! allow-listed identifiers, so storage backends may splice
//! [`SortField::column`] and [`SortOrder::keyword`] into SQL directly while
//! binding everything else.

use std::num::IntErrorKind;

use serde::Deserialize;

pub(crate) const DEFAULT_LIMIT: u32 = 25;
pub(crate) const MAX_LIMIT: u32 = 100;

/// Raw listing parameters as they appear in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(rename = "Limit", alias = "limit")]
    pub(crate) limit: Option<String>,
    #[serde(rename = "Offset", alias = "offset")]
    pub(crate) offset: Option<String>,
    #[serde(rename = "Sort", alias = "sort")]
    pub(crate) sort: Option<String>,
    #[serde(rename = "Order", alias = "order")]
    pub(crate) order: Option<String>,
    #[serde(rename = "Search", alias = "search")]
    pub(crate) search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SortField {
    #[default]
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "id" => Some(SortField::Id),
            "name" => Some(SortField::Name),
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListFilter {
    pub(crate) search: Option<String>,
    pub(crate) sort: SortField,
    pub(crate) order: SortOrder,
    pub(crate) limit: u32,
    pub(crate) offset: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            search: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListFilter {
    pub(crate) fn from_query(query: ListQuery) -> Self {
        let limit = match query.limit.as_deref().map(|raw| raw.trim().parse::<i64>()) {
            Some(Ok(value)) if value > i64::from(MAX_LIMIT) => MAX_LIMIT,
            Some(Ok(value)) if value > 0 => value as u32,
            Some(Err(err)) if *err.kind() == IntErrorKind::PosOverflow => MAX_LIMIT,
            _ => DEFAULT_LIMIT,
        };

        let offset = match query.offset.as_deref().map(|raw| raw.trim().parse::<i64>()) {
            Some(Ok(value)) if value > 0 => value.min(i64::from(u32::MAX)) as u32,
            Some(Err(err)) if *err.kind() == IntErrorKind::PosOverflow => u32::MAX,
            _ => 0,
        };

        let sort = query
            .sort
            .as_deref()
            .and_then(SortField::parse)
            .unwrap_or_default();
        let order = query
            .order
            .as_deref()
            .and_then(SortOrder::parse)
            .unwrap_or_default();

        let search = query
            .search
            .map(|raw| raw.trim().to_string())
            .filter(|term| !term.is_empty());

        Self {
            search,
            sort,
            order,
            limit,
            offset,
        }
    }

    /// Lower-cased `%term%` pattern for a `LIKE` match, with `\`, `%` and `_`
    /// escaped so the term is always matched literally.
    pub(crate) fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|term| {
            let mut pattern = String::with_capacity(term.len() + 2);
            pattern.push('%');
            for ch in term.to_lowercase().chars() {
                if matches!(ch, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(ch);
            }
            pattern.push('%');
            pattern
        })
    }

    /// In-process equivalent of the `LIKE` predicate.
    pub(crate) fn matches(&self, name: &str, description: &str) -> bool {
        match self.search.as_deref() {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                name.to_lowercase().contains(&term) || description.to_lowercase().contains(&term)
            }
        }
    }
}
