#![forbid(unsafe_code)]
//! Faceted search over the AdaptWiki page set.
//!
//! The base set is derived first (free-text match materialized back into a
//! plain id filter, or all live pages for bare category browsing, or
//! nothing), then narrowed by kind and facet filters. Per-kind tab counts
//! come from the base set before narrowing; facet option lists are global
//! over all live pages of the declaring kind.

use adaptwiki_model::PageKind;
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

mod paginate;

pub use paginate::{clamp_page, PageParam, PageWindow, PAGE_SIZE};

pub const CRATE_NAME: &str = "adaptwiki-query";

#[derive(Debug)]
pub struct QueryError(pub String);

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for QueryError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub kind: Option<PageKind>,
    pub dimension: Option<String>,
    pub indicator_type: Option<String>,
    pub geographic_scale: Option<String>,
    pub frequency: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub filter: SearchFilter,
    pub page: PageParam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub kind: PageKind,
    pub title: String,
    pub slug: String,
    pub entry_author: Option<String>,
    pub updated_at: i64,
}

/// Tab badges for the three searchable kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub indicator: usize,
    pub metric: usize,
    pub sop: usize,
}

/// Dropdown options, global over all live pages of the declaring kind(s).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOptions {
    pub dimensions: Vec<String>,
    pub indicator_types: Vec<String>,
    pub geographic_scales: Vec<String>,
    pub frequencies: Vec<String>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub page: PageWindow,
    pub counts: KindCounts,
    pub facets: FacetOptions,
}

/// Canonical query normalization: NFKC + Unicode lowercase.
#[must_use]
pub fn normalize_query(input: &str) -> String {
    input.nfkc().collect::<String>().to_lowercase()
}

/// Turn free text into an FTS5 match expression: each token quoted, joined
/// by implicit AND. Returns `None` when no tokens survive, which callers
/// treat as "no query".
#[must_use]
pub fn fts_match_expr(input: &str) -> Option<String> {
    let normalized = normalize_query(input);
    let tokens: Vec<String> = normalized
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

enum BaseSet {
    /// Free-text matches, already materialized to plain page ids.
    Ids(Vec<i64>),
    /// All live pages (bare category browsing).
    AllLive,
    /// No query and no kind filter: show nothing.
    Empty,
}

fn resolve_base_set(conn: &Connection, filter: &SearchFilter) -> Result<BaseSet, QueryError> {
    if let Some(expr) = filter.query.as_deref().and_then(fts_match_expr) {
        // The raw match result does not compose with further filters;
        // re-resolve the matched ids against the live page set first.
        let mut stmt = conn
            .prepare(
                "SELECT p.id FROM pages p JOIN page_fts f ON f.rowid = p.id
                 WHERE p.live = 1 AND page_fts MATCH ?1",
            )
            .map_err(|e| QueryError(e.to_string()))?;
        let ids = stmt
            .query_map([expr], |row| row.get::<_, i64>(0))
            .map_err(|e| QueryError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueryError(e.to_string()))?;
        return Ok(BaseSet::Ids(ids));
    }
    if filter.kind.is_some() {
        return Ok(BaseSet::AllLive);
    }
    Ok(BaseSet::Empty)
}

fn base_where(base: &BaseSet) -> (String, Vec<Value>) {
    match base {
        BaseSet::Ids(ids) => {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let clause = if ids.is_empty() {
                "0".to_string()
            } else {
                format!("p.live = 1 AND p.id IN ({placeholders})")
            };
            (clause, ids.iter().map(|id| Value::Integer(*id)).collect())
        }
        BaseSet::AllLive => ("p.live = 1".to_string(), Vec::new()),
        BaseSet::Empty => ("0".to_string(), Vec::new()),
    }
}

fn facet_where(filter: &SearchFilter) -> (Vec<String>, Vec<Value>) {
    let mut where_parts: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(kind) = filter.kind {
        where_parts.push("p.kind = ?".to_string());
        params.push(Value::Text(kind.as_str().to_string()));
    }
    if let Some(dimension) = &filter.dimension {
        where_parts.push("p.kind = 'indicator' AND p.dimension = ?".to_string());
        params.push(Value::Text(dimension.clone()));
    }
    if let Some(indicator_type) = &filter.indicator_type {
        where_parts.push("p.kind = 'indicator' AND p.indicator_type = ?".to_string());
        params.push(Value::Text(indicator_type.clone()));
    }
    if let Some(scale) = &filter.geographic_scale {
        where_parts.push("p.kind = 'sop' AND p.geographic_scale = ?".to_string());
        params.push(Value::Text(scale.clone()));
    }
    if let Some(frequency) = &filter.frequency {
        where_parts.push("p.kind = 'sop' AND p.frequency = ?".to_string());
        params.push(Value::Text(frequency.clone()));
    }
    if let Some(author) = &filter.author {
        // entry_author exists on Indicator, Metric and Sop rows only.
        where_parts.push("p.entry_author = ? AND p.kind != 'method'".to_string());
        params.push(Value::Text(author.clone()));
    }
    (where_parts, params)
}

pub fn search_pages(conn: &Connection, req: &SearchRequest) -> Result<SearchOutcome, QueryError> {
    let base = resolve_base_set(conn, &req.filter)?;
    let (base_clause, base_params) = base_where(&base);
    let (facet_parts, facet_params) = facet_where(&req.filter);

    let mut where_clause = base_clause.clone();
    for part in &facet_parts {
        where_clause.push_str(" AND ");
        where_clause.push_str(part);
    }
    let mut all_params = base_params.clone();
    all_params.extend(facet_params);

    let total: i64 = {
        let sql = format!("SELECT COUNT(*) FROM pages p WHERE {where_clause}");
        let mut stmt = conn.prepare(&sql).map_err(|e| QueryError(e.to_string()))?;
        stmt.query_row(params_from_iter(all_params.iter()), |row| row.get(0))
            .map_err(|e| QueryError(e.to_string()))?
    };
    let page = clamp_page(total as usize, req.page);

    let hits = {
        let sql = format!(
            "SELECT p.id, p.parent_id, p.kind, p.title, p.slug, p.entry_author, p.updated_at
             FROM pages p WHERE {where_clause} ORDER BY p.id ASC LIMIT ? OFFSET ?"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| QueryError(e.to_string()))?;
        let mut params = all_params.clone();
        params.push(Value::Integer(page.page_size as i64));
        params.push(Value::Integer(page.offset() as i64));
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(|e| QueryError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueryError(e.to_string()))?;
        rows.into_iter()
        .filter_map(
            |(id, parent_id, kind_raw, title, slug, entry_author, updated_at)| {
                PageKind::parse(&kind_raw).map(|kind| SearchHit {
                    id,
                    parent_id,
                    kind,
                    title,
                    slug,
                    entry_author,
                    updated_at,
                })
            },
        )
        .collect()
    };

    let counts = kind_counts(conn, &base, &base_clause, &base_params)?;
    let facets = facet_options(conn)?;

    Ok(SearchOutcome {
        hits,
        page,
        counts,
        facets,
    })
}

/// Tab badges are computed from the base set only: the text matches when a
/// query is present, otherwise all live pages. Applying a tab's own kind
/// filter here would blank the other tabs.
fn kind_counts(
    conn: &Connection,
    base: &BaseSet,
    base_clause: &str,
    base_params: &[Value],
) -> Result<KindCounts, QueryError> {
    let clause = match base {
        BaseSet::Empty => "p.live = 1".to_string(),
        _ => base_clause.to_string(),
    };
    let sql = format!("SELECT p.kind, COUNT(*) FROM pages p WHERE {clause} GROUP BY p.kind");
    let mut stmt = conn.prepare(&sql).map_err(|e| QueryError(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(base_params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| QueryError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QueryError(e.to_string()))?;

    let mut counts = KindCounts::default();
    for (kind_raw, n) in rows {
        match PageKind::parse(&kind_raw) {
            Some(PageKind::Indicator) => counts.indicator = n as usize,
            Some(PageKind::Metric) => counts.metric = n as usize,
            Some(PageKind::Sop) => counts.sop = n as usize,
            _ => {}
        }
    }
    Ok(counts)
}

fn distinct_values(
    conn: &Connection,
    column: &str,
    kind_clause: &str,
) -> Result<Vec<String>, QueryError> {
    let sql = format!(
        "SELECT DISTINCT {column} FROM pages p
         WHERE p.live = 1 AND {kind_clause} AND {column} IS NOT NULL AND {column} != ''
         ORDER BY {column}"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| QueryError(e.to_string()))?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| QueryError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QueryError(e.to_string()));
    values
}

/// Facet option lists are independent of the current filter selection.
pub fn facet_options(conn: &Connection) -> Result<FacetOptions, QueryError> {
    Ok(FacetOptions {
        dimensions: distinct_values(conn, "p.dimension", "p.kind = 'indicator'")?,
        indicator_types: distinct_values(conn, "p.indicator_type", "p.kind = 'indicator'")?,
        geographic_scales: distinct_values(conn, "p.geographic_scale", "p.kind = 'sop'")?,
        frequencies: distinct_values(conn, "p.frequency", "p.kind = 'sop'")?,
        authors: distinct_values(conn, "p.entry_author", "p.kind != 'method'")?,
    })
}
