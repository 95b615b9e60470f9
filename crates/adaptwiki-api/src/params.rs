// SPDX-License-Identifier: Apache-2.0

use adaptwiki_model::PageKind;
use adaptwiki_query::{PageParam, SearchFilter, SearchRequest};
use std::collections::BTreeMap;

/// `all` in a dropdown means "no filter"; so does an empty value.
fn facet_value(query: &BTreeMap<String, String>, name: &str) -> Option<String> {
    query
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "all")
        .map(str::to_string)
}

fn kind_filter(query: &BTreeMap<String, String>) -> Option<PageKind> {
    // The category dropdown aliases the tab filter and wins when present.
    let raw = facet_value(query, "category").or_else(|| facet_value(query, "type"))?;
    PageKind::parse(&raw)
}

/// Search parameters never fail to parse: bad pagination input is carried
/// as `NotANumber` and clamped downstream, unknown filter values simply do
/// not filter.
#[must_use]
pub fn parse_search_params(query: &BTreeMap<String, String>) -> SearchRequest {
    let page = query
        .get("page")
        .map(|raw| PageParam::parse(raw))
        .unwrap_or_default();
    SearchRequest {
        filter: SearchFilter {
            query: query
                .get("query")
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            kind: kind_filter(query),
            dimension: facet_value(query, "dimension"),
            indicator_type: facet_value(query, "indicator_type"),
            geographic_scale: facet_value(query, "geographic_scale"),
            frequency: facet_value(query, "frequency"),
            author: facet_value(query, "author"),
        },
        page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn category_aliases_and_overrides_type() {
        let req = parse_search_params(&q(&[("type", "indicator"), ("category", "sop")]));
        assert_eq!(req.filter.kind, Some(PageKind::Sop));

        let req = parse_search_params(&q(&[("type", "metric"), ("category", "all")]));
        assert_eq!(req.filter.kind, Some(PageKind::Metric));
    }

    #[test]
    fn all_and_empty_values_mean_no_filter() {
        let req = parse_search_params(&q(&[("dimension", "all"), ("frequency", "")]));
        assert_eq!(req.filter.dimension, None);
        assert_eq!(req.filter.frequency, None);
        assert_eq!(req.filter.kind, None);
    }

    #[test]
    fn unknown_kind_values_do_not_filter() {
        let req = parse_search_params(&q(&[("type", "bogus")]));
        assert_eq!(req.filter.kind, None);
    }

    #[test]
    fn page_parses_defensively() {
        assert_eq!(
            parse_search_params(&q(&[("page", "7")])).page,
            PageParam::Number(7)
        );
        assert_eq!(
            parse_search_params(&q(&[("page", "abc")])).page,
            PageParam::NotANumber
        );
        assert_eq!(parse_search_params(&q(&[])).page, PageParam::Number(1));
    }

    #[test]
    fn blank_query_is_no_query() {
        let req = parse_search_params(&q(&[("query", "   ")]));
        assert_eq!(req.filter.query, None);
    }
}
