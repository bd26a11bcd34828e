//! JSON schemas for every tool, for registration with tool-calling clients.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use super::args::{DEFAULT_SOURCE_ROWS, MAX_EXPORT_ROW_LIMIT, MAX_TOOL_ROW_LIMIT};
use crate::models::DEFAULT_ROW_LIMIT;

/// Tool schema for LLM function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Collection of all Search Console tool schemas
pub struct GscToolSchemas;

const DIMENSIONS: [&str; 6] = ["query", "page", "country", "device", "searchAppearance", "date"];

fn site_url() -> JsonValue {
    json!({
        "type": "string",
        "description": "Property identifier, e.g. 'sc-domain:example.com' or 'https://example.com/'"
    })
}

fn date(description: &str) -> JsonValue {
    json!({
        "type": "string",
        "format": "date",
        "description": description
    })
}

fn format() -> JsonValue {
    json!({
        "type": "string",
        "enum": ["compact", "full", "csv"],
        "description": "Output shape. 'compact' (default) abbreviates fields and strips the property's URL prefix"
    })
}

fn limit(default: u32, max: u32) -> JsonValue {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": max,
        "default": default,
        "description": format!("Maximum number of rows to return (1-{max})")
    })
}

fn search_type() -> JsonValue {
    json!({
        "type": "string",
        "enum": ["web", "image", "video", "news", "discover", "googleNews"],
        "default": "web"
    })
}

fn data_state() -> JsonValue {
    json!({
        "type": "string",
        "enum": ["all", "final"],
        "description": "'all' includes fresh, not yet finalized data"
    })
}

fn filter() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "dimension": {"type": "string", "enum": DIMENSIONS},
            "operator": {
                "type": "string",
                "enum": ["equals", "notEquals", "contains", "notContains", "includingRegex", "excludingRegex"],
                "default": "equals"
            },
            "expression": {"type": "string"}
        },
        "required": ["dimension", "expression"]
    })
}

/// Properties accepted by every raw analytics query tool.
fn query_properties(max_limit: u32) -> Map<String, JsonValue> {
    properties(json!({
        "siteUrl": site_url(),
        "startDate": date("First day of the range (YYYY-MM-DD)"),
        "endDate": date("Last day of the range, inclusive (YYYY-MM-DD)"),
        "dimensions": {
            "type": "array",
            "items": {"type": "string", "enum": DIMENSIONS},
            "description": "Dimensions to group by, in key order"
        },
        "filters": {
            "type": "array",
            "items": filter(),
            "description": "Filters combined with AND"
        },
        "filterGroups": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "groupType": {"type": "string", "enum": ["and", "or"]},
                    "filters": {"type": "array", "items": filter()}
                },
                "required": ["filters"]
            }
        },
        "limit": limit(DEFAULT_ROW_LIMIT, max_limit),
        "startRow": {"type": "integer", "minimum": 0, "default": 0},
        "dataState": data_state(),
        "aggregationType": {"type": "string", "enum": ["auto", "byPage", "byProperty"]},
        "searchType": search_type(),
        "format": format()
    }))
}

fn object(properties: Map<String, JsonValue>, required: &[&str]) -> JsonValue {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn properties(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

fn analysis_properties(extra: JsonValue) -> Map<String, JsonValue> {
    let mut map = properties(json!({
        "siteUrl": site_url(),
        "startDate": date("First day of the range (YYYY-MM-DD)"),
        "endDate": date("Last day of the range, inclusive (YYYY-MM-DD)"),
        "searchType": search_type(),
        "dataState": data_state(),
        "sourceRows": {
            "type": "integer",
            "minimum": 1,
            "maximum": MAX_TOOL_ROW_LIMIT,
            "default": DEFAULT_SOURCE_ROWS,
            "description": "How many (query, page) rows to analyse"
        },
        "format": format()
    }));
    map.extend(properties(extra));
    map
}

impl GscToolSchemas {
    /// Get all tool schemas for registration with LLM
    pub fn all() -> Vec<ToolSchema> {
        vec![
            Self::list_sites(),
            Self::get_site(),
            Self::query_search_analytics(),
            Self::get_top_queries(),
            Self::get_top_pages(),
            Self::export_search_analytics(),
            Self::find_low_ctr_opportunities(),
            Self::detect_cannibalization(),
            Self::compare_periods(),
            Self::weekly_summary(),
            Self::list_sitemaps(),
            Self::get_sitemap(),
            Self::submit_sitemap(),
            Self::delete_sitemap(),
            Self::inspect_url(),
            Self::batch_inspect_urls(),
        ]
    }

    pub fn list_sites() -> ToolSchema {
        ToolSchema {
            name: "list_sites".to_string(),
            description: "List every Search Console property the credential can access, \
                with its permission level."
                .to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    pub fn get_site() -> ToolSchema {
        ToolSchema {
            name: "get_site".to_string(),
            description: "Get one property and the credential's permission level on it. \
                Returns found=false when the property is unknown."
                .to_string(),
            parameters: object(properties(json!({"siteUrl": site_url()})), &["siteUrl"]),
        }
    }

    pub fn query_search_analytics() -> ToolSchema {
        let mut props = query_properties(MAX_TOOL_ROW_LIMIT);
        props.insert(
            "granularity".to_string(),
            json!({
                "type": "string",
                "enum": ["daily", "weekly", "monthly", "auto"],
                "default": "daily",
                "description": "Re-bucket date rows; needs 'date' as the first dimension. \
                    'auto' picks monthly above 90 days and weekly above 21 days"
            }),
        );
        ToolSchema {
            name: "query_search_analytics".to_string(),
            description: "Query clicks, impressions, CTR and average position for a property, \
                grouped by any combination of dimensions and optionally filtered."
                .to_string(),
            parameters: object(props, &["siteUrl", "startDate", "endDate"]),
        }
    }

    pub fn get_top_queries() -> ToolSchema {
        let mut props = query_properties(MAX_TOOL_ROW_LIMIT);
        props.remove("dimensions");
        ToolSchema {
            name: "get_top_queries".to_string(),
            description: "Top search queries by clicks for a date range.".to_string(),
            parameters: object(props, &["siteUrl", "startDate", "endDate"]),
        }
    }

    pub fn get_top_pages() -> ToolSchema {
        let mut props = query_properties(MAX_TOOL_ROW_LIMIT);
        props.remove("dimensions");
        ToolSchema {
            name: "get_top_pages".to_string(),
            description: "Top pages by clicks for a date range.".to_string(),
            parameters: object(props, &["siteUrl", "startDate", "endDate"]),
        }
    }

    pub fn export_search_analytics() -> ToolSchema {
        ToolSchema {
            name: "export_search_analytics".to_string(),
            description: format!(
                "Export up to {MAX_EXPORT_ROW_LIMIT} rows, fetched page by page. \
                 Defaults to CSV output."
            ),
            parameters: object(
                query_properties(MAX_EXPORT_ROW_LIMIT),
                &["siteUrl", "startDate", "endDate"],
            ),
        }
    }

    pub fn find_low_ctr_opportunities() -> ToolSchema {
        let props = analysis_properties(json!({
            "minImpressions": {"type": "integer", "minimum": 0, "default": 100},
            "maxCtr": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.03},
            "minPosition": {"type": "number", "default": 4},
            "maxPosition": {"type": "number", "default": 20},
            "limit": {"type": "integer", "minimum": 1, "default": 25}
        }));
        ToolSchema {
            name: "find_low_ctr_opportunities".to_string(),
            description: "Find queries and pages that rank on page one or two but earn \
                few clicks, with an estimate of the clicks a better snippet could win \
                (assuming a 5% CTR)."
                .to_string(),
            parameters: object(props, &["siteUrl", "startDate", "endDate"]),
        }
    }

    pub fn detect_cannibalization() -> ToolSchema {
        let props = analysis_properties(json!({
            "minImpressions": {"type": "integer", "minimum": 0, "default": 50},
            "limit": {"type": "integer", "minimum": 1, "default": 25}
        }));
        ToolSchema {
            name: "detect_cannibalization".to_string(),
            description: "Detect queries for which several pages of the property compete, \
                with a consolidation recommendation."
                .to_string(),
            parameters: object(props, &["siteUrl", "startDate", "endDate"]),
        }
    }

    pub fn compare_periods() -> ToolSchema {
        let mut props = query_properties(MAX_TOOL_ROW_LIMIT);
        props.remove("startDate");
        props.remove("endDate");
        props.extend(properties(json!({
            "period1StartDate": date("Start of the period of interest"),
            "period1EndDate": date("End of the period of interest"),
            "period2StartDate": date("Start of the baseline period"),
            "period2EndDate": date("End of the baseline period")
        })));
        ToolSchema {
            name: "compare_periods".to_string(),
            description: "Compare two date ranges: totals for each and the change in \
                clicks, impressions and average position from period 2 to period 1."
                .to_string(),
            parameters: object(
                props,
                &[
                    "siteUrl",
                    "period1StartDate",
                    "period1EndDate",
                    "period2StartDate",
                    "period2EndDate",
                ],
            ),
        }
    }

    pub fn weekly_summary() -> ToolSchema {
        ToolSchema {
            name: "weekly_summary".to_string(),
            description: "Last seven days against the seven before: totals, change, top \
                queries, top pages and device split. Ends three days ago unless endDate is given."
                .to_string(),
            parameters: object(
                properties(json!({
                    "siteUrl": site_url(),
                    "endDate": date("Last day of the current week (YYYY-MM-DD)"),
                    "format": format()
                })),
                &["siteUrl"],
            ),
        }
    }

    pub fn list_sitemaps() -> ToolSchema {
        ToolSchema {
            name: "list_sitemaps".to_string(),
            description: "List the sitemaps submitted for a property.".to_string(),
            parameters: object(properties(json!({"siteUrl": site_url()})), &["siteUrl"]),
        }
    }

    pub fn get_sitemap() -> ToolSchema {
        ToolSchema {
            name: "get_sitemap".to_string(),
            description: "Get the status of one submitted sitemap. Returns found=false when \
                it has not been submitted."
                .to_string(),
            parameters: Self::sitemap_parameters(),
        }
    }

    pub fn submit_sitemap() -> ToolSchema {
        ToolSchema {
            name: "submit_sitemap".to_string(),
            description: "Submit a sitemap for a property. Requires the full access scope."
                .to_string(),
            parameters: Self::sitemap_parameters(),
        }
    }

    pub fn delete_sitemap() -> ToolSchema {
        ToolSchema {
            name: "delete_sitemap".to_string(),
            description: "Remove a sitemap from a property. Requires the full access scope."
                .to_string(),
            parameters: Self::sitemap_parameters(),
        }
    }

    pub fn inspect_url() -> ToolSchema {
        ToolSchema {
            name: "inspect_url".to_string(),
            description: "Inspect the index status of one URL of the property.".to_string(),
            parameters: object(
                properties(json!({
                    "siteUrl": site_url(),
                    "url": {"type": "string", "description": "Absolute URL to inspect"}
                })),
                &["siteUrl", "url"],
            ),
        }
    }

    pub fn batch_inspect_urls() -> ToolSchema {
        ToolSchema {
            name: "batch_inspect_urls".to_string(),
            description: "Inspect several URLs at once. Each URL reports its own success or \
                failure; results keep the input order."
                .to_string(),
            parameters: object(
                properties(json!({
                    "siteUrl": site_url(),
                    "urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1
                    }
                })),
                &["siteUrl", "urls"],
            ),
        }
    }

    fn sitemap_parameters() -> JsonValue {
        object(
            properties(json!({
                "siteUrl": site_url(),
                "feedpath": {"type": "string", "description": "Full URL of the sitemap"}
            })),
            &["siteUrl", "feedpath"],
        )
    }

    /// Get schema by name
    pub fn get_by_name(name: &str) -> Option<ToolSchema> {
        Self::all().into_iter().find(|s| s.name == name)
    }

    /// Get all tool names
    pub fn tool_names() -> Vec<String> {
        Self::all().into_iter().map(|s| s.name).collect()
    }
}
