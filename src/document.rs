//! Document parsing and the tree-query capability
//!
//! A raw payload becomes either a markup tree (via scraper) or a nested
//! structured value decoded from an embedding anchor. `Node` exposes the same
//! queries over both, so selector chains never care which parser ran.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::normalize::collapse_text;

/// Anchor id carrying the embedded data block on current page generations
pub const DEFAULT_ANCHOR_ID: &str = "__NEXT_DATA__";

/// Declared shape of a raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeHint {
    MarkupTree,
    EmbeddedStructuredValue,
}

impl std::str::FromStr for ShapeHint {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markup-tree" | "markup" | "html" => Ok(Self::MarkupTree),
            "embedded-structured-value" | "embedded" | "json" => Ok(Self::EmbeddedStructuredValue),
            other => Err(ExtractError::Config {
                message: format!("unknown shape hint '{}'", other),
            }),
        }
    }
}

/// Payload handed over by the fetch collaborator
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub shape: ShapeHint,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, shape: ShapeHint) -> Self {
        Self {
            bytes: bytes.into(),
            shape,
        }
    }

    pub fn markup(html: &str) -> Self {
        Self::new(html.as_bytes(), ShapeHint::MarkupTree)
    }

    pub fn embedded(html: &str) -> Self {
        Self::new(html.as_bytes(), ShapeHint::EmbeddedStructuredValue)
    }
}

/// Read-only tree built once per request
pub enum ParsedTree {
    Markup(Html),
    Structured(Value),
}

impl std::fmt::Debug for ParsedTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markup(_) => f.write_str("ParsedTree::Markup"),
            Self::Structured(v) => write!(f, "ParsedTree::Structured({})", v),
        }
    }
}

impl ParsedTree {
    pub fn root(&self) -> Node<'_> {
        match self {
            Self::Markup(html) => Node::Element(html.root_element()),
            Self::Structured(value) => Node::Value(value),
        }
    }
}

/// Parse a raw payload according to its shape hint.
///
/// Consumes the document; the returned tree is never mutated afterwards.
pub fn parse_document(raw: RawDocument, anchor_id: &str) -> ExtractResult<ParsedTree> {
    let text = String::from_utf8(raw.bytes)
        .map_err(|e| ExtractError::parse(format!("invalid UTF-8 in document: {}", e)))?;

    let html = Html::parse_document(&text);
    match raw.shape {
        ShapeHint::MarkupTree => Ok(ParsedTree::Markup(html)),
        ShapeHint::EmbeddedStructuredValue => {
            decode_anchor(&html, anchor_id).map(ParsedTree::Structured)
        }
    }
}

fn decode_anchor(html: &Html, anchor_id: &str) -> ExtractResult<Value> {
    let selector = Selector::parse(&format!(r#"script[id="{}"]"#, anchor_id))
        .map_err(|e| ExtractError::parse(format!("invalid anchor id '{}': {}", anchor_id, e)))?;

    let element = html
        .select(&selector)
        .next()
        .ok_or_else(|| ExtractError::AnchorNotFound {
            anchor: anchor_id.to_string(),
        })?;

    let content = element.text().collect::<String>();
    debug!("Decoding {} bytes under anchor {}", content.len(), anchor_id);

    serde_json::from_str::<Value>(content.trim())
        .map_err(|e| ExtractError::parse(format!("anchor '{}' is not valid JSON: {}", anchor_id, e)))
}

/// How text is pulled out of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextMode {
    /// Concatenate all text and trim the edges
    Strip,
    /// Trim every fragment, drop empty ones, join with a separator
    Join { separator: String },
}

impl TextMode {
    pub fn join(separator: &str) -> Self {
        Self::Join {
            separator: separator.to_string(),
        }
    }
}

/// Compiled query against a node.
///
/// CSS queries only match markup nodes and paths only match structured nodes.
#[derive(Debug, Clone)]
pub enum Query {
    Css(Selector),
    Path(Vec<PathSegment>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key, or array index when numeric
    Key(String),
    /// Every element of an array or every member of an object
    Wildcard,
}

impl Query {
    /// Parse a dot path such as `props.items.*.title` or `edges.0.node`
    pub fn path(path: &str) -> Self {
        let segments = path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" | "[*]" => PathSegment::Wildcard,
                key => PathSegment::Key(key.trim_start_matches('[').trim_end_matches(']').to_string()),
            })
            .collect();
        Self::Path(segments)
    }
}

/// One navigable node of a parsed tree
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Element(ElementRef<'a>),
    Value(&'a Value),
}

impl<'a> Node<'a> {
    /// All nodes matching the query under this node, in document order
    pub fn find_all(&self, query: &Query) -> Vec<Node<'a>> {
        match (self, query) {
            (Node::Element(el), Query::Css(selector)) => {
                el.select(selector).map(Node::Element).collect()
            }
            (Node::Value(value), Query::Path(segments)) => walk_path(*value, segments)
                .into_iter()
                .map(Node::Value)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn find_one(&self, query: &Query) -> Option<Node<'a>> {
        self.find_all(query).into_iter().next()
    }

    /// Text content, `None` when the node carries no non-empty text
    pub fn text(&self, mode: &TextMode) -> Option<String> {
        let text = match self {
            Node::Element(el) => match mode {
                TextMode::Strip => el.text().collect::<String>().trim().to_string(),
                TextMode::Join { separator } => collapse_text(el.text(), separator),
            },
            Node::Value(value) => value_text(value, mode)?,
        };
        Some(text).filter(|t| !t.is_empty())
    }

    /// Attribute of a markup element, or member of a structured object
    pub fn attribute(&self, name: &str) -> Option<String> {
        match self {
            Node::Element(el) => el.value().attr(name).map(String::from),
            Node::Value(value) => lookup(value, name).and_then(|v| value_text(v, &TextMode::Strip)),
        }
    }

    /// The node as a JSON value: structured nodes as-is, elements as their text
    pub fn to_value(&self) -> Value {
        match self {
            Node::Element(_) => self
                .text(&TextMode::Strip)
                .map(Value::String)
                .unwrap_or(Value::Null),
            Node::Value(value) => (*value).clone(),
        }
    }
}

fn walk_path<'a>(root: &'a Value, segments: &[PathSegment]) -> Vec<&'a Value> {
    let mut current = vec![root];

    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match segment {
                PathSegment::Wildcard => match value {
                    Value::Array(arr) => next.extend(arr.iter()),
                    Value::Object(obj) => next.extend(obj.values()),
                    _ => {}
                },
                PathSegment::Key(key) => {
                    if let Some(child) = lookup(value, key) {
                        next.push(child);
                    }
                }
            }
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }

    current
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(obj) => obj.get(key),
        Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    }
}

fn value_text(value: &Value, mode: &TextMode) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(arr) => {
            let separator = match mode {
                TextMode::Strip => " ",
                TextMode::Join { separator } => separator.as_str(),
            };
            let parts: Vec<String> = arr.iter().filter_map(|v| value_text(v, mode)).collect();
            Some(collapse_text(parts.iter().map(String::as_str), separator))
        }
        Value::Object(_) | Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css(s: &str) -> Query {
        Query::Css(Selector::parse(s).unwrap())
    }

    #[test]
    fn test_markup_queries() {
        let raw = RawDocument::markup(
            r#"
            <ul class="list">
                <li data-testid="item"><a href="/title/tt1/">  Heat  </a></li>
                <li data-testid="item"><a href="/title/tt2/">Ronin</a></li>
            </ul>
            "#,
        );
        let tree = parse_document(raw, DEFAULT_ANCHOR_ID).unwrap();
        let root = tree.root();

        let items = root.find_all(&css("[data-testid=item]"));
        assert_eq!(items.len(), 2);

        let link = items[0].find_one(&css("a")).unwrap();
        assert_eq!(link.text(&TextMode::Strip).unwrap(), "Heat");
        assert_eq!(link.attribute("href").unwrap(), "/title/tt1/");
        assert!(link.attribute("title").is_none());
    }

    #[test]
    fn test_join_mode_collapses_fragments() {
        let raw = RawDocument::markup(
            "<p class=\"addr\"><span>12 Main St</span>\n   <span>Springfield</span> </p>",
        );
        let tree = parse_document(raw, DEFAULT_ANCHOR_ID).unwrap();
        let addr = tree.root().find_one(&css(".addr")).unwrap();
        assert_eq!(
            addr.text(&TextMode::join(", ")).unwrap(),
            "12 Main St, Springfield"
        );
    }

    #[test]
    fn test_embedded_anchor_decoded() {
        let raw = RawDocument::embedded(
            r#"<html><body>
            <script id="__NEXT_DATA__" type="application/json">
                {"props": {"items": [{"name": "A", "year": 1999}, {"name": "B"}]}}
            </script>
            </body></html>"#,
        );
        let tree = parse_document(raw, DEFAULT_ANCHOR_ID).unwrap();
        let root = tree.root();

        let names = root.find_all(&Query::path("props.items.*.name"));
        assert_eq!(names.len(), 2);
        assert_eq!(names[1].text(&TextMode::Strip).unwrap(), "B");

        let year = root.find_one(&Query::path("props.items.0.year")).unwrap();
        assert_eq!(year.to_value(), serde_json::json!(1999));

        assert!(root.find_one(&Query::path("props.items.1.year")).is_none());
        assert!(root.find_one(&Query::path("props.missing")).is_none());
    }

    #[test]
    fn test_queries_do_not_cross_shapes() {
        let raw = RawDocument::embedded(r#"<script id="__NEXT_DATA__">{"a": 1}</script>"#);
        let tree = parse_document(raw, DEFAULT_ANCHOR_ID).unwrap();
        assert!(tree.root().find_all(&css("script")).is_empty());
        assert_eq!(tree.root().find_all(&Query::path("a")).len(), 1);
    }

    #[test]
    fn test_missing_anchor() {
        let raw = RawDocument::embedded("<html><body><p>nothing here</p></body></html>");
        let err = parse_document(raw, DEFAULT_ANCHOR_ID).unwrap_err();
        assert_eq!(
            err,
            ExtractError::AnchorNotFound {
                anchor: "__NEXT_DATA__".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_payloads() {
        let invalid_utf8 = RawDocument::new(vec![0xff, 0xfe, 0x00], ShapeHint::MarkupTree);
        assert!(matches!(
            parse_document(invalid_utf8, DEFAULT_ANCHOR_ID),
            Err(ExtractError::Parse { .. })
        ));

        let broken_json = RawDocument::embedded(r#"<script id="__NEXT_DATA__">{"props": </script>"#);
        assert!(matches!(
            parse_document(broken_json, DEFAULT_ANCHOR_ID),
            Err(ExtractError::Parse { .. })
        ));
    }

    #[test]
    fn test_shape_hint_names() {
        assert_eq!("markup-tree".parse::<ShapeHint>().unwrap(), ShapeHint::MarkupTree);
        assert_eq!(
            "embedded-structured-value".parse::<ShapeHint>().unwrap(),
            ShapeHint::EmbeddedStructuredValue
        );
        assert!("pdf".parse::<ShapeHint>().is_err());
    }
}
