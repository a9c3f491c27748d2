//! Selector chains and their resolution
//!
//! A `SelectorSpec` is declarative data: an ordered, newest-schema-first list
//! of candidates for one field. The `Resolver` walks that list against a scope
//! node and stops at the first candidate that yields anything.

use std::sync::atomic::{AtomicUsize, Ordering};

use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::document::{Node, Query};
use crate::error::{ExtractError, ExtractResult};
use crate::extract::field::{CompiledCoercion, Coercion, FieldDefault};
use crate::normalize::Normalizer;

/// How a candidate query is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Raw CSS selector
    Css,
    /// Element name
    Tag,
    /// Class token
    Class,
    /// Stable `data-testid` hook
    TestId,
    /// Attribute predicate, e.g. `itemprop=name`
    Attribute,
    /// Dot path into an embedded structured value
    Path,
}

impl Strategy {
    /// Compile a query string for this strategy
    pub fn compile(self, query: &str) -> Result<Query, String> {
        let css = match self {
            Self::Path => return Ok(Query::path(query)),
            Self::Css => query.to_string(),
            Self::Tag => {
                let name = query.trim();
                let bare = !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
                if !bare {
                    return Err(format!("'{}' is not an element name", query));
                }
                name.to_string()
            }
            Self::Class => format!(".{}", query.trim_start_matches('.')),
            Self::TestId => format!(r#"[data-testid="{}"]"#, query),
            Self::Attribute => format!("[{}]", query.trim_start_matches('[').trim_end_matches(']')),
        };
        Selector::parse(&css)
            .map(Query::Css)
            .map_err(|e| format!("'{}': {}", css, e))
    }
}

/// One extraction strategy within a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub strategy: Strategy,
    pub query: String,
    /// Overrides the field coercion when this candidate wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coercion: Option<Coercion>,
}

impl Candidate {
    pub fn new(strategy: Strategy, query: &str) -> Self {
        Self {
            strategy,
            query: query.to_string(),
            coercion: None,
        }
    }

    pub fn css(query: &str) -> Self {
        Self::new(Strategy::Css, query)
    }

    pub fn tag(query: &str) -> Self {
        Self::new(Strategy::Tag, query)
    }

    pub fn class(query: &str) -> Self {
        Self::new(Strategy::Class, query)
    }

    pub fn test_id(query: &str) -> Self {
        Self::new(Strategy::TestId, query)
    }

    pub fn attribute(query: &str) -> Self {
        Self::new(Strategy::Attribute, query)
    }

    pub fn path(query: &str) -> Self {
        Self::new(Strategy::Path, query)
    }

    pub fn read_as(mut self, coercion: Coercion) -> Self {
        self.coercion = Some(coercion);
        self
    }
}

/// Ordered fallback chain for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub name: String,
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub coercion: Coercion,
    #[serde(default)]
    pub default: FieldDefault,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalize: Vec<Normalizer>,
}

impl SelectorSpec {
    pub fn new(name: &str, candidates: Vec<Candidate>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
            required: false,
            coercion: Coercion::default(),
            default: FieldDefault::default(),
            normalize: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn coerce(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn or_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn normalize(mut self, normalizer: Normalizer) -> Self {
        self.normalize.push(normalizer);
        self
    }
}

/// Candidate with its query compiled
#[derive(Debug, Clone)]
pub struct CompiledCandidate {
    pub strategy: Strategy,
    pub source: String,
    pub query: Query,
    pub coercion: Option<CompiledCoercion>,
}

impl CompiledCandidate {
    pub fn compile(field: &str, candidate: &Candidate) -> ExtractResult<Self> {
        let query = candidate
            .strategy
            .compile(&candidate.query)
            .map_err(|reason| ExtractError::invalid_spec(field, reason))?;
        let coercion = candidate
            .coercion
            .as_ref()
            .map(|c| CompiledCoercion::compile(field, c))
            .transpose()?;

        Ok(Self {
            strategy: candidate.strategy,
            source: candidate.query.clone(),
            query,
            coercion,
        })
    }
}

/// The winning candidate and what it matched
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub index: usize,
    pub nodes: Vec<Node<'a>>,
}

/// Walks selector chains, counting every candidate it evaluates
#[derive(Debug, Default)]
pub struct Resolver {
    evaluations: AtomicUsize,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates evaluated so far
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Resolve a chain against a scope node.
    ///
    /// Returns the first candidate yielding at least one node. An unresolved
    /// chain is `Ok(None)` unless `required`, which raises
    /// `MissingRequiredField`.
    pub fn resolve<'a>(
        &self,
        scope: Node<'a>,
        field: &str,
        candidates: &[CompiledCandidate],
        required: bool,
        item_index: Option<usize>,
    ) -> ExtractResult<Option<Resolution<'a>>> {
        for (index, candidate) in candidates.iter().enumerate() {
            self.evaluations.fetch_add(1, Ordering::Relaxed);

            let nodes = scope.find_all(&candidate.query);
            if !nodes.is_empty() {
                debug!(
                    "Resolved {} with candidate {} ({:?} '{}'), {} node(s)",
                    field,
                    index,
                    candidate.strategy,
                    candidate.source,
                    nodes.len()
                );
                return Ok(Some(Resolution { index, nodes }));
            }
            trace!("Candidate {} for {} did not match", index, field);
        }

        if required {
            Err(ExtractError::missing_field(field, item_index))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse_document, RawDocument, DEFAULT_ANCHOR_ID};

    fn compile(candidates: &[Candidate]) -> Vec<CompiledCandidate> {
        candidates
            .iter()
            .map(|c| CompiledCandidate::compile("field", c).unwrap())
            .collect()
    }

    const HTML: &str = r#"
        <div class="card" data-testid="card">
            <span class="modern">new</span>
            <span class="legacy">old</span>
        </div>
    "#;

    #[test]
    fn test_first_match_wins_and_stops() {
        let tree = parse_document(RawDocument::markup(HTML), DEFAULT_ANCHOR_ID).unwrap();
        let chain = compile(&[Candidate::class("modern"), Candidate::class("legacy")]);
        let resolver = Resolver::new();

        let res = resolver
            .resolve(tree.root(), "label", &chain, false, None)
            .unwrap()
            .unwrap();
        assert_eq!(res.index, 0);
        assert_eq!(res.nodes.len(), 1);
        // the legacy candidate is never evaluated
        assert_eq!(resolver.evaluations(), 1);
    }

    #[test]
    fn test_falls_back_to_legacy() {
        let tree = parse_document(RawDocument::markup(HTML), DEFAULT_ANCHOR_ID).unwrap();
        let chain = compile(&[
            Candidate::test_id("label-v3"),
            Candidate::path("label"),
            Candidate::class("legacy"),
        ]);
        let resolver = Resolver::new();

        let res = resolver
            .resolve(tree.root(), "label", &chain, true, Some(0))
            .unwrap()
            .unwrap();
        assert_eq!(res.index, 2);
        assert_eq!(resolver.evaluations(), 3);
    }

    #[test]
    fn test_unresolved_optional_and_required() {
        let tree = parse_document(RawDocument::markup(HTML), DEFAULT_ANCHOR_ID).unwrap();
        let chain = compile(&[Candidate::tag("table"), Candidate::attribute("itemprop=name")]);
        let resolver = Resolver::new();

        assert!(resolver
            .resolve(tree.root(), "label", &chain, false, None)
            .unwrap()
            .is_none());

        let err = resolver
            .resolve(tree.root(), "label", &chain, true, Some(4))
            .unwrap_err();
        assert_eq!(err, ExtractError::missing_field("label", Some(4)));
    }

    #[test]
    fn test_strategy_compilation() {
        assert!(Strategy::TestId.compile("hero-title").is_ok());
        assert!(Strategy::Class.compile(".lister-item").is_ok());
        assert!(Strategy::Attribute.compile("itemprop=name").is_ok());
        assert!(Strategy::Css.compile("div[[").is_err());
        assert!(Strategy::Tag.compile("main").is_ok());
        assert!(Strategy::Tag.compile("h3.title").is_err());
        assert!(Strategy::Tag.compile("ul li").is_err());
        assert!(Strategy::Css.compile("ul li").is_ok());
        assert!(matches!(Strategy::Path.compile("a.b.*"), Ok(Query::Path(_))));
    }

    #[test]
    fn test_spec_roundtrips_through_json() {
        let spec = SelectorSpec::new(
            "title",
            vec![Candidate::path("titleText.text"), Candidate::css("h3 a")],
        )
        .required();
        let json = serde_json::to_string(&spec).unwrap();
        let back: SelectorSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
