// src/tree.rs
//! Segment trie used to resolve a request path to a registered route.
//!
//! Pattern grammar:
//! - literal segments separated by `/`
//! - `<name>` captures one segment, possibly empty
//! - `<name:regex>` captures one segment the anchored `regex` accepts
//! - a trailing `*` captures the remainder of the path, including nothing.
//!   Text before it in the same segment is a literal prefix: `/static*`
//!   matches `/static`, `/static/` and `/static/css/a.css`, capturing what
//!   follows `static`.
//!
//! Literals are compared after percent-decoding on both sides.
//!
//! At every node the children are tried in a fixed order: the static literal,
//! then constrained parameters in registration order, then the named
//! parameter, then the catch-alls, longest prefix first. The first branch
//! that matches the whole path wins, so a literal route can never be shadowed
//! by a parameter sibling.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouteError;
use crate::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Constrained(&'a str, &'a str),
    CatchAll(&'a str),
}

/// A terminal entry: the stored value plus the parameter names of the
/// pattern that produced it, by position. The catch-all is named `""`.
#[derive(Debug)]
pub struct Leaf<T> {
    pub value: T,
    pub names: Arc<[String]>,
}

#[derive(Debug)]
struct Constrained<T> {
    source: String,
    regex: Regex,
    node: Node<T>,
}

#[derive(Debug)]
struct CatchAll<T> {
    prefix: String,
    leaf: Leaf<T>,
}

#[derive(Debug)]
struct Node<T> {
    statics: HashMap<String, Node<T>>,
    constrained: Vec<Constrained<T>>,
    param: Option<Box<Node<T>>>,
    // longest prefix first
    catch_all: Vec<CatchAll<T>>,
    leaf: Option<Leaf<T>>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            statics: HashMap::new(),
            constrained: Vec::new(),
            param: None,
            catch_all: Vec::new(),
            leaf: None,
        }
    }

    fn find<'n>(&'n self, rest: &str, index: usize, values: &mut [String]) -> Option<&'n Leaf<T>> {
        let (raw, tail) = match memchr::memchr(b'/', rest.as_bytes()) {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        let segment = decode(raw);

        if let Some(child) = self.statics.get(&*segment) {
            if let Some(leaf) = child.descend(tail, index, values) {
                return Some(leaf);
            }
        }

        for c in &self.constrained {
            if c.regex.is_match(&segment) {
                capture(values, index, &segment);
                if let Some(leaf) = c.node.descend(tail, index + 1, values) {
                    return Some(leaf);
                }
            }
        }

        if let Some(child) = &self.param {
            capture(values, index, &segment);
            if let Some(leaf) = child.descend(tail, index + 1, values) {
                return Some(leaf);
            }
        }

        if self.catch_all.is_empty() {
            return None;
        }
        let remainder = decode(rest);
        for c in &self.catch_all {
            if let Some(captured) = remainder.strip_prefix(c.prefix.as_str()) {
                capture(values, index, captured);
                return Some(&c.leaf);
            }
        }
        None
    }

    fn descend<'n>(
        &'n self,
        tail: Option<&str>,
        index: usize,
        values: &mut [String],
    ) -> Option<&'n Leaf<T>> {
        match tail {
            None => self.leaf.as_ref(),
            Some(rest) => self.find(rest, index, values),
        }
    }

    fn count(&self) -> usize {
        let own = self.leaf.is_some() as usize + self.catch_all.len();
        own + self.statics.values().map(Node::count).sum::<usize>()
            + self.constrained.iter().map(|c| c.node.count()).sum::<usize>()
            + self.param.as_ref().map_or(0, |p| p.count())
    }
}

/// Route trie for a single HTTP method.
///
/// Built during setup and read-only afterwards; `get` takes `&self` and needs
/// no locking.
#[derive(Debug)]
pub struct PathTree<T> {
    method: Method,
    root: Node<T>,
}

impl<T> PathTree<T> {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            root: Node::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Number of routes stored in this tree.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `value` under `pattern` and returns how many parameters the
    /// pattern captures.
    pub fn add(&mut self, pattern: &str, value: T) -> Result<usize, RouteError> {
        let raw = split_pattern(pattern)?;
        let mut segments = Vec::with_capacity(raw.len());
        for (i, seg) in raw.iter().enumerate() {
            let parsed = parse_segment(seg, pattern)?;
            if matches!(parsed, Segment::CatchAll(_)) && i + 1 != raw.len() {
                return Err(RouteError::CatchAllNotLast {
                    pattern: pattern.to_string(),
                });
            }
            segments.push(parsed);
        }

        let mut names: Vec<String> = Vec::new();
        for seg in &segments {
            match seg {
                Segment::Param(name) | Segment::Constrained(name, _) => {
                    if names.iter().any(|n| n == name) {
                        return Err(RouteError::invalid(
                            pattern,
                            format!("parameter <{name}> appears more than once"),
                        ));
                    }
                    names.push(name.to_string());
                }
                Segment::CatchAll(_) => names.push(String::new()),
                Segment::Static(_) => {}
            }
        }
        let count = names.len();
        let leaf = Leaf {
            value,
            names: names.into(),
        };

        let method = self.method;
        let mut node = &mut self.root;
        for seg in segments {
            node = match seg {
                Segment::Static(lit) => node
                    .statics
                    .entry(decode(lit).into_owned())
                    .or_insert_with(Node::new),
                Segment::Param(_) => &mut **node.param.get_or_insert_with(|| Box::new(Node::new())),
                Segment::Constrained(_, source) => {
                    let idx = match node.constrained.iter().position(|c| c.source == source) {
                        Some(idx) => idx,
                        None => {
                            let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
                                RouteError::InvalidConstraint {
                                    pattern: pattern.to_string(),
                                    source: e,
                                }
                            })?;
                            node.constrained.push(Constrained {
                                source: source.to_string(),
                                regex,
                                node: Node::new(),
                            });
                            node.constrained.len() - 1
                        }
                    };
                    &mut node.constrained[idx].node
                }
                Segment::CatchAll(prefix) => {
                    let prefix = decode(prefix).into_owned();
                    if node.catch_all.iter().any(|c| c.prefix == prefix) {
                        return Err(RouteError::Duplicate {
                            method,
                            pattern: pattern.to_string(),
                        });
                    }
                    let at = node
                        .catch_all
                        .iter()
                        .position(|c| c.prefix.len() < prefix.len())
                        .unwrap_or(node.catch_all.len());
                    node.catch_all.insert(at, CatchAll { prefix, leaf });
                    return Ok(count);
                }
            };
        }

        if node.leaf.is_some() {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.to_string(),
            });
        }
        node.leaf = Some(leaf);
        Ok(count)
    }

    /// Resolves `path`, writing captured values into `values` by parameter
    /// position. `values` must hold at least as many slots as the largest
    /// parameter count registered.
    pub fn get(&self, path: &str, values: &mut [String]) -> Option<(&T, &Arc<[String]>)> {
        let rest = path.strip_prefix('/')?;
        self.root
            .find(rest, 0, values)
            .map(|leaf| (&leaf.value, &leaf.names))
    }
}

fn capture(values: &mut [String], index: usize, value: &str) {
    debug_assert!(index < values.len(), "parameter buffer too small");
    if let Some(slot) = values.get_mut(index) {
        slot.clear();
        slot.push_str(value);
    }
}

fn decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Splits a pattern on `/`, ignoring separators inside `<...>`.
fn split_pattern(pattern: &str) -> Result<Vec<&str>, RouteError> {
    let body = pattern
        .strip_prefix('/')
        .ok_or_else(|| RouteError::invalid(pattern, "pattern must start with '/'"))?;

    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b'/' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RouteError::invalid(pattern, "unclosed parameter"));
    }
    segments.push(&body[start..]);
    Ok(segments)
}

fn parse_segment<'a>(seg: &'a str, pattern: &str) -> Result<Segment<'a>, RouteError> {
    if seg.starts_with('<') && seg.ends_with('>') && seg.len() >= 2 {
        let inner = &seg[1..seg.len() - 1];
        let (name, constraint) = match inner.find(':') {
            Some(i) => (&inner[..i], &inner[i + 1..]),
            None => (inner, ""),
        };
        if name.is_empty() {
            return Err(RouteError::invalid(pattern, "parameter name is empty"));
        }
        return Ok(if constraint.is_empty() {
            Segment::Param(name)
        } else {
            Segment::Constrained(name, constraint)
        });
    }
    if seg.contains('<') || seg.contains('>') {
        return Err(RouteError::invalid(
            pattern,
            "a parameter must occupy a whole segment",
        ));
    }
    match seg.strip_suffix('*') {
        Some(prefix) if prefix.contains('*') => Err(RouteError::invalid(
            pattern,
            "a segment holds at most one catch-all",
        )),
        Some(prefix) => Ok(Segment::CatchAll(prefix)),
        None => Ok(Segment::Static(seg)),
    }
}
