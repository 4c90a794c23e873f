//! Compiled grammar artifacts.
//!
//! This module holds the *static* side of the engine: reading an artifact from
//! disk, validating it, and deriving the lookahead tables the matcher needs.
//! Producing artifacts is somebody else's job; this module only loads them.
//!
//! ## Artifact layout
//!
//! An artifact is a JSON document:
//!
//! ```text
//! {
//!   "format": "rulehook-grammar",
//!   "version": 1,
//!   "start": "hello",
//!   "ignore": ["\\s+"],                       (optional)
//!   "terminals": {
//!     "LPAREN": {"literal": "("},
//!     "DIGITS": {"pattern": "[0-9]+"}
//!   },
//!   "rules": {
//!     "hello": {"seq": [{"term": "LPAREN"}, {"choice": [{"rule": "hello"}, {"term": "DIGITS"}]}, ...]}
//!   }
//! }
//! ```
//!
//! Rule bodies are built from `term`, `rule`, `seq`, `choice`, `optional`,
//! `star` and `plus`.
//!
//! ## Compilation
//!
//! 1. Resolve every name to an index (unknown names are load errors).
//! 2. Compile terminal patterns, anchored at the current position.
//! 3. Compute `nullable` and FIRST sets per rule to a fixpoint.
//! 4. Annotate every node with its own `nullable`/FIRST so the matcher can
//!    decide choices and repetitions with one token of lookahead.
//! 5. Reject left recursion, which a top-down walk cannot terminate on.
//!
//! ## Invariants
//!
//! - `TermId` indexes `CompiledGrammar::terminals`, `RuleId` indexes
//!   `CompiledGrammar::rules`. Both are assigned in name order, so loading the
//!   same artifact twice yields identical ids.
//! - No terminal or ignore pattern can match the empty string.

use crate::error::LoadError;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Value of the artifact's `format` field.
pub const ARTIFACT_FORMAT: &str = "rulehook-grammar";
/// Artifact version understood by this loader.
pub const ARTIFACT_VERSION: u32 = 1;

pub(crate) type TermId = usize;
pub(crate) type RuleId = usize;

// --- Artifact schema ---------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Artifact {
    format: String,
    version: u32,
    start: String,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    terminals: BTreeMap<String, TerminalDef>,
    rules: BTreeMap<String, Expr>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TerminalDef {
    Literal(String),
    Pattern(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expr {
    Term(String),
    Rule(String),
    Seq(Vec<Expr>),
    Choice(Vec<Expr>),
    Optional(Box<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
}

// --- Compiled form -----------------------------------------------------------

/// How a terminal recognizes its text.
#[derive(Debug)]
pub(crate) enum Matcher {
    Literal(String),
    /// Anchored with `^(?:...)`; run against the input slice at the position.
    Pattern(Regex),
}

#[derive(Debug)]
pub(crate) struct Terminal {
    pub name: String,
    pub matcher: Matcher,
}

impl Terminal {
    /// Length in bytes of this terminal's match at the start of `rest`.
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        match &self.matcher {
            Matcher::Literal(lit) => rest.starts_with(lit.as_str()).then_some(lit.len()),
            Matcher::Pattern(re) => re.find(rest).map(|m| m.end()).filter(|&len| len > 0),
        }
    }
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Term(TermId),
    Rule(RuleId),
    Seq(Vec<Node>),
    Choice(Vec<Node>),
    Optional(Box<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
}

/// A rule body node annotated with its lookahead facts.
#[derive(Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    /// Whether this node can succeed without consuming a token.
    pub nullable: bool,
    /// Terminals that can start this node (sorted, unique).
    pub first: Vec<TermId>,
}

#[derive(Debug)]
pub(crate) struct Rule {
    pub name: String,
    pub body: Node,
}

/// A loaded, validated grammar. Read-only once built; share it with `Arc`.
#[derive(Debug)]
pub struct CompiledGrammar {
    source: Option<PathBuf>,
    pub(crate) start: RuleId,
    pub(crate) ignore: Vec<Regex>,
    pub(crate) terminals: Vec<Terminal>,
    pub(crate) rules: Vec<Rule>,
}

impl CompiledGrammar {
    /// Read and compile the artifact at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut grammar = Self::from_json(&text)?;
        grammar.source = Some(path.to_path_buf());

        debug_log!(
            "[grammar:load] path={} rules={} terminals={} start=\"{}\"",
            path.display(),
            grammar.rules.len(),
            grammar.terminals.len(),
            grammar.start_rule()
        );
        Ok(grammar)
    }

    /// Compile an artifact held in memory.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let artifact: Artifact = serde_json::from_str(text)?;
        compile(artifact)
    }

    /// File the grammar was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Name of the rule a match starts from.
    pub fn start_rule(&self) -> &str {
        &self.rules[self.start].name
    }

    /// Rule names in id order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Terminal names in id order.
    pub fn terminal_names(&self) -> impl Iterator<Item = &str> {
        self.terminals.iter().map(|t| t.name.as_str())
    }
}

// --- Compilation -------------------------------------------------------------

/// Rule body with names resolved but no lookahead facts yet.
enum Shape {
    Term(TermId),
    Rule(RuleId),
    Seq(Vec<Shape>),
    Choice(Vec<Shape>),
    Optional(Box<Shape>),
    Star(Box<Shape>),
    Plus(Box<Shape>),
}

struct Names<'a> {
    rules: HashMap<&'a str, RuleId>,
    terminals: HashMap<&'a str, TermId>,
}

fn compile(artifact: Artifact) -> Result<CompiledGrammar, LoadError> {
    if artifact.format != ARTIFACT_FORMAT {
        return Err(LoadError::Format(artifact.format));
    }
    if artifact.version != ARTIFACT_VERSION {
        return Err(LoadError::Version { found: artifact.version, expected: ARTIFACT_VERSION });
    }

    let names = Names {
        rules: artifact.rules.keys().enumerate().map(|(id, name)| (name.as_str(), id)).collect(),
        terminals: artifact.terminals.keys().enumerate().map(|(id, name)| (name.as_str(), id)).collect(),
    };

    let start = *names
        .rules
        .get(artifact.start.as_str())
        .ok_or_else(|| LoadError::MissingStart(artifact.start.clone()))?;

    let terminals = artifact
        .terminals
        .iter()
        .map(|(name, def)| compile_terminal(name, def))
        .collect::<Result<Vec<_>, _>>()?;

    let ignore = artifact
        .ignore
        .iter()
        .enumerate()
        .map(|(index, pat)| compile_ignore(index, pat))
        .collect::<Result<Vec<_>, _>>()?;

    let shapes = artifact
        .rules
        .iter()
        .map(|(name, expr)| resolve_shape(name, expr, &names))
        .collect::<Result<Vec<_>, _>>()?;

    let (rule_nullable, rule_first) = rule_tables(&shapes);

    let rule_names: Vec<&String> = artifact.rules.keys().collect();
    if let Some(id) = find_left_recursion(&shapes, &rule_nullable) {
        return Err(LoadError::LeftRecursion(rule_names[id].clone()));
    }

    let rules = shapes
        .into_iter()
        .zip(rule_names)
        .map(|(shape, name)| Rule { name: name.clone(), body: annotate(shape, &rule_nullable, &rule_first) })
        .collect();

    Ok(CompiledGrammar { source: None, start, ignore, terminals, rules })
}

fn compile_terminal(name: &str, def: &TerminalDef) -> Result<Terminal, LoadError> {
    let matcher = match def {
        TerminalDef::Literal(lit) if lit.is_empty() => return Err(LoadError::EmptyMatch(name.to_string())),
        TerminalDef::Literal(lit) => Matcher::Literal(lit.clone()),
        TerminalDef::Pattern(pat) => Matcher::Pattern(compile_pattern(name, pat)?),
    };
    Ok(Terminal { name: name.to_string(), matcher })
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, LoadError> {
    let re = anchored(pattern).map_err(|source| LoadError::BadPattern { terminal: name.to_string(), source })?;
    if re.is_match("") {
        return Err(LoadError::EmptyMatch(name.to_string()));
    }
    Ok(re)
}

fn compile_ignore(index: usize, pattern: &str) -> Result<Regex, LoadError> {
    let re = anchored(pattern).map_err(|source| LoadError::BadIgnore { index, source })?;
    if re.is_match("") {
        return Err(LoadError::EmptyIgnore(index));
    }
    Ok(re)
}

fn resolve_shape(rule: &str, expr: &Expr, names: &Names) -> Result<Shape, LoadError> {
    let many = |items: &[Expr]| items.iter().map(|e| resolve_shape(rule, e, names)).collect::<Result<Vec<_>, _>>();
    let one = |inner: &Expr| resolve_shape(rule, inner, names).map(Box::new);

    Ok(match expr {
        Expr::Term(name) => Shape::Term(*names.terminals.get(name.as_str()).ok_or_else(|| {
            LoadError::UnknownTerminal { rule: rule.to_string(), terminal: name.clone() }
        })?),
        Expr::Rule(name) => Shape::Rule(
            *names
                .rules
                .get(name.as_str())
                .ok_or_else(|| LoadError::UnknownRule { rule: rule.to_string(), target: name.clone() })?,
        ),
        Expr::Seq(items) => Shape::Seq(many(items.as_slice())?),
        Expr::Choice(items) => Shape::Choice(many(items.as_slice())?),
        Expr::Optional(inner) => Shape::Optional(one(&**inner)?),
        Expr::Star(inner) => Shape::Star(one(&**inner)?),
        Expr::Plus(inner) => Shape::Plus(one(&**inner)?),
    })
}

/// `(nullable, first)` of `shape` given the current per-rule tables.
fn analyze(shape: &Shape, nullable: &[bool], first: &[BTreeSet<TermId>]) -> (bool, BTreeSet<TermId>) {
    match shape {
        Shape::Term(t) => (false, BTreeSet::from([*t])),
        Shape::Rule(r) => (nullable[*r], first[*r].clone()),
        Shape::Seq(items) => {
            let mut set = BTreeSet::new();
            for item in items {
                let (n, f) = analyze(item, nullable, first);
                set.extend(f);
                if !n {
                    return (false, set);
                }
            }
            (true, set)
        }
        Shape::Choice(items) => {
            let mut set = BTreeSet::new();
            let mut any_nullable = false;
            for item in items {
                let (n, f) = analyze(item, nullable, first);
                any_nullable |= n;
                set.extend(f);
            }
            (any_nullable, set)
        }
        Shape::Optional(inner) | Shape::Star(inner) => (true, analyze(inner, nullable, first).1),
        Shape::Plus(inner) => analyze(inner, nullable, first),
    }
}

/// Per-rule `nullable` and FIRST sets, iterated to a fixpoint.
fn rule_tables(shapes: &[Shape]) -> (Vec<bool>, Vec<BTreeSet<TermId>>) {
    let mut nullable = vec![false; shapes.len()];
    let mut first = vec![BTreeSet::new(); shapes.len()];

    loop {
        let mut changed = false;
        for (id, shape) in shapes.iter().enumerate() {
            let (n, f) = analyze(shape, &nullable, &first);
            if n != nullable[id] || f != first[id] {
                nullable[id] = n;
                first[id] = f;
                changed = true;
            }
        }
        if !changed {
            return (nullable, first);
        }
    }
}

/// Rules `shape` may enter before consuming any token.
fn leading_rules(shape: &Shape, nullable: &[bool], out: &mut Vec<RuleId>) {
    match shape {
        Shape::Term(_) => {}
        Shape::Rule(r) => out.push(*r),
        Shape::Seq(items) => {
            for item in items {
                leading_rules(item, nullable, out);
                if !analyze_nullable(item, nullable) {
                    break;
                }
            }
        }
        Shape::Choice(items) => items.iter().for_each(|item| leading_rules(item, nullable, out)),
        Shape::Optional(inner) | Shape::Star(inner) | Shape::Plus(inner) => leading_rules(inner, nullable, out),
    }
}

fn analyze_nullable(shape: &Shape, nullable: &[bool]) -> bool {
    match shape {
        Shape::Term(_) => false,
        Shape::Rule(r) => nullable[*r],
        Shape::Seq(items) => items.iter().all(|i| analyze_nullable(i, nullable)),
        Shape::Choice(items) => items.iter().any(|i| analyze_nullable(i, nullable)),
        Shape::Optional(_) | Shape::Star(_) => true,
        Shape::Plus(inner) => analyze_nullable(inner, nullable),
    }
}

/// First rule (by id) that can reach itself without consuming input.
fn find_left_recursion(shapes: &[Shape], nullable: &[bool]) -> Option<RuleId> {
    let edges: Vec<Vec<RuleId>> = shapes
        .iter()
        .map(|shape| {
            let mut out = Vec::new();
            leading_rules(shape, nullable, &mut out);
            out
        })
        .collect();

    (0..shapes.len()).find(|&root| {
        let mut seen = vec![false; shapes.len()];
        let mut stack = edges[root].clone();
        while let Some(r) = stack.pop() {
            if r == root {
                return true;
            }
            if !seen[r] {
                seen[r] = true;
                stack.extend(edges[r].iter().copied());
            }
        }
        false
    })
}

/// Attach lookahead facts bottom-up.
fn annotate(shape: Shape, nullable: &[bool], first: &[BTreeSet<TermId>]) -> Node {
    let node = |kind, n, f: BTreeSet<TermId>| Node { kind, nullable: n, first: f.into_iter().collect() };

    match shape {
        Shape::Term(t) => node(NodeKind::Term(t), false, BTreeSet::from([t])),
        Shape::Rule(r) => node(NodeKind::Rule(r), nullable[r], first[r].clone()),
        Shape::Seq(items) => {
            let children: Vec<Node> = items.into_iter().map(|s| annotate(s, nullable, first)).collect();
            let mut set = BTreeSet::new();
            let mut all_nullable = true;
            for child in &children {
                set.extend(child.first.iter().copied());
                if !child.nullable {
                    all_nullable = false;
                    break;
                }
            }
            node(NodeKind::Seq(children), all_nullable, set)
        }
        Shape::Choice(items) => {
            let children: Vec<Node> = items.into_iter().map(|s| annotate(s, nullable, first)).collect();
            let any_nullable = children.iter().any(|c| c.nullable);
            let set = children.iter().flat_map(|c| c.first.iter().copied()).collect();
            node(NodeKind::Choice(children), any_nullable, set)
        }
        Shape::Optional(inner) => {
            let child = annotate(*inner, nullable, first);
            let set = child.first.iter().copied().collect();
            node(NodeKind::Optional(Box::new(child)), true, set)
        }
        Shape::Star(inner) => {
            let child = annotate(*inner, nullable, first);
            let set = child.first.iter().copied().collect();
            node(NodeKind::Star(Box::new(child)), true, set)
        }
        Shape::Plus(inner) => {
            let child = annotate(*inner, nullable, first);
            let (n, set) = (child.nullable, child.first.iter().copied().collect());
            node(NodeKind::Plus(Box::new(child)), n, set)
        }
    }
}
