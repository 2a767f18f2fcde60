//! A compact XPath 1.0 subset evaluator.
//!
//! Supports what configuration scopes are written with: absolute and
//! relative location paths, `//`, the abbreviated steps `.`, `..`, `@name`
//! and `@*`, the common axes, unions, and predicates built from positions,
//! comparisons, `and`/`or`/`not()`, `contains()` and `starts-with()`.
//! Anything outside this subset is rejected at compile time.

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{XmlError, XmlResult};
use std::collections::HashMap;

/// A node selected by an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    /// The document node, parent of the root element.
    Document,
    /// An element, text or comment node.
    Node(NodeId),
    /// The attribute at the given index of an element.
    Attribute(NodeId, usize),
}

impl Item {
    /// Returns the node id if this item is an element.
    pub fn as_element(&self, doc: &Document) -> Option<NodeId> {
        match *self {
            Item::Node(id) if doc.element(id).is_some() => Some(id),
            _ => None,
        }
    }
}

/// A compiled selector.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    paths: Vec<Path>,
}

impl XPath {
    /// Compiles a selector.
    pub fn compile(selector: &str) -> XmlResult<Self> {
        let tokens = tokenize(selector).map_err(|reason| XmlError::invalid_xpath(selector, reason))?;
        if tokens.is_empty() {
            return Err(XmlError::invalid_xpath(selector, "empty expression"));
        }

        let mut parser = Parser { tokens, pos: 0 };
        let paths = parser
            .parse_union()
            .map_err(|reason| XmlError::invalid_xpath(selector, reason))?;
        if let Some(token) = parser.peek() {
            return Err(XmlError::invalid_xpath(
                selector,
                format!("unexpected token {:?}", token),
            ));
        }

        Ok(Self {
            source: selector.to_string(),
            paths,
        })
    }

    /// Returns the selector text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the selector against a document, starting at the
    /// document node. Results are in document order without duplicates.
    pub fn evaluate(&self, doc: &Document) -> Vec<Item> {
        let ctx = EvalContext::new(doc);
        let focus = Focus {
            item: Item::Document,
            position: 1,
            size: 1,
        };
        let mut items = Vec::new();
        for path in &self.paths {
            items.extend(ctx.eval_path(path, focus.item));
        }
        ctx.sort_unique(items)
    }
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "self" => Axis::SelfAxis,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }

    fn is_reverse(self) -> bool {
        matches!(self, Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    Text,
    Comment,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    StartsWith(Box<Expr>, Box<Expr>),
    Last,
    Position,
    Literal(String),
    Number(f64),
    Path(Path),
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Pipe,
    Dot,
    DotDot,
    DoubleColon,
    Star,
    Name(String),
    Literal(String),
    Number(f64),
    Op(CmpOp),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            ':' if next == Some(':') => {
                tokens.push(Token::DoubleColon);
                i += 2;
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Le));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op(CmpOp::Lt));
                i += 1;
            }
            '>' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ge));
                i += 2;
            }
            '>' => {
                tokens.push(Token::Op(CmpOp::Gt));
                i += 1;
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let (number, end) = read_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let (number, end) = read_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            c if is_name_start(c) => {
                let mut end = i + 1;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                // Qualified name: a single colon followed by a name or `*`.
                if end + 1 < chars.len()
                    && chars[end] == ':'
                    && (is_name_start(chars[end + 1]) || chars[end + 1] == '*')
                {
                    end += 2;
                    if chars[end - 1] != '*' {
                        while end < chars.len() && is_name_char(chars[end]) {
                            end += 1;
                        }
                    }
                }
                tokens.push(Token::Name(chars[i..end].iter().collect()));
                i = end;
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), String> {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() && (chars[end].is_ascii_digit() || (chars[end] == '.' && !seen_dot)) {
        if chars[end] == '.' {
            // `1..` is a number followed by `..`; stop before the pair.
            if chars.get(end + 1) == Some(&'.') {
                break;
            }
            seen_dot = true;
        }
        end += 1;
    }
    let text: String = chars[start..end].iter().collect();
    text.parse::<f64>()
        .map(|number| (number, end))
        .map_err(|_| format!("invalid number '{}'", text))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = Result<T, String>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?}, found end of expression", expected)),
        }
    }

    fn peek_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    fn parse_union(&mut self) -> ParseResult<Vec<Path>> {
        let mut paths = vec![self.parse_path()?];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            paths.push(self.parse_path()?);
        }
        Ok(paths)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn parse_path(&mut self) -> ParseResult<Path> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                if !self.starts_step() {
                    return Ok(Path {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }

        Ok(Path { absolute, steps })
    }

    fn parse_step(&mut self) -> ParseResult<Step> {
        match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let axis = match (self.peek(), self.peek_at(1)) {
            (Some(Token::At), _) => {
                self.advance();
                Axis::Attribute
            }
            (Some(Token::Name(name)), Some(Token::DoubleColon)) => {
                let axis = Axis::from_name(name).ok_or_else(|| format!("unsupported axis '{}'", name))?;
                self.advance();
                self.advance();
                axis
            }
            _ => Axis::Child,
        };

        let test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> ParseResult<NodeTest> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(NodeTest::Name(name));
                }
                let test = match name.as_str() {
                    "text" => NodeTest::Text,
                    "node" => NodeTest::Node,
                    "comment" => NodeTest::Comment,
                    other => return Err(format!("unsupported function '{}'", other)),
                };
                self.advance();
                self.expect(Token::RParen)?;
                Ok(test)
            }
            Some(token) => Err(format!("expected a node test, found {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_name("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.peek_name("and") {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_primary()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_call_args(&mut self, count: usize) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.parse_or()?);
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                args.push(self.parse_or()?);
            }
        }
        self.expect(Token::RParen)?;
        if args.len() != count {
            return Err(format!(
                "function expects {} argument(s), got {}",
                count,
                args.len()
            ));
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match (self.peek().cloned(), self.peek_at(1)) {
            (Some(Token::Literal(text)), _) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            (Some(Token::Number(number)), _) => {
                self.advance();
                Ok(Expr::Number(number))
            }
            (Some(Token::LParen), _) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            (Some(Token::Name(name)), Some(Token::LParen)) => match name.as_str() {
                "text" | "node" | "comment" => Ok(Expr::Path(self.parse_path()?)),
                "last" => {
                    self.advance();
                    self.parse_call_args(0)?;
                    Ok(Expr::Last)
                }
                "position" => {
                    self.advance();
                    self.parse_call_args(0)?;
                    Ok(Expr::Position)
                }
                "not" => {
                    self.advance();
                    let mut args = self.parse_call_args(1)?;
                    Ok(Expr::Not(Box::new(args.remove(0))))
                }
                "contains" | "starts-with" => {
                    self.advance();
                    let mut args = self.parse_call_args(2)?;
                    let needle = Box::new(args.remove(1));
                    let haystack = Box::new(args.remove(0));
                    if name == "contains" {
                        Ok(Expr::Contains(haystack, needle))
                    } else {
                        Ok(Expr::StartsWith(haystack, needle))
                    }
                }
                other => Err(format!("unsupported function '{}'", other)),
            },
            (Some(_), _) => Ok(Expr::Path(self.parse_path()?)),
            (None, _) => Err("unexpected end of expression".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Focus {
    item: Item,
    position: usize,
    size: usize,
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Item>),
    Text(String),
    Number(f64),
    Bool(bool),
}

struct EvalContext<'d> {
    doc: &'d Document,
    ranks: HashMap<NodeId, usize>,
}

impl<'d> EvalContext<'d> {
    fn new(doc: &'d Document) -> Self {
        let ranks = doc
            .preorder()
            .into_iter()
            .enumerate()
            .map(|(rank, id)| (id, rank + 1))
            .collect();
        Self { doc, ranks }
    }

    fn order_key(&self, item: &Item) -> (usize, usize) {
        match *item {
            Item::Document => (0, 0),
            Item::Node(id) => (self.ranks.get(&id).copied().unwrap_or(usize::MAX), 0),
            Item::Attribute(id, index) => {
                (self.ranks.get(&id).copied().unwrap_or(usize::MAX), index + 1)
            }
        }
    }

    fn sort_unique(&self, mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by_key(|item| self.order_key(item));
        items.dedup();
        items
    }

    fn eval_path(&self, path: &Path, context: Item) -> Vec<Item> {
        let mut current = vec![if path.absolute { Item::Document } else { context }];
        for step in &path.steps {
            let mut next = Vec::new();
            for &item in &current {
                let candidates: Vec<Item> = self
                    .axis(step.axis, item)
                    .into_iter()
                    .filter(|candidate| self.matches(step.axis, &step.test, candidate))
                    .collect();
                next.extend(self.apply_predicates(candidates, &step.predicates));
            }
            current = self.sort_unique(next);
        }
        current
    }

    /// Candidates in axis order: nearest first for reverse axes.
    fn axis(&self, axis: Axis, item: Item) -> Vec<Item> {
        let doc = self.doc;
        let nodes = |ids: Vec<NodeId>| ids.into_iter().map(Item::Node).collect::<Vec<_>>();
        match (axis, item) {
            (Axis::SelfAxis, _) => vec![item],

            (Axis::Child, Item::Document) => vec![Item::Node(doc.root())],
            (Axis::Child, Item::Node(id)) => nodes(doc.children(id).to_vec()),

            (Axis::Descendant, Item::Document) => nodes(doc.preorder()),
            (Axis::Descendant, Item::Node(id)) => nodes(doc.descendants(id)),
            (Axis::DescendantOrSelf, Item::Document) => {
                let mut all = vec![Item::Document];
                all.extend(nodes(doc.preorder()));
                all
            }
            (Axis::DescendantOrSelf, Item::Node(id)) => {
                let mut all = vec![item];
                all.extend(nodes(doc.descendants(id)));
                all
            }

            (Axis::Parent, Item::Node(id)) => {
                vec![doc.parent(id).map(Item::Node).unwrap_or(Item::Document)]
            }
            (Axis::Parent, Item::Attribute(id, _)) => vec![Item::Node(id)],

            (Axis::Ancestor | Axis::AncestorOrSelf, Item::Document) => {
                if axis == Axis::AncestorOrSelf {
                    vec![item]
                } else {
                    Vec::new()
                }
            }
            (Axis::Ancestor | Axis::AncestorOrSelf, Item::Node(id) | Item::Attribute(id, _)) => {
                let mut chain = Vec::new();
                if axis == Axis::AncestorOrSelf {
                    chain.push(item);
                }
                if matches!(item, Item::Attribute(..)) {
                    chain.push(Item::Node(id));
                }
                chain.extend(nodes(doc.ancestors(id)));
                chain.push(Item::Document);
                chain
            }

            (Axis::Attribute, Item::Node(id)) => match doc.element(id) {
                Some(element) => (0..element.attributes.len())
                    .map(|index| Item::Attribute(id, index))
                    .collect(),
                None => Vec::new(),
            },

            _ => Vec::new(),
        }
    }

    fn matches(&self, axis: Axis, test: &NodeTest, item: &Item) -> bool {
        match *item {
            Item::Document => matches!(test, NodeTest::Node),
            Item::Attribute(id, index) => {
                if axis != Axis::Attribute {
                    return matches!(test, NodeTest::Node);
                }
                match test {
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Name(name) => self
                        .doc
                        .element(id)
                        .and_then(|element| element.attributes.get(index))
                        .is_some_and(|(key, _)| key == name),
                    NodeTest::Text | NodeTest::Comment => false,
                }
            }
            Item::Node(id) => match (test, self.doc.kind(id)) {
                (NodeTest::Node, _) => true,
                (NodeTest::Any, NodeKind::Element(_)) => axis != Axis::Attribute,
                (NodeTest::Name(name), NodeKind::Element(element)) => {
                    axis != Axis::Attribute && &element.name == name
                }
                (NodeTest::Text, NodeKind::Text(_)) => true,
                (NodeTest::Comment, NodeKind::Comment(_)) => true,
                _ => false,
            },
        }
    }

    fn apply_predicates(&self, mut items: Vec<Item>, predicates: &[Expr]) -> Vec<Item> {
        for predicate in predicates {
            let size = items.len();
            items = items
                .into_iter()
                .enumerate()
                .filter(|&(index, item)| {
                    let focus = Focus {
                        item,
                        position: index + 1,
                        size,
                    };
                    match self.eval(predicate, focus) {
                        Value::Number(number) => number == (index + 1) as f64,
                        other => self.truthy(&other),
                    }
                })
                .map(|(_, item)| item)
                .collect();
        }
        items
    }

    fn eval(&self, expr: &Expr, focus: Focus) -> Value {
        match expr {
            Expr::Or(left, right) => Value::Bool(
                self.truthy(&self.eval(left, focus)) || self.truthy(&self.eval(right, focus)),
            ),
            Expr::And(left, right) => Value::Bool(
                self.truthy(&self.eval(left, focus)) && self.truthy(&self.eval(right, focus)),
            ),
            Expr::Not(inner) => Value::Bool(!self.truthy(&self.eval(inner, focus))),
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, focus);
                let right = self.eval(right, focus);
                Value::Bool(self.compare(*op, &left, &right))
            }
            Expr::Contains(haystack, needle) => {
                let haystack = self.string(&self.eval(haystack, focus));
                let needle = self.string(&self.eval(needle, focus));
                Value::Bool(haystack.contains(&needle))
            }
            Expr::StartsWith(haystack, prefix) => {
                let haystack = self.string(&self.eval(haystack, focus));
                let prefix = self.string(&self.eval(prefix, focus));
                Value::Bool(haystack.starts_with(&prefix))
            }
            Expr::Last => Value::Number(focus.size as f64),
            Expr::Position => Value::Number(focus.position as f64),
            Expr::Literal(text) => Value::Text(text.clone()),
            Expr::Number(number) => Value::Number(*number),
            Expr::Path(path) => Value::Nodes(self.eval_path(path, focus.item)),
        }
    }

    fn item_string(&self, item: &Item) -> String {
        match *item {
            Item::Document => self.doc.string_value(self.doc.root()),
            Item::Node(id) => self.doc.string_value(id),
            Item::Attribute(id, index) => self
                .doc
                .element(id)
                .and_then(|element| element.attributes.get(index))
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }

    fn truthy(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(items) => !items.is_empty(),
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => *number != 0.0 && !number.is_nan(),
            Value::Bool(flag) => *flag,
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(items) => items
                .first()
                .map(|item| self.item_string(item))
                .unwrap_or_default(),
            Value::Text(text) => text.clone(),
            Value::Number(number) => format_number(*number),
            Value::Bool(flag) => flag.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(number) => *number,
            Value::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.string(other)),
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(items), other) => items
                .iter()
                .any(|item| self.compare(op, &Value::Text(self.item_string(item)), other)),
            (other, Value::Nodes(items)) => items
                .iter()
                .any(|item| self.compare(op, other, &Value::Text(self.item_string(item)))),
            _ => match op {
                CmpOp::Eq | CmpOp::Ne => {
                    let equal = match (left, right) {
                        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                            self.truthy(left) == self.truthy(right)
                        }
                        (Value::Number(_), _) | (_, Value::Number(_)) => {
                            self.number(left) == self.number(right)
                        }
                        _ => self.string(left) == self.string(right),
                    };
                    equal == (op == CmpOp::Eq)
                }
                CmpOp::Lt => self.number(left) < self.number(right),
                CmpOp::Le => self.number(left) <= self.number(right),
                CmpOp::Gt => self.number(left) > self.number(right),
                CmpOp::Ge => self.number(left) >= self.number(right),
            },
        }
    }
}

fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}
