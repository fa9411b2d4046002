//! Grammar-derived textual form of trees: `Plus(Literal(1.5), Var("x"))`.
//!
//! Constructors without slots print bare, collections print as `[a, b]` and
//! primitive values use [`Value`]'s display. [`parse_tree`] reads the same
//! form back, guided by the slot types of each production.

use std::fmt;

use super::tree::{Child, Node, NodeId, Tree};
use crate::error::{Result, SynthgpError};
use crate::grammar::{GrammarModel, Metahandler, Param, Slot, SymbolId};
use crate::types::Value;

pub struct TreeText<'a> {
    tree: &'a Tree,
    grammar: &'a GrammarModel,
}

impl Tree {
    pub fn display<'a>(&'a self, grammar: &'a GrammarModel) -> TreeText<'a> {
        TreeText {
            tree: self,
            grammar,
        }
    }

    pub fn to_text(&self, grammar: &GrammarModel) -> String {
        self.display(grammar).to_string()
    }
}

impl TreeText<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = self.tree.node(id);
        f.write_str(self.grammar.production(node.production()).name())?;
        if node.children().is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match child {
                Child::Node(c) => self.write_node(f, *c)?,
                Child::List(cs) => {
                    f.write_str("[")?;
                    for (j, c) in cs.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        self.write_node(f, *c)?;
                    }
                    f.write_str("]")?;
                }
                Child::Value(v) => write!(f, "{}", v)?,
            }
        }
        f.write_str(")")
    }
}

impl fmt::Display for TreeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.tree.root())
    }
}

/// Parses the textual form of a tree expanding `symbol`.
pub fn parse_tree(grammar: &GrammarModel, symbol: SymbolId, text: &str) -> Result<Tree> {
    let mut parser = Parser {
        src: text,
        pos: 0,
        grammar,
        arena: Vec::new(),
        nesting: 0,
    };
    parser.parse_node(&[symbol], None)?;
    parser.skip_ws();
    if parser.pos < text.len() {
        return Err(parser.error("trailing input after tree"));
    }
    Ok(Tree::from_arena(parser.arena))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    grammar: &'a GrammarModel,
    arena: Vec<Node>,
    nesting: usize,
}

/// Deepest constructor nesting accepted from text.
pub const MAX_NESTING: usize = 256;

const DELIMITERS: &[char] = &['(', ')', '[', ']', ','];

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> SynthgpError {
        SynthgpError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    /// Next bare word (identifier or unquoted literal) without consuming it.
    fn peek_word(&mut self) -> &'a str {
        self.skip_ws();
        let src: &'a str = self.src;
        let rest = &src[self.pos..];
        let end = rest
            .find(|c: char| c.is_whitespace() || DELIMITERS.contains(&c))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn parse_node(&mut self, allowed: &[SymbolId], parent: Option<NodeId>) -> Result<NodeId> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error(format!("constructors nested deeper than {}", MAX_NESTING)));
        }
        self.nesting += 1;
        let id = self.parse_constructor(allowed, parent)?;
        self.nesting -= 1;
        Ok(id)
    }

    fn parse_constructor(&mut self, allowed: &[SymbolId], parent: Option<NodeId>) -> Result<NodeId> {
        let grammar = self.grammar;
        let name = self.peek_word();
        let production_id = grammar
            .production_by_name(name)
            .ok_or_else(|| self.error(format!("unknown constructor {:?}", name)))?;
        let production = grammar.production(production_id);
        if !allowed.contains(&production.symbol()) {
            return Err(self.error(format!(
                "{} builds {}, which is not allowed here",
                name,
                grammar.symbol(production.symbol()).name()
            )));
        }
        self.pos += name.len();

        let id = NodeId(self.arena.len());
        self.arena.push(Node::new(production_id, production.symbol(), parent));

        let params = production.params();
        let mut children = Vec::with_capacity(params.len());
        if params.is_empty() {
            if self.eat('(') {
                self.expect(')')?;
            }
        } else {
            self.expect('(')?;
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    self.expect(',')?;
                }
                children.push(self.parse_slot(param, id)?);
            }
            self.expect(')')?;
        }
        self.arena[id.0].set_children(children);
        Ok(id)
    }

    fn parse_slot(&mut self, param: &Param, parent: NodeId) -> Result<Child> {
        match &param.slot {
            Slot::Symbol(s) => Ok(Child::Node(self.parse_node(&[*s], Some(parent))?)),
            Slot::List { element, min, max } => {
                let ids = self.parse_node_list(&[*element], parent)?;
                if !(*min..=*max).contains(&ids.len()) {
                    return Err(self.error(format!(
                        "slot {} takes {}..={} elements, got {}",
                        param.name,
                        min,
                        max,
                        ids.len()
                    )));
                }
                Ok(Child::List(ids))
            }
            Slot::Meta(handler) => self.parse_meta(handler.as_ref(), &param.name, parent),
        }
    }

    fn parse_meta(
        &mut self,
        handler: &dyn Metahandler,
        slot: &str,
        parent: NodeId,
    ) -> Result<Child> {
        let symbols = handler.symbols();
        if self.peek() == Some('[') && !symbols.is_empty() {
            let ids = self.parse_node_list(&symbols, parent)?;
            let parsed: Vec<SymbolId> = ids.iter().map(|id| self.arena[id.0].symbol()).collect();
            if !handler.accepts_subtrees(&parsed, true) {
                return Err(self.error(format!(
                    "list of {} elements is not valid for slot {}",
                    ids.len(),
                    slot
                )));
            }
            return Ok(Child::List(ids));
        }
        let word = self.peek_word();
        if let Some(p) = self.grammar.production_by_name(word) {
            let symbol = self.grammar.production(p).symbol();
            if symbols.contains(&symbol) {
                if !handler.accepts_subtrees(&[symbol], false) {
                    return Err(self.error(format!("slot {} does not take a single {}", slot, word)));
                }
                return Ok(Child::Node(self.parse_node(&symbols, Some(parent))?));
            }
        }
        let value = self.parse_literal()?;
        if !handler.accepts(&value) {
            return Err(self.error(format!("{} is not a valid value for slot {}", value, slot)));
        }
        Ok(Child::Value(value))
    }

    fn parse_node_list(&mut self, allowed: &[SymbolId], parent: NodeId) -> Result<Vec<NodeId>> {
        self.expect('[')?;
        let mut ids = Vec::new();
        if self.eat(']') {
            return Ok(ids);
        }
        loop {
            ids.push(self.parse_node(allowed, Some(parent))?);
            if self.eat(']') {
                return Ok(ids);
            }
            self.expect(',')?;
        }
    }

    fn parse_literal(&mut self) -> Result<Value> {
        if self.peek() == Some('"') {
            return self.parse_string();
        }
        let word = self.peek_word();
        let value = match word {
            "" => return Err(self.error("expected a value")),
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ if word.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '+') => word
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| self.error(format!("bad integer {:?}: {}", word, e)))?,
            _ => word
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| self.error(format!("bad value {:?}: {}", word, e)))?,
        };
        self.pos += word.len();
        Ok(value)
    }

    fn parse_string(&mut self) -> Result<Value> {
        let rest = &self.src[self.pos..];
        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i + 1);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| self.error("unterminated string"))?;
        let s: String = serde_json::from_str(&rest[..end])
            .map_err(|e| self.error(format!("bad string literal: {}", e)))?;
        self.pos += end;
        Ok(Value::String(s))
    }
}
