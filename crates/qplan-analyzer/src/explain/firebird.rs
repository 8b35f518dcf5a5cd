//! Firebird PLAN Parser
//!
//! Parses the plan text Firebird reports for a prepared statement, e.g.
//!
//! ```text
//! PLAN JOIN (SORT (C NATURAL), O INDEX (FK_ORDERS_CUSTOMER))
//! PLAN HASH (A NATURAL, B NATURAL)
//! PLAN SORT MERGE (SORT (A NATURAL), SORT (B NATURAL))
//! ```
//!
//! The grammar is small and whitespace-insensitive:
//!
//! ```text
//! plan        := "PLAN" plan-expr ("PLAN" plan-expr)*
//! plan-expr   := "(" plan-item ("," plan-item)* ")"
//!              | sorted-item | joined-item | merged-item
//! plan-item   := basic-item | plan-expr
//! joined-item := ("JOIN" | "HASH") "(" plan-item ("," plan-item)* ")"
//! merged-item := ("SORT MERGE" | "MERGE") "(" sorted-item ("," sorted-item)* ")"
//! sorted-item := "SORT" "(" plan-item ")"
//! basic-item  := identifier+ ( "NATURAL"
//!                            | "INDEX" "(" identifier-list ")"
//!                            | "ORDER" identifier ["INDEX" "(" identifier-list ")"] )
//! ```
//!
//! Every line of plan text is one grammar instance and becomes one root node,
//! labelled with the verbatim line.
//!
//! # Examples
//!
//! ```
//! use qplan_analyzer::explain::firebird::parse_plan_line;
//!
//! let root = parse_plan_line("PLAN JOIN (T1 NATURAL, T2 INDEX (IX1))", 128).unwrap();
//! let join = &root.children[0];
//! assert_eq!(join.label(), "JOIN");
//! assert_eq!(join.children[1].label(), "T2 INDEX(IX1)");
//! ```

pub mod tokenizer;

use crate::config::{AnalyzerConfig, clamp_nesting_depth};
use crate::explain::error::{PlanError, Result};
use crate::explain::plan::{DetachedNode, Plan};
use crate::explain::PlanParser;
use tokenizer::{Token, TokenKind, Tokenizer};

/// Parser for Firebird plan text
#[derive(Debug, Clone)]
pub struct FirebirdPlanParser {
    max_nesting_depth: usize,
}

impl FirebirdPlanParser {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            max_nesting_depth: config.nesting_depth(),
        }
    }
}

impl Default for FirebirdPlanParser {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl PlanParser for FirebirdPlanParser {
    fn parse(&self, query: &str, raw_plan: &str) -> Result<Plan> {
        let roots = parse_plan_text(raw_plan, self.max_nesting_depth)?;
        Plan::new(query, None, roots)
    }
}

/// Parses plan text, one root per non-blank line
pub fn parse_plan_text(text: &str, max_nesting_depth: usize) -> Result<Vec<DetachedNode>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_plan_line(line, max_nesting_depth))
        .collect()
}

/// Parses a single plan line into a root node labelled with the line itself.
///
/// `max_nesting_depth` is clamped to [`crate::config::MAX_NESTING_DEPTH_LIMIT`].
pub fn parse_plan_line(plan: &str, max_nesting_depth: usize) -> Result<DetachedNode> {
    Parser::new(plan, max_nesting_depth).parse_root()
}

struct Parser<'a> {
    plan: &'a str,
    tokens: Tokenizer<'a>,
    current: Token<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(plan: &'a str, max_depth: usize) -> Self {
        let mut tokens = Tokenizer::new(plan);
        let current = tokens.next_significant();
        Self {
            plan,
            tokens,
            current,
            depth: 0,
            max_depth: clamp_nesting_depth(max_depth),
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let previous = self.current;
        self.current = self.tokens.next_significant();
        previous
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>> {
        if self.current.kind == kind {
            Ok(self.advance())
        } else {
            Err(PlanError::expected_token(
                kind,
                self.current.kind,
                self.char_offset(),
                self.plan,
            ))
        }
    }

    fn unexpected(&self) -> PlanError {
        PlanError::unexpected_token(self.current.kind, self.char_offset(), self.plan)
    }

    /// Character offset of the current token
    fn char_offset(&self) -> usize {
        self.plan[..self.current.offset].chars().count()
    }

    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(PlanError::TooDeeplyNested {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn parse_root(mut self) -> Result<DetachedNode> {
        let mut root = DetachedNode::text(self.plan);

        self.expect(TokenKind::Plan)?;
        loop {
            self.parse_plan_expr(&mut root)?;
            match self.current.kind {
                TokenKind::Plan => {
                    self.advance();
                }
                TokenKind::End => break,
                _ => return Err(self.unexpected()),
            }
        }

        Ok(root)
    }

    fn parse_plan_expr(&mut self, parent: &mut DetachedNode) -> Result<()> {
        self.nested(|p| match p.current.kind {
            TokenKind::LeftParen => {
                // A bare list adds its items to the parent directly
                p.advance();
                p.parse_plan_items(parent)?;
                p.expect(TokenKind::RightParen)?;
                Ok(())
            }
            TokenKind::Sort => p.parse_sorted_item(parent),
            TokenKind::Join | TokenKind::Hash => p.parse_joined_item(parent),
            TokenKind::SortMerge | TokenKind::Merge => p.parse_merged_item(parent),
            _ => Err(p.unexpected()),
        })
    }

    fn parse_plan_items(&mut self, parent: &mut DetachedNode) -> Result<()> {
        self.parse_plan_item(parent)?;
        while self.current.kind == TokenKind::Comma {
            self.advance();
            self.parse_plan_item(parent)?;
        }
        Ok(())
    }

    fn parse_plan_item(&mut self, parent: &mut DetachedNode) -> Result<()> {
        if self.current.kind == TokenKind::Identifier {
            self.parse_basic_item(parent)
        } else {
            self.parse_plan_expr(parent)
        }
    }

    fn parse_joined_item(&mut self, parent: &mut DetachedNode) -> Result<()> {
        let keyword = self.advance();
        let mut node = DetachedNode::text(keyword.text);

        self.expect(TokenKind::LeftParen)?;
        self.parse_plan_items(&mut node)?;
        self.expect(TokenKind::RightParen)?;

        parent.push_child(node);
        Ok(())
    }

    fn parse_merged_item(&mut self, parent: &mut DetachedNode) -> Result<()> {
        let label = match self.advance().kind {
            TokenKind::SortMerge => "SORT MERGE",
            _ => "MERGE",
        };
        let mut node = DetachedNode::text(label);

        self.expect(TokenKind::LeftParen)?;
        self.nested(|p| p.parse_sorted_item(&mut node))?;
        while self.current.kind == TokenKind::Comma {
            self.advance();
            self.nested(|p| p.parse_sorted_item(&mut node))?;
        }
        self.expect(TokenKind::RightParen)?;

        parent.push_child(node);
        Ok(())
    }

    fn parse_sorted_item(&mut self, parent: &mut DetachedNode) -> Result<()> {
        self.expect(TokenKind::Sort)?;
        let mut node = DetachedNode::text("SORT");

        self.expect(TokenKind::LeftParen)?;
        self.parse_plan_item(&mut node)?;
        self.expect(TokenKind::RightParen)?;

        parent.push_child(node);
        Ok(())
    }

    fn parse_basic_item(&mut self, parent: &mut DetachedNode) -> Result<()> {
        let mut label = self.expect(TokenKind::Identifier)?.text.to_string();
        while self.current.kind == TokenKind::Identifier {
            label.push(' ');
            label.push_str(self.advance().text);
        }

        match self.current.kind {
            TokenKind::Natural => {
                self.advance();
                label.push_str(" NATURAL");
            }
            TokenKind::Index => {
                self.advance();
                label.push_str(" INDEX");
                self.parse_identifier_list(&mut label)?;
            }
            TokenKind::Order => {
                self.advance();
                label.push_str(" ORDER ");
                label.push_str(self.expect(TokenKind::Identifier)?.text);
                if self.current.kind == TokenKind::Index {
                    self.advance();
                    label.push_str(" INDEX");
                    self.parse_identifier_list(&mut label)?;
                }
            }
            _ => return Err(self.unexpected()),
        }

        parent.push_child(DetachedNode::text(label));
        Ok(())
    }

    /// Parses `"(" identifier ("," identifier)* ")"` and appends it as `(a,b)`
    fn parse_identifier_list(&mut self, label: &mut String) -> Result<()> {
        self.expect(TokenKind::LeftParen)?;
        label.push('(');
        label.push_str(self.expect(TokenKind::Identifier)?.text);
        while self.current.kind == TokenKind::Comma {
            self.advance();
            label.push(',');
            label.push_str(self.expect(TokenKind::Identifier)?.text);
        }
        self.expect(TokenKind::RightParen)?;
        label.push(')');
        Ok(())
    }
}
