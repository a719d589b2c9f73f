use std::collections::HashMap;

use tracing::debug;

use crate::ast::*;
use crate::error::{Error, Position};
use crate::lexer::{tokenize, Token, TokenKind};

/// Parser state: tracks position in the token stream.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse a Blueprint file into its definitions.
///
/// Parsing is all-or-nothing: the first malformed construct aborts the file.
pub fn parse(input: &str) -> Result<File, Error> {
    let tokens: Vec<Token> = tokenize(input)?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();
    let mut parser = Parser { tokens, pos: 0 };
    let mut file = File::default();
    let mut seen: HashMap<String, Position> = HashMap::new();

    while parser.peek().kind != TokenKind::Eof {
        let def = parser.parse_definition()?;
        if let Definition::Module(module) = &def {
            if let Some(name) = &module.name {
                if let Some(first) = seen.get(name) {
                    return Err(Error::DuplicateModule {
                        name: name.clone(),
                        first: *first,
                        second: module.position,
                    });
                }
                seen.insert(name.clone(), module.position);
            }
        }
        file.defs.push(def);
    }

    debug!(definitions = file.defs.len(), "parsed blueprint file");
    Ok(file)
}

impl Parser {
    // ── Helpers ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// Look `n` tokens ahead. The stream always ends in `Eof`, which is
    /// returned for any lookahead past the end.
    fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek().is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<Token, Error> {
        if self.peek().is_punct(p) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "Expected '{}', found {}",
                p,
                self.peek().describe()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Token, Error> {
        if self.peek().kind == TokenKind::Ident {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "Expected {}, found {}",
                what,
                self.peek().describe()
            )))
        }
    }

    /// Create an error spanning the current token.
    fn error_here(&self, message: String) -> Error {
        let tok = self.peek();
        Error::syntax_error(message, tok.begin, tok.end)
    }

    /// Eat an optional `,` or `;` separator.
    fn eat_separator(&mut self) {
        if !self.eat_punct(",") {
            self.eat_punct(";");
        }
    }

    // ── Definitions ─────────────────────────────────────────────────

    fn parse_definition(&mut self) -> Result<Definition, Error> {
        let head = self.expect_ident("a module type or variable name")?;
        let next = self.peek();

        if next.is_operator("=") || next.is_operator("+=") {
            let op = self.parse_assign_op()?;
            let value = self.parse_expression()?;
            return Ok(Definition::Assignment(Assignment {
                name: head.text,
                op,
                value,
                position: head.begin,
            }));
        }

        if next.is_punct("{") {
            let properties = self.parse_property_block()?;
            let name = properties
                .iter()
                .rev()
                .find(|p| p.name == "name")
                .and_then(|p| match &p.value {
                    Expr::String(s) => Some(s.clone()),
                    _ => None,
                });
            return Ok(Definition::Module(Module {
                module_type: head.text,
                name,
                properties,
                position: head.begin,
            }));
        }

        Err(self.error_here(format!(
            "Expected '=', '+=' or '{{' after '{}', found {}",
            head.text,
            next.describe()
        )))
    }

    fn parse_assign_op(&mut self) -> Result<AssignOp, Error> {
        let tok = self.peek();
        let op = if tok.is_operator("=") || tok.is_punct(":") {
            AssignOp::Set
        } else if tok.is_operator("+=") {
            AssignOp::Append
        } else {
            return Err(self.error_here(format!(
                "Expected ':', '=' or '+=', found {}",
                tok.describe()
            )));
        };
        self.advance();
        Ok(op)
    }

    /// `{ key: value, key += value; ... }` for module bodies and map literals.
    fn parse_property_block(&mut self) -> Result<Vec<Property>, Error> {
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.peek().is_punct("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error_here("Expected '}' to close block".to_string()));
            }
            let key = self.expect_ident("a property name")?;
            let op = self.parse_assign_op()?;
            let value = self.parse_expression()?;
            properties.push(Property {
                name: key.text,
                op,
                value,
                position: key.begin,
            });
            self.eat_separator();
        }
        self.expect_punct("}")?;
        Ok(properties)
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_primary()?;
        while self.peek().is_operator("+") {
            let plus = self.advance();
            let right = self.parse_primary()?;
            left = Expr::Concat {
                left: Box::new(left),
                right: Box::new(right),
                position: plus.begin,
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::String => {
                self.advance();
                Ok(Expr::String(tok.text))
            }
            TokenKind::Int => {
                self.advance();
                tok.text.parse::<i64>().map(Expr::Int).map_err(|_| {
                    Error::syntax_error(
                        format!("Integer literal {} out of range", tok.text),
                        tok.begin,
                        tok.end,
                    )
                })
            }
            TokenKind::Bool => {
                self.advance();
                Ok(Expr::Bool(tok.text == "true"))
            }
            TokenKind::Punct if tok.text == "[" => self.parse_list(),
            TokenKind::Punct if tok.text == "{" => self.parse_property_block().map(Expr::Map),
            TokenKind::Ident => {
                let calls = self.peek_at(1).is_punct("(");
                if tok.text == "select" && calls {
                    return self.parse_select();
                }
                if calls {
                    return Err(self.unsupported_call());
                }
                self.advance();
                if tok.text == "unset" {
                    return Ok(Expr::Unset);
                }
                Ok(Expr::VariableRef {
                    name: tok.text,
                    position: tok.begin,
                })
            }
            _ => Err(self.error_here(format!("Expected a value, found {}", tok.describe()))),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, Error> {
        self.expect_punct("[")?;
        let mut values = Vec::new();
        while !self.peek().is_punct("]") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error_here("Expected ']' to close list".to_string()));
            }
            values.push(self.parse_expression()?);
            if !self.eat_punct(",") && !self.peek().is_punct("]") {
                return Err(self.error_here(format!(
                    "Expected ',' or ']' in list, found {}",
                    self.peek().describe()
                )));
            }
        }
        self.expect_punct("]")?;
        Ok(Expr::List(values))
    }

    /// A call such as `glob("*.c")` in value position. Consumes through the
    /// matching `)` so the error spans the whole construct.
    fn unsupported_call(&mut self) -> Error {
        let name = self.advance();
        let mut depth = 0usize;
        let end = loop {
            let tok = self.advance();
            if tok.kind == TokenKind::Eof {
                break tok.end;
            }
            if tok.is_punct("(") {
                depth += 1;
            } else if tok.is_punct(")") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break tok.end;
                }
            }
        };
        Error::UnsupportedSyntax {
            construct: format!("function call '{}(...)'", name.text),
            begin: name.begin,
            end,
        }
    }

    // ── select() ────────────────────────────────────────────────────

    /// Both `select(cond(), { cases })` and `select(cond()) { cases }`.
    fn parse_select(&mut self) -> Result<Expr, Error> {
        let head = self.advance();
        self.expect_punct("(")?;

        let conditions = if self.eat_punct("(") {
            let mut conds = vec![self.parse_condition()?];
            while self.eat_punct(",") {
                if self.peek().is_punct(")") {
                    break;
                }
                conds.push(self.parse_condition()?);
            }
            self.expect_punct(")")?;
            conds
        } else {
            vec![self.parse_condition()?]
        };

        let (cases, default_branch) = if self.eat_punct(",") {
            let body = self.parse_select_cases(conditions.len())?;
            self.eat_punct(",");
            self.expect_punct(")")?;
            body
        } else {
            self.expect_punct(")")?;
            self.parse_select_cases(conditions.len())?
        };

        Ok(Expr::Select(SelectExpr {
            conditions,
            cases,
            default_branch,
            position: head.begin,
        }))
    }

    fn parse_condition(&mut self) -> Result<Condition, Error> {
        let function = self.expect_ident("a select condition")?;
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.peek().is_punct(")") {
            let arg = self.peek().clone();
            if arg.kind != TokenKind::String {
                return Err(self.error_here(format!(
                    "Expected a string argument to '{}', found {}",
                    function.text,
                    arg.describe()
                )));
            }
            self.advance();
            args.push(arg.text);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(Condition {
            function: function.text,
            args,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_select_cases(
        &mut self,
        arity: usize,
    ) -> Result<(Vec<SelectCase>, Option<Box<Expr>>), Error> {
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        let mut default_branch = None;

        while !self.peek().is_punct("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error_here("Expected '}' to close select".to_string()));
            }
            let begin = self.peek().begin;
            let patterns = if self.eat_punct("(") {
                let mut pats = Vec::new();
                while !self.peek().is_punct(")") {
                    pats.push(self.parse_pattern()?);
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct(")")?;
                if pats.len() != arity {
                    return Err(Error::syntax_error(
                        format!(
                            "Select pattern has {} elements but there are {} conditions",
                            pats.len(),
                            arity
                        ),
                        begin,
                        self.peek().begin,
                    ));
                }
                pats
            } else {
                vec![self.parse_pattern()?]
            };

            self.expect_punct(":")?;
            let value = self.parse_expression()?;
            self.eat_punct(",");

            if patterns == [Pattern::Default] {
                if default_branch.is_some() {
                    return Err(Error::syntax_error(
                        "Select has more than one default case".to_string(),
                        begin,
                        begin,
                    ));
                }
                default_branch = Some(Box::new(value));
            } else {
                cases.push(SelectCase { patterns, value });
            }
        }
        self.expect_punct("}")?;
        Ok((cases, default_branch))
    }

    fn parse_pattern(&mut self) -> Result<Pattern, Error> {
        let tok = self.peek().clone();
        let pattern = match tok.kind {
            TokenKind::String => Pattern::String(tok.text),
            TokenKind::Bool => Pattern::Bool(tok.text == "true"),
            TokenKind::Ident if tok.text == "default" => Pattern::Default,
            TokenKind::Ident if tok.text == "any" => Pattern::Any,
            _ => {
                return Err(self.error_here(format!(
                    "Expected a select pattern, found {}",
                    tok.describe()
                )))
            }
        };
        self.advance();
        Ok(pattern)
    }
}
