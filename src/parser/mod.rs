//! Pratt parser turning tokens into the AST.

pub mod precedence;

use crate::ast::{BinaryOp, BlockStatement, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::error::ParserError;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use precedence::{get_precedence, Precedence};

pub type ParseResult<T> = Result<T, ParserError>;

/// The parser for Simian.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse a complete program.
    ///
    /// Collects one error per failed statement and synchronizes to the next
    /// statement boundary, so a single bad line reports every offending
    /// statement rather than only the first.
    pub fn parse(&mut self) -> Result<Program, Vec<ParserError>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            Ok(Program::new(statements))
        } else {
            Err(errors)
        }
    }

    // ===== Statements =====

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.let_statement(),
            TokenKind::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.advance(); // let

        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.expression(Precedence::Lowest)?;
        self.match_token(&TokenKind::Semicolon);

        let span = start.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Let { name, value }, span))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.advance(); // return

        let value = self.expression(Precedence::Lowest)?;
        self.match_token(&TokenKind::Semicolon);

        let span = start.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression(Precedence::Lowest)?;
        self.match_token(&TokenKind::Semicolon);

        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    fn block_statement(&mut self) -> ParseResult<BlockStatement> {
        let start = self.expect(&TokenKind::LeftBrace)?.span;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        let end = self.expect(&TokenKind::RightBrace)?.span;
        Ok(BlockStatement::new(statements, start.merge(end)))
    }

    // ===== Expressions =====

    fn expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.prefix()?;

        while !self.check(&TokenKind::Semicolon) && precedence < get_precedence(&self.peek().kind)
        {
            left = self.infix(left)?;
        }

        Ok(left)
    }

    fn prefix(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(value), token.span))
            }
            TokenKind::StringLiteral(ref value) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(value.clone()), token.span))
            }
            TokenKind::BoolLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(value), token.span))
            }
            TokenKind::Identifier(ref name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name.clone()), token.span))
            }
            TokenKind::Bang => self.prefix_expression(UnaryOp::Bang),
            TokenKind::Minus => self.prefix_expression(UnaryOp::Minus),
            TokenKind::LeftParen => self.grouped_expression(),
            TokenKind::If => self.if_expression(),
            TokenKind::Fn => self.function_literal(),
            TokenKind::LeftBracket => self.array_literal(),
            TokenKind::LeftBrace => self.hash_literal(),
            TokenKind::Eof => Err(ParserError::UnexpectedEof(token.span)),
            _ => Err(ParserError::NoParseRule(
                token.kind.to_string(),
                token.span,
            )),
        }
    }

    fn prefix_expression(&mut self, operator: UnaryOp) -> ParseResult<Expr> {
        let start = self.advance().span;
        let right = self.expression(Precedence::Unary)?;
        let span = start.merge(right.span);
        Ok(Expr::new(
            ExprKind::Prefix {
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn grouped_expression(&mut self) -> ParseResult<Expr> {
        self.advance(); // (
        let expr = self.expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RightParen)?;
        Ok(expr)
    }

    fn if_expression(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span; // if

        self.expect(&TokenKind::LeftParen)?;
        let condition = self.expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RightParen)?;

        let consequence = self.block_statement()?;

        let alternative = if self.match_token(&TokenKind::Else) {
            Some(self.block_statement()?)
        } else {
            None
        };

        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }

    fn function_literal(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span; // fn

        self.expect(&TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            parameters.push(self.expect_identifier()?);
            while self.match_token(&TokenKind::Comma) {
                parameters.push(self.expect_identifier()?);
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.block_statement()?;

        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::FunctionLiteral { parameters, body },
            span,
        ))
    }

    fn array_literal(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span; // [
        let elements = self.expression_list(&TokenKind::RightBracket)?;
        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Array(elements), span))
    }

    fn hash_literal(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span; // {

        let mut pairs = Vec::new();
        if !self.check(&TokenKind::RightBrace) {
            loop {
                let key = self.expression(Precedence::Lowest)?;
                self.expect(&TokenKind::Colon)?;
                let value = self.expression(Precedence::Lowest)?;
                pairs.push((key, value));
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Hash(pairs), span))
    }

    fn infix(&mut self, left: Expr) -> ParseResult<Expr> {
        match self.peek().kind {
            TokenKind::LeftParen => self.call_expression(left),
            TokenKind::LeftBracket => self.index_expression(left),
            _ => self.binary_expression(left),
        }
    }

    fn binary_expression(&mut self, left: Expr) -> ParseResult<Expr> {
        let token = self.advance();
        let operator = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::LessThan,
            TokenKind::Greater => BinaryOp::GreaterThan,
            other => {
                return Err(ParserError::NoParseRule(other.to_string(), token.span));
            }
        };

        let right = self.expression(get_precedence(&token.kind))?;
        let span = left.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Infix {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn call_expression(&mut self, function: Expr) -> ParseResult<Expr> {
        self.advance(); // (
        let arguments = self.expression_list(&TokenKind::RightParen)?;
        let span = function.span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
            span,
        ))
    }

    fn index_expression(&mut self, left: Expr) -> ParseResult<Expr> {
        self.advance(); // [
        let index = self.expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RightBracket)?;
        let span = left.span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
            span,
        ))
    }

    fn expression_list(&mut self, end: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if !self.check(end) {
            items.push(self.expression(Precedence::Lowest)?);
            while self.match_token(&TokenKind::Comma) {
                items.push(self.expression(Precedence::Lowest)?);
            }
        }
        self.expect(end)?;
        Ok(items)
    }

    // ===== Token manipulation =====

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
        }
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParserError::unexpected_token(
                format!("{}", kind),
                format!("{}", self.peek().kind),
                self.current_span(),
            ))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParserError::unexpected_token(
                "identifier",
                format!("{}", self.peek().kind),
                self.current_span(),
            )),
        }
    }

    /// Skip to the next statement boundary after a parse error.
    fn synchronize(&mut self) {
        // Always make progress, even when the error did not consume the
        // offending token.
        if !self.is_at_end() {
            self.advance();
        }
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Let | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn previous_span(&self) -> Span {
        self.previous().span
    }
}

/// Convenience: scan and parse a source string in one step.
pub fn parse_source(source: &str) -> Result<Program, Vec<ParserError>> {
    let tokens = crate::lexer::Scanner::new(source)
        .scan_tokens()
        .map_err(|e| vec![ParserError::from(e)])?;
    Parser::new(tokens).parse()
}
