//! Recursive descent parser for C0

use std::collections::HashSet;

use crate::common::{CheckError, CheckResult, Span};
use crate::syntax::ast::*;
use crate::syntax::lexer::{Lexer, Token, TokenKind};

/// Which contract keyword introduced an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnnoKind {
    Requires,
    Ensures,
    LoopInvariant,
    Assert,
}

impl AnnoKind {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "requires" => Some(AnnoKind::Requires),
            "ensures" => Some(AnnoKind::Ensures),
            "loop_invariant" => Some(AnnoKind::LoopInvariant),
            "assert" => Some(AnnoKind::Assert),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            AnnoKind::Requires => "@requires",
            AnnoKind::Ensures => "@ensures",
            AnnoKind::LoopInvariant => "@loop_invariant",
            AnnoKind::Assert => "@assert",
        }
    }
}

struct Annotation {
    kind: AnnoKind,
    condition: Expr,
    span: Span,
}

/// Recursive descent parser for C0
///
/// Type names introduced by `typedef` are tracked so that `name * x;`
/// parses as a declaration once `name` is known to be a type.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Span,
    type_names: HashSet<String>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source
    pub fn new(source: &'a str) -> CheckResult<Self> {
        Self::for_file(source, 0)
    }

    /// Create a parser whose spans point into reporter file `file`
    pub fn for_file(source: &'a str, file: usize) -> CheckResult<Self> {
        let mut lexer = Lexer::for_file(source, file);
        let current = lexer.next_token()?;
        let previous = Span::in_file(file, 0, 0);
        Ok(Self {
            lexer,
            current,
            previous,
            type_names: HashSet::new(),
        })
    }

    /// Seed the parser with type names declared by earlier files
    pub fn with_type_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.type_names.extend(names);
        self
    }

    /// Type names known after parsing, including those seeded
    pub fn type_names(&self) -> &HashSet<String> {
        &self.type_names
    }

    /// Parse a complete source file
    pub fn parse(&mut self) -> CheckResult<SourceUnit> {
        let mut declarations = Vec::new();

        while !self.at_end() {
            declarations.push(self.parse_declaration()?);
        }

        Ok(SourceUnit::new(declarations))
    }

    /// Parse input consisting of exactly one expression
    pub fn parse_standalone_expression(&mut self) -> CheckResult<Expr> {
        let expr = self.parse_expression()?;
        if !self.at_end() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> CheckResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        self.previous = prev.span;
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> CheckResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CheckResult<Token> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> CheckResult<String> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> CheckError {
        CheckError::parser(
            format!("expected {}, found {}", expected, self.current.kind),
            self.current.span,
        )
    }

    /// Span from `start` to the end of the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous)
    }

    fn starts_type(&self) -> bool {
        match &self.current.kind {
            TokenKind::Identifier(name) => self.type_names.contains(name),
            kind => kind.is_type_keyword(),
        }
    }

    // =========================================================================
    // Top-level declarations
    // =========================================================================

    fn parse_declaration(&mut self) -> CheckResult<Declaration> {
        let start = self.current.span;

        match &self.current.kind {
            TokenKind::Pragma(directive) => {
                let directive = directive.clone();
                self.advance()?;
                Ok(Declaration::new(DeclKind::Pragma(Pragma::new(directive, start)), start))
            }
            TokenKind::Typedef => self.parse_typedef(),
            TokenKind::Struct => {
                self.advance()?;
                let name = self.expect_identifier()?;
                if self.check(&TokenKind::Semi) || self.check(&TokenKind::LBrace) {
                    return self.parse_struct_rest(name, start);
                }
                // `struct s*` starting a function header
                let return_type = self.parse_type_suffix(Type::Struct(name))?;
                self.parse_function(return_type, start)
            }
            _ => {
                let return_type = self.parse_type()?;
                self.parse_function(return_type, start)
            }
        }
    }

    fn parse_struct_rest(&mut self, name: String, start: Span) -> CheckResult<Declaration> {
        let fields = if self.match_token(&TokenKind::LBrace)? {
            let mut fields = Vec::new();
            while !self.check(&TokenKind::RBrace) {
                let field_start = self.current.span;
                let ty = self.parse_type()?;
                let field_name = self.expect_identifier()?;
                self.expect(TokenKind::Semi)?;
                fields.push(Field::new(field_name, ty, self.span_from(field_start)));
            }
            self.expect(TokenKind::RBrace)?;
            Some(fields)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;

        let span = self.span_from(start);
        Ok(Declaration::new(DeclKind::Struct(StructDecl::new(name, fields, span)), span))
    }

    fn parse_typedef(&mut self) -> CheckResult<Declaration> {
        let start = self.expect(TokenKind::Typedef)?.span;
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;

        if self.check(&TokenKind::LParen) {
            let signature = self.parse_signature(ty)?;
            self.expect(TokenKind::Semi)?;
            self.type_names.insert(name.clone());
            let span = self.span_from(start);
            let def = FunctionTypeDef::new(name, signature, span);
            return Ok(Declaration::new(DeclKind::FunctionTypeDef(def), span));
        }

        self.expect(TokenKind::Semi)?;
        self.type_names.insert(name.clone());
        let span = self.span_from(start);
        Ok(Declaration::new(DeclKind::TypeDef(TypeDef::new(name, ty, span)), span))
    }

    fn parse_function(&mut self, return_type: Type, start: Span) -> CheckResult<Declaration> {
        let name = self.expect_identifier()?;
        let signature = self.parse_signature(return_type)?;

        let mut func = FuncDecl::new(name, signature, start);
        if self.check(&TokenKind::LBrace) {
            func = func.with_body(self.parse_block()?);
        } else {
            self.expect(TokenKind::Semi)?;
        }

        let span = self.span_from(start);
        func.span = span;
        Ok(Declaration::new(DeclKind::Function(func), span))
    }

    /// Parameter list followed by @requires/@ensures annotations
    fn parse_signature(&mut self, return_type: Type) -> CheckResult<Signature> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param_start = self.current.span;
                let ty = self.parse_type()?;
                let name = self.expect_identifier()?;
                params.push(Param::new(name, ty, self.span_from(param_start)));
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let mut signature = Signature::new(return_type, params);
        for anno in self.parse_annotations()? {
            match anno.kind {
                AnnoKind::Requires => signature.requires.push(anno.condition),
                AnnoKind::Ensures => signature.ensures.push(anno.condition),
                other => {
                    return Err(CheckError::parser(
                        format!("{} is not allowed on a function header", other.keyword()),
                        anno.span,
                    ));
                }
            }
        }
        Ok(signature)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn parse_type(&mut self) -> CheckResult<Type> {
        let base = match &self.current.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Bool => Type::Bool,
            TokenKind::Char => Type::Char,
            TokenKind::StringType => Type::String,
            TokenKind::Void => Type::Void,
            TokenKind::Struct => {
                self.advance()?;
                let name = self.expect_identifier()?;
                return self.parse_type_suffix(Type::Struct(name));
            }
            TokenKind::Identifier(name) if self.type_names.contains(name) => Type::Named(name.clone()),
            _ => return Err(self.unexpected("type")),
        };
        self.advance()?;
        self.parse_type_suffix(base)
    }

    fn parse_type_suffix(&mut self, mut ty: Type) -> CheckResult<Type> {
        loop {
            if self.match_token(&TokenKind::Star)? {
                ty = Type::pointer_to(ty);
            } else if self.match_token(&TokenKind::LBracket)? {
                self.expect(TokenKind::RBracket)?;
                ty = Type::array_of(ty);
            } else {
                return Ok(ty);
            }
        }
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    fn parse_annotations(&mut self) -> CheckResult<Vec<Annotation>> {
        let mut annotations = Vec::new();

        while self.current.kind.is_annotation_start() {
            let opener = self.advance()?;
            let block = matches!(opener.kind, TokenKind::AnnoOpen);
            let before = annotations.len();

            while let TokenKind::Identifier(word) = &self.current.kind {
                let Some(kind) = AnnoKind::from_keyword(word) else {
                    break;
                };
                let start = self.current.span;
                self.advance()?;
                let condition = self.parse_expression()?;
                self.expect(TokenKind::Semi)?;
                annotations.push(Annotation {
                    kind,
                    condition,
                    span: self.span_from(start),
                });
            }

            if annotations.len() == before {
                return Err(self.unexpected("annotation keyword"));
            }
            if block {
                self.expect(TokenKind::AnnoClose)?;
            }
        }

        Ok(annotations)
    }

    fn parse_loop_invariants(&mut self) -> CheckResult<Vec<Expr>> {
        let mut invariants = Vec::new();
        for anno in self.parse_annotations()? {
            if anno.kind != AnnoKind::LoopInvariant {
                return Err(CheckError::parser(
                    format!("{} is not allowed before a loop body", anno.kind.keyword()),
                    anno.span,
                ));
            }
            invariants.push(anno.condition);
        }
        Ok(invariants)
    }

    /// Annotations in statement position; only asserts are allowed
    fn parse_assertions(&mut self) -> CheckResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        for anno in self.parse_annotations()? {
            if anno.kind != AnnoKind::Assert {
                let message = match anno.kind {
                    AnnoKind::LoopInvariant => "@loop_invariant must directly follow a loop header".to_string(),
                    kind => format!("{} is only allowed on function headers", kind.keyword()),
                };
                return Err(CheckError::parser(message, anno.span));
            }
            stmts.push(Stmt::new(StmtKind::Assert(anno.condition), anno.span));
        }
        Ok(stmts)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> CheckResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            if self.current.kind.is_annotation_start() {
                stmts.extend(self.parse_assertions()?);
            } else {
                stmts.push(self.parse_statement()?);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_statement(&mut self) -> CheckResult<Stmt> {
        let start = self.current.span;

        match &self.current.kind {
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Stmt::new(StmtKind::Block(block), span))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => {
                self.advance()?;
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(StmtKind::Return(value), self.span_from(start)))
            }
            TokenKind::Break => {
                self.advance()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(StmtKind::Break, self.span_from(start)))
            }
            TokenKind::Continue => {
                self.advance()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(StmtKind::Continue, self.span_from(start)))
            }
            TokenKind::Error => {
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let message = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(StmtKind::Error(message), self.span_from(start)))
            }
            TokenKind::Semi => {
                self.advance()?;
                Ok(Stmt::new(StmtKind::Empty, start))
            }
            TokenKind::AnnoLine | TokenKind::AnnoOpen => {
                let mut asserts = self.parse_assertions()?;
                if asserts.len() == 1 {
                    Ok(asserts.remove(0))
                } else {
                    let span = self.span_from(start);
                    Ok(Stmt::new(StmtKind::Block(Block::new(asserts, span)), span))
                }
            }
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(stmt.kind, self.span_from(start)))
            }
        }
    }

    fn parse_if_statement(&mut self) -> CheckResult<Stmt> {
        let start = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If { condition, then_branch, else_branch },
            self.span_from(start),
        ))
    }

    fn parse_while_statement(&mut self) -> CheckResult<Stmt> {
        let start = self.expect(TokenKind::While)?.span;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let invariants = self.parse_loop_invariants()?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::new(
            StmtKind::While { condition, invariants, body },
            self.span_from(start),
        ))
    }

    fn parse_for_statement(&mut self) -> CheckResult<Stmt> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;

        let init = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::Semi)?;

        let condition = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::RParen)?;

        let invariants = self.parse_loop_invariants()?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::new(
            StmtKind::For { init, condition, update, invariants, body },
            self.span_from(start),
        ))
    }

    /// Declaration, assignment, increment or expression, without the `;`
    fn parse_simple_statement(&mut self) -> CheckResult<Stmt> {
        let start = self.current.span;

        if self.starts_type() {
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            let init = if self.match_token(&TokenKind::Eq)? {
                Some(self.parse_expression()?)
            } else {
                None
            };
            return Ok(Stmt::new(StmtKind::Decl { name, ty, init }, self.span_from(start)));
        }

        let target = self.parse_expression()?;

        if let Some(op) = self.get_assignment_op() {
            self.advance()?;
            let value = self.parse_expression()?;
            return Ok(Stmt::new(StmtKind::Assign { op, target, value }, self.span_from(start)));
        }
        if self.match_token(&TokenKind::PlusPlus)? {
            return Ok(Stmt::new(StmtKind::PostIncrement(target), self.span_from(start)));
        }
        if self.match_token(&TokenKind::MinusMinus)? {
            return Ok(Stmt::new(StmtKind::PostDecrement(target), self.span_from(start)));
        }

        Ok(Stmt::new(StmtKind::Expr(target), self.span_from(start)))
    }

    fn get_assignment_op(&self) -> Option<AssignOp> {
        match &self.current.kind {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::ModAssign),
            TokenKind::AmpEq => Some(AssignOp::AndAssign),
            TokenKind::PipeEq => Some(AssignOp::OrAssign),
            TokenKind::CaretEq => Some(AssignOp::XorAssign),
            TokenKind::LtLtEq => Some(AssignOp::ShlAssign),
            TokenKind::GtGtEq => Some(AssignOp::ShrAssign),
            _ => None,
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> CheckResult<Expr> {
        self.parse_conditional_expression()
    }

    fn parse_conditional_expression(&mut self) -> CheckResult<Expr> {
        let condition = self.parse_binary_expression(1)?;

        if self.match_token(&TokenKind::Question)? {
            let then_expr = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let else_expr = self.parse_conditional_expression()?;
            let span = condition.span.merge(else_expr.span);

            return Ok(Expr::new(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ));
        }

        Ok(condition)
    }

    /// Binary operator at the current token and its precedence
    /// (higher binds tighter)
    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match &self.current.kind {
            TokenKind::PipePipe => (BinaryOp::LogOr, 1),
            TokenKind::AmpAmp => (BinaryOp::LogAnd, 2),
            TokenKind::Pipe => (BinaryOp::BitOr, 3),
            TokenKind::Caret => (BinaryOp::BitXor, 4),
            TokenKind::Amp => (BinaryOp::BitAnd, 5),
            TokenKind::EqEq => (BinaryOp::Eq, 6),
            TokenKind::NotEq => (BinaryOp::Ne, 6),
            TokenKind::Lt => (BinaryOp::Lt, 7),
            TokenKind::Gt => (BinaryOp::Gt, 7),
            TokenKind::LtEq => (BinaryOp::Le, 7),
            TokenKind::GtEq => (BinaryOp::Ge, 7),
            TokenKind::LtLt => (BinaryOp::Shl, 8),
            TokenKind::GtGt => (BinaryOp::Shr, 8),
            TokenKind::Plus => (BinaryOp::Add, 9),
            TokenKind::Minus => (BinaryOp::Sub, 9),
            TokenKind::Star => (BinaryOp::Mul, 10),
            TokenKind::Slash => (BinaryOp::Div, 10),
            TokenKind::Percent => (BinaryOp::Mod, 10),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over left-associative binary operators
    fn parse_binary_expression(&mut self, min_precedence: u8) -> CheckResult<Expr> {
        let mut left = self.parse_unary_expression()?;

        while let Some((op, precedence)) = self.binary_op() {
            if precedence < min_precedence {
                break;
            }
            self.advance()?;
            let right = self.parse_binary_expression(precedence + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> CheckResult<Expr> {
        let start = self.current.span;

        let op = match &self.current.kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary_expression()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, span));
        }

        if self.match_token(&TokenKind::Star)? {
            let operand = self.parse_unary_expression()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(ExprKind::Deref(Box::new(operand)), span));
        }

        if self.match_token(&TokenKind::Amp)? {
            let name = self.expect_identifier()?;
            return Ok(Expr::new(ExprKind::AddrOf(name), self.span_from(start)));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> CheckResult<Expr> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let start = expr.span;
            if self.match_token(&TokenKind::Dot)? {
                let field = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::Member { object: Box::new(expr), field },
                    self.span_from(start),
                );
            } else if self.match_token(&TokenKind::Arrow)? {
                let field = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::PtrMember { pointer: Box::new(expr), field },
                    self.span_from(start),
                );
            } else if self.match_token(&TokenKind::LBracket)? {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::new(
                    ExprKind::Index { array: Box::new(expr), index: Box::new(index) },
                    self.span_from(start),
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> CheckResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary_expression(&mut self) -> CheckResult<Expr> {
        let start = self.current.span;

        let kind = match self.current.kind.clone() {
            TokenKind::IntLiteral(text) => {
                self.advance()?;
                ExprKind::IntLiteral(parse_decimal(&text, start)?)
            }
            TokenKind::HexLiteral(text) => {
                self.advance()?;
                ExprKind::IntLiteral(parse_hex(&text, start)?)
            }
            TokenKind::CharLiteral(text) => {
                self.advance()?;
                let chars = unescape(&text[1..text.len() - 1], start)?;
                let mut iter = chars.chars();
                match (iter.next(), iter.next()) {
                    (Some(c), None) => ExprKind::CharLiteral(c),
                    _ => return Err(CheckError::parser("character literal must hold one character", start)),
                }
            }
            TokenKind::StringLiteral(text) => {
                self.advance()?;
                ExprKind::StringLiteral(unescape(&text[1..text.len() - 1], start)?)
            }
            TokenKind::True => {
                self.advance()?;
                ExprKind::BoolLiteral(true)
            }
            TokenKind::False => {
                self.advance()?;
                ExprKind::BoolLiteral(false)
            }
            TokenKind::Null => {
                self.advance()?;
                ExprKind::Null
            }
            TokenKind::Result => {
                self.advance()?;
                ExprKind::Result
            }
            TokenKind::Length => {
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let array = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Length(Box::new(array))
            }
            TokenKind::Alloc => {
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Alloc(ty)
            }
            TokenKind::AllocArray => {
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::Comma)?;
                let count = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::AllocArray { ty, count: Box::new(count) }
            }
            TokenKind::Identifier(name) => {
                self.advance()?;
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_arguments()?;
                    ExprKind::Call { name, args }
                } else {
                    ExprKind::Identifier(name)
                }
            }
            TokenKind::LParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                if !self.check(&TokenKind::LParen) {
                    return Ok(Expr::new(inner.kind, self.span_from(start)));
                }
                // (*f)(args)
                let ExprKind::Deref(callee) = inner.kind else {
                    return Err(CheckError::parser(
                        "only function names and (*f) can be called",
                        inner.span,
                    ));
                };
                let args = self.parse_arguments()?;
                ExprKind::PtrCall { callee, args }
            }
            _ => return Err(self.unexpected("expression")),
        };

        Ok(Expr::new(kind, self.span_from(start)))
    }
}

/// Largest decimal literal; only meaningful as the operand of unary minus
const MAX_DECIMAL: i64 = 2_147_483_648;

fn parse_decimal(text: &str, span: Span) -> CheckResult<i64> {
    match text.parse::<i64>() {
        Ok(value) if value <= MAX_DECIMAL => Ok(value),
        _ => Err(CheckError::parser(format!("integer literal {text} out of range"), span)),
    }
}

fn parse_hex(text: &str, span: Span) -> CheckResult<i64> {
    match u32::from_str_radix(&text[2..], 16) {
        Ok(value) => Ok(i64::from(value as i32)),
        Err(_) => Err(CheckError::parser(format!("hex literal {text} out of range"), span)),
    }
}

fn unescape(text: &str, span: Span) -> CheckResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            other => {
                return Err(CheckError::parser(
                    format!("unknown escape sequence '\\{}'", other.unwrap_or(' ')),
                    span,
                ));
            }
        };
        out.push(escaped);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceUnit {
        Parser::new(source).unwrap().parse().unwrap()
    }

    fn function(unit: &SourceUnit, index: usize) -> &FuncDecl {
        match &unit.declarations[index].kind {
            DeclKind::Function(f) => f,
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let unit = parse("int main() { return 0; }");

        assert_eq!(unit.declarations.len(), 1);
        let f = function(&unit, 0);
        assert_eq!(f.name, "main");
        assert!(f.is_definition());
        assert_eq!(f.signature.return_type, Type::Int);
    }

    #[test]
    fn test_parse_prototype_with_contracts() {
        let unit = parse(
            "int fact(int n)\n//@requires n >= 0;\n//@ensures \\result >= 1;\n;",
        );

        let f = function(&unit, 0);
        assert!(f.is_declaration());
        assert_eq!(f.signature.params.len(), 1);
        assert_eq!(f.signature.requires.len(), 1);
        assert_eq!(f.signature.ensures.len(), 1);
        assert!(matches!(
            &f.signature.ensures[0].kind,
            ExprKind::Binary { op: BinaryOp::Ge, left, .. } if left.kind == ExprKind::Result
        ));
    }

    #[test]
    fn test_parse_block_annotation() {
        let unit = parse("int f(int x) /*@requires x > 0; ensures \\result < x; @*/ ;");
        let f = function(&unit, 0);
        assert_eq!(f.signature.requires.len(), 1);
        assert_eq!(f.signature.ensures.len(), 1);
    }

    #[test]
    fn test_parse_typedefs_and_structs() {
        let unit = parse(
            "#use <conio>\n\
             struct node;\n\
             struct node { int data; struct node* next; };\n\
             typedef struct node* list;\n\
             typedef int cmp_fn(int a, int b) //@ensures -1 <= \\result && \\result <= 1;\n;\n\
             list push(list l, int x);",
        );

        assert!(matches!(&unit.declarations[0].kind, DeclKind::Pragma(p) if p.directive == "#use <conio>"));
        assert!(matches!(&unit.declarations[1].kind, DeclKind::Struct(s) if s.fields.is_none()));
        assert!(matches!(&unit.declarations[2].kind, DeclKind::Struct(s) if s.fields.as_ref().map(Vec::len) == Some(2)));
        assert!(matches!(
            &unit.declarations[3].kind,
            DeclKind::TypeDef(t) if t.ty == Type::pointer_to(Type::Struct("node".into()))
        ));
        assert!(matches!(
            &unit.declarations[4].kind,
            DeclKind::FunctionTypeDef(t) if t.signature.params.len() == 2 && t.signature.ensures.len() == 1
        ));
        let push = function(&unit, 5);
        assert_eq!(push.signature.return_type, Type::Named("list".into()));
    }

    #[test]
    fn test_parse_struct_pointer_return() {
        let unit = parse("struct node* make(int x);");
        let f = function(&unit, 0);
        assert_eq!(f.signature.return_type, Type::pointer_to(Type::Struct("node".into())));
    }

    #[test]
    fn test_typedef_name_starts_declaration() {
        let unit = parse("typedef int num;\nvoid f() { num * p = NULL; x * y; }");
        let body = function(&unit, 1).body.as_ref().unwrap();
        assert!(matches!(&body.stmts[0].kind, StmtKind::Decl { ty: Type::Pointer(_), .. }));
        assert!(matches!(&body.stmts[1].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn test_parse_precedence() {
        let unit = parse("int f() { return 1 + 2 * 3 - 4; }");
        let body = function(&unit, 0).body.as_ref().unwrap();
        let StmtKind::Return(Some(expr)) = &body.stmts[0].kind else {
            panic!("expected return");
        };
        // (1 + (2 * 3)) - 4
        let ExprKind::Binary { op: BinaryOp::Sub, left, .. } = &expr.kind else {
            panic!("expected subtraction at the root");
        };
        assert!(matches!(
            &left.kind,
            ExprKind::Binary { op: BinaryOp::Add, right, .. }
                if matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. })
        ));
    }

    #[test]
    fn test_parse_loops_with_invariants() {
        let unit = parse(
            "int sum(int n) {\n\
               int s = 0;\n\
               for (int i = 0; i < n; i++)\n\
               //@loop_invariant 0 <= i;\n\
               { s += i; }\n\
               while (s > 100) //@loop_invariant s >= 0;\n\
                 s -= 1;\n\
               //@assert s <= 100;\n\
               return s;\n\
             }",
        );
        let body = function(&unit, 0).body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 5);
        assert!(matches!(&body.stmts[1].kind, StmtKind::For { invariants, init: Some(_), update: Some(_), .. } if invariants.len() == 1));
        assert!(matches!(&body.stmts[2].kind, StmtKind::While { invariants, .. } if invariants.len() == 1));
        assert!(matches!(&body.stmts[3].kind, StmtKind::Assert(_)));
    }

    #[test]
    fn test_parse_function_pointer_call() {
        let unit = parse("typedef int fn(int x);\nint apply(fn* f, int x) { return (*f)(x); }\nint g() { fn* f = &apply2; return 0; }");
        let body = function(&unit, 1).body.as_ref().unwrap();
        assert!(matches!(
            &body.stmts[0].kind,
            StmtKind::Return(Some(Expr { kind: ExprKind::PtrCall { args, .. }, .. })) if args.len() == 1
        ));
        let body = function(&unit, 2).body.as_ref().unwrap();
        assert!(matches!(
            &body.stmts[0].kind,
            StmtKind::Decl { init: Some(Expr { kind: ExprKind::AddrOf(name), .. }), .. } if name == "apply2"
        ));
    }

    #[test]
    fn test_requires_inside_body_rejected() {
        let err = Parser::new("void f() { //@requires true;\n }")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, CheckError::Parser { .. }));
    }

    #[test]
    fn test_literals() {
        let unit = parse("string s() { return \"a\\tb\"; }\nchar c() { return '\\n'; }\nint h() { return 0xFFFFFFFF; }");
        let ret = |i: usize| match &function(&unit, i).body.as_ref().unwrap().stmts[0].kind {
            StmtKind::Return(Some(e)) => e.kind.clone(),
            _ => panic!("expected return"),
        };
        assert_eq!(ret(0), ExprKind::StringLiteral("a\tb".into()));
        assert_eq!(ret(1), ExprKind::CharLiteral('\n'));
        assert_eq!(ret(2), ExprKind::IntLiteral(-1));
    }

    #[test]
    fn test_literal_out_of_range() {
        let err = Parser::new("int f() { return 2147483649; }").unwrap().parse().unwrap_err();
        assert!(matches!(err, CheckError::Parser { .. }));
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let err = Parser::new("int f(int x)").unwrap().parse().unwrap_err();
        assert_eq!(err.message(), "expected ';', found end of file");
    }
}
