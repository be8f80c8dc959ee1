//! Lexer implementation using logos

use super::token::{Token, TokenKind};
use crate::common::{CheckError, CheckResult, Span};
use logos::Logos;

/// Lexer for C0 source code
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    file: usize,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self::for_file(source, 0)
    }

    /// Create a lexer whose spans point into the reporter file `file`
    pub fn for_file(source: &'a str, file: usize) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            file,
            at_eof: false,
        }
    }

    fn span(&self, range: std::ops::Range<usize>) -> Span {
        Span::in_file(self.file, range.start, range.end)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> CheckResult<Token> {
        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, self.span(len..len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => Ok(Token::new(kind, self.span(self.inner.span()))),
            Some(Err(())) => Err(CheckError::lexer(
                format!("unexpected character '{}'", self.inner.slice()),
                self.span(self.inner.span()),
            )),
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, self.span(len..len)))
            }
        }
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize_all(mut self) -> CheckResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords() {
        let source = "int bool string void struct typedef return alloc_array";
        let mut lexer = Lexer::new(source);

        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Int));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Bool));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::StringType));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Void));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Struct));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Typedef));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Return));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::AllocArray));
    }

    #[test]
    fn test_annotations_are_not_comments() {
        let tokens = kinds("// plain comment\n//@requires n >= 0;\n/* block */ /*@ensures \\result > 0; @*/");

        assert_eq!(tokens[0], TokenKind::AnnoLine);
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "requires"));
        assert_eq!(tokens[5], TokenKind::Semi);
        assert_eq!(tokens[6], TokenKind::AnnoOpen);
        assert!(matches!(&tokens[7], TokenKind::Identifier(s) if s == "ensures"));
        assert_eq!(tokens[8], TokenKind::Result);
        assert_eq!(tokens[12], TokenKind::AnnoClose);
        assert_eq!(tokens[13], TokenKind::Eof);
    }

    #[test]
    fn test_pragma_keeps_directive() {
        let tokens = kinds("#use <conio>\nint main();");
        assert!(matches!(&tokens[0], TokenKind::Pragma(s) if s == "#use <conio>"));
        assert_eq!(tokens[1], TokenKind::Int);
    }

    #[test]
    fn test_operators() {
        let source = "+ - * / % == != < > <= >= && || ! -> <<= ++";
        let mut lexer = Lexer::new(source);

        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Plus));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Minus));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Star));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Slash));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Percent));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::EqEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::NotEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Lt));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Gt));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::LtEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::GtEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::AmpAmp));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::PipePipe));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Bang));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Arrow));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::LtLtEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::PlusPlus));
    }

    #[test]
    fn test_spans_carry_file_id() {
        let tokens = Lexer::for_file("int x", 3).tokenize_all().unwrap();
        assert_eq!(tokens[1].span, Span::in_file(3, 4, 5));
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("int $x");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err, CheckError::Lexer { .. }));
    }
}
