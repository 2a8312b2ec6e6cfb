//! Formula lexer
//!
//! Turns formula text into a lazy, single-pass stream of tokens. Operator
//! symbols come from the [`OperatorRegistry`], so operators registered by the
//! caller are lexed the same way as the built-ins.

use crate::error::{FormulaError, FormulaResult};
use crate::operators::OperatorRegistry;
use std::fmt;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unsigned numeric literal
    Number(f64),
    /// Variable or function name
    Identifier(String),
    /// Registered operator symbol or ternary separator
    Operator(String),
    LeftParen,
    RightParen,
    Comma,
    /// End of input
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Operator(symbol) => write!(f, "operator '{}'", symbol),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::End => f.write_str("end of input"),
        }
    }
}

/// Token with the byte offset at which it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Lazy token stream over formula text
///
/// The stream cannot be restarted; lex the text again with a new stream.
pub struct TokenStream<'a> {
    input: &'a str,
    pos: usize,
    operators: &'a OperatorRegistry,
    peeked: Option<Spanned>,
    /// Set once `End` or an error has been handed out through `Iterator`
    exhausted: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new(input: &'a str, operators: &'a OperatorRegistry) -> Self {
        Self {
            input,
            pos: 0,
            operators,
            peeked: None,
            exhausted: false,
        }
    }

    /// Consume the next token
    ///
    /// Keeps returning `End` once the input is exhausted.
    pub fn next_token(&mut self) -> FormulaResult<Spanned> {
        match self.peeked.take() {
            Some(spanned) => Ok(spanned),
            None => self.scan_token(),
        }
    }

    /// Look at the next token without consuming it
    pub fn peek_token(&mut self) -> FormulaResult<&Spanned> {
        let spanned = match self.peeked.take() {
            Some(spanned) => spanned,
            None => self.scan_token()?,
        };
        Ok(self.peeked.insert(spanned))
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> FormulaResult<Spanned> {
        self.skip_whitespace();
        let offset = self.pos;

        let c = match self.peek_char() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::End,
                    offset,
                })
            }
        };

        let token = match c {
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) =>
            {
                self.scan_number()?
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            _ => self.scan_operator(c)?,
        };

        Ok(Spanned { token, offset })
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let digits_at = match self.peek_char_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self
                .peek_char_at(digits_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digits_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::UnexpectedToken {
                found: format!("number '{}'", num_str),
                offset: start,
            })
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        if self.operators.is_word_operator(text) {
            Token::Operator(text.to_ascii_uppercase())
        } else {
            Token::Identifier(text.to_string())
        }
    }

    fn scan_operator(&mut self, c: char) -> FormulaResult<Token> {
        let rest = &self.input[self.pos..];
        match self.operators.match_punctuation(rest) {
            Some(symbol) => {
                self.pos += symbol.len();
                Ok(Token::Operator(symbol.to_string()))
            }
            None => Err(FormulaError::Lex {
                character: c,
                offset: self.pos,
            }),
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = FormulaResult<Spanned>;

    /// Yields every token before `End`, stopping after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.next_token() {
            Ok(Spanned {
                token: Token::End, ..
            }) => {
                self.exhausted = true;
                None
            }
            Ok(spanned) => Some(Ok(spanned)),
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> FormulaResult<Vec<Token>> {
        let registry = OperatorRegistry::new();
        TokenStream::new(text, &registry)
            .map(|spanned| spanned.map(|s| s.token))
            .collect()
    }

    fn op(symbol: &str) -> Token {
        Token::Operator(symbol.into())
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 2.75 .5 1e3 2.5E-2").unwrap(),
            vec![
                Token::Number(42.0),
                Token::Number(2.75),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(0.025),
            ]
        );
    }

    #[test]
    fn test_exponent_needs_digits() {
        assert_eq!(
            tokens("2e").unwrap(),
            vec![Token::Number(2.0), Token::Identifier("e".into())]
        );
    }

    #[test]
    fn test_sign_is_not_part_of_literal() {
        assert_eq!(tokens("-5").unwrap(), vec![op("-"), Token::Number(5.0)]);
    }

    #[test]
    fn test_identifiers_and_words() {
        assert_eq!(
            tokens("rate_1 and NOT _x").unwrap(),
            vec![
                Token::Identifier("rate_1".into()),
                op("AND"),
                op("NOT"),
                Token::Identifier("_x".into()),
            ]
        );
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            tokens("a>=b<>c<d").unwrap(),
            vec![
                Token::Identifier("a".into()),
                op(">="),
                Token::Identifier("b".into()),
                op("<>"),
                Token::Identifier("c".into()),
                op("<"),
                Token::Identifier("d".into()),
            ]
        );
    }

    #[test]
    fn test_structure() {
        assert_eq!(
            tokens("f(a, b) ? 1 : 2").unwrap(),
            vec![
                Token::Identifier("f".into()),
                Token::LeftParen,
                Token::Identifier("a".into()),
                Token::Comma,
                Token::Identifier("b".into()),
                Token::RightParen,
                op("?"),
                Token::Number(1.0),
                op(":"),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_lex_error_offset() {
        assert_eq!(
            tokens("1 + $x"),
            Err(FormulaError::Lex {
                character: '$',
                offset: 4,
            })
        );
    }

    #[test]
    fn test_peek_does_not_advance() {
        let registry = OperatorRegistry::new();
        let mut stream = TokenStream::new("1 + 2", &registry);

        assert_eq!(stream.peek_token().unwrap().token, Token::Number(1.0));
        assert_eq!(stream.peek_token().unwrap().token, Token::Number(1.0));

        let first = stream.next_token().unwrap();
        assert_eq!(first.token, Token::Number(1.0));
        assert_eq!(first.offset, 0);

        let plus = stream.next_token().unwrap();
        assert_eq!(plus, Spanned { token: op("+"), offset: 2 });

        assert_eq!(stream.next_token().unwrap().token, Token::Number(2.0));
        assert_eq!(stream.next_token().unwrap().token, Token::End);
        assert_eq!(stream.next_token().unwrap().token, Token::End);
    }

    #[test]
    fn test_custom_symbols() {
        let mut registry = OperatorRegistry::new();
        registry
            .register(crate::operators::builtin::strict_divide("//"))
            .unwrap();

        let lexed: Vec<Token> = TokenStream::new("6//3/2", &registry)
            .map(|s| s.unwrap().token)
            .collect();
        assert_eq!(
            lexed,
            vec![
                Token::Number(6.0),
                op("//"),
                Token::Number(3.0),
                op("/"),
                Token::Number(2.0),
            ]
        );
    }
}
