//! Lexer (tokenizer) for MPL source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! The lexer never fails: characters it does not recognise (including a lone
//! `!`) are skipped, and an unterminated string still yields a string token
//! holding whatever was read before end of input.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64, SourceLocation),
    StringLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Var(SourceLocation),
    Rule(SourceLocation),
    Function(SourceLocation),
    Return(SourceLocation),
    If(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    For(SourceLocation),
    Of(SourceLocation),
    In(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),    // +
    Minus(SourceLocation),   // -
    Star(SourceLocation),    // *
    Slash(SourceLocation),   // /
    Percent(SourceLocation), // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Assignment
    Eq(SourceLocation), // =

    // Punctuation
    Dot(SourceLocation),       // .
    Colon(SourceLocation),     // :
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Var(loc)
            | Token::Rule(loc)
            | Token::Function(loc)
            | Token::Return(loc)
            | Token::If(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::For(loc)
            | Token::Of(loc)
            | Token::In(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::Eq(loc)
            | Token::Dot(loc)
            | Token::Colon(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::StringLiteral(s, _) => write!(f, "string \"{}\"", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Var(_) => write!(f, "'var'"),
            Token::Rule(_) => write!(f, "'rule'"),
            Token::Function(_) => write!(f, "'function'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::For(_) => write!(f, "'for'"),
            Token::Of(_) => write!(f, "'of'"),
            Token::In(_) => write!(f, "'in'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Eq(_) => write!(f, "'='"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer for MPL source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input. The last token is always [`Token::Eof`].
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            if let Some(token) = self.next_token() {
                tokens.push(token);
            }
        }

        tokens
    }

    /// Lex one token, or `None` when the character was skipped.
    fn next_token(&mut self) -> Option<Token> {
        let loc = self.current_location();
        let ch = self.advance()?;

        let token = match ch {
            '"' => self.string_literal(loc),
            '0'..='9' => self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch, loc),

            '+' => Token::Plus(loc),
            '-' => Token::Minus(loc),
            '*' => Token::Star(loc),
            '/' => Token::Slash(loc),
            '%' => Token::Percent(loc),
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::EqEq(loc)
                } else {
                    Token::Eq(loc)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::NotEq(loc)
                } else {
                    return None;
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Le(loc)
                } else {
                    Token::Lt(loc)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Ge(loc)
                } else {
                    Token::Gt(loc)
                }
            }
            '.' => Token::Dot(loc),
            ':' => Token::Colon(loc),
            '(' => Token::LParen(loc),
            ')' => Token::RParen(loc),
            '{' => Token::LBrace(loc),
            '}' => Token::RBrace(loc),
            '[' => Token::LBracket(loc),
            ']' => Token::RBracket(loc),
            ';' => Token::Semicolon(loc),
            ',' => Token::Comma(loc),

            _ => return None,
        };

        Some(token)
    }

    /// Parse string literal; the opening quote is already consumed.
    fn string_literal(&mut self, loc: SourceLocation) -> Token {
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Token::StringLiteral(string, loc),
                '\\' => match self.advance() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('r') => string.push('\r'),
                    Some('\\') => string.push('\\'),
                    Some('"') => string.push('"'),
                    Some(other) => {
                        string.push('\\');
                        string.push(other);
                    }
                    None => string.push('\\'),
                },
                _ => string.push(ch),
            }
        }

        // Unterminated: keep what was read
        Token::StringLiteral(string, loc)
    }

    /// Parse numeric literal (unsigned integers only)
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Token {
        let mut num_str = String::new();
        num_str.push(first_digit);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // A digit run always parses as f64 (possibly to infinity).
        let value = num_str.parse::<f64>().unwrap_or(f64::INFINITY);
        Token::Number(value, loc)
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(
        &mut self,
        first_char: char,
        loc: SourceLocation,
    ) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "var" => Token::Var(loc),
            "rule" => Token::Rule(loc),
            "function" => Token::Function(loc),
            "return" => Token::Return(loc),
            "if" => Token::If(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "for" => Token::For(loc),
            "of" => Token::Of(loc),
            "in" => Token::In(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => {
                    self.skip_line_comment();
                }
                _ => break,
            }
        }
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Convenience wrapper: lex a whole source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<String> {
        tokenize(source).iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = tokenize("var rule function foo of in");
        assert!(matches!(tokens[0], Token::Var(_)));
        assert!(matches!(tokens[1], Token::Rule(_)));
        assert!(matches!(tokens[2], Token::Function(_)));
        assert!(matches!(&tokens[3], Token::Ident(s, _) if s == "foo"));
        assert!(matches!(tokens[4], Token::Of(_)));
        assert!(matches!(tokens[5], Token::In(_)));
        assert!(matches!(tokens[6], Token::Eof(_)));
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("== != <= >= < > ="),
            vec!["'=='", "'!='", "'<='", "'>='", "'<'", "'>'", "'='", "end of file"]
        );
    }

    #[test]
    fn test_lone_bang_and_unknown_chars_are_skipped() {
        assert_eq!(kinds("! @ # 1"), vec!["number 1", "end of file"]);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\nb\t\"q\"\\ \z""#);
        match &tokens[0] {
            Token::StringLiteral(s, _) => assert_eq!(s, "a\nb\t\"q\"\\ \\z"),
            other => panic!("expected string, got {other}"),
        }
    }

    #[test]
    fn test_unterminated_string_still_emitted() {
        let tokens = tokenize("\"abc");
        assert!(matches!(&tokens[0], Token::StringLiteral(s, _) if s == "abc"));
        assert!(matches!(tokens[1], Token::Eof(_)));
    }

    #[test]
    fn test_locations_track_lines_and_columns() {
        let tokens = tokenize("var x;\n  set(1, 2);");
        assert_eq!(tokens[0].location(), SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location(), SourceLocation::new(1, 5));
        assert_eq!(tokens[3].location(), SourceLocation::new(2, 3));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // trailing comment\n2"),
            vec!["number 1", "number 2", "end of file"]
        );
    }
}
