use crate::error::{Error, Position};

/// Token classes produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    String,
    Int,
    Bool,
    /// `=`, `+=` or `+`
    Operator,
    /// `{ } [ ] ( ) : , ;`
    Punct,
    /// `// ...` or `/* ... */`, lexeme includes the delimiters
    Comment,
    Eof,
}

/// A single token with its kind, text, and source location.
///
/// For strings `text` is the unescaped value, not the quoted source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub begin: Position,
    pub end: Position,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    /// Short human description for error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => format!("string \"{}\"", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

/// Tokenize the whole input, comments included, ending with an `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer {
        input,
        pos: 0,
        line: 0,
        column: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}

impl<'a> Lexer<'a> {
    // ── Helpers ──────────────────────────────────────────────────────

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    fn token(&self, kind: TokenKind, text: impl Into<String>, begin: Position) -> Token {
        Token {
            kind,
            text: text.into(),
            begin,
            end: self.position(),
        }
    }

    // ── Token dispatch ──────────────────────────────────────────────

    fn next_token(&mut self) -> Result<Token, Error> {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }

        let begin = self.position();
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(self.token(TokenKind::Eof, "", begin)),
        };

        if self.starts_with("//") {
            return Ok(self.line_comment(begin));
        }
        if self.starts_with("/*") {
            return self.block_comment(begin);
        }

        match ch {
            '"' => self.double_quoted(begin),
            '`' => self.backtick(begin),
            '{' | '}' | '[' | ']' | '(' | ')' | ':' | ',' | ';' => {
                self.bump();
                Ok(self.token(TokenKind::Punct, ch.to_string(), begin))
            }
            '+' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    Ok(self.token(TokenKind::Operator, "+=", begin))
                } else {
                    Ok(self.token(TokenKind::Operator, "+", begin))
                }
            }
            '=' => {
                self.bump();
                Ok(self.token(TokenKind::Operator, "=", begin))
            }
            c if c.is_ascii_digit() => Ok(self.integer(begin)),
            '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.integer(begin))
            }
            c if c.is_alphabetic() || c == '_' => Ok(self.word(begin)),
            c => {
                self.bump();
                Err(Error::syntax_error(
                    format!("Unexpected character '{}'", c),
                    begin,
                    self.position(),
                ))
            }
        }
    }

    // ── Comments ────────────────────────────────────────────────────

    fn line_comment(&mut self, begin: Position) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
        let text = &self.input[start..self.pos];
        self.token(TokenKind::Comment, text, begin)
    }

    fn block_comment(&mut self, begin: Position) -> Result<Token, Error> {
        let start = self.pos;
        self.bump();
        self.bump();
        loop {
            if self.starts_with("*/") {
                self.bump();
                self.bump();
                let text = &self.input[start..self.pos];
                return Ok(self.token(TokenKind::Comment, text, begin));
            }
            if self.bump().is_none() {
                return Err(Error::syntax_error(
                    "Unterminated block comment".to_string(),
                    begin,
                    self.position(),
                ));
            }
        }
    }

    // ── Literals ────────────────────────────────────────────────────

    fn double_quoted(&mut self, begin: Position) -> Result<Token, Error> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(self.token(TokenKind::String, value, begin)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(other) => value.push(other),
                    None => break,
                },
                Some('\n') | None => break,
                Some(ch) => value.push(ch),
            }
        }
        Err(Error::syntax_error(
            "Unterminated string".to_string(),
            begin,
            self.position(),
        ))
    }

    fn backtick(&mut self, begin: Position) -> Result<Token, Error> {
        self.bump();
        let start = self.pos;
        loop {
            match self.peek_char() {
                Some('`') => {
                    let value = self.input[start..self.pos].to_string();
                    self.bump();
                    return Ok(self.token(TokenKind::String, value, begin));
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(Error::syntax_error(
                        "Unterminated raw string".to_string(),
                        begin,
                        self.position(),
                    ))
                }
            }
        }
    }

    fn integer(&mut self, begin: Position) -> Token {
        let start = self.pos;
        if self.peek_char() == Some('-') {
            self.bump();
        }
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        self.token(TokenKind::Int, text, begin)
    }

    fn word(&mut self, begin: Position) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        let kind = match text {
            "true" | "false" => TokenKind::Bool,
            _ => TokenKind::Ident,
        };
        self.token(kind, text, begin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_and_operators() {
        let toks = tokenize("a += b + [c];").unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "+=", "b", "+", "[", "c", "]", ";", ""]);
        assert!(toks[1].is_operator("+="));
        assert!(toks[3].is_operator("+"));
    }

    #[test]
    fn test_comments_are_tokens() {
        assert_eq!(
            kinds("// line\n/* block\n */ x"),
            vec![
                TokenKind::Comment,
                TokenKind::Comment,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_bool_int_and_negative() {
        assert_eq!(
            kinds("true false 42 -7"),
            vec![
                TokenKind::Bool,
                TokenKind::Bool,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let toks = tokenize(r#""a\"b\\c\n""#).unwrap();
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text, "a\"b\\c\n");
    }

    #[test]
    fn test_positions_track_lines() {
        let toks = tokenize("a\n  bb").unwrap();
        assert_eq!(toks[1].begin.line, 1);
        assert_eq!(toks[1].begin.column, 2);
        assert_eq!(toks[1].begin.offset, 4);
        assert_eq!(toks[1].end.column, 4);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = \"abc").unwrap_err();
        assert_eq!(err.code(), "syntax-error");
        assert_eq!(err.span().unwrap().0.column, 4);
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize("/* never closed").is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a = $b").unwrap_err();
        assert!(err.to_string().contains("Unexpected character '$'"));
    }
}
