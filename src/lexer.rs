//! Hand-rolled scanner for the S-expression front-end. The grammar is
//! ASCII-only: an identifier is one symbol-start character followed by any
//! number of symbol-or-digit characters, where "symbol" covers the ASCII
//! letters plus `! $ % & * + - . / : < = > ? @ ^ _ ~`.

use crate::error::LexError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Name,
    IntLiteral,
    OpenParen,
    CloseParen,
    EndOfInput,
    Invalid,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Token {
        Token {
            kind,
            text: text.into(),
        }
    }

    fn end_of_input() -> Token {
        Token::new(TokenKind::EndOfInput, "")
    }
}

fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic() || "!$%&*+-./:<=>?@^_~".contains(c)
}

fn is_symbol_continue(c: char) -> bool {
    is_symbol_start(c) || c.is_ascii_digit()
}

/// Cursor over the source bytes, grounded on the reference
/// `lc3-assembler`'s `Cursor` (byte slice + position, `peek`/`advance`).
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Cursor<'a> {
        Cursor {
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.bytes.get(self.pos).map(|&b| b as char)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }
}

/// Scans one [`Token`] at a time from a source string.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            cursor: Cursor::new(source),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cursor.peek(), Some(' ') | Some('\t') | Some('\r') | Some('\n') | Some('\x0C'))
        {
            self.cursor.advance();
        }
    }

    /// Returns the next token. Never fails: an unrecognised byte becomes an
    /// `Invalid` token rather than an error; callers that want lexing to
    /// fail fast on the first invalid token should use [`Lexer::scan`].
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.cursor.peek() {
            None => return Token::end_of_input(),
            Some(c) => c,
        };

        if c == '\0' {
            return Token::end_of_input();
        }

        if c == '(' {
            self.cursor.advance();
            return Token::new(TokenKind::OpenParen, "(");
        }

        if c == ')' {
            self.cursor.advance();
            return Token::new(TokenKind::CloseParen, ")");
        }

        if c.is_ascii_digit() {
            let mut text = String::new();
            while matches!(self.cursor.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.cursor.advance().unwrap());
            }
            return Token::new(TokenKind::IntLiteral, text);
        }

        if is_symbol_start(c) {
            let mut text = String::new();
            while matches!(self.cursor.peek(), Some(c) if is_symbol_continue(c)) {
                text.push(self.cursor.advance().unwrap());
            }
            return Token::new(TokenKind::Name, text);
        }

        self.cursor.advance();
        Token::new(TokenKind::Invalid, c.to_string())
    }

    /// Scans the full token stream, terminated by `EndOfInput`. Fails with
    /// [`LexError`] at the first `Invalid` token, matching
    /// `Scanner::scan`'s abort-on-invalid-token behaviour.
    pub fn scan(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let tok = self.next_token();

            match tok.kind {
                TokenKind::EndOfInput => {
                    tokens.push(tok);
                    break;
                }
                TokenKind::Invalid => {
                    return Err(LexError::UnexpectedCharacter(
                        tok.text.chars().next().unwrap_or('\0'),
                    ));
                }
                _ => tokens.push(tok),
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_simple_list() {
        let tokens = Lexer::new("(add 1 2)").scan().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::OpenParen,
                TokenKind::Name,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::CloseParen,
                TokenKind::EndOfInput,
            ]
        );
    }

    // Scenario S5: scanning the mixed digit/symbol sample.
    #[test]
    fn scans_scenario_s5() {
        let tokens = Lexer::new("123 (0456.@$@%789)))").scan().unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["123", "(", "0456", ".@$@%789", ")", ")", ")", ""]
        );
        assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfInput);
    }

    #[test]
    fn rejects_invalid_byte() {
        let err = Lexer::new("(foo #)").scan().unwrap_err();
        assert_eq!(err, LexError::UnexpectedCharacter('#'));
    }

    #[test]
    fn name_may_start_with_punctuation() {
        let tokens = Lexer::new("-foo").scan().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "-foo");
    }
}
