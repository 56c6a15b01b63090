/// Token types produced by the type-expression lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An identifier (type or class name)
    Name(String),
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `,`
    Comma,
    /// `|` union separator
    Pipe,
    /// `?` nullable marker
    Question,
    /// An unexpected byte
    Unexpected(char),
    /// End of input
    Eof,
}

/// A token with its byte offset in the input.
#[derive(Debug, Clone)]
pub struct Located {
    pub token: Token,
    pub offset: usize,
}

/// Tokenizer for type expressions.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        if self.pos < self.input.len() {
            Some(self.input[self.pos])
        } else {
            None
        }
    }

    fn advance(&mut self) -> Option<u8> {
        if self.pos < self.input.len() {
            let b = self.input[self.pos];
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek_byte() {
            self.advance();
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        // Name bytes are ASCII by construction.
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Located {
        self.skip_whitespace();
        let offset = self.pos;

        let token = match self.peek_byte() {
            None => Token::Eof,
            Some(b'<') => {
                self.advance();
                Token::Lt
            }
            Some(b'>') => {
                self.advance();
                Token::Gt
            }
            Some(b',') => {
                self.advance();
                Token::Comma
            }
            Some(b'|') => {
                self.advance();
                Token::Pipe
            }
            Some(b'?') => {
                self.advance();
                Token::Question
            }
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' => Token::Name(self.read_name()),
            Some(b) => {
                self.advance();
                Token::Unexpected(b as char)
            }
        };

        Located { token, offset }
    }

    /// Peek at the next token without consuming it.
    pub fn peek_token(&mut self) -> Located {
        let saved = self.pos;
        let tok = self.next_token();
        self.pos = saved;
        tok
    }
}
