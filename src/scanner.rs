use log::{debug, info};
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "fun" => TokenType::Fun,
    "for" => TokenType::For,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

/// Lexer over the source text as a sequence of code points. Scanning stops on
/// the first lexical error; on success the token list ends with `Eof`.
#[derive(Debug, Clone)]
pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        info!("Initializing Scanner with {} bytes of source", source.len());

        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan(mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        info!("Reached end of input at line {}", self.line);

        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            String::new(),
            self.line,
        ));

        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<()> {
        let c: char = self.advance();

        debug!("Scanning '{}' at line {}", c, self.line);

        match c {
            '(' => self.add_token(TokenType::LeftParenthesis),

            ')' => self.add_token(TokenType::RightParenthesis),

            '{' => self.add_token(TokenType::LeftSquare),

            '}' => self.add_token(TokenType::RightSquare),

            ',' => self.add_token(TokenType::Comma),

            '.' => self.add_token(TokenType::Dot),

            '-' => self.add_token(TokenType::Minus),

            '+' => self.add_token(TokenType::Plus),

            ';' => self.add_token(TokenType::Semicolon),

            '*' => self.add_token(TokenType::Star),

            '!' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::NotEqual
                } else {
                    TokenType::Not
                };
                self.add_token(token_type);
            }

            '=' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }

            ' ' | '\r' | '\t' => {
                debug!("Skipping whitespace");
            }

            '\n' => {
                self.line += 1;
            }

            '/' => {
                if self.match_char('/') {
                    debug!("Found comment, skipping until newline");
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            '"' => self.scan_string()?,

            '0'..='9' => self.scan_number(),

            'a'..='z' | 'A'..='Z' => self.scan_identifier(),

            _ => {
                debug!("Unknown character '{}' at line {}", c, self.line);

                return Err(LoxError::lex(
                    self.line,
                    format!("unknown character '{}'", c),
                ));
            }
        }

        Ok(())
    }

    fn scan_string(&mut self) -> Result<()> {
        // The token reports the line the literal opened on.
        let opening_line: usize = self.line;

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "unterminated string"));
        }

        // Closing quote.
        self.advance();

        let lexeme: String = self.source[self.start..self.current].iter().collect();
        let literal: String = self.source[self.start + 1..self.current - 1].iter().collect();

        info!("Scanned string literal: {}", literal);

        self.tokens
            .push(Token::new(TokenType::String, lexeme, literal, opening_line));

        Ok(())
    }

    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // The dot is consumed only when a digit follows it.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let number: String = self.source[self.start..self.current].iter().collect();

        info!("Scanned number: {}", number);

        self.tokens.push(Token::new(
            TokenType::Number,
            number.clone(),
            number,
            self.line,
        ));
    }

    fn scan_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        match KEYWORDS.get(text.as_str()) {
            Some(token_type) => {
                info!("Scanned keyword: {}", text);

                self.add_token(*token_type);
            }

            None => {
                info!("Scanned identifier: {}", text);

                self.add_token(TokenType::Identifier);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();

        self.tokens
            .push(Token::new(token_type, lexeme, String::new(), self.line));
    }

    #[inline]
    fn advance(&mut self) -> char {
        let c: char = self.source[self.current];

        self.current += 1;

        c
    }

    #[inline]
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    #[inline]
    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}
