use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, Literal};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Recursive-descent parser over the scanned token list. Fails fast on the
/// first syntax error; there is no synchronization.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: usize,
}

impl Parser {
    /// `first_id` seeds the per-reference id counter; a session that parses
    /// several chunks against one interpreter threads the counter through so
    /// ids stay unique across chunks.
    pub fn new(tokens: Vec<Token>, first_id: usize) -> Self {
        Parser {
            tokens,
            current: 0,
            next_id: first_id,
        }
    }

    /// The id the next parsed reference would receive.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        Ok(statements)
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_token(&[TokenType::Var]) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::Identifier)?;

        let initializer: Option<Expr> = if self.match_token(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon)?;

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_token(&[TokenType::If]) {
            return self.if_statement();
        }

        if self.match_token(&[TokenType::For]) {
            return self.for_statement();
        }

        if self.match_token(&[TokenType::Fun]) {
            let declaration = self.function_declaration()?;
            return Ok(Stmt::Function(declaration));
        }

        if self.match_token(&[TokenType::Class]) {
            return self.class_statement();
        }

        if self.match_token(&[TokenType::Print]) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::Semicolon)?;
            return Ok(Stmt::Print(expr));
        }

        if self.match_token(&[TokenType::Return]) {
            let keyword: Token = self.previous().clone();
            let value: Expr = self.expression()?;
            self.consume(TokenType::Semicolon)?;
            return Ok(Stmt::Return { keyword, value });
        }

        if self.match_token(&[TokenType::While]) {
            return self.while_statement();
        }

        if self.match_token(&[TokenType::LeftSquare]) {
            return Ok(Stmt::Block(self.block()?));
        }

        let expr: Expr = self.expression()?;
        self.consume(TokenType::Semicolon)?;

        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParenthesis)?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RightParenthesis)?;

        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.match_token(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParenthesis)?;

        let initializer: Option<Box<Stmt>> = if self.match_token(&[TokenType::Semicolon]) {
            None
        } else if self.match_token(&[TokenType::Var]) {
            Some(Box::new(self.var_declaration()?))
        } else {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::Semicolon)?;
            Some(Box::new(Stmt::Expression(expr)))
        };

        let condition: Option<Expr> = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon)?;

        let increment: Option<Expr> = if self.check(TokenType::RightParenthesis) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParenthesis)?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn function_declaration(&mut self) -> Result<Rc<FunctionDecl>> {
        let name: Token = self.consume(TokenType::Identifier)?;

        self.consume(TokenType::LeftParenthesis)?;

        let mut params: Vec<Token> = Vec::new();
        if !self.check(TokenType::RightParenthesis) {
            loop {
                params.push(self.consume(TokenType::Identifier)?);

                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParenthesis)?;
        self.consume(TokenType::LeftSquare)?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn class_statement(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::Identifier)?;

        self.consume(TokenType::LeftSquare)?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        while !self.check(TokenType::RightSquare) && !self.is_at_end() {
            // A method reads like a function declaration without the keyword.
            methods.push(self.function_declaration()?);
        }

        self.consume(TokenType::RightSquare)?;

        Ok(Stmt::Class { name, methods })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParenthesis)?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RightParenthesis)?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RightSquare) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightSquare)?;

        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.or()?;

        if self.match_token(&[TokenType::Equal]) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    name,
                    id: self.fresh_id(),
                    value: Box::new(value),
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),

                _ => Err(LoxError::parse(equals.line, "invalid assignment target")),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.and()?;

        while self.match_token(&[TokenType::Or]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.match_token(&[TokenType::And]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.match_token(&[TokenType::NotEqual, TokenType::EqualEqual]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.match_token(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.match_token(&[TokenType::Minus, TokenType::Plus]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.match_token(&[TokenType::Slash, TokenType::Star]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_token(&[TokenType::Not, TokenType::Minus]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.match_token(&[TokenType::LeftParenthesis]) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&[TokenType::Dot]) {
                let name: Token = self.consume(TokenType::Identifier)?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RightParenthesis) {
            loop {
                arguments.push(self.expression()?);

                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RightParenthesis)?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_token(&[TokenType::True]) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }

        if self.match_token(&[TokenType::False]) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }

        if self.match_token(&[TokenType::Nil]) {
            return Ok(Expr::Literal(Literal::Nil));
        }

        if self.match_token(&[TokenType::Number]) {
            let token: &Token = self.previous();
            let value: f64 = token
                .literal
                .parse()
                .map_err(|_| LoxError::parse(token.line, "invalid number literal"))?;
            return Ok(Expr::Literal(Literal::Number(value)));
        }

        if self.match_token(&[TokenType::String]) {
            let literal: String = self.previous().literal.clone();
            return Ok(Expr::Literal(Literal::String(literal)));
        }

        if self.match_token(&[TokenType::Identifier]) {
            let name: Token = self.previous().clone();
            return Ok(Expr::Variable {
                name,
                id: self.fresh_id(),
            });
        }

        if self.match_token(&[TokenType::LeftParenthesis]) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RightParenthesis)?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse(
            self.peek().line,
            format!("unknown token '{}'", self.peek().lexeme),
        ))
    }

    fn fresh_id(&mut self) -> usize {
        let id: usize = self.next_id;
        self.next_id += 1;
        id
    }

    fn match_token(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn consume(&mut self, token_type: TokenType) -> Result<Token> {
        if self.check(token_type) {
            self.advance();
            return Ok(self.previous().clone());
        }

        Err(LoxError::parse(
            self.peek().line,
            format!("expected '{}'", token_type),
        ))
    }

    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}
