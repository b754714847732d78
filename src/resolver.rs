//! Static resolution pass.
//!
//! A single AST walk that runs between parsing and evaluation to:
//! 1. **Build lexical scopes**: a stack of `HashMap<String, bool>` tracking
//!    declared (false) and fully defined (true) names per nesting level. One
//!    initial scope is pushed before the program is walked, so top-level
//!    declarations are tracked like any block's.
//! 2. **Enforce static rules**: reading a local variable in its own
//!    initializer and `return` outside of a function are rejected here.
//! 3. **Record binding distances**: for every `Expr::Variable` and
//!    `Expr::Assign` target, the number of scopes between the use site and
//!    the binding is reported to the interpreter under the reference's id.
//!    Names not found in any scope get no record and are located at runtime
//!    by walking parent environments.
//!
//! Function declarations do not introduce their own name into the scope
//! stack, and `for` statements resolve their children without a scope of
//! their own; both fall back on the runtime parent walk, matching how the
//! evaluator treats them.

use std::collections::HashMap;
use std::io::Write;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// Are we inside a user function? Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances by calling back into the interpreter.
pub struct Resolver<'a, W: Write> {
    interpreter: &'a mut Interpreter<W>,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
}

impl<'a, W: Write> Resolver<'a, W> {
    pub fn new(interpreter: &'a mut Interpreter<W>) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: vec![HashMap::new()],
            current_function: FunctionType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for stmt in statements {
                    self.resolve_stmt(stmt)?;
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared but not yet defined while its initializer runs.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);
            }

            // The function's own name is not declared here; recursive calls
            // resolve through the runtime parent walk.
            Stmt::Function(declaration) => {
                self.resolve_function(declaration)?;
            }

            Stmt::Class { name, methods } => {
                self.declare(name);
                self.define(name);

                // Method bodies are checked even though the evaluator never
                // installs them.
                for method in methods {
                    self.resolve_function(method)?;
                }
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            // No scope of its own: an initializer declaration lands in the
            // enclosing scope, mirroring the evaluator.
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                if let Some(init) = initializer {
                    self.resolve_stmt(init)?;
                }

                if let Some(cond) = condition {
                    self.resolve_expr(cond)?;
                }

                if let Some(incr) = increment {
                    self.resolve_expr(incr)?;
                }

                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "'return' used outside of function",
                    ));
                }

                self.resolve_expr(value)?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { name, id } => {
                self.resolve_variable(name, *id)?;
            }

            // The target resolves like a read before the value is visited.
            Expr::Assign { name, id, value } => {
                self.resolve_variable(name, *id)?;
                self.resolve_expr(value)?;
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object)?;
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Fresh scope for a function's parameters and body.
    fn resolve_function(&mut self, declaration: &FunctionDecl) -> Result<()> {
        let enclosing: FunctionType = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();

        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &declaration.body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
    }

    fn resolve_variable(&mut self, name: &Token, id: usize) -> Result<()> {
        if let Some(scope) = self.scopes.last() {
            if scope.get(&name.lexeme) == Some(&false) {
                return Err(LoxError::resolve(
                    name.line,
                    "cannot read local variable in its own initializer",
                ));
            }
        }

        self.resolve_local(name, id);

        Ok(())
    }

    /// Record this reference as a local at its lexical depth, or leave it to
    /// the runtime parent walk when no scope holds the name.
    fn resolve_local(&mut self, name: &Token, id: usize) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Same-scope redeclaration is allowed; the name simply flips back to
    /// declared-but-undefined until its initializer finishes.
    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
}
