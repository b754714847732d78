use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, Literal};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::{Instance, LoxClass, LoxFunction, NativeFunction, Value};

/// Out-of-band control flow threaded through every statement and expression.
/// `Return` unwinds to the nearest function-call frame; everything else
/// propagates to the driver.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(error: LoxError) -> Self {
        Unwind::Error(error)
    }
}

impl From<io::Error> for Unwind {
    fn from(error: io::Error) -> Self {
        Unwind::Error(LoxError::Io(error))
    }
}

/// Tree-walking evaluator. Holds the current-environment pointer (rooted at
/// the global scope), the resolver's binding distances, and the sink that
/// `print` writes to (stdout in the binary, a buffer in tests).
pub struct Interpreter<W: Write> {
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        let environment = Rc::new(RefCell::new(Environment::new()));

        environment.borrow_mut().define(
            "clock",
            Value::NativeFunction(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock_native,
            }),
        );

        Interpreter {
            environment,
            locals: HashMap::new(),
            out,
        }
    }

    /// Records the binding distance for one variable reference. Called by the
    /// resolver; references without a record resolve through the runtime
    /// parent walk.
    pub fn note_local(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Consumes the interpreter and hands back its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.execute(stmt).map_err(|unwind| match unwind {
                Unwind::Return(_) => LoxError::runtime(0, "unexpected return"),
                Unwind::Error(error) => error,
            })?;
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> std::result::Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let previous: Rc<RefCell<Environment>> = self.environment.clone();

                self.environment =
                    Rc::new(RefCell::new(Environment::with_enclosing(previous.clone())));

                for stmt in statements {
                    if let Err(unwind) = self.execute(stmt) {
                        self.environment = previous;
                        return Err(unwind);
                    }
                }

                self.environment = previous;

                Ok(())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            // The loop shares the enclosing scope: an initializer declaration
            // stays visible after the loop exits.
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                if let Some(init) = initializer {
                    self.execute(init)?;
                }

                loop {
                    let running: bool = match condition {
                        Some(cond) => is_truthy(&self.evaluate(cond)?),
                        None => true,
                    };

                    if !running {
                        break;
                    }

                    self.execute(body)?;

                    if let Some(incr) = increment {
                        self.evaluate(incr)?;
                    }
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction {
                    declaration: declaration.clone(),
                    closure: self.environment.clone(),
                };

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = self.evaluate(value)?;

                Err(Unwind::Return(value))
            }

            Stmt::Class { name, methods: _ } => {
                let class = LoxClass {
                    name: name.lexeme.clone(),
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));

                Ok(())
            }
        }
    }

    fn evaluate(&mut self, expr: &Expr) -> std::result::Result<Value, Unwind> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { name, id } => {
                let distance: usize = self.locals.get(id).copied().unwrap_or(0);

                let value: Value =
                    self.environment
                        .borrow()
                        .get(&name.lexeme, distance, name.line)?;

                Ok(value)
            }

            // Assignment ignores the recorded distance and walks parents at
            // runtime.
            Expr::Assign { name, id: _, value } => {
                let value: Value = self.evaluate(value)?;

                self.environment
                    .borrow_mut()
                    .assign(&name.lexeme, value.clone(), name.line)?;

                Ok(value)
            }

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => Ok(instance.borrow().field(&name.lexeme)),

                    _ => Err(LoxError::runtime(
                        name.line,
                        format!("invalid property '{}'", name.lexeme),
                    )
                    .into()),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;

                        instance.borrow_mut().set_field(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(
                        name.line,
                        format!("invalid property '{}'", name.lexeme),
                    )
                    .into()),
                }
            }
        }
    }

    fn evaluate_unary(
        &mut self,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Unwind> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::Not => Ok(Value::Bool(!is_truthy(&value))),

            TokenType::Minus => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    format!("bad operand for unary '{}'", operator.lexeme),
                )
                .into()),
            },

            _ => Err(LoxError::runtime(
                operator.line,
                format!("bad operand for unary '{}'", operator.lexeme),
            )
            .into()),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Unwind> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        let invalid_operands = || -> Unwind {
            LoxError::runtime(
                operator.line,
                format!("invalid operands for binary '{}'", operator.lexeme),
            )
            .into()
        };

        match operator.token_type {
            TokenType::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(invalid_operands()),
            },

            TokenType::Minus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(invalid_operands()),
            },

            TokenType::Star => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(invalid_operands()),
            },

            TokenType::Slash => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(invalid_operands()),
            },

            TokenType::EqualEqual => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::NotEqual => Ok(Value::Bool(!is_equal(&left, &right))),

            TokenType::Greater => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(invalid_operands()),
            },

            TokenType::GreaterEqual => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(invalid_operands()),
            },

            TokenType::Less => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(invalid_operands()),
            },

            TokenType::LessEqual => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(invalid_operands()),
            },

            _ => Err(invalid_operands()),
        }
    }

    // Short-circuiting, but the result is coerced to a boolean rather than
    // being the operand itself.
    fn evaluate_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Unwind> {
        let left: Value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::Or => {
                if is_truthy(&left) {
                    Ok(Value::Bool(true))
                } else {
                    let right: Value = self.evaluate(right)?;
                    Ok(Value::Bool(is_truthy(&right)))
                }
            }

            TokenType::And => {
                if is_truthy(&left) {
                    let right: Value = self.evaluate(right)?;
                    Ok(Value::Bool(is_truthy(&right)))
                } else {
                    Ok(Value::Bool(false))
                }
            }

            _ => Err(LoxError::runtime(
                operator.line,
                format!("invalid operands for binary '{}'", operator.lexeme),
            )
            .into()),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> std::result::Result<Value, Unwind> {
        let callee: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee {
            Value::Function(function) => {
                let arity: usize = function.declaration.params.len();

                if arity != args.len() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!("expected {} arguments but got {}", arity, args.len()),
                    )
                    .into());
                }

                self.call_function(&function, args)
            }

            Value::NativeFunction(native) => {
                if native.arity != args.len() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!("expected {} arguments but got {}", native.arity, args.len()),
                    )
                    .into());
                }

                (native.func)(&args)
                    .map_err(|message| LoxError::runtime(paren.line, message).into())
            }

            Value::Class(class) => {
                if !args.is_empty() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!("expected 0 arguments but got {}", args.len()),
                    )
                    .into());
                }

                Ok(Value::Instance(Rc::new(RefCell::new(Instance::new(class)))))
            }

            _ => Err(LoxError::runtime(paren.line, "can only call functions and classes").into()),
        }
    }

    /// Runs a user function in a fresh child of its closure. The caller's
    /// environment is restored on every exit path, and a `Return` signal is
    /// caught at this frame.
    fn call_function(
        &mut self,
        function: &LoxFunction,
        args: Vec<Value>,
    ) -> std::result::Result<Value, Unwind> {
        let previous: Rc<RefCell<Environment>> = self.environment.clone();

        self.environment = Rc::new(RefCell::new(Environment::with_enclosing(
            function.closure.clone(),
        )));

        for (param, arg) in function.declaration.params.iter().zip(args) {
            self.environment.borrow_mut().define(&param.lexeme, arg);
        }

        let mut result: Value = Value::Nil;

        for stmt in &function.declaration.body {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Return(value)) => {
                    result = value;
                    break;
                }

                Err(unwind) => {
                    self.environment = previous;
                    return Err(unwind);
                }
            }
        }

        self.environment = previous;

        Ok(result)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,

        (Value::Bool(a), Value::Bool(b)) => a == b,

        (Value::Number(a), Value::Number(b)) => a == b,

        (Value::String(a), Value::String(b)) => a == b,

        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),

        (Value::NativeFunction(a), Value::NativeFunction(b)) => a.name == b.name,

        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),

        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),

        _ => false,
    }
}

fn clock_native(_args: &[Value]) -> std::result::Result<Value, String> {
    let seconds: u64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("clock error: {}", e))?
        .as_secs();

    Ok(Value::Number(seconds as f64))
}
