use rlox::error::LoxError;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;

/// Runs the whole pipeline against a buffer sink and returns what `print`
/// emitted.
fn interpret(source: &str) -> Result<String, LoxError> {
    let tokens = Scanner::new(source).scan()?;

    let mut parser = Parser::new(tokens, 0);
    let statements = parser.parse()?;

    let mut interpreter: Interpreter<Vec<u8>> = Interpreter::new(Vec::new());
    Resolver::new(&mut interpreter).resolve(&statements)?;
    interpreter.interpret(&statements)?;

    Ok(String::from_utf8(interpreter.into_output()).expect("print output is UTF-8"))
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions and printing
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(interpret("print 1 + 2 * 3;").unwrap(), "7\n");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(interpret("print (1 + 2) * 3;").unwrap(), "9\n");
}

#[test]
fn fractional_results_print_six_decimals() {
    assert_eq!(interpret("print 10 / 4;").unwrap(), "2.500000\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(interpret("print \"a\" + \"b\";").unwrap(), "ab\n");
}

#[test]
fn mixed_type_equality_is_false() {
    assert_eq!(interpret("print 1 == \"1\";").unwrap(), "false\n");
    assert_eq!(interpret("print nil == false;").unwrap(), "false\n");
    assert_eq!(interpret("print nil == nil;").unwrap(), "true\n");
}

#[test]
fn comparisons() {
    assert_eq!(interpret("print 1 < 2; print 2 <= 2; print 3 > 4;").unwrap(), "true\ntrue\nfalse\n");
}

#[test]
fn unary_operators() {
    assert_eq!(interpret("print -3; print !nil; print !!0;").unwrap(), "-3\ntrue\ntrue\n");
}

#[test]
fn logical_operators_coerce_to_bool() {
    // The operands are not returned; the result is always a boolean.
    assert_eq!(interpret("print nil or false;").unwrap(), "false\n");
    assert_eq!(interpret("print nil or \"x\";").unwrap(), "true\n");
    assert_eq!(interpret("print 1 and 2;").unwrap(), "true\n");
    assert_eq!(interpret("print false and 2;").unwrap(), "false\n");
}

#[test]
fn logical_operators_short_circuit() {
    // The right-hand side would raise an undefined-variable error if reached.
    assert_eq!(interpret("print true or missing;").unwrap(), "true\n");
    assert_eq!(interpret("print false and missing;").unwrap(), "false\n");
}

#[test]
fn truthiness_law() {
    assert_eq!(
        interpret("if (nil) print \"T\"; else print \"F\";").unwrap(),
        "F\n"
    );
    assert_eq!(
        interpret("if (false) print \"T\"; else print \"F\";").unwrap(),
        "F\n"
    );
    assert_eq!(
        interpret("if (0) print \"T\"; else print \"F\";").unwrap(),
        "T\n"
    );
    assert_eq!(
        interpret("if (\"\") print \"T\"; else print \"F\";").unwrap(),
        "T\n"
    );
}

// ─────────────────────────────────────────────────────────────────────────
// Variables, scopes, control flow
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn block_shadowing_restores_outer_binding() {
    assert_eq!(
        interpret("var a = 1; { var a = 2; print a; } print a;").unwrap(),
        "2\n1\n"
    );
}

#[test]
fn uninitialized_variable_reads_nil() {
    assert_eq!(interpret("var a; print a;").unwrap(), "nil\n");
}

#[test]
fn assignment_is_an_expression_and_walks_parents() {
    assert_eq!(
        interpret("var a = 1; { a = 2; } print a;").unwrap(),
        "2\n"
    );
    assert_eq!(interpret("var a = 1; print a = 5;").unwrap(), "5\n");
}

#[test]
fn if_else_branches() {
    assert_eq!(
        interpret("var a = 3; if (a > 2) print \"big\"; else print \"small\";").unwrap(),
        "big\n"
    );
}

#[test]
fn while_loop() {
    assert_eq!(
        interpret("var i = 0; while (i < 3) { print i; i = i + 1; }").unwrap(),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_builds_a_string() {
    assert_eq!(
        interpret("var s = \"\"; for (var i = 0; i < 3; i = i + 1) s = s + \"x\"; print s;")
            .unwrap(),
        "xxx\n"
    );
}

#[test]
fn for_initializer_leaks_into_enclosing_scope() {
    assert_eq!(
        interpret("for (var i = 0; i < 3; i = i + 1) {} print i;").unwrap(),
        "3\n"
    );
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let err = interpret("print ghost;").unwrap_err();

    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("undefined variable ghost"));
}

#[test]
fn self_initializer_is_a_resolve_error() {
    let err = interpret("{ var a = \"outer\"; { var a = a; } }").unwrap_err();

    assert!(matches!(err, LoxError::Resolve { .. }));
    assert!(err
        .to_string()
        .contains("cannot read local variable in its own initializer"));
}

// ─────────────────────────────────────────────────────────────────────────
// Functions and closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn recursive_fibonacci() {
    let source = "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);";

    assert_eq!(interpret(source).unwrap(), "55\n");
}

#[test]
fn closure_counter_keeps_state() {
    let source = "
        fun make() {
            var i = 0;
            fun inc() {
                i = i + 1;
                return i;
            }
            return inc;
        }
        var c = make();
        print c();
        print c();
        print c();
    ";

    assert_eq!(interpret(source).unwrap(), "1\n2\n3\n");
}

#[test]
fn independent_closures_do_not_share_state() {
    let source = "
        fun make() {
            var i = 0;
            fun inc() {
                i = i + 1;
                return i;
            }
            return inc;
        }
        var a = make();
        var b = make();
        print a();
        print a();
        print b();
    ";

    assert_eq!(interpret(source).unwrap(), "1\n2\n1\n");
}

#[test]
fn return_unwinds_nested_blocks_and_loops() {
    let source = "
        fun find() {
            var i = 0;
            while (true) {
                if (i == 4) {
                    return i;
                }
                i = i + 1;
            }
        }
        print find();
    ";

    assert_eq!(interpret(source).unwrap(), "4\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(interpret("fun f() { 1 + 1; } print f();").unwrap(), "nil\n");
}

#[test]
fn parameters_shadow_globals() {
    let source = "var x = \"global\"; fun show(x) { print x; } show(\"local\"); print x;";

    assert_eq!(interpret(source).unwrap(), "local\nglobal\n");
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    let err = interpret("fun f(a, b) { return a; } f(1);").unwrap_err();

    assert!(err.to_string().contains("expected 2 arguments but got 1"));
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let err = interpret("\"x\"();").unwrap_err();

    assert!(err
        .to_string()
        .contains("can only call functions and classes"));
}

#[test]
fn return_outside_function_is_a_resolve_error() {
    let err = interpret("return 1;").unwrap_err();

    assert!(matches!(err, LoxError::Resolve { .. }));
    assert!(err.to_string().contains("'return' used outside of function"));
}

#[test]
fn functions_print_by_name() {
    assert_eq!(interpret("fun f() { return 1; } print f;").unwrap(), "<fn f>\n");
}

#[test]
fn clock_yields_a_positive_number() {
    assert_eq!(interpret("print clock() > 0;").unwrap(), "true\n");
}

#[test]
fn clock_takes_no_arguments() {
    let err = interpret("clock(1);").unwrap_err();

    assert!(err.to_string().contains("expected 0 arguments but got 1"));
}

// ─────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn class_constructs_a_field_bag() {
    assert_eq!(
        interpret("class P {} var p = P(); p.x = 42; print p.x;").unwrap(),
        "42\n"
    );
}

#[test]
fn missing_field_reads_nil() {
    assert_eq!(
        interpret("class P {} var p = P(); print p.x;").unwrap(),
        "nil\n"
    );
}

#[test]
fn instances_print_their_class_name() {
    assert_eq!(interpret("class P {} print P();").unwrap(), "P\n");
}

#[test]
fn methods_are_inert() {
    // Methods parse but are never installed; reading one is a plain missing
    // field.
    assert_eq!(
        interpret("class P { m() { return 1; } } var p = P(); print p.m;").unwrap(),
        "nil\n"
    );
}

#[test]
fn class_constructor_takes_no_arguments() {
    let err = interpret("class P {} P(1);").unwrap_err();

    assert!(err.to_string().contains("expected 0 arguments but got 1"));
}

#[test]
fn instances_share_identity_through_variables() {
    let source = "class P {} var p = P(); var q = p; q.x = 1; print p.x; print p == q;";

    assert_eq!(interpret(source).unwrap(), "1\ntrue\n");
}

#[test]
fn property_access_on_non_instance_is_a_runtime_error() {
    let err = interpret("var x = 1; print x.y;").unwrap_err();

    assert!(err.to_string().contains("invalid property 'y'"));
}

#[test]
fn property_write_on_non_instance_is_a_runtime_error() {
    let err = interpret("var x = 1; x.y = 2;").unwrap_err();

    assert!(err.to_string().contains("invalid property 'y'"));
}

#[test]
fn error_in_property_object_expression_propagates() {
    let err = interpret("ghost.x;").unwrap_err();

    assert!(err.to_string().contains("undefined variable ghost"));
}

// ─────────────────────────────────────────────────────────────────────────
// Operator type errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn adding_number_and_string_is_a_runtime_error() {
    let err = interpret("1 + \"a\";").unwrap_err();

    assert!(err.to_string().contains("invalid operands for binary '+'"));
}

#[test]
fn comparing_mixed_types_is_a_runtime_error() {
    let err = interpret("1 < \"a\";").unwrap_err();

    assert!(err.to_string().contains("invalid operands for binary '<'"));
}

#[test]
fn negating_a_string_is_a_runtime_error() {
    let err = interpret("-\"a\";").unwrap_err();

    assert!(err.to_string().contains("bad operand for unary '-'"));
}

#[test]
fn runtime_errors_carry_the_source_line() {
    let err = interpret("var a = 1;\nvar b = 2;\nprint ghost;").unwrap_err();

    assert!(err.to_string().contains("line 3"));
}
