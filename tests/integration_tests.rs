use indoc::indoc;
use py2cpp::analyzer::{ParamMode, Ty};
use py2cpp::error::{CompileError, SyntaxError};
use py2cpp::lexer::TokenKind;
use py2cpp::parser::*;

fn generate_ast(input: &str) -> Program {
    let tokens = py2cpp::tokenize(input).unwrap();
    py2cpp::parse(tokens).unwrap()
}

fn extract_expr(program: &Program) -> &Expr {
    let Some(Stmt::Assign(_, expr)) = program.0.first() else {
        panic!("{:?}", program);
    };
    expr
}

#[test]
fn compare_ast() {
    let ast1 = generate_ast("x = 1 + 2 * 3");
    let ast2 = generate_ast("x = 1 + (2 * 3)");
    let ast3 = generate_ast("x = (1 + 2) * 3");

    assert_eq!(extract_expr(&ast1), extract_expr(&ast2));
    assert_ne!(extract_expr(&ast1), extract_expr(&ast3));
}

#[test]
fn pipeline_is_deterministic() {
    let input = indoc! {"
        def fib(n):
            if n < 2:
                return n
            return fib(n - 1) + fib(n - 2)

        i = 0
        while i < 10:
            print(fib(i))
            i += 1
    "};
    assert_eq!(py2cpp::compile(input).unwrap(), py2cpp::compile(input).unwrap());
}

#[test]
fn output_ends_with_newline() {
    let output = py2cpp::compile("print(1 + 2)").unwrap();
    assert!(output.ends_with("    return 0;\n}\n"));
    assert!(output.contains("cout << py_str(1 + 2) << endl;"));
}

#[test]
fn missing_colon_is_a_syntax_error() {
    let err = py2cpp::compile("if x").unwrap_err();
    let CompileError::Syntax(SyntaxError::Unexpected { expected, found }) = err else {
        panic!("{err:?}");
    };
    assert_eq!(expected, "':'");
    assert_eq!(found.kind, TokenKind::Newline);
}

#[test]
fn error_messages_name_the_stage() {
    let err = py2cpp::compile("x = 1 $").unwrap_err();
    assert_eq!(
        err.to_string(),
        "lex error: unexpected character '$' at line 1, column 7"
    );

    let err = py2cpp::compile("while True:\n    pass\ncontinue\n").unwrap_err();
    assert_eq!(err.to_string(), "codegen error: 'continue' outside loop");
}

#[test]
fn quicksort_signatures() {
    let input = indoc! {"
        def partition(arr, low, high):
            pivot = arr[high]
            i = low - 1
            for j in range(low, high):
                if arr[j] <= pivot:
                    i += 1
                    arr[i], arr[j] = arr[j], arr[i]
            arr[i + 1], arr[high] = arr[high], arr[i + 1]
            return i + 1

        def quick_sort(arr, low, high):
            if low < high:
                pi = partition(arr, low, high)
                quick_sort(arr, low, pi - 1)
                quick_sort(arr, pi + 1, high)
    "};
    let program = generate_ast(input);
    let table = py2cpp::analyze(&program).unwrap();

    let partition = table.get_func("partition").unwrap();
    assert_eq!(partition.ret, Ty::Int);
    assert_eq!(partition.params[0].mode, ParamMode::MutRef);
    assert_eq!(partition.params[1].ty, Ty::Int);

    let quick_sort = table.get_func("quick_sort").unwrap();
    assert_eq!(quick_sort.ret, Ty::Void);
    assert_eq!(
        quick_sort.declaration(),
        "void quick_sort(vector<long long>& arr, long long low, long long high)"
    );
}

#[test]
fn string_concatenation_uses_py_str() {
    let output = py2cpp::compile("n = 3\nprint(\"n is \" + n + \"!\")\n").unwrap();
    assert!(output.contains("cout << string(\"n is \") + py_str(n) + \"!\" << endl;"));
}
