//! Benchmark comparing execution modes: tree-walk interpreter vs bytecode VM.
//!
//! Run with: cargo bench --bench mode_comparison

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use simian::bytecode::{Compiler, VM};
use simian::interpreter::Interpreter;
use simian::parser::parse_source;

/// Parse source code into an AST.
fn parse(source: &str) -> simian::ast::Program {
    parse_source(source).expect("parse error")
}

/// Run with the tree-walk interpreter.
fn run_tree_walk(source: &str) {
    let program = parse(source);
    let mut interpreter = Interpreter::new();
    interpreter.eval_program(&program);
}

/// Run with the bytecode VM.
fn run_bytecode(source: &str) {
    let program = parse(source);
    let mut compiler = Compiler::new();
    let bytecode = compiler.compile(&program).expect("compile error");
    let mut vm = VM::new();
    vm.run(bytecode).expect("runtime error");
}

/// Deeply nested arithmetic - tests dispatch overhead.
fn arithmetic_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");

    let source = "(1 + 2 * 3 - 4 / 2) * (5 + 6) * (7 - 8 / 4 + 9) * (1 + 2 * 3 - 4 / 2) \
                  + (10 - 3) * (2 + 2 * 2) - (9 / 3 + 1) * (4 * 4 - 6)";

    group.bench_function("tree_walk", |b| b.iter(|| run_tree_walk(black_box(source))));
    group.bench_function("bytecode", |b| b.iter(|| run_bytecode(black_box(source))));

    group.finish();
}

/// Conditionals - tests branching.
fn conditionals_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditionals");

    let source = "let a = if (1 < 2) { 10 } else { 20 };
                  let b = if (a > 5) { if (a > 9) { a * 2 } else { a } } else { 0 };
                  let c = if (!false) { b + a } else { b - a };
                  if (c == 30) { c } else { 0 }";

    group.bench_function("tree_walk", |b| b.iter(|| run_tree_walk(black_box(source))));
    group.bench_function("bytecode", |b| b.iter(|| run_bytecode(black_box(source))));

    group.finish();
}

/// Array and hash construction plus indexing - tests aggregate handling.
fn aggregates_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregates");

    let source = "let numbers = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
                  let table = {\"a\": 1, \"b\": 2, \"c\": 3, 4: \"four\", true: \"yes\"};
                  let head = first(numbers);
                  let rest = tail(numbers);
                  let grown = push(rest, table[\"a\"]);
                  head + numbers[3] + len(grown) + table[\"b\"]";

    group.bench_function("tree_walk", |b| b.iter(|| run_tree_walk(black_box(source))));
    group.bench_function("bytecode", |b| b.iter(|| run_bytecode(black_box(source))));

    group.finish();
}

/// Function calls - tests call overhead.
fn function_calls_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_calls");

    let source = "let add = fn(a, b) { a + b };
                  let double = fn(x) { x * 2 };
                  let apply = fn(x) { add(double(x), 1) };
                  apply(1) + apply(2) + apply(3) + apply(4) + apply(5)";

    group.bench_function("tree_walk", |b| b.iter(|| run_tree_walk(black_box(source))));
    group.bench_function("bytecode", |b| b.iter(|| run_bytecode(black_box(source))));

    group.finish();
}

/// String concatenation - tests string handling.
fn strings_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");

    let source = "let greet = fn(name) { \"Hello, \" + name + \"!\" };
                  len(greet(\"world\") + greet(\"simian\") + greet(\"bytecode\"))";

    group.bench_function("tree_walk", |b| b.iter(|| run_tree_walk(black_box(source))));
    group.bench_function("bytecode", |b| b.iter(|| run_bytecode(black_box(source))));

    group.finish();
}

criterion_group!(
    benches,
    arithmetic_comparison,
    conditionals_comparison,
    aggregates_comparison,
    function_calls_comparison,
    strings_comparison,
);

criterion_main!(benches);
