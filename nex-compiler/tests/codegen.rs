mod common;

use common::compile_and_run;

// ── End-to-end programs on the emulator ──────────────────────────────────

#[test]
fn trivial_return() {
    let source = "fn main(x: i32, y: i32) -> i32 { return x; }";
    assert_eq!(compile_and_run(source, 7, 99), 7);
}

#[test]
fn sum_through_a_local() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let r: i32 = 0;
            r = x + y;
            return r;
        }
    "#;
    assert_eq!(compile_and_run(source, 3, 4), 7);
}

#[test]
fn branch_computes_max() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let result: i32 = 0;
            if (x > y) {
                result = x;
            } else {
                result = y;
            }
            return result;
        }
    "#;
    assert_eq!(compile_and_run(source, 5, 12), 12);
    assert_eq!(compile_and_run(source, 9, 2), 9);
}

#[test]
fn loop_sums_one_to_n() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let n: i32 = x;
            let acc: i32 = y;
            while (n > 0) {
                acc = acc + n;
                n = n - 1;
            }
            return acc;
        }
    "#;
    assert_eq!(compile_and_run(source, 10, 0), 55);
}

#[test]
fn call_with_parameter_block() {
    let source = r#"
        fn add(a: i32, b: i32) -> i32 { return a + b; }
        fn main(x: i32, y: i32) -> i32 { return add(x, y); }
    "#;
    assert_eq!(compile_and_run(source, 2, 3), 5);
}

#[test]
fn nested_calls_preserve_the_dynamic_link() {
    let source = r#"
        fn double(a: i32) -> i32 { return a + a; }
        fn add_doubled(a: i32, b: i32) -> i32 { return double(a) + double(b); }
        fn main(x: i32, y: i32) -> i32 { return add_doubled(x, y); }
    "#;
    assert_eq!(compile_and_run(source, 3, 4), 14);
}

#[test]
fn recursion_factorial() {
    let source = r#"
        fn fact(n: i32) -> i32 {
            let result: i32 = 1;
            if (n > 1) {
                result = n * fact(n - 1);
            } else {
                result = 1;
            }
            return result;
        }
        fn main(x: i32, y: i32) -> i32 { return fact(x); }
    "#;
    assert_eq!(compile_and_run(source, 5, 0), 120);
    assert_eq!(compile_and_run(source, 1, 0), 1);
}

#[test]
fn mutual_recursion_type_checks_in_either_order() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 { return is_even(x); }
        fn is_even(n: i32) -> i32 {
            let result: i32 = 1;
            if (n == 0) { result = 1; } else { result = is_odd(n - 1); }
            return result;
        }
        fn is_odd(n: i32) -> i32 {
            let result: i32 = 0;
            if (n == 0) { result = 0; } else { result = is_even(n - 1); }
            return result;
        }
    "#;
    assert_eq!(compile_and_run(source, 10, 0), 1);
    assert_eq!(compile_and_run(source, 7, 0), 0);
}

// ── Arithmetic and operator semantics ────────────────────────────────────

#[test]
fn division_and_remainder() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 { return (x / y) * 100 + x % y; }
    "#;
    assert_eq!(compile_and_run(source, 17, 5), 302);
}

#[test]
fn arithmetic_wraps_two_complement() {
    // 2147483647 + 1 wraps to -2147483648; dividing by x recovers a value
    // observable through the result register.
    let source = r#"
        fn main(x: i32, y: i32) -> i32 { return 2147483647 + 1; }
    "#;
    assert_eq!(compile_and_run(source, 0, 0), 0x8000_0000u32);
}

#[test]
fn comparison_yields_zero_or_one() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            return (x < y) * 8 + (x == x) * 4 + (x >= y) * 2 + (x != x);
        }
    "#;
    assert_eq!(compile_and_run(source, 1, 2), 12);
    assert_eq!(compile_and_run(source, 2, 1), 6);
}

#[test]
fn logical_operators_normalise_any_nonzero() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 { return (x && y) * 10 + (x || y); }
    "#;
    assert_eq!(compile_and_run(source, 7, 3), 11);
    assert_eq!(compile_and_run(source, 7, 0), 1);
    assert_eq!(compile_and_run(source, 0, 0), 0);
}

#[test]
fn not_inverts_truthiness() {
    let source = "fn main(x: i32, y: i32) -> i32 { return !x * 10 + !y; }";
    assert_eq!(compile_and_run(source, 0, 5), 10);
    assert_eq!(compile_and_run(source, 3, 0), 1);
}

#[test]
fn operator_precedence_matches_the_layered_grammar() {
    let source = "fn main(x: i32, y: i32) -> i32 { return x + y * 3 - x / 2; }";
    // 10 + 21 - 5
    assert_eq!(compile_and_run(source, 10, 7), 26);
}

// ── Pointers and the address operator ────────────────────────────────────

#[test]
fn address_of_and_store_through_pointer() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let a: i32 = 5;
            let p: *i32 = &a;
            *p = x;
            return a;
        }
    "#;
    assert_eq!(compile_and_run(source, 42, 0), 42);
}

#[test]
fn pointer_to_parameter_crosses_the_call_boundary() {
    let source = r#"
        fn set(p: *i32, v: i32) -> i32 {
            *p = v;
            return 0;
        }
        fn main(x: i32, y: i32) -> i32 {
            let a: i32 = 0;
            set(&a, x + y);
            return a;
        }
    "#;
    assert_eq!(compile_and_run(source, 20, 22), 42);
}

#[test]
fn deref_reads_back_written_values() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let a: i32 = x;
            let p: *i32 = &a;
            return *p + y;
        }
    "#;
    assert_eq!(compile_and_run(source, 30, 12), 42);
}
