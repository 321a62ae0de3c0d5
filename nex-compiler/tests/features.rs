mod common;

use std::collections::HashSet;
use std::rc::Rc;

use common::compile_and_run;

use nex_compiler::backend::elim_labels::elim_labels;
use nex_compiler::backend::elim_scopes::ElimScopes;
use nex_compiler::backend::instruction::{Instr, Reg};
use nex_compiler::frontend::grammar::{language_grammar, Grammar, LANGUAGE_GRAMMAR};
use nex_compiler::ir::code::{asm, block, AccessMode, Code, Procedure, Variable};
use nex_compiler::{compile, compile_to_asm, compile_to_words, words_to_bytes};

// ── Casts and literals ───────────────────────────────────────────────────

#[test]
fn char_literal_is_its_code_point() {
    let source = "fn main(x: i32, y: i32) -> i32 { return 'a' as i32; }";
    assert_eq!(compile_and_run(source, 0, 0), 97);
}

#[test]
fn string_literal_is_a_pointer_into_the_static_pool() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let s: *char = "A";
            return (*s) as i32;
        }
    "#;
    assert_eq!(compile_and_run(source, 0, 0), 65);
}

#[test]
fn string_pool_entries_are_null_terminated() {
    let source = r#"
        fn strlen(s: *char) -> i32 {
            let n: i32 = 0;
            while (((*s) as i32) != 0) {
                n = n + 1;
                s = ((s as i32) + 4) as *char;
            }
            return n;
        }
        fn main(x: i32, y: i32) -> i32 { return strlen("hello"); }
    "#;
    assert_eq!(compile_and_run(source, 0, 0), 5);
}

#[test]
fn bool_round_trips_through_casts() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let b: bool = (x > y) as bool;
            let r: i32 = 0;
            if (b) { r = 1; } else { r = 0; }
            return r;
        }
    "#;
    assert_eq!(compile_and_run(source, 9, 1), 1);
    assert_eq!(compile_and_run(source, 1, 9), 0);
}

#[test]
fn casts_are_bit_preserving() {
    let source = "fn main(x: i32, y: i32) -> i32 { return ((x as char) as i32) + y; }";
    assert_eq!(compile_and_run(source, 40, 2), 42);
}

// ── Grammar as an input ──────────────────────────────────────────────────

#[test]
fn a_loaded_grammar_file_behaves_like_the_built_in_one() {
    let grammar = Grammar::parse(LANGUAGE_GRAMMAR).unwrap();
    let source = "fn main(x: i32, y: i32) -> i32 { return x + y; }";
    assert_eq!(
        compile(source, &grammar).unwrap(),
        compile_to_words(source).unwrap()
    );
}

#[test]
fn compilation_is_deterministic() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let r: i32 = 0;
            if (x > y) { r = x; } else { r = y; }
            while (r > 10) { r = r - 10; }
            return r;
        }
    "#;
    assert_eq!(compile_to_words(source).unwrap(), compile_to_words(source).unwrap());
}

// ── The listing and label discipline ─────────────────────────────────────

#[test]
fn listing_defines_every_referenced_label_exactly_once() {
    let source = r#"
        fn add(a: i32, b: i32) -> i32 { return a + b; }
        fn main(x: i32, y: i32) -> i32 {
            let r: i32 = 0;
            if (x > y) { r = add(x, y); } else { r = y; }
            while (r > 100) { r = r - 100; }
            return r;
        }
    "#;
    let listing = compile_to_asm(source, &language_grammar()).unwrap();

    let mut defined: Vec<&str> = Vec::new();
    let mut used: Vec<&str> = Vec::new();
    for line in listing.lines() {
        let line = line.trim();
        if let Some(label) = line.strip_suffix(':') {
            defined.push(label);
        } else if let Some(operand) = line.strip_prefix(".word ") {
            if !operand.starts_with("0x") {
                used.push(operand);
            }
        } else if line.starts_with("beq") || line.starts_with("bne") {
            let target = line.rsplit(", ").next().unwrap();
            if target.parse::<i64>().is_err() {
                used.push(target);
            }
        }
    }

    let unique: HashSet<&str> = defined.iter().copied().collect();
    assert_eq!(unique.len(), defined.len(), "a label is defined twice:\n{listing}");
    for label in used {
        assert!(unique.contains(label), "label {label} used but not defined:\n{listing}");
    }
}

#[test]
fn every_emitted_word_is_32_bits_and_serialises_big_endian() {
    let words = compile_to_words("fn main(x: i32, y: i32) -> i32 { return x; }").unwrap();
    let bytes = words_to_bytes(&words);
    assert_eq!(bytes.len(), words.len() * 4);
    assert_eq!(
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        words[0]
    );
}

#[test]
fn undefined_label_is_fatal() {
    let items = vec![
        asm(Instr::Lis { d: Reg::TargetPC }),
        Rc::new(Code::UseLabel("nowhere".to_string())),
    ];
    assert!(elim_labels(items).is_err());
}

// ── Pass idempotence ─────────────────────────────────────────────────────

fn encode_flat(items: &[Rc<Code>]) -> Vec<u32> {
    items
        .iter()
        .map(|item| match item.as_ref() {
            Code::Assembly(instr) => instr.encode(),
            Code::Word(value) => *value,
            other => panic!("unresolved node after elim_labels: {other:?}"),
        })
        .collect()
}

#[test]
fn elim_labels_twice_leaves_the_word_stream_unchanged() {
    let items = vec![
        Rc::new(Code::DefineLabel("head".to_string())),
        asm(Instr::mov(Reg::Result, Reg::Input1)),
        Rc::new(Code::BeqLabel { lhs: Reg::Result, rhs: Reg::Zero, label: "end".to_string() }),
        asm(Instr::Lis { d: Reg::TargetPC }),
        Rc::new(Code::UseLabel("head".to_string())),
        asm(Instr::Jr { s: Reg::TargetPC }),
        Rc::new(Code::DefineLabel("end".to_string())),
        asm(Instr::Jr { s: Reg::ReturnAddr }),
    ];

    let once = elim_labels(items).unwrap();
    let twice = elim_labels(once.clone()).unwrap();
    assert_eq!(encode_flat(&once), encode_flat(&twice));
}

#[test]
fn elim_scopes_on_its_own_output_is_a_no_op() {
    let proc = Procedure::new("f", 0, vec![Variable::fresh("p")]);
    let a = Variable::fresh("a");
    let b = Variable::fresh("b");
    let code = block(vec![
        Rc::new(Code::VarAccess { var: a.clone(), reg: Reg::Result, mode: AccessMode::Write }),
        Rc::new(Code::VarAccess {
            var: proc.parameters[0].clone(),
            reg: Reg::Result,
            mode: AccessMode::Read,
        }),
        Rc::new(Code::VarAccess { var: b.clone(), reg: Reg::Result, mode: AccessMode::Read }),
        Rc::new(Code::VarAccess { var: a.clone(), reg: Reg::Result, mode: AccessMode::Read }),
    ]);

    let mut first = ElimScopes::new(&proc);
    let output = first.visit(&code);
    assert!(Rc::ptr_eq(&code, &output), "the pass must not rebuild the tree");
    let first_locals = first.locals();

    // Parameters and reserved slots are excluded; duplicates collapse.
    assert_eq!(first_locals.len(), 2);
    assert!(first_locals[0].as_ref() == a.as_ref());
    assert!(first_locals[1].as_ref() == b.as_ref());

    let mut second = ElimScopes::new(&proc);
    second.visit(&output);
    let second_locals = second.locals();
    assert_eq!(first_locals, second_locals);
}

// ── Scope discipline end-to-end ──────────────────────────────────────────

#[test]
fn nested_scopes_merge_into_one_frame() {
    let source = r#"
        fn main(x: i32, y: i32) -> i32 {
            let total: i32 = 0;
            if (x > 0) {
                let inner: i32 = x * 2;
                total = total + inner;
            } else {
                let inner: i32 = y * 3;
                total = total + inner;
            }
            while (total > 100) {
                let step: i32 = 10;
                total = total - step;
            }
            return total;
        }
    "#;
    assert_eq!(compile_and_run(source, 60, 0), 100);
    assert_eq!(compile_and_run(source, 0, 5), 15);
}

#[test]
fn empty_parameter_procedures_call_cleanly() {
    let source = r#"
        fn forty_two() -> i32 { return 42; }
        fn main(x: i32, y: i32) -> i32 { return forty_two() + x; }
    "#;
    assert_eq!(compile_and_run(source, 8, 0), 50);
}
