//! The lowering pass pipeline: typed IR in, machine words out.

pub mod elim_bin_ops;
pub mod elim_calls;
pub mod elim_if_stmts;
pub mod elim_labels;
pub mod elim_scopes;
pub mod elim_vars_proc;
pub mod entry_exit;
pub mod flatten;
pub mod instruction;

use std::rc::Rc;

use log::debug;

use crate::ir::code::{asm, block, reg_to_result, word, Chunk, Code, Procedure};
use crate::ir::ir_generator::ProgramIr;
use crate::CompileError;

use elim_bin_ops::ElimBinOps;
use elim_calls::ElimCalls;
use elim_if_stmts::ElimIfStmts;
use elim_scopes::ElimScopes;
use elim_vars_proc::ElimVarsProc;
use flatten::Flatten;
use instruction::{Instr, Reg};

/// Jumping here hands control back to the host.
pub const TERMINATION_PC: u32 = 0xFEE1_DEAD;

/// Run every pass and encode the program image.
pub fn lower_program(unit: ProgramIr) -> Result<Vec<u32>, CompileError> {
    let flat = lower_to_flat(unit)?;
    let resolved = elim_labels::elim_labels(flat)?;
    emit_words(&resolved)
}

/// Run every pass except label resolution and render the listing.
pub fn lower_to_listing(unit: ProgramIr) -> Result<String, CompileError> {
    let flat = lower_to_flat(unit)?;
    Ok(flatten::listing(&flat))
}

fn lower_to_flat(mut unit: ProgramIr) -> Result<Vec<Rc<Code>>, CompileError> {
    let start_id = unit.procedures.len();
    let mut start_proc = Procedure::new("start", start_id, Vec::new());
    start_proc.code = block(vec![
        Rc::new(Code::Call {
            proc: unit.main,
            args: vec![reg_to_result(Reg::Input1), reg_to_result(Reg::Input2)],
        }),
        asm(Instr::Lis { d: Reg::TargetPC }),
        word(TERMINATION_PC),
        asm(Instr::Jr { s: Reg::TargetPC }),
    ]);
    unit.procedures.push(start_proc);

    let elim_calls = ElimCalls::new(&unit.procedures);
    let mut elim_if_stmts = ElimIfStmts::new();

    // The start procedure is emitted first so execution begins at address 0.
    let order = std::iter::once(start_id).chain(0..start_id);
    let mut program_items = Vec::with_capacity(unit.procedures.len() + unit.static_data.len());

    for index in order {
        let proc = &unit.procedures[index];
        debug!("lowering procedure {}", proc.name);

        let code = elim_calls.rewrite(&proc.code)?;
        let code = elim_if_stmts.rewrite(&code)?;

        let mut elim_scopes = ElimScopes::new(proc);
        let code = elim_scopes.visit(&code);
        let locals = elim_scopes.locals();
        debug!("{} has {} local(s)", proc.name, locals.len());

        let mut frame_vars =
            vec![proc.param_ptr.clone(), proc.dynamic_link.clone(), proc.saved_pc.clone()];
        frame_vars.extend(locals);
        let frame = Chunk::new(frame_vars);

        let code = entry_exit::add_entry_exit(proc, &frame, code)?;

        let elim_vars = ElimVarsProc::new(frame, proc.param_chunk(), proc.param_ptr.clone());
        let code = elim_vars.rewrite(&code)?;

        let code = ElimBinOps.rewrite(&code)?;
        program_items.push(code);
    }

    program_items.extend(unit.static_data.iter().cloned());

    let mut flattener = Flatten::new();
    flattener.visit(&block(program_items))?;
    Ok(flattener.get())
}

fn emit_words(items: &[Rc<Code>]) -> Result<Vec<u32>, CompileError> {
    items
        .iter()
        .map(|item| match item.as_ref() {
            Code::Assembly(instr) => Ok(instr.encode()),
            Code::Word(value) => Ok(*value),
            other => Err(CompileError::Codegen {
                message: format!("cannot encode unresolved node {other:?}"),
            }),
        })
        .collect()
}
