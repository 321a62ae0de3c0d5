//! Procedure prologue and epilogue around the frame chunk.

use std::rc::Rc;

use crate::ir::code::{asm, block, word, Chunk, Code, Procedure};
use crate::CompileError;

use super::instruction::{Instr, Reg};

fn missing_slot(name: &str) -> CompileError {
    CompileError::Codegen { message: format!("reserved slot {name} missing from the frame chunk") }
}

/// Wrap `body` with entry and exit code for `proc`.
///
/// On entry the frame is carved out of the stack and the caller's stack top
/// (the parameter block base), frame pointer, and the captured return address
/// are stored into the reserved slots. The epilogue label sits between body
/// and exit code so `return` lowers to a jump.
pub fn add_entry_exit(
    proc: &Procedure,
    frame: &Chunk,
    body: Rc<Code>,
) -> Result<Rc<Code>, CompileError> {
    let frame_bytes = frame.bytes();

    let prologue = block(vec![
        Rc::new(Code::DefineLabel(proc.entry_label.clone())),
        asm(Instr::Lis { d: Reg::Scratch }),
        word(frame_bytes),
        asm(Instr::Sub { d: Reg::StackPtr, s: Reg::StackPtr, t: Reg::Scratch }),
        // Scratch ← old stack top = the caller-built parameter block.
        asm(Instr::Add { d: Reg::Scratch, s: Reg::StackPtr, t: Reg::Scratch }),
        frame
            .store(Reg::StackPtr, &proc.param_ptr, Reg::Scratch)
            .ok_or_else(|| missing_slot("param_ptr"))?,
        frame
            .store(Reg::StackPtr, &proc.dynamic_link, Reg::FramePtr)
            .ok_or_else(|| missing_slot("dynamic_link"))?,
        frame
            .store(Reg::StackPtr, &proc.saved_pc, Reg::ReturnAddr)
            .ok_or_else(|| missing_slot("saved_pc"))?,
        asm(Instr::mov(Reg::FramePtr, Reg::StackPtr)),
    ]);

    let epilogue = block(vec![
        Rc::new(Code::DefineLabel(proc.epilogue_label.clone())),
        frame
            .load(Reg::FramePtr, Reg::ReturnAddr, &proc.saved_pc)
            .ok_or_else(|| missing_slot("saved_pc"))?,
        asm(Instr::mov(Reg::StackPtr, Reg::FramePtr)),
        // FramePtr is restored last; it is the base of the load itself.
        frame
            .load(Reg::FramePtr, Reg::FramePtr, &proc.dynamic_link)
            .ok_or_else(|| missing_slot("dynamic_link"))?,
        asm(Instr::Lis { d: Reg::Scratch }),
        word(frame_bytes),
        asm(Instr::Add { d: Reg::StackPtr, s: Reg::StackPtr, t: Reg::Scratch }),
        asm(Instr::Jr { s: Reg::ReturnAddr }),
    ]);

    Ok(block(vec![prologue, body, epilogue]))
}
