//! Target machine instructions and their 32-bit word encodings.
//!
//! The target is a MIPS-style word machine: R-format three-register
//! operations, I-format loads/stores/branches with 16-bit signed immediates,
//! and register-indirect jumps. `lis` loads the *next program word* into its
//! destination register and skips it.

use std::fmt;

use crate::CompileError;

// ============================================================================
// Registers
// ============================================================================

/// The fixed-purpose register convention. `Zero` and `ReturnAddr` are imposed
/// by the ISA; the rest is the compiler's calling convention and every pass
/// honours it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// Hardwired zero.
    Zero,
    /// First program input, handed to `main`.
    Input1,
    /// Second program input.
    Input2,
    /// Expression result and return value.
    Result,
    /// Pass-internal temporary.
    Scratch,
    /// Staging register for `lis` + `jr`/`jalr` jump targets.
    TargetPC,
    /// Base of the current frame chunk.
    FramePtr,
    /// Stack top; the stack grows towards lower addresses.
    StackPtr,
    /// Captured program counter of `jalr`.
    ReturnAddr,
}

impl Reg {
    pub fn number(self) -> u32 {
        match self {
            Reg::Zero => 0,
            Reg::Input1 => 1,
            Reg::Input2 => 2,
            Reg::Result => 3,
            Reg::Scratch => 4,
            Reg::TargetPC => 8,
            Reg::FramePtr => 29,
            Reg::StackPtr => 30,
            Reg::ReturnAddr => 31,
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.number())
    }
}

// ============================================================================
// Instructions
// ============================================================================

/// A typed target instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    // ── R format ───────────────────────────────────────────────────────
    /// `add $d, $s, $t`
    Add { d: Reg, s: Reg, t: Reg },
    /// `sub $d, $s, $t`
    Sub { d: Reg, s: Reg, t: Reg },
    /// `slt $d, $s, $t` — signed set-less-than
    Slt { d: Reg, s: Reg, t: Reg },
    /// `sltu $d, $s, $t` — unsigned set-less-than
    Sltu { d: Reg, s: Reg, t: Reg },
    /// `mult $s, $t` — product into hi:lo
    Mult { s: Reg, t: Reg },
    /// `div $s, $t` — quotient into lo, remainder into hi
    Div { s: Reg, t: Reg },
    /// `mfhi $d`
    Mfhi { d: Reg },
    /// `mflo $d`
    Mflo { d: Reg },
    /// `lis $d` — load the following program word, skip it
    Lis { d: Reg },
    /// `jr $s`
    Jr { s: Reg },
    /// `jalr $s` — jump and capture the PC in `$31`
    Jalr { s: Reg },

    // ── I format ───────────────────────────────────────────────────────
    /// `lw $t, offset($s)`
    Lw { t: Reg, offset: i16, s: Reg },
    /// `sw $t, offset($s)`
    Sw { t: Reg, offset: i16, s: Reg },
    /// `beq $s, $t, offset` — PC-relative in words
    Beq { s: Reg, t: Reg, offset: i16 },
    /// `bne $s, $t, offset`
    Bne { s: Reg, t: Reg, offset: i16 },
}

// Funct codes for the R format.
const FUNCT_ADD: u32 = 0x20;
const FUNCT_SUB: u32 = 0x22;
const FUNCT_SLT: u32 = 0x2a;
const FUNCT_SLTU: u32 = 0x2b;
const FUNCT_MULT: u32 = 0x18;
const FUNCT_DIV: u32 = 0x1a;
const FUNCT_MFHI: u32 = 0x10;
const FUNCT_MFLO: u32 = 0x12;
const FUNCT_LIS: u32 = 0x14;
const FUNCT_JR: u32 = 0x08;
const FUNCT_JALR: u32 = 0x09;

// Opcodes for the I format.
const OP_LW: u32 = 0x23;
const OP_SW: u32 = 0x2b;
const OP_BEQ: u32 = 0x04;
const OP_BNE: u32 = 0x05;

fn r_format(s: Reg, t: Reg, d: Reg, funct: u32) -> u32 {
    (s.number() << 21) | (t.number() << 16) | (d.number() << 11) | funct
}

fn i_format(op: u32, s: Reg, t: Reg, imm: i16) -> u32 {
    (op << 26) | (s.number() << 21) | (t.number() << 16) | (imm as u16 as u32)
}

impl Instr {
    /// `add $d, $s, $0` — register-to-register move.
    pub fn mov(d: Reg, s: Reg) -> Instr {
        Instr::Add { d, s, t: Reg::Zero }
    }

    /// Encode to one 32-bit word.
    pub fn encode(self) -> u32 {
        match self {
            Instr::Add { d, s, t } => r_format(s, t, d, FUNCT_ADD),
            Instr::Sub { d, s, t } => r_format(s, t, d, FUNCT_SUB),
            Instr::Slt { d, s, t } => r_format(s, t, d, FUNCT_SLT),
            Instr::Sltu { d, s, t } => r_format(s, t, d, FUNCT_SLTU),
            Instr::Mult { s, t } => r_format(s, t, Reg::Zero, FUNCT_MULT),
            Instr::Div { s, t } => r_format(s, t, Reg::Zero, FUNCT_DIV),
            Instr::Mfhi { d } => r_format(Reg::Zero, Reg::Zero, d, FUNCT_MFHI),
            Instr::Mflo { d } => r_format(Reg::Zero, Reg::Zero, d, FUNCT_MFLO),
            Instr::Lis { d } => r_format(Reg::Zero, Reg::Zero, d, FUNCT_LIS),
            Instr::Jr { s } => r_format(s, Reg::Zero, Reg::Zero, FUNCT_JR),
            Instr::Jalr { s } => r_format(s, Reg::Zero, Reg::Zero, FUNCT_JALR),
            Instr::Lw { t, offset, s } => i_format(OP_LW, s, t, offset),
            Instr::Sw { t, offset, s } => i_format(OP_SW, s, t, offset),
            Instr::Beq { s, t, offset } => i_format(OP_BEQ, s, t, offset),
            Instr::Bne { s, t, offset } => i_format(OP_BNE, s, t, offset),
        }
    }
}

/// Branch offsets are 16-bit signed word counts; a branch that cannot reach
/// its label is unencodable.
pub fn branch_offset(from_index: usize, to_index: usize) -> Result<i16, CompileError> {
    // Offset is relative to the instruction after the branch.
    let delta = to_index as i64 - (from_index as i64 + 1);
    i16::try_from(delta).map_err(|_| CompileError::Codegen {
        message: format!("branch offset {delta} exceeds the 16-bit immediate"),
    })
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Add { d, s, t } => write!(f, "add {d}, {s}, {t}"),
            Instr::Sub { d, s, t } => write!(f, "sub {d}, {s}, {t}"),
            Instr::Slt { d, s, t } => write!(f, "slt {d}, {s}, {t}"),
            Instr::Sltu { d, s, t } => write!(f, "sltu {d}, {s}, {t}"),
            Instr::Mult { s, t } => write!(f, "mult {s}, {t}"),
            Instr::Div { s, t } => write!(f, "div {s}, {t}"),
            Instr::Mfhi { d } => write!(f, "mfhi {d}"),
            Instr::Mflo { d } => write!(f, "mflo {d}"),
            Instr::Lis { d } => write!(f, "lis {d}"),
            Instr::Jr { s } => write!(f, "jr {s}"),
            Instr::Jalr { s } => write!(f, "jalr {s}"),
            Instr::Lw { t, offset, s } => write!(f, "lw {t}, {offset}({s})"),
            Instr::Sw { t, offset, s } => write!(f, "sw {t}, {offset}({s})"),
            Instr::Beq { s, t, offset } => write!(f, "beq {s}, {t}, {offset}"),
            Instr::Bne { s, t, offset } => write!(f, "bne {s}, {t}, {offset}"),
        }
    }
}
