//! A minimal emulator for the target word machine, used by the end-to-end
//! tests. Fetch-decode-execute over a word memory; the machine halts when the
//! program counter reaches `TERMINATION_PC` and the result register is the
//! program's answer.

use nex_compiler::backend::TERMINATION_PC;

const MEM_WORDS: usize = 1 << 16;
const STEP_LIMIT: usize = 2_000_000;

pub struct Emulator {
    mem: Vec<u32>,
    regs: [u32; 32],
    hi: u32,
    lo: u32,
    pc: u32,
}

impl Emulator {
    pub fn load(words: &[u32]) -> Emulator {
        assert!(words.len() < MEM_WORDS, "program too large for emulator memory");
        let mut mem = vec![0u32; MEM_WORDS];
        mem[..words.len()].copy_from_slice(words);
        Emulator { mem, regs: [0; 32], hi: 0, lo: 0, pc: 0 }
    }

    /// Run to termination with the two machine inputs; returns the result
    /// register.
    pub fn run(mut self, input1: u32, input2: u32) -> u32 {
        self.regs[1] = input1;
        self.regs[2] = input2;
        self.regs[30] = (MEM_WORDS * 4) as u32;
        self.regs[31] = TERMINATION_PC;

        for _ in 0..STEP_LIMIT {
            if self.pc == TERMINATION_PC {
                return self.regs[3];
            }
            let word = self.fetch();
            self.execute(word);
            self.regs[0] = 0;
        }
        panic!("program did not terminate within {STEP_LIMIT} steps");
    }

    fn fetch(&mut self) -> u32 {
        let word = self.mem[(self.pc / 4) as usize];
        self.pc += 4;
        word
    }

    fn execute(&mut self, word: u32) {
        let opcode = word >> 26;
        let s = ((word >> 21) & 31) as usize;
        let t = ((word >> 16) & 31) as usize;
        let d = ((word >> 11) & 31) as usize;
        let imm = word as u16 as i16 as i32;

        match opcode {
            0 => match word & 0x3f {
                0x20 => self.regs[d] = self.regs[s].wrapping_add(self.regs[t]),
                0x22 => self.regs[d] = self.regs[s].wrapping_sub(self.regs[t]),
                0x18 => {
                    let product =
                        (self.regs[s] as i32 as i64).wrapping_mul(self.regs[t] as i32 as i64);
                    self.lo = product as u32;
                    self.hi = (product >> 32) as u32;
                }
                0x1a => {
                    let divisor = self.regs[t] as i32;
                    assert!(divisor != 0, "division by zero trap");
                    let dividend = self.regs[s] as i32;
                    self.lo = dividend.wrapping_div(divisor) as u32;
                    self.hi = dividend.wrapping_rem(divisor) as u32;
                }
                0x10 => self.regs[d] = self.hi,
                0x12 => self.regs[d] = self.lo,
                0x14 => {
                    self.regs[d] = self.fetch();
                }
                0x2a => {
                    self.regs[d] = ((self.regs[s] as i32) < (self.regs[t] as i32)) as u32;
                }
                0x2b => self.regs[d] = (self.regs[s] < self.regs[t]) as u32,
                0x08 => self.pc = self.regs[s],
                0x09 => {
                    let target = self.regs[s];
                    self.regs[31] = self.pc;
                    self.pc = target;
                }
                funct => panic!("unknown funct 0x{funct:02x}"),
            },
            0x23 => {
                let addr = self.regs[s].wrapping_add(imm as u32);
                self.regs[t] = self.mem[(addr / 4) as usize];
            }
            0x2b => {
                let addr = self.regs[s].wrapping_add(imm as u32);
                self.mem[(addr / 4) as usize] = self.regs[t];
            }
            0x04 => {
                if self.regs[s] == self.regs[t] {
                    self.pc = self.pc.wrapping_add((imm * 4) as u32);
                }
            }
            0x05 => {
                if self.regs[s] != self.regs[t] {
                    self.pc = self.pc.wrapping_add((imm * 4) as u32);
                }
            }
            op => panic!("unknown opcode 0x{op:02x}"),
        }
    }
}

/// Compile and run with the given inputs; the test's one-call harness.
pub fn compile_and_run(source: &str, input1: u32, input2: u32) -> u32 {
    let words = nex_compiler::compile_to_words(source).expect("source should compile");
    Emulator::load(&words).run(input1, input2)
}
