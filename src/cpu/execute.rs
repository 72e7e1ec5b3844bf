//! Fetch/decode/execute engine.
//!
//! Decoding is folded into execution: once the opcode byte is recognized its
//! operand shape is known, so operands are fetched straight off the
//! instruction pointer and the decoded [`Instruction`] is applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{self, RegisterError, RegisterLayout, Registers};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// A step failed; the CPU refuses to continue until [`Cpu::reset`].
    Faulted,
}

/// The virtual CPU.
#[derive(Clone)]
pub struct Cpu {
    mem: Memory,
    regs: Registers,
    state: CpuState,
    cycles: u64,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU over `mem` with the standard register layout.
    pub fn new(mem: Memory) -> Self {
        Self::with_layout(mem, RegisterLayout::standard())
    }

    /// Create a CPU over `mem` with a custom register layout.
    pub fn with_layout(mem: Memory, layout: Arc<RegisterLayout>) -> Self {
        Self {
            mem,
            regs: Registers::new(layout),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Read the byte at `ip` and advance `ip` by one.
    pub fn fetch(&mut self) -> Result<u8, CpuError> {
        let ip = self.regs.get(registers::IP)?;
        let byte = self.mem.read8(usize::from(ip))?;
        self.regs.set(registers::IP, ip.wrapping_add(1))?;
        Ok(byte)
    }

    /// Read the big-endian word at `ip` and advance `ip` by two.
    pub fn fetch16(&mut self) -> Result<u16, CpuError> {
        let ip = self.regs.get(registers::IP)?;
        let word = self.mem.read16(usize::from(ip))?;
        self.regs.set(registers::IP, ip.wrapping_add(2))?;
        Ok(word)
    }

    /// Decode `opcode`, fetched from `address`, then fetch its operands and
    /// execute it.
    ///
    /// An unrecognized opcode is fatal: nothing past the opcode byte is
    /// consumed and [`CpuError::IllegalOpcode`] is returned.
    pub(crate) fn execute(&mut self, opcode: u8, address: u16) -> Result<Instruction, CpuError> {
        let op = Opcode::decode(opcode)
            .map_err(|_| CpuError::IllegalOpcode { opcode, address })?;

        let instr = self.fetch_operands(op)?;
        self.apply(instr)?;
        Ok(instr)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// leaves the CPU [`CpuState::Faulted`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.ip();
        let result = self.fetch().and_then(|opcode| self.execute(opcode, pc));

        match result {
            Ok(instr) => {
                log::debug!("{:04x}: {}", pc, instr);
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(e) => {
                log::warn!("fault at {:04x}: {}", pc, e);
                self.state = CpuState::Faulted;
                Err(e)
            }
        }
    }

    /// Run for at most `max_steps` instructions.
    ///
    /// Returns the number of instructions executed.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_steps);

        while self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Step while `ip < end`, for at most `max_steps` instructions.
    ///
    /// Returns the number of instructions executed.
    pub fn run_until(&mut self, end: u16, max_steps: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_steps);

        while self.ip() < end && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Register dump, one `name: 0xhhhh` line per register plus a blank line.
    pub fn debug(&self) -> String {
        self.regs.to_string()
    }

    /// Zero every register and clear a fault. Memory is left untouched.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Current instruction pointer.
    pub fn ip(&self) -> u16 {
        self.regs.get(registers::IP).unwrap_or_default()
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    /// Instructions executed since creation or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Fetch the operands of `op` and assemble the full instruction.
    fn fetch_operands(&mut self, op: Opcode) -> Result<Instruction, CpuError> {
        let instr = match op {
            Opcode::MovLitR1 => Instruction::MovLitR1 {
                literal: self.fetch16()?,
            },
            Opcode::MovLitR2 => Instruction::MovLitR2 {
                literal: self.fetch16()?,
            },
            Opcode::AddRegReg => {
                let lhs = self.fetch()?;
                let rhs = self.fetch()?;
                Instruction::AddRegReg { lhs, rhs }
            }
        };
        Ok(instr)
    }

    /// Apply a decoded instruction to the register file.
    fn apply(&mut self, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            Instruction::MovLitR1 { literal } => {
                self.regs.set(registers::R1, literal)?;
            }

            Instruction::MovLitR2 { literal } => {
                self.regs.set(registers::R2, literal)?;
            }

            Instruction::AddRegReg { lhs, rhs } => {
                let a = self.regs.get_by_index(lhs)?;
                let b = self.regs.get_by_index(rhs)?;
                self.regs.set(registers::ACC, a.wrapping_add(b))?;
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("illegal opcode 0x{opcode:02x} at 0x{address:04x}")]
    IllegalOpcode { opcode: u8, address: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cpu(program: &[Instruction]) -> Cpu {
        let bytes: Vec<u8> = program.iter().flat_map(|i| i.encode()).collect();
        let mut mem = Memory::new(256);
        mem.load_program(0, &bytes).unwrap();
        Cpu::new(mem)
    }

    #[test]
    fn test_fetch_advances_ip() {
        let mut mem = Memory::new(8);
        mem.load_program(0, &[0xaa, 0x12, 0x34]).unwrap();
        let mut cpu = Cpu::new(mem);

        assert_eq!(cpu.fetch().unwrap(), 0xaa);
        assert_eq!(cpu.ip(), 1);
        assert_eq!(cpu.fetch16().unwrap(), 0x1234);
        assert_eq!(cpu.ip(), 3);
    }

    #[test]
    fn test_fetch_out_of_bounds_keeps_ip() {
        let mut cpu = Cpu::new(Memory::new(2));
        cpu.registers_mut().set(registers::IP, 1).unwrap();

        assert!(matches!(cpu.fetch16(), Err(CpuError::Memory(_))));
        assert_eq!(cpu.ip(), 1);

        cpu.registers_mut().set(registers::IP, 2).unwrap();
        assert!(cpu.fetch().is_err());
        assert_eq!(cpu.ip(), 2);
    }

    #[test]
    fn test_mov_literals() {
        let mut cpu = make_cpu(&[
            Instruction::MovLitR1 { literal: 0x1234 },
            Instruction::MovLitR2 { literal: 0xabcd },
        ]);

        cpu.step().unwrap();
        assert_eq!(cpu.registers().get(registers::R1).unwrap(), 0x1234);
        assert_eq!(cpu.ip(), 3);

        cpu.step().unwrap();
        assert_eq!(cpu.registers().get(registers::R2).unwrap(), 0xabcd);
        assert_eq!(cpu.ip(), 6);
    }

    #[test]
    fn test_add_wraps() {
        let mut cpu = make_cpu(&[
            Instruction::MovLitR1 { literal: 0xffff },
            Instruction::MovLitR2 { literal: 0x0002 },
            Instruction::AddRegReg { lhs: 2, rhs: 3 },
        ]);

        assert_eq!(cpu.run_limited(3).unwrap(), 3);
        assert_eq!(cpu.registers().get(registers::ACC).unwrap(), 0x0001);
    }

    #[test]
    fn test_add_reads_ip_by_index() {
        // Index 0 is ip itself, read after both operands were fetched
        let mut cpu = make_cpu(&[Instruction::AddRegReg { lhs: 0, rhs: 0 }]);
        cpu.step().unwrap();
        assert_eq!(cpu.registers().get(registers::ACC).unwrap(), 6);
    }

    #[test]
    fn test_add_bad_register_index() {
        let mut cpu = make_cpu(&[Instruction::AddRegReg { lhs: 2, rhs: 10 }]);

        let err = cpu.step().unwrap_err();
        assert_eq!(
            err,
            CpuError::Register(RegisterError::IndexOutOfRange {
                index: 10,
                count: 10
            })
        );
        assert_eq!(cpu.registers().get(registers::ACC).unwrap(), 0);
        assert_eq!(cpu.state(), CpuState::Faulted);
    }

    #[test]
    fn test_illegal_opcode_is_fatal() {
        let mut mem = Memory::new(16);
        mem.load_program(0, &[0xff, 0x10, 0x00, 0x01]).unwrap();
        let mut cpu = Cpu::new(mem);

        assert_eq!(
            cpu.step(),
            Err(CpuError::IllegalOpcode {
                opcode: 0xff,
                address: 0
            })
        );
        assert_eq!(cpu.ip(), 1);
        assert_eq!(cpu.state(), CpuState::Faulted);
        assert_eq!(
            cpu.step(),
            Err(CpuError::NotRunning(CpuState::Faulted))
        );
    }

    #[test]
    fn test_illegal_opcode_reports_fetch_address() {
        let mut cpu = Cpu::new(Memory::new(4));
        assert_eq!(
            cpu.execute(0xff, 0),
            Err(CpuError::IllegalOpcode {
                opcode: 0xff,
                address: 0
            })
        );
        assert_eq!(cpu.ip(), 0);

        let mut mem = Memory::new(8);
        mem.load_program(5, &[0xee]).unwrap();
        let mut cpu = Cpu::new(mem);
        cpu.registers_mut().set(registers::IP, 5).unwrap();
        assert_eq!(
            cpu.step(),
            Err(CpuError::IllegalOpcode {
                opcode: 0xee,
                address: 5
            })
        );
        assert_eq!(cpu.ip(), 6);
    }

    #[test]
    fn test_reset_clears_fault() {
        let mut mem = Memory::new(4);
        mem.load_program(0, &[0x00]).unwrap();
        let mut cpu = Cpu::new(mem);

        assert!(cpu.step().is_err());
        cpu.reset();
        assert!(cpu.is_running());
        assert_eq!(cpu.ip(), 0);
        assert_eq!(cpu.memory().read8(0).unwrap(), 0x00);
    }

    #[test]
    fn test_run_until() {
        let mut cpu = make_cpu(&[
            Instruction::MovLitR1 { literal: 1 },
            Instruction::MovLitR2 { literal: 2 },
            Instruction::AddRegReg { lhs: 2, rhs: 3 },
        ]);

        assert_eq!(cpu.run_until(9, 100).unwrap(), 3);
        assert_eq!(cpu.ip(), 9);
        assert_eq!(cpu.cycles(), 3);
        assert_eq!(
            cpu.last_instruction(),
            Some(Instruction::AddRegReg { lhs: 2, rhs: 3 })
        );

        cpu.reset();
        assert_eq!(cpu.run_until(9, 1).unwrap(), 1);
    }

    #[test]
    fn test_debug_dump() {
        let cpu = make_cpu(&[]);
        let dump = cpu.debug();
        assert!(dump.starts_with("ip: 0x0000\nacc: 0x0000\nr1: 0x0000\n"));
        assert!(dump.ends_with("r8: 0x0000\n\n"));
        assert_eq!(dump.lines().count(), 11);
    }
}
