//! Bytecode disassembler for debugging and the `--disassemble` flag.

use std::fmt::Write;

use crate::bytecode::chunk::{compiled_functions, Bytecode};
use crate::bytecode::instruction::{read_operands, OpCode};

/// Disassemble a raw instruction stream. Each line is the instruction's byte
/// offset followed by the opcode name and its decoded operands:
///
/// ```text
/// 0000 Constant 2
/// 0003 Pop
/// ```
pub fn disassemble(instructions: &[u8]) -> String {
    let mut output = String::new();
    let mut offset = 0;

    while offset < instructions.len() {
        let byte = instructions[offset];
        let Some(opcode) = OpCode::from_u8(byte) else {
            writeln!(&mut output, "{:04} ERROR: unknown opcode {}", offset, byte).unwrap();
            offset += 1;
            continue;
        };

        let (operands, read) = read_operands(opcode, &instructions[offset + 1..]);
        match operands.as_slice() {
            [] => writeln!(&mut output, "{:04} {:?}", offset, opcode).unwrap(),
            [operand] => {
                writeln!(&mut output, "{:04} {:?} {}", offset, opcode, operand).unwrap()
            }
            _ => unreachable!("no opcode takes more than one operand"),
        }

        offset += 1 + read;
    }

    output
}

/// Disassemble a whole compiled program: the top-level stream followed by
/// every compiled function in the constant pool.
pub fn disassemble_bytecode(bytecode: &Bytecode) -> String {
    let mut output = String::new();

    writeln!(&mut output, "== main ==").unwrap();
    output.push_str(&disassemble(&bytecode.instructions));

    for (idx, function) in compiled_functions(&bytecode.constants) {
        writeln!(
            &mut output,
            "\n== fn constant {} (params: {}) ==",
            idx, function.num_parameters
        )
        .unwrap();
        output.push_str(&disassemble(&function.instructions));
    }

    output
}
