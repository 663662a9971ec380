//! Code generation: lower the IR into flat-assembler x86-64 Linux text.
//!
//! The generator walks the single function's instruction list and emits one
//! assembly fragment per instruction. Only RET has a lowering today: move
//! the operand into the accumulator register and return. The arithmetic
//! kinds are recognised but emit nothing yet, and temporary operands cannot
//! be rendered; both gaps are tracked in DESIGN.md.
//!
//! This is a batch compiler back-end, so unrecoverable conditions (an output
//! file that cannot be opened, a RET with no operand) print a diagnostic to
//! stderr and terminate the process instead of unwinding.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process;

use crate::ir::{Function, InstKind, Instruction, IrProgram, Value};

/// Emit assembly for a whole program as a string.
pub fn generate(program: &IrProgram) -> String {
  let mut asm = String::new();
  asm.push_str("format ELF64\n");
  asm.push_str("section '.text' executable\n");
  emit_function(&program.main_function, &mut asm);
  asm
}

/// Write the generated assembly to `path`, creating or truncating the file.
/// Failure to open or write the file is fatal.
pub fn x86_64_linux_emit_code(program: &IrProgram, path: &Path) {
  let mut file = match File::create(path) {
    Ok(file) => file,
    Err(err) => fail(&format!("could not open file {}: {err}", path.display())),
  };
  if let Err(err) = file.write_all(generate(program).as_bytes()) {
    fail(&format!("could not write file {}: {err}", path.display()));
  }
}

fn emit_function(func: &Function, asm: &mut String) {
  asm.push_str(&format!("public {}\n", func.name));
  asm.push_str(&format!("{}:\n", func.name));

  for inst in func.instructions.iter() {
    emit_instruction(inst, asm);
  }
}

fn emit_instruction(inst: &Instruction, asm: &mut String) {
  match inst.kind {
    InstKind::Ret => {
      let Some(lhs) = inst.lhs.as_deref() else {
        fail("invalid ir ret instruction, lhs is null");
      };
      asm.push_str(&format!("  mov rax,{}\n", operand(lhs)));
      asm.push_str("  ret\n");
    }
    // Arithmetic reaches the IR but has no assembly lowering yet.
    InstKind::Add | InstKind::Sub | InstKind::Mul | InstKind::Div => {}
  }
}

fn operand(value: &Value) -> String {
  match value {
    Value::Constant(value) => value.to_string(),
    Value::Temp(name) => fail(&format!("temporary operand %{name} is not lowered yet")),
  }
}

fn fail(msg: &str) -> ! {
  eprintln!("(x86_64-linux) asm generation failed: {msg}");
  process::exit(1);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ret(value: Value) -> Instruction {
    Instruction::new(InstKind::Ret, Some(Box::new(value)), None, None)
  }

  fn program(instructions: Vec<Instruction>) -> IrProgram {
    IrProgram {
      main_function: Box::new(Function {
        name: "main".to_string(),
        instructions: instructions.into_boxed_slice(),
      }),
    }
  }

  #[test]
  fn constant_return_generates_full_text() {
    let asm = generate(&program(vec![ret(Value::Constant(42))]));
    assert_eq!(
      asm,
      "format ELF64\n\
       section '.text' executable\n\
       public main\n\
       main:\n\
       \x20 mov rax,42\n\
       \x20 ret\n"
    );
  }

  #[test]
  fn arithmetic_instructions_emit_nothing() {
    let add = Instruction::new(
      InstKind::Add,
      Some(Box::new(Value::Constant(1))),
      Some(Box::new(Value::Constant(2))),
      Some(Box::new(Value::Temp("t0".to_string()))),
    );
    let asm = generate(&program(vec![add, ret(Value::Constant(3))]));
    assert_eq!(
      asm,
      "format ELF64\n\
       section '.text' executable\n\
       public main\n\
       main:\n\
       \x20 mov rax,3\n\
       \x20 ret\n"
    );
  }

  #[test]
  fn negative_constants_render_in_decimal() {
    let asm = generate(&program(vec![ret(Value::Constant(-324))]));
    assert!(asm.contains("  mov rax,-324\n"));
  }
}
