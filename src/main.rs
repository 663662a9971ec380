//! Command-line driver: argument handling, file reading, stage sequencing
//! and invoking the external assembler and linker on the generated text.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{self, Command};

use fnc::lexer::Lexer;
use fnc::lower::{Lowerer, UnsupportedExprPolicy};
use fnc::parser::Parser;
use fnc::{codegen, CompileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrintMode {
  Ast,
  Ir,
  All,
}

struct Config {
  input: PathBuf,
  output: Option<PathBuf>,
  print_mode: PrintMode,
  emit: bool,
  strict: bool,
}

fn print_help(exit_code: i32, program_name: &str) -> ! {
  println!("{program_name} FILE");
  println!("  --help       # Print this help");
  println!("  --print=all  # Print the ast and ir to stdout");
  println!("  --print=ast  # Print the ast to stdout");
  println!("  --print=ir   # Print the ir to stdout");
  println!("  --no-emit    # Do not emit any assembly or executables");
  println!("  --strict     # Treat unsupported constructs as hard errors");
  println!("  -o FILE      # Specify the output file for the executable");
  process::exit(exit_code);
}

impl Config {
  fn build(program_name: &str, args: impl Iterator<Item = String>) -> Self {
    let mut input = None;
    let mut output = None;
    let mut print_mode = PrintMode::All;
    let mut emit = true;
    let mut strict = false;

    let mut args = args;
    while let Some(arg) = args.next() {
      match arg.as_str() {
        "--help" => print_help(0, program_name),
        "--print=ast" => print_mode = PrintMode::Ast,
        "--print=ir" => print_mode = PrintMode::Ir,
        "--print=all" => print_mode = PrintMode::All,
        "--no-emit" => emit = false,
        "--strict" => strict = true,
        "-o" => match args.next() {
          Some(file) => output = Some(PathBuf::from(file)),
          None => {
            println!("expected file, got no more arguments");
            print_help(1, program_name);
          }
        },
        other if other.starts_with('-') => {
          println!("unknown option \"{other}\"");
          print_help(1, program_name);
        }
        other => {
          if input.is_some() {
            println!("unknown argument \"{other}\"");
            print_help(1, program_name);
          }
          input = Some(PathBuf::from(other));
        }
      }
    }

    let Some(input) = input else {
      println!("no input file specified");
      print_help(1, program_name);
    };
    if emit && output.is_none() {
      println!("no output file specified");
      print_help(1, program_name);
    }

    Self {
      input,
      output,
      print_mode,
      emit,
      strict,
    }
  }
}

/// Run an external program, reporting its captured output on failure.
fn launch_program(program: &str, args: &[&str]) -> bool {
  match Command::new(program).args(args).output() {
    Ok(out) if out.status.success() => true,
    Ok(out) => {
      eprintln!(
        "failed to run {program}\n{}\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
      );
      false
    }
    Err(err) => {
      eprintln!("failed to run {program}: {err}");
      false
    }
  }
}

fn main() {
  env_logger::init();

  let mut args = env::args();
  let program_name = args.next().unwrap_or_else(|| "fnc".to_string());
  let config = Config::build(&program_name, args);

  let input_path = config.input.display().to_string();
  let source = fs::read(&config.input).unwrap_or_else(|err| {
    let err = CompileError::ReadInput {
      path: input_path.clone(),
      source: err,
    };
    eprintln!("{err}");
    process::exit(1);
  });

  let lexer = Lexer::new(&source, &input_path);
  let mut parser = Parser::new(lexer);
  let program = parser.parse_program();

  if config.print_mode != PrintMode::Ir {
    println!("{program}");
  }

  let errors = parser.errors() + parser.lexer().errors();
  if errors > 0 || program.main_function.is_none() {
    eprintln!("aborting after {errors} parse error(s)");
    process::exit(1);
  }

  let policy = if config.strict {
    UnsupportedExprPolicy::Strict
  } else {
    UnsupportedExprPolicy::Placeholder
  };
  let ir = Lowerer::with_policy(policy)
    .emit_program(&program)
    .unwrap_or_else(|err| {
      eprintln!("{err}");
      process::exit(1);
    });

  if config.print_mode != PrintMode::Ast {
    print!("{ir}");
  }

  if config.emit {
    // Checked during argument parsing when emitting is enabled.
    let Some(output) = config.output.as_ref() else {
      eprintln!("no output file specified");
      process::exit(1);
    };

    let fasm_file = config.input.with_extension("fasm");
    let object_file = config.input.with_extension("o");

    codegen::x86_64_linux_emit_code(&ir, &fasm_file);

    let fasm_path = fasm_file.display().to_string();
    let object_path = object_file.display().to_string();
    let output_path = output.display().to_string();

    if launch_program("fasm", &[&fasm_path, &object_path]) {
      launch_program("gcc", &[&object_path, "-o", &output_path]);
    }

    let _ = fs::remove_file(&fasm_file);
    let _ = fs::remove_file(&object_file);
  }
}
