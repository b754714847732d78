use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;

use rlox::error::{LoxError, Result};
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(name = "lox", version, about = "Tree-walking interpreter for the Lox scripting language", long_about = None)]
struct Cli {
    /// Script to execute. Starts an interactive prompt when omitted.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit();
        }

        Err(_) => {
            eprintln!("usage: lox [script]");
            std::process::exit(64);
        }
    };

    match args.script {
        Some(path) => run_file(&path)?,
        None => run_prompt()?,
    }

    Ok(())
}

fn run_file(path: &PathBuf) -> anyhow::Result<()> {
    let source: String = fs::read_to_string(path)?;

    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());
    let mut next_id: usize = 0;

    if let Err(e) = run(&source, &mut interpreter, &mut next_id) {
        eprintln!("{}", e);

        let code: i32 = match e {
            LoxError::Runtime { .. } => 70,
            _ => 65,
        };
        std::process::exit(code);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    // One interpreter for the whole session so definitions carry across
    // lines; the id counter is threaded through for the same reason.
    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());
    let mut next_id: usize = 0;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line: String = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        if let Err(e) = run(&line, &mut interpreter, &mut next_id) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn run<W: Write>(source: &str, interpreter: &mut Interpreter<W>, next_id: &mut usize) -> Result<()> {
    let tokens = Scanner::new(source).scan()?;

    let mut parser: Parser = Parser::new(tokens, *next_id);
    let statements = parser.parse()?;
    *next_id = parser.next_id();

    Resolver::new(interpreter).resolve(&statements)?;

    interpreter.interpret(&statements)
}
