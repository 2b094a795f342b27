use chipmml::compiler::options::CompileOptions;
use chipmml::target::{self, AsmSyntax, TargetId};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chipmml")]
#[command(version = "0.1.0")]
#[command(about = "MML song script to sound driver data compiler", long_about = None)]
struct Args {
    /// Output assembly (or JSON) file
    #[arg(required_unless_present = "list_targets")]
    output: Option<PathBuf>,

    /// Input song script, JSON or gzipped JSON (reads from stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Target platform (overrides the script)
    #[arg(short, long)]
    target: Option<String>,

    /// Treat warnings as errors
    #[arg(short = 'W', long)]
    warnings_as_errors: bool,

    /// Assembler syntax (overrides the target's default)
    #[arg(long, value_enum)]
    syntax: Option<AsmSyntax>,

    /// Write the encoded output as JSON instead of assembly
    #[arg(long)]
    json: bool,

    /// List available targets
    #[arg(short = 'L', long)]
    list_targets: bool,
}

fn main() -> Result<(), chipmml::Error> {
    env_logger::init();
    let args = Args::parse();

    if args.list_targets {
        for (name, description) in target::list_targets() {
            println!("{:<10} {}", name, description);
        }
        return Ok(());
    }

    let output = args
        .output
        .expect("output is required when not listing targets");

    let options = CompileOptions {
        warnings_as_errors: args.warnings_as_errors,
        target: args.target.as_deref().map(str::parse::<TargetId>).transpose()?,
        syntax: args.syntax,
        ..Default::default()
    };
    let mut compiler = chipmml::Compiler::with_options(options);
    compiler.json = args.json;

    let compilation = match &args.input {
        Some(path) => compiler.compile_file(path, &output)?,
        None => compiler.compile(std::io::stdin(), &output)?,
    };

    if !compilation.warnings.is_empty() {
        eprintln!("{} warning(s)", compilation.warnings.len());
    }

    Ok(())
}
