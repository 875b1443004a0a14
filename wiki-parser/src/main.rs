use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

fn main() {
    if let Err(err) = run() {
        eprintln!("{}: {err}", env!("CARGO_PKG_NAME"));
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    let mut input = Input::Stdin;
    let mut format = Format::Json;
    for arg in args {
        match arg.as_str() {
            flag if is_help_flag(flag) => {
                print_help(&program);
                return Ok(());
            }
            flag if is_version_flag(flag) => {
                println!("{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--text" => format = Format::Text,
            "-" => input = Input::Stdin,
            path if !path.starts_with('-') && matches!(input, Input::Stdin) => {
                input = Input::File(path.to_string());
            }
            extra => return Err(format!("unexpected argument: {extra}\n{}", usage(&program))),
        }
    }

    let html = match input {
        Input::Stdin => read_stdin()?,
        Input::File(path) => read_file(&path)?,
    };

    match format {
        Format::Json => {
            let blocks = wiki_parser::extract_blocks(&html);
            let json = serde_json::to_string_pretty(&blocks)
                .map_err(|err| format!("failed to serialize JSON: {err}"))?;
            println!("{json}");
        }
        Format::Text => println!("{}", wiki_parser::extract_text(&html)),
    }
    Ok(())
}

enum Input {
    Stdin,
    File(String),
}

enum Format {
    Json,
    Text,
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn is_version_flag(arg: &str) -> bool {
    arg == "-V" || arg == "--version"
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("failed to read '{path}': {err}"))
}

fn read_stdin() -> Result<String, String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|err| format!("failed to read stdin: {err}"))?;
    Ok(buf)
}

fn print_help(program: &str) {
    println!(
        "{}\n\nOptions:\n  --text          Print block text one per line instead of JSON\n  -h, --help      Show this message\n  -V, --version   Print package version",
        usage(program)
    );
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--text] [HTML_FILE|-]\n\n\
         Provide a path to a downloaded Wikipedia HTML file or '-' to read from stdin. \
         When no path is passed, stdin is used. Blocks are printed as JSON with their \
         heading path unless --text is given."
    )
}
