//! Prints the bytecode of patterns and runs them on sample inputs.
//!
//! Usage: `debug_bytecode [-i] [-d] [-w] [PATTERN]... [-- INPUT...]`
//!
//! Set `RUST_LOG=trace` to follow the VM.

use clap::{arg, ArgAction, ArgMatches, Command};
use talisman_regex::{CompiledRegex, Flags};

fn command() -> Command {
    Command::new("debug_bytecode")
        .about("Prints the bytecode of patterns and runs them on sample inputs")
        .arg(
            arg!(-i --"case-insensitive")
                .help("Match letters regardless of case")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-d --"diacritics-insensitive")
                .help("Match letters regardless of accents")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-w --"word-boundaries")
                .help("Add word boundaries around patterns that start or end with a letter")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!([PATTERN] ...)
                .help("Patterns to compile")
                .action(ArgAction::Append),
        )
        .arg(
            arg!([INPUT] ...)
                .help("Texts to search, given after --")
                .action(ArgAction::Append)
                .last(true),
        )
}

fn flags(args: &ArgMatches) -> Flags {
    let mut flags = Flags::empty();
    if args.get_flag("case-insensitive") {
        flags |= Flags::CASE_INSENSITIVE;
    }
    if args.get_flag("diacritics-insensitive") {
        flags |= Flags::DIACRITICS_INSENSITIVE;
    }
    if args.get_flag("word-boundaries") {
        flags |= Flags::AUTO_WORD_BOUNDARIES;
    }
    flags
}

fn values(args: &ArgMatches, id: &str, defaults: &[&str]) -> Vec<String> {
    match args.get_many::<String>(id) {
        Some(values) => values.cloned().collect(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn main() {
    env_logger::init();

    let args = command().get_matches();
    let flags = flags(&args);
    let patterns = values(&args, "PATTERN", &["a*", "ab*c", "(abc)|(de)(f)|(deg)"]);
    let inputs = values(&args, "INPUT", &["", "a", "abbc", "abdef"]);

    for pattern in &patterns {
        println!("\nPattern: {pattern}");
        let regex = match CompiledRegex::with_flags(pattern, flags) {
            Ok(regex) => regex,
            Err(e) => {
                println!("  Error: {e}");
                continue;
            }
        };

        print!("{regex}");
        match regex.serialize() {
            Ok(bytes) => {
                println!("  Serialized ({} bytes):", bytes.len());
                let hex: Vec<String> = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                println!("  {}", hex.join(" "));
            }
            Err(e) => println!("  Cannot serialize: {e}"),
        }

        for input in &inputs {
            let matches: Vec<String> = regex
                .find_in(input)
                .map(|found| {
                    let groups: Vec<String> = (1..=found.group_count())
                        .map(|i| match found.group_str(input, i) {
                            Some(text) => format!("{text:?}"),
                            None => "-".to_string(),
                        })
                        .collect();
                    format!(
                        "{:?} {:?} [{}]",
                        found.range(),
                        found.as_str(input).unwrap_or_default(),
                        groups.join(", ")
                    )
                })
                .collect();
            println!("    vs {input:?} -> {matches:?}");
        }
    }
}
