//! Print the CC16 pin mapping table.

use std::process::ExitCode;

use clap::Parser;

use cc16_console::board::cc16::{pin_table, PinEntry, PinKind};

/// CC16 pin mapping table
#[derive(Parser, Debug)]
#[command(name = "cc16-pins", version, about, long_about = None)]
struct Cli {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let table = pin_table();

    if cli.json {
        match serde_json::to_string_pretty(&table) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("cc16-pins: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_table(&table);
    }
    ExitCode::SUCCESS
}

fn print_table(table: &[PinEntry]) {
    println!("{:<14} {:<7} {:>5}  CAPABILITIES", "NAME", "KIND", "INDEX");
    for entry in table {
        let kind = match entry.kind {
            PinKind::Output => "output",
            PinKind::Input => "input",
            PinKind::Vref => "vref",
        };
        let index = entry
            .index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut line = format!(
            "{:<14} {:<7} {:>5}  {}",
            entry.name,
            kind,
            index,
            entry.capabilities.join(",")
        );
        if let Some(note) = entry.note {
            line.push_str("  (");
            line.push_str(note);
            line.push(')');
        }
        println!("{}", line);
    }
}
