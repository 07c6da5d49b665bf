//! fiomatch command-line tool
//!
//! Subcommands:
//!
//! - `text <input.xml>` prints the delimited name/birth-date lines
//! - `rows <table>` prints the ingested table rows as JSON
//! - `match <input.xml> <table>` writes the two-sheet report next to the table

use std::io::{self, Write};
use std::process;

use fiomatch::{FioMatchError, IngestMode, Reconciler, ReconcilerBuilder, WriteError};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> <args...> [options]", program);
    eprintln!("\nCommands:");
    eprintln!("  text <input.xml>            Print surname;name;patronymic;year;month;day lines");
    eprintln!("  rows <table>                Print table rows as JSON");
    eprintln!("  match <input.xml> <table>   Write the match report next to the table");
    eprintln!("\nOptions:");
    eprintln!("  --marker <value>     Positive flag marker (default: ДА)");
    eprintln!("  --prefix <value>     Report file name prefix (default: goususlugi_)");
    eprintln!("  --sheet <name>       Preferred spreadsheet sheet (default: Sheet1)");
    eprintln!("  --html-only          Read the table as HTML only");
    eprintln!("  --spreadsheet-only   Read the table as a spreadsheet only");
    eprintln!("\nExamples:");
    eprintln!("  {} text export.xml > persons.txt", program);
    eprintln!("  {} match export.xml ibd-f.xls", program);
    eprintln!("  {} match export.xml ibd-f.xls --marker YES --html-only", program);
}

/// コマンドライン引数の解析結果
struct Options {
    command: String,
    positional: Vec<String>,
    builder: ReconcilerBuilder,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let command = args.get(1).cloned().ok_or("missing command")?;

    let mut positional = Vec::new();
    let mut builder = ReconcilerBuilder::new();
    let mut i = 2;
    while i < args.len() {
        let value = |name: &str| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| format!("{} requires a value", name))
        };
        match args[i].as_str() {
            "--marker" => {
                builder = builder.with_positive_marker(value("--marker")?);
                i += 2;
            }
            "--prefix" => {
                builder = builder.with_output_prefix(value("--prefix")?);
                i += 2;
            }
            "--sheet" => {
                builder = builder.with_preferred_sheet(value("--sheet")?);
                i += 2;
            }
            "--html-only" => {
                builder = builder.with_ingest_mode(IngestMode::HtmlOnly);
                i += 1;
            }
            "--spreadsheet-only" => {
                builder = builder.with_ingest_mode(IngestMode::SpreadsheetOnly);
                i += 1;
            }
            arg if arg.starts_with("--") => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                positional.push(arg.to_string());
                i += 1;
            }
        }
    }

    let expected = match command.as_str() {
        "text" | "rows" => 1,
        "match" => 2,
        other => return Err(format!("Unknown command: {}", other)),
    };
    if positional.len() != expected {
        return Err(format!(
            "'{}' takes {} path argument(s), got {}",
            command,
            expected,
            positional.len()
        ));
    }

    Ok(Options {
        command,
        positional,
        builder,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fiomatch");

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("Error: {}\n", msg);
            print_usage(program);
            process::exit(1);
        }
    };

    if let Err(e) = execute(options) {
        handle_error(e);
        process::exit(1);
    }
}

fn execute(options: Options) -> Result<(), FioMatchError> {
    let reconciler: Reconciler = options.builder.build()?;
    let paths = &options.positional;

    match options.command.as_str() {
        "text" => {
            let text = reconciler.parse_to_delimited_text(&paths[0])?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(text.as_bytes())?;
            handle.flush()?;
        }
        "rows" => {
            let table = reconciler.load_table(&paths[0])?;
            println!("{}", table.to_json_pretty()?);
        }
        _ => {
            let summary = reconciler.run(&paths[0], &paths[1])?;
            println!(
                "Documents: {}, rows: {} ({}), matched: {}, positive: {}",
                summary.documents,
                summary.rows,
                summary.strategy,
                summary.matched,
                summary.positive
            );
            println!("Report written: {}", summary.output_path.display());
        }
    }

    Ok(())
}

fn handle_error(error: FioMatchError) {
    match error {
        FioMatchError::MalformedXml(msg) => {
            eprintln!("XML Error: {}", msg);
            eprintln!("The XML must be a complete document with a <List> root element.");
        }
        FioMatchError::UnreadableFile { path, source } => {
            eprintln!("Cannot read '{}': {}", path.display(), source);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        FioMatchError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
        }
        FioMatchError::NoSheetsAvailable => {
            eprintln!("Spreadsheet Error: the workbook contains no sheets.");
        }
        FioMatchError::NoTableFound => {
            eprintln!("Table Error: no <tr>...</tr> rows found.");
            eprintln!("The file is neither a spreadsheet nor an HTML table export.");
        }
        FioMatchError::NoCellsFound => {
            eprintln!("Table Error: table rows contain no <td>/<th> cells.");
        }
        FioMatchError::Spreadsheet(err) => {
            eprintln!("Spreadsheet Error: {}", err);
            eprintln!("The file may be corrupted; try --html-only for HTML exports saved as .xls.");
        }
        FioMatchError::Zip(msg) => {
            eprintln!("ZIP Error: {}", msg);
        }
        FioMatchError::WriteFailure { path, source } => match source {
            WriteError::Document(err) => {
                eprintln!("Report Error: cannot build '{}': {}", path.display(), err);
            }
            WriteError::Io(err) => {
                eprintln!("Cannot save report to '{}': {}", path.display(), err);
                eprintln!("Please check that the directory is writable.");
            }
        },
        FioMatchError::Json(err) => {
            eprintln!("JSON Error: {}", err);
        }
        FioMatchError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        FioMatchError::SecurityViolation(msg) => {
            eprintln!("Security Error: {}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("fiomatch")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_match_with_options() {
        let options = parse_args(&args(&[
            "match", "a.xml", "--marker", "YES", "b.xls", "--html-only",
        ]))
        .unwrap();
        assert_eq!(options.command, "match");
        assert_eq!(options.positional, vec!["a.xml", "b.xls"]);
        assert!(options.builder.build().is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["diff", "a"])).is_err());
        assert!(parse_args(&args(&["text"])).is_err());
        assert!(parse_args(&args(&["match", "a.xml"])).is_err());
        assert!(parse_args(&args(&["text", "a.xml", "--marker"])).is_err());
        assert!(parse_args(&args(&["text", "a.xml", "--verbose"])).is_err());
    }
}
