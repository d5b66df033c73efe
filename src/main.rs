//! # Quire CLI
//!
//! Usage:
//!   quire input.json -o pages.json
//!   echo '{ ... }' | quire -o pages.json
//!   quire --example > report.json
//!
//! Without `-o` the pages are written to stdout. `-v` enables debug logging.

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use tracing::Level;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_report_json());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> quire::QuireResult<()> {
    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone());
    let input_path = args
        .iter()
        .enumerate()
        .find(|(i, a)| !a.starts_with('-') && (*i == 0 || args[i - 1] != "-o"))
        .map(|(_, a)| a.clone());

    let input = match input_path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let pages = quire::render_json(&input)?;
    match output_path {
        Some(path) => {
            fs::write(&path, &pages)?;
            eprintln!("✓ Written {} bytes to {}", pages.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(pages.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn example_report_json() -> &'static str {
    r##"{
  "page": {
    "size": "A4",
    "margin": { "top": 54, "right": 54, "bottom": 54, "left": 54 },
    "spacing": 12
  },
  "footer": {
    "kind": { "type": "Paragraph", "text": "Page {page} of {pages}", "textStyle": { "fontSize": 9, "textAlign": "End" } }
  },
  "children": [
    {
      "kind": { "type": "Paragraph", "text": "Quarterly Report", "textStyle": { "fontSize": 24, "fontWeight": 700 } }
    },
    {
      "kind": { "type": "Rule", "thickness": 1, "color": { "r": 0.8, "g": 0.8, "b": 0.8 } }
    },
    {
      "kind": {
        "type": "Paragraph",
        "spans": [
          { "text": "Revenue grew " },
          { "text": "14%", "style": { "fontWeight": 700 } },
          { "text": " over the previous quarter, driven by subscriptions and a strong close in the enterprise segment." }
        ],
        "textStyle": { "fontSize": 11, "lineSpacing": 1.2 }
      }
    },
    {
      "kind": {
        "type": "Grid",
        "columns": [ { "width": "Auto" }, { "width": { "Star": 1 } }, { "width": { "Star": 1 } } ],
        "columnSpacing": 8,
        "rowSpacing": 4
      },
      "children": [
        { "kind": { "type": "Paragraph", "text": "Region", "textStyle": { "fontWeight": 700 } }, "cell": { "row": 0, "column": 0 } },
        { "kind": { "type": "Paragraph", "text": "Q1", "textStyle": { "fontWeight": 700, "textAlign": "End" } }, "cell": { "row": 0, "column": 1 } },
        { "kind": { "type": "Paragraph", "text": "Q2", "textStyle": { "fontWeight": 700, "textAlign": "End" } }, "cell": { "row": 0, "column": 2 } },
        { "kind": { "type": "Paragraph", "text": "North America" }, "cell": { "row": 1, "column": 0 } },
        { "kind": { "type": "Paragraph", "text": "$1.2M", "textStyle": { "textAlign": "End" } }, "cell": { "row": 1, "column": 1 } },
        { "kind": { "type": "Paragraph", "text": "$1.4M", "textStyle": { "textAlign": "End" } }, "cell": { "row": 1, "column": 2 } },
        { "kind": { "type": "Paragraph", "text": "Europe" }, "cell": { "row": 2, "column": 0 } },
        { "kind": { "type": "Paragraph", "text": "$0.8M", "textStyle": { "textAlign": "End" } }, "cell": { "row": 2, "column": 1 } },
        { "kind": { "type": "Paragraph", "text": "$0.9M", "textStyle": { "textAlign": "End" } }, "cell": { "row": 2, "column": 2 } }
      ]
    },
    {
      "kind": { "type": "HorizontalStack", "spacing": 16 },
      "children": [
        { "kind": { "type": "Paragraph", "text": "Prepared by Finance" } },
        { "kind": { "type": "Paragraph", "text": "Confidential", "textStyle": { "textAlign": "End", "color": { "r": 0.6, "g": 0.1, "b": 0.1 } } } }
      ]
    }
  ]
}
"##
}
