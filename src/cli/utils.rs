use serde::Serialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

use crate::cli::OutputFormat;
use crate::notice::Notice;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Report a command failure; notices keep their error code
pub fn report_failure(output_format: &OutputFormat, err: &anyhow::Error) -> anyhow::Result<()> {
    match err.downcast_ref::<Notice>() {
        Some(notice) => output_error(output_format, &notice.description, notice.code.as_deref()),
        None => output_error(output_format, &err.to_string(), None),
    }
}

/// Output a collection: pretty JSON, or one line per item
pub fn output_list<T: Serialize>(
    output_format: &OutputFormat,
    collection_name: &str,
    items: &[T],
    empty_message: &str,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: items }))?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_message);
            }
            for item in items {
                println!("{}", line(item));
            }
        }
    }
    Ok(())
}

/// Output a single record: pretty JSON, or preformatted text lines
pub fn output_item<T: Serialize>(output_format: &OutputFormat, item: &T, lines: Vec<String>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
        OutputFormat::Text => {
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Read one line from stdin after printing a prompt to stderr
pub fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Interactive yes/no confirmation, defaulting to no
pub fn confirm_on_terminal(prompt: &str) -> bool {
    match prompt_line(&format!("{} [y/N] ", prompt)) {
        Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "ha"),
        Err(_) => false,
    }
}
