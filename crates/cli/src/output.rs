use crate::error::CliError;
use engine_config::report::finding::Finding;
use engine_core::BatchSummary;
use engine_processing::ValidationResult;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

pub fn print_summary(summary: &BatchSummary, as_json: bool) -> Result<(), CliError> {
    if as_json {
        return print_json(summary, true);
    }
    print!("{summary}");
    Ok(())
}

pub fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!("{finding}");
    }
}

pub fn print_validation(result: &ValidationResult) -> Result<(), CliError> {
    print_json(result, true)?;
    if result.can_process {
        println!("Document can be processed");
    } else {
        println!("Document would be rejected");
    }
    Ok(())
}
