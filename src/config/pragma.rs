//! Application of `.pragma` directives to a configuration.
//!
//! Pragmas apply last-writer-wins, in source order.
//! A pragma never overrides a value set on the command line, a repeated key
//! warns, and an unknown key warns.

use std::collections::BTreeMap;

use crate::ast::Program;
use crate::config::Config;
use crate::reports::ErrorReport;

/// Applies the program's pragmas to the configuration.
pub fn apply_pragmas(config: &mut Config, program: &Program, report: &mut ErrorReport) {
    let mut seen: BTreeMap<&str, ()> = BTreeMap::default();

    for pragma in &program.pragmas {
        if seen.insert(pragma.key.as_str(), ()).is_some() {
            report.add_warning(
                format!("Duplicate pragma {}", pragma.key),
                pragma.loc.clone(),
            );
        }

        match pragma.key.as_str() {
            "magic-transform" => match parse_switch(&pragma.value) {
                Some(value) => config.magic_transform.set_from_pragma(value),
                None => bad_value(report, pragma),
            },
            "provenance" => match parse_switch(&pragma.value) {
                Some(value) => config.provenance.set_from_pragma(value),
                None => bad_value(report, pragma),
            },
            "profile" => match parse_switch(&pragma.value) {
                Some(value) => config.profile.set_from_pragma(value),
                None => bad_value(report, pragma),
            },
            "fact-dir" => config.fact_dir.set_from_pragma(pragma.value.clone()),
            "output-dir" => config.output_dir.set_from_pragma(pragma.value.clone()),
            "jobs" => match pragma.value.parse::<usize>() {
                Ok(value) if value > 0 => config.jobs.set_from_pragma(value),
                _ => bad_value(report, pragma),
            },
            _ => report.add_warning(
                format!("Unknown pragma {}", pragma.key),
                pragma.loc.clone(),
            ),
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "true" | "on" | "1" | "" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn bad_value(report: &mut ErrorReport, pragma: &crate::ast::Pragma) {
    report.add_error(
        format!("Invalid value \"{}\" for pragma {}", pragma.value, pragma.key),
        pragma.loc.clone(),
    );
}
