//! Code-grading harness CLI.
//!
//! Evaluates a candidate source file against a question's stored test cases
//! through the configured compiler/loader, and offers authoring helpers for
//! question files and listy text.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grader::core::descriptor::TypeDescriptor;
use grader::core::listy::{reformat, sample};
use grader::core::signature::TestCase;
use grader::core::validation::validate_question;
use grader::core::verdict::{Report, Verdict};
use grader::engine::evaluate_report;
use grader::exit_codes;
use grader::io::config::{DEFAULT_CONFIG_PATH, GraderConfig, load_config, write_config};
use grader::io::loader::ProcessLoader;
use grader::io::question::load_question;
use grader::logging;

#[derive(Parser)]
#[command(name = "grader", version, about = "Structural code-grading harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grade a candidate source file against a question's test cases.
    Evaluate {
        /// Question JSON file.
        #[arg(long)]
        question: PathBuf,
        /// Candidate source file.
        #[arg(long)]
        source: PathBuf,
        /// Grader config (TOML). Defaults to `.grader/config.toml` if present.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Run the question's examples before its test cases.
        #[arg(long)]
        with_examples: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check a question file: schema, descriptors and every stored case.
    Validate {
        #[arg(long)]
        question: PathBuf,
    },
    /// Print a valid placeholder value for a type descriptor.
    Sample {
        /// Descriptor JSON, e.g. '{"type": "Array", "type_children": {"type": "Integer"}}'.
        #[arg(long = "type")]
        descriptor: String,
    },
    /// Print listy text in canonical `", "`-separated form.
    Format { text: String },
    /// Write the default config to `.grader/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Evaluate {
            question,
            source,
            config,
            with_examples,
            json,
        } => cmd_evaluate(&question, &source, config.as_deref(), with_examples, json),
        Command::Validate { question } => cmd_validate(&question),
        Command::Sample { descriptor } => cmd_sample(&descriptor),
        Command::Format { text } => {
            println!("{}", reformat(&text)?);
            Ok(exit_codes::OK)
        }
        Command::Init { force, config } => cmd_init(&config, force),
    }
}

fn cmd_evaluate(
    question_path: &Path,
    source_path: &Path,
    config_path: Option<&Path>,
    with_examples: bool,
    json: bool,
) -> Result<i32> {
    let question = load_question(question_path)?;
    let source = fs::read_to_string(source_path)
        .with_context(|| format!("read {}", source_path.display()))?;
    let config = load_config(config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH)))?;

    let cases: Vec<TestCase> = if with_examples {
        question
            .examples
            .iter()
            .chain(&question.test_cases)
            .cloned()
            .collect()
    } else {
        question.test_cases.clone()
    };
    let loader = ProcessLoader::new(config);
    let report = evaluate_report(&loader, &source, &cases, &question.function_config);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(verdict_exit_code(&report.verdict))
}

fn print_report(report: &Report) {
    match &report.verdict {
        Verdict::Pass => println!("PASS ({} cases)", report.cases_run),
        Verdict::Fail => {
            println!("FAIL");
            if let Some(mismatch) = &report.mismatch {
                println!("  case: {}", mismatch.case_index + 1);
                println!("  input: {}", mismatch.parameters.join(", "));
                println!("  expected: {}", mismatch.expected);
                match &mismatch.actual {
                    Some(actual) => println!("  actual: {actual}"),
                    None => println!("  actual: <unencodable>"),
                }
            }
        }
        Verdict::Error(message) => println!("ERROR {message}"),
    }
}

fn verdict_exit_code(verdict: &Verdict) -> i32 {
    match verdict {
        Verdict::Pass => exit_codes::OK,
        Verdict::Fail => exit_codes::FAIL,
        Verdict::Error(_) => exit_codes::ERROR,
    }
}

fn cmd_validate(question_path: &Path) -> Result<i32> {
    let question = load_question(question_path)?;
    let errors = validate_question(&question);
    if errors.is_empty() {
        println!("ok");
        return Ok(exit_codes::OK);
    }
    eprintln!("invalid question:\n- {}", errors.join("\n- "));
    Ok(exit_codes::INVALID)
}

fn cmd_sample(raw: &str) -> Result<i32> {
    let descriptor: TypeDescriptor =
        serde_json::from_str(raw).context("parse type descriptor json")?;
    println!("{}", sample(&descriptor)?);
    Ok(exit_codes::OK)
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &GraderConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evaluate() {
        let cli = Cli::parse_from([
            "grader",
            "evaluate",
            "--question",
            "q.json",
            "--source",
            "s.py",
            "--json",
        ]);
        let Command::Evaluate {
            question,
            config,
            json,
            with_examples,
            ..
        } = cli.command
        else {
            panic!("expected evaluate");
        };
        assert_eq!(question, PathBuf::from("q.json"));
        assert!(config.is_none());
        assert!(json);
        assert!(!with_examples);
    }

    #[test]
    fn parse_sample_type_flag() {
        let cli = Cli::parse_from(["grader", "sample", "--type", r#"{"type": "Integer"}"#]);
        assert!(matches!(cli.command, Command::Sample { .. }));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["grader", "init", "--force"]);
        let Command::Init { force, config } = cli.command else {
            panic!("expected init");
        };
        assert!(force);
        assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn verdicts_map_to_distinct_exit_codes() {
        assert_eq!(verdict_exit_code(&Verdict::Pass), exit_codes::OK);
        assert_eq!(verdict_exit_code(&Verdict::Fail), exit_codes::FAIL);
        assert_eq!(
            verdict_exit_code(&Verdict::error("callable not found")),
            exit_codes::ERROR
        );
    }
}
