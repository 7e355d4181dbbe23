// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jinja_vars::{Engine, EngineOptions, Source};

fn read_options(file: Option<String>) -> Result<EngineOptions> {
    let Some(file) = file else {
        return Ok(EngineOptions::default());
    };
    let contents =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read {file}"))?;
    if file.ends_with(".json") {
        EngineOptions::from_json(&contents)
    } else if file.ends_with(".yaml") || file.ends_with(".yml") {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        bail!("Unsupported options file `{file}`. Must be json or yaml.")
    }
}

fn parse_lines(lines: &str) -> Result<(usize, usize)> {
    let (first, last) = match lines.split_once(':') {
        Some((first, last)) => (first, last),
        None => (lines, lines),
    };
    let first = first
        .trim()
        .parse()
        .with_context(|| format!("invalid first line in `{lines}`"))?;
    let last = last
        .trim()
        .parse()
        .with_context(|| format!("invalid last line in `{lines}`"))?;
    Ok((first, last))
}

fn template_extract(
    file: String,
    lines: Option<String>,
    describe: bool,
    options: Option<String>,
) -> Result<()> {
    let engine = Engine::with_options(read_options(options)?);
    let source = Source::from_file(&file)?;

    let schema = match lines {
        Some(lines) => {
            let (first, last) = parse_lines(&lines)?;
            engine.extract_lines(&source, first, last)?
        }
        None => engine.extract_source(&source),
    };

    if describe {
        println!("{}", serde_json::to_string_pretty(&schema.describe())?);
    } else {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    }
    Ok(())
}

fn template_segments(file: String, verbose: bool) -> Result<()> {
    let source = Source::from_file(&file)?;
    for segment in Engine::new().segments(&source) {
        if verbose {
            // Print each segment's line and mark its start with ^.
            println!("{}", source.message_at(segment.start, "", ""));
        }
        println!("{segment:?}");
    }
    Ok(())
}

fn template_statements(file: String) -> Result<()> {
    let source = Source::from_file(&file)?;
    let statements = Engine::new().statements(&source);
    println!("{}", serde_json::to_string_pretty(&statements)?);
    Ok(())
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Infer the variables a template expects.
    Extract {
        /// Template file.
        file: String,

        /// Only analyze lines FIRST:LAST (one-based, inclusive).
        #[arg(long, short, value_name = "FIRST:LAST")]
        lines: Option<String>,

        /// Print the structural schema instead of a sample context.
        #[arg(long, short)]
        describe: bool,

        /// Engine options. json or yaml.
        #[arg(long, short, value_name = "options.json|options.yaml")]
        options: Option<String>,
    },

    /// Split a template into segments.
    Segments {
        /// Template file.
        file: String,

        /// Verbose output.
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse the statements of a template.
    Statements {
        /// Template file.
        file: String,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: TemplateCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse and dispatch command.
    let cli = Cli::parse();
    match cli.command {
        TemplateCommand::Extract {
            file,
            lines,
            describe,
            options,
        } => template_extract(file, lines, describe, options),
        TemplateCommand::Segments { file, verbose } => template_segments(file, verbose),
        TemplateCommand::Statements { file } => template_statements(file),
    }
}
