use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use labinsight_core::{
    display_label, format_value, AnalysisConfig, AnalysisResult, Gender, LabValue,
    ObservationSet, ReferenceData,
};
use labinsight_engine::{KeywordKnowledgeBase, LabAnalyzer, LabReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod extract;

#[derive(Parser, Debug)]
#[command(
    name = "labinsight",
    about = "Rule-based interpretation of laboratory reports."
)]
struct Cli {
    /// JSON reference table replacing the built-in ranges.
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract lab values from report text and print them as JSON.
    Extract {
        /// Report text file.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Analyze a panel and print the interpretation.
    Analyze(AnalyzeArgs),
    /// Compare a single value against its reference range.
    Classify {
        test: String,
        value: f64,
        #[arg(short, long)]
        gender: Gender,
    },
    /// Search the built-in knowledge base.
    Ask {
        question: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// JSON object of test name -> value.
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    values: Option<PathBuf>,
    /// Report text file, run through the extractor first.
    #[arg(long)]
    text: Option<PathBuf>,
    #[arg(short, long)]
    gender: Gender,
    #[arg(short, long)]
    age: u32,
    /// Correct or add a value, e.g. `--set Hemoglobin=11.2`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    corrections: Vec<String>,
    /// Drop a value before analysis.
    #[arg(long = "remove", value_name = "NAME")]
    removals: Vec<String>,
    /// Attach the built-in knowledge base.
    #[arg(long)]
    knowledge: bool,
    /// Write the full report document to this file.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the analysis as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labinsight=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let reference = load_reference(cli.reference.as_deref())?;

    match cli.command {
        Command::Extract { input } => {
            let text = read_file(&input)?;
            let values = extract::extract_lab_values(&text);
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        Command::Analyze(args) => run_analyze(args, reference)?,
        Command::Classify {
            test,
            value,
            gender,
        } => {
            let classification = LabAnalyzer::new(reference).classify(&test, value, gender);
            println!(
                "{} {}: {} - {}",
                classification.glyph(),
                display_label(&test),
                format_value(value),
                classification.description
            );
        }
        Command::Ask { question, top_k } => {
            let knowledge = KeywordKnowledgeBase::standard(AnalysisConfig::default());
            let passages = knowledge.query(&question, top_k);
            if passages.is_empty() {
                println!("No matching passages.");
            }
            for passage in passages {
                println!("## {}\n{}\n", passage.topic, passage.text);
            }
        }
    }

    Ok(())
}

fn run_analyze(args: AnalyzeArgs, reference: ReferenceData) -> anyhow::Result<()> {
    let mut observations = match (&args.values, &args.text) {
        (Some(path), _) => {
            let data = read_file(path)?;
            serde_json::from_str::<ObservationSet>(&data)
                .with_context(|| format!("Invalid lab values in {}", path.display()))?
        }
        (None, Some(path)) => extract::extract_lab_values(&read_file(path)?),
        (None, None) => bail!("either --values or --text is required"),
    };

    for correction in &args.corrections {
        let (name, raw) = correction
            .split_once('=')
            .with_context(|| format!("Expected NAME=VALUE, received '{correction}'"))?;
        observations
            .set(name.trim(), LabValue::parse(raw), &reference)
            .with_context(|| format!("Could not apply correction '{correction}'"))?;
    }
    for name in &args.removals {
        if observations.remove(name).is_none() {
            tracing::warn!(test = %name, "nothing to remove");
        }
    }

    if observations.is_empty() {
        bail!("no lab values to analyze");
    }

    let mut analyzer = LabAnalyzer::new(reference);
    if args.knowledge {
        analyzer = analyzer.with_standard_knowledge();
    }
    let analysis = analyzer.analyze_observations(&observations, args.gender, args.age);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis, &observations, &analyzer, args.gender);
    }

    if let Some(path) = &args.report {
        let report = LabReport::new(args.gender, args.age, observations, analysis);
        let summary = report.executive_summary();
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Could not write report to {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            parameters = summary.total_parameters,
            abnormal = summary.abnormal_findings,
            "report written"
        );
    }

    Ok(())
}

fn print_analysis(
    analysis: &AnalysisResult,
    observations: &ObservationSet,
    analyzer: &LabAnalyzer,
    gender: Gender,
) {
    if !analysis.critical_alerts.is_empty() {
        println!("CRITICAL VALUES");
        for alert in &analysis.critical_alerts {
            println!(
                "  {}: {} (critical range {}, {})",
                display_label(&alert.test),
                format_value(alert.value),
                alert.range,
                alert.direction
            );
        }
        println!();
    }

    println!("RESULTS");
    for (test, value) in observations.iter() {
        match value.as_numeric() {
            Some(number) => {
                let classification = analyzer.classify(test, number, gender);
                println!(
                    "  {} {}: {} - {}",
                    classification.glyph(),
                    display_label(test),
                    value,
                    classification.description
                );
            }
            None => println!("  • {}: {}", display_label(test), value),
        }
    }

    for line in &analysis.summary {
        println!("  {line}");
    }

    for (category, result) in &analysis.categories {
        if result.patterns.is_empty() {
            continue;
        }
        println!("\n{}", category.label().to_uppercase());
        for finding in &result.patterns {
            println!("  {finding}");
        }
    }

    if !analysis.diagnoses.is_empty() {
        println!("\nDIFFERENTIAL DIAGNOSIS");
        for (rank, dx) in analysis.diagnoses.iter().enumerate() {
            println!(
                "  {}. {} [{:?} probability, {:?} urgency]",
                rank + 1,
                dx.condition,
                dx.probability,
                dx.urgency
            );
            for evidence in &dx.supporting_evidence {
                println!("     - {evidence}");
            }
        }
    }

    println!("\nNEXT STEPS");
    for step in &analysis.next_steps {
        println!("  {step}");
    }

    println!("\n{}", analysis.rag_insights);
}

fn load_reference(path: Option<&Path>) -> anyhow::Result<ReferenceData> {
    let Some(path) = path else {
        return Ok(ReferenceData::standard());
    };
    let data = read_file(path)?;
    ReferenceData::from_json_str(&data)
        .with_context(|| format!("Invalid reference table in {}", path.display()))
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Could not read file {}", path.display()))
}
