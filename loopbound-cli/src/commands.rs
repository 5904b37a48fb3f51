// CLI command handlers
use anyhow::{Context, Result};
use loopbound_core::config::AnalysisConfig;
use loopbound_core::ir::Module;
use loopbound_core::loopbound::{Classification, LoopBoundAnalyzer, LoopBoundReport};
use std::fs;
use std::path::Path;

/// Output format of the `analyze` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Read an IR module from a JSON file. Validation happens when the module is analyzed.
pub fn load_module(module_path: &Path) -> Result<Module> {
    let content = fs::read_to_string(module_path)
        .with_context(|| format!("Failed to read module file: {}", module_path.display()))?;
    let module = Module::from_json_str(&content)
        .with_context(|| format!("Failed to parse module file: {}", module_path.display()))?;
    Ok(module)
}

/// Analyze every loop of a module and write the report.
pub fn analyze(
    module_path: &Path,
    config_path: &Path,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<LoopBoundReport> {
    let config = AnalysisConfig::load(config_path)?;
    let module = load_module(module_path)?;

    let report = LoopBoundAnalyzer::new(config.clone())
        .analyze_module(&module)
        .context("Loop-bound analysis failed")?;

    let rendered = render(&report, &config, format)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(report)
}

/// Render a report in the requested format.
pub fn render(
    report: &LoopBoundReport,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = report
                .iter()
                .map(|result| {
                    let mut entry = serde_json::to_value(result)?;
                    entry["trip_count"] = serde_json::to_value(result.trip_count(config))?;
                    Ok(entry)
                })
                .collect::<serde_json::Result<_>>()
                .context("Failed to serialize report")?;
            serde_json::to_string_pretty(&entries).context("Failed to serialize report")
        }
        OutputFormat::Text => {
            let mut text = String::new();
            for result in report.iter() {
                let trips = result.trip_count(config);
                text.push_str(&format!("{result}\n    trip count: [{}, {}]\n", trips.low, trips.high));
            }
            let summary = report.summary();
            text.push_str(&format!("{} loops", report.len()));
            for classification in Classification::ALL {
                if let Some(count) = summary.get(&classification) {
                    text.push_str(&format!(", {classification}: {count}"));
                }
            }
            Ok(text)
        }
    }
}

/// Load a configuration file and print the resolved fallback table.
pub fn check_config(config_path: &Path) -> Result<AnalysisConfig> {
    let config = AnalysisConfig::load(config_path)?;
    println!("Configuration {} is valid", config_path.display());
    for classification in Classification::ALL {
        if let Some(key) = classification.config_key() {
            println!("  {key}: {}", config.fallback_for(classification));
        }
    }
    println!("  max_worklist_iterations: {}", config.max_worklist_iterations());
    println!("  parallel: {}", config.parallel());
    Ok(config)
}
