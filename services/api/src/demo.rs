use crate::infra::{demo_samples, parse_issue, parse_method, parse_metric_list};
use clap::Args;
use std::path::PathBuf;
use workforce_insights::analytics::report::views::AnalysisReportSummary;
use workforce_insights::analytics::{
    AnalysisReport, DetectionConfig, DetectionMethod, MetricCatalog, MetricSampleStore,
    RangeTable, ReportRequest, SampleImporter,
};
use workforce_insights::config::AppConfig;
use workforce_insights::error::AppError;
use workforce_insights::recommendations::{issue_for_outliers, IssueType, RecommendationRequest};

const DEMO_METRICS: [&str; 3] = ["performance", "engagement", "satisfaction"];

/// Comma-separated metric names given as one argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MetricList(pub(crate) Vec<String>);

fn parse_metrics_arg(raw: &str) -> Result<MetricList, String> {
    parse_metric_list(raw).map(MetricList)
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// CSV metric export (entity_id,entity_label,department,metric_name,value,...)
    #[arg(long)]
    pub(crate) samples: PathBuf,
    /// Comma-separated metrics to score (e.g. performance,engagement)
    #[arg(long, value_parser = parse_metrics_arg)]
    pub(crate) metrics: MetricList,
    /// zscore, iqr or isolation_forest_proxy
    #[arg(long, value_parser = parse_method, default_value = "zscore")]
    pub(crate) method: DetectionMethod,
    /// Sensitivity threshold in deviation units
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    /// Minimum confidence for a flagged entity to be reported
    #[arg(long, conflicts_with = "no_confidence_filter")]
    pub(crate) confidence: Option<f64>,
    /// Report every flagged entity regardless of confidence
    #[arg(long)]
    pub(crate) no_confidence_filter: bool,
    /// Metric bucketed into the five-point distribution
    #[arg(long)]
    pub(crate) score_metric: Option<String>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Sensitivity threshold used for the synthetic population
    #[arg(long, default_value_t = 1.5)]
    pub(crate) threshold: f64,
    /// Ask for plans for this issue instead of the one derived from the outliers
    #[arg(long, value_parser = parse_issue)]
    pub(crate) issue: Option<IssueType>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        samples,
        metrics,
        method,
        threshold,
        confidence,
        no_confidence_filter,
        score_metric,
        json,
    } = args;

    let mut store = MetricSampleStore::new(MetricCatalog::standard());
    let file = std::fs::File::open(&samples)?;
    let loaded = SampleImporter::load_into(&mut store, file)?;

    let mut detection = DetectionConfig::for_metrics(metrics.0).with_method(method);
    if let Some(threshold) = threshold {
        detection = detection.with_sensitivity(threshold);
    }
    if let Some(confidence) = confidence {
        detection = detection.with_confidence_threshold(Some(confidence));
    }
    if no_confidence_filter {
        detection = detection.with_confidence_threshold(None);
    }

    let request = ReportRequest {
        detection,
        score_metric,
        ranges: RangeTable::five_point(),
    };
    let report = AnalysisReport::build(&store, &request)?;

    if json {
        print_json(&report.summary())?;
    } else {
        println!("Loaded {loaded} samples from {}", samples.display());
        render_report(&report.summary());
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let mut store = MetricSampleStore::new(MetricCatalog::standard());
    store.load(demo_samples())?;

    let request = ReportRequest {
        detection: DetectionConfig::for_metrics(DEMO_METRICS)
            .with_sensitivity(args.threshold)
            .with_confidence_threshold(None),
        score_metric: Some("performance".to_string()),
        ranges: RangeTable::five_point(),
    };
    let report = AnalysisReport::build(&store, &request)?;
    let summary = report.summary();

    if args.json {
        print_json(&summary)?;
    } else {
        println!("Workforce insights demo ({} synthetic employees)", summary.population);
        render_report(&summary);
    }

    let gateway = config.ai.gateway();
    let (issue, request) = match args.issue {
        Some(issue) => (issue, RecommendationRequest::for_issue(issue)),
        None => (
            issue_for_outliers(&report.outliers),
            RecommendationRequest::for_outliers(report.outliers.clone()),
        ),
    };
    let plans = gateway.request_recommendations(&request).await;

    println!("\nRecommended action plans for {}", issue.label());
    if !gateway.is_configured() {
        println!("(no recommendation endpoint configured; showing built-in templates)");
    }
    for plan in &plans {
        let source = if plan.is_fallback { "fallback" } else { "generated" };
        println!("- [{source}] {}: {}", plan.title, plan.description);
        for step in &plan.steps {
            println!(
                "    * {} ({}, {})",
                step.step, step.timeline, step.responsible
            );
        }
        println!(
            "    target {} | expected {}",
            plan.target_metric, plan.expected_improvement
        );
    }

    Ok(())
}

fn print_json(summary: &AnalysisReportSummary) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(summary)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn render_report(summary: &AnalysisReportSummary) {
    println!(
        "Population {} | method {}",
        summary.population, summary.method_label
    );

    println!("\nMetric summaries");
    for entry in &summary.metric_summaries {
        let stats = &entry.summary;
        match (stats.mean, stats.median, stats.std_dev, stats.min, stats.max) {
            (Some(mean), Some(median), Some(std_dev), Some(min), Some(max)) => println!(
                "- {}: n={} mean {:.2} | median {:.2} | sd {:.2} | range {:.1}-{:.1}",
                entry.metric_name, stats.count, mean, median, std_dev, min, max
            ),
            _ => println!("- {}: no data", entry.metric_name),
        }
    }

    if let Some(distribution) = &summary.distribution {
        println!("\nDistribution of {}", distribution.metric_name);
        for bucket in &distribution.buckets {
            if bucket.is_unclassified() && bucket.count() == 0 {
                continue;
            }
            println!("- {}: {}", bucket.label, bucket.count());
        }
    }

    let outliers = &summary.outlier_summary;
    println!(
        "\nOutliers: {} total ({} positive, {} negative, {} neutral) across {} departments",
        outliers.total_outliers,
        outliers.positive_outliers,
        outliers.negative_outliers,
        outliers.neutral_outliers,
        outliers.departments_affected
    );
    if outliers.total_outliers > 0 {
        println!("Average confidence {:.0}%", outliers.average_confidence * 100.0);
    }

    for view in &summary.outliers {
        let result = &view.result;
        println!(
            "- [{}] {} ({}) {} deviation {:+.2}, confidence {:.0}%",
            view.severity_label,
            result.entity_label,
            result.department.as_deref().unwrap_or("no department"),
            view.outlier_type_label,
            result.deviation_score,
            result.confidence_score * 100.0
        );
        for risk in &view.insight.risk_factors {
            println!("    risk: {risk}");
        }
        for strength in &view.insight.strengths {
            println!("    strength: {strength}");
        }
        println!(
            "    priority {} | {}",
            view.insight.intervention_priority, view.insight.predicted_outcome_label
        );
    }
}
