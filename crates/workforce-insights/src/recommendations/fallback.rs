use super::domain::{ActionStep, IssueType, RecommendationResponse, SurveyQuestion};
use crate::analytics::domain::{OutlierResult, OutlierType};

const RISK_BELOW: f64 = 3.0;

/// Metric families checked, in tie-break order, when negative outliers dominate.
const FAMILIES: [(&str, IssueType); 3] = [
    ("engagement", IssueType::LowEngagement),
    ("performance", IssueType::PerformanceIssues),
    ("satisfaction", IssueType::LowSatisfaction),
];

/// Issue implied by a set of classified outliers.
///
/// A negative majority maps to the metric family most often below 3.0 among the negative
/// outliers; a positive majority maps to retention; anything else is general.
pub fn issue_for_outliers(outliers: &[OutlierResult]) -> IssueType {
    let total = outliers.len();
    let negatives: Vec<&OutlierResult> = outliers
        .iter()
        .filter(|result| result.outlier_type == OutlierType::Negative)
        .collect();
    let positives = outliers
        .iter()
        .filter(|result| result.outlier_type == OutlierType::Positive)
        .count();

    if total > 0 && negatives.len() * 2 > total {
        let mut best: Option<(usize, IssueType)> = None;
        for (family, issue) in FAMILIES {
            let hits = negatives
                .iter()
                .filter(|result| {
                    result
                        .contributing_metrics
                        .iter()
                        .any(|(metric, value)| metric.contains(family) && *value < RISK_BELOW)
                })
                .count();
            if hits > 0 && best.map_or(true, |(top, _)| hits > top) {
                best = Some((hits, issue));
            }
        }
        return best.map_or(IssueType::General, |(_, issue)| issue);
    }

    if total > 0 && positives * 2 > total {
        return IssueType::HighPerformerRetention;
    }

    IssueType::General
}

/// Deterministic stand-in plans for `issue`, each flagged `is_fallback`.
pub fn fallback_recommendations(issue: IssueType) -> Vec<RecommendationResponse> {
    let plan = match issue {
        IssueType::LowEngagement => RecommendationResponse {
            title: "Team Building Workshop".to_string(),
            description: "Run facilitated team activities to rebuild collaboration and engagement."
                .to_string(),
            category: Some("engagement".to_string()),
            steps: vec![
                ActionStep::new("Plan team building activities", "1 week", "HR Team"),
                ActionStep::new("Run the workshop", "1 day", "External Facilitator"),
                ActionStep::new("Send a follow-up pulse survey", "2 weeks", "HR Team"),
            ],
            success_metrics: strings(&[
                "Engagement score improvement",
                "Team collaboration rating",
            ]),
            target_metric: "Employee Engagement".to_string(),
            expected_improvement: "15-20%".to_string(),
            estimated_duration: Some("4 weeks".to_string()),
            is_fallback: true,
        },
        IssueType::PerformanceIssues => RecommendationResponse {
            title: "Performance Improvement Plan".to_string(),
            description: "Structured approach to close identified performance gaps.".to_string(),
            category: Some("performance".to_string()),
            steps: vec![
                ActionStep::new("Identify performance gaps", "1 week", "Manager"),
                ActionStep::new("Agree an improvement plan", "1 week", "HR & Manager"),
                ActionStep::new("Hold regular check-ins", "8 weeks", "Manager"),
            ],
            success_metrics: strings(&["Performance rating improvement", "Goal achievement"]),
            target_metric: "Performance Rating".to_string(),
            expected_improvement: "25-30%".to_string(),
            estimated_duration: Some("12 weeks".to_string()),
            is_fallback: true,
        },
        IssueType::LowSatisfaction => RecommendationResponse {
            title: "Satisfaction Listening Sessions".to_string(),
            description: "Gather concrete grievances in small groups and act on the top themes."
                .to_string(),
            category: Some("satisfaction".to_string()),
            steps: vec![
                ActionStep::new("Schedule listening sessions", "1 week", "HR Team"),
                ActionStep::new("Publish the top three themes", "2 weeks", "HR Team"),
                ActionStep::new("Deliver the first fixes", "6 weeks", "Department Heads"),
            ],
            success_metrics: strings(&["Satisfaction score improvement", "Voluntary turnover"]),
            target_metric: "Employee Satisfaction".to_string(),
            expected_improvement: "10-15%".to_string(),
            estimated_duration: Some("8 weeks".to_string()),
            is_fallback: true,
        },
        IssueType::HighPerformerRetention => RecommendationResponse {
            title: "High Performer Retention Program".to_string(),
            description: "Keep top contributors with growth paths and recognition.".to_string(),
            category: Some("retention".to_string()),
            steps: vec![
                ActionStep::new("Hold stay interviews", "2 weeks", "Manager"),
                ActionStep::new("Agree individual growth plans", "4 weeks", "HR & Manager"),
                ActionStep::new("Review compensation and recognition", "6 weeks", "HR Team"),
            ],
            success_metrics: strings(&["High performer retention rate", "Internal promotions"]),
            target_metric: "Retention Rate".to_string(),
            expected_improvement: "10%".to_string(),
            estimated_duration: Some("8 weeks".to_string()),
            is_fallback: true,
        },
        IssueType::General => RecommendationResponse {
            title: "Manager Review of Flagged Metrics".to_string(),
            description: "Walk through the flagged metrics with each manager and agree owners."
                .to_string(),
            category: Some("general".to_string()),
            steps: vec![
                ActionStep::new("Share the metric review", "1 week", "HR Team"),
                ActionStep::new("Agree owners for each finding", "2 weeks", "Department Heads"),
            ],
            success_metrics: strings(&["Findings with an owner", "Metric trend"]),
            target_metric: "Overall Metric Health".to_string(),
            expected_improvement: "5-10%".to_string(),
            estimated_duration: Some("4 weeks".to_string()),
            is_fallback: true,
        },
    };
    vec![plan]
}

pub fn fallback_survey_questions(kpi_focus: &str) -> Vec<SurveyQuestion> {
    vec![SurveyQuestion {
        question: format!(
            "How would you rate your current level of {}?",
            kpi_focus.trim().to_lowercase()
        ),
        question_type: "likert".to_string(),
        options: Some(strings(&[
            "Strongly Disagree",
            "Disagree",
            "Neutral",
            "Agree",
            "Strongly Agree",
        ])),
        kpi_mapping: Some(kpi_focus.to_string()),
        weight: Some(1.0),
        is_fallback: true,
    }]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::domain::Severity;

    fn outlier(id: &str, kind: OutlierType, metrics: &[(&str, f64)]) -> OutlierResult {
        OutlierResult {
            entity_id: id.to_string(),
            entity_label: id.to_string(),
            department: None,
            outlier_type: kind,
            severity: Severity::Medium,
            deviation_score: 1.0,
            confidence_score: 0.8,
            contributing_metrics: metrics
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    #[test]
    fn negative_majority_maps_to_weakest_family() {
        let outliers = vec![
            outlier("a", OutlierType::Negative, &[("performance", 2.0), ("engagement", 3.5)]),
            outlier("b", OutlierType::Negative, &[("performance_score", 1.5)]),
            outlier("c", OutlierType::Positive, &[("performance", 4.9)]),
        ];
        assert_eq!(issue_for_outliers(&outliers), IssueType::PerformanceIssues);
    }

    #[test]
    fn ties_prefer_engagement() {
        let outliers = vec![outlier(
            "a",
            OutlierType::Negative,
            &[("performance", 2.0), ("engagement", 2.0)],
        )];
        assert_eq!(issue_for_outliers(&outliers), IssueType::LowEngagement);
    }

    #[test]
    fn positive_majority_maps_to_retention() {
        let outliers = vec![
            outlier("a", OutlierType::Positive, &[("performance", 4.9)]),
            outlier("b", OutlierType::Positive, &[("engagement", 4.8)]),
            outlier("c", OutlierType::Neutral, &[]),
        ];
        assert_eq!(issue_for_outliers(&outliers), IssueType::HighPerformerRetention);
    }

    #[test]
    fn empty_or_split_sets_are_general() {
        assert_eq!(issue_for_outliers(&[]), IssueType::General);
        let split = vec![
            outlier("a", OutlierType::Positive, &[]),
            outlier("b", OutlierType::Negative, &[("turnover_risk", 80.0)]),
        ];
        assert_eq!(issue_for_outliers(&split), IssueType::General);
    }

    #[test]
    fn every_template_is_flagged_and_complete() {
        for issue in IssueType::ordered() {
            let plans = fallback_recommendations(issue);
            assert!(!plans.is_empty());
            for plan in plans {
                assert!(plan.is_fallback);
                assert!(!plan.steps.is_empty());
                assert!(!plan.success_metrics.is_empty());
            }
        }
        let questions = fallback_survey_questions("Employee Engagement");
        assert_eq!(
            questions[0].question,
            "How would you rate your current level of employee engagement?"
        );
        assert!(questions[0].is_fallback);
    }
}
