//! Action-plan and survey-question recommendations from an external collaborator,
//! with flagged local fallbacks whenever it cannot be used.

pub mod domain;
mod extract;
pub mod fallback;
pub mod gateway;
pub mod http;

pub use domain::{
    ActionStep, GatewayFailure, IssueType, RecommendationRequest, RecommendationResponse,
    RecommendationSubject, SurveyQuestion,
};
pub use fallback::{fallback_recommendations, fallback_survey_questions, issue_for_outliers};
pub use gateway::{
    GatewayRequest, GatewayRequestKind, RecommendationGateway, RecommendationProvider,
    DEFAULT_TIMEOUT,
};
pub use http::HttpRecommendationProvider;
