pub mod app_config;
pub mod classifier;
pub mod config;
pub mod identity;
pub mod rules;
pub mod trending;
pub mod validity;

use thiserror::Error;

pub use app_config::{AppConfig, BackendTarget, Environment, GenerationSettings};
pub use classifier::{Classification, ClassificationVerdict, Classifier, MatchReason};
pub use config::{load_app_config, load_app_config_from_env};
pub use identity::identity_hash;
pub use rules::{load_rules, ClassifierRules};
pub use trending::{
    category_filter, clamp_trending_limit, today_utc, RecordOutcome, DEFAULT_LOG_CATEGORY,
    DEFAULT_TRENDING_CATEGORY, TRENDING_DEFAULT_LIMIT, TRENDING_MAX_LIMIT,
};
pub use validity::{decode_path, PathRejection, PathRules, MAX_PATH_CHARS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read rules file {path}: {source}")]
    RulesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file: {0}")]
    RulesFileParse(#[source] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid {category} signature list: {source}")]
    InvalidPattern {
        category: &'static str,
        #[source]
        source: regex::Error,
    },
}
