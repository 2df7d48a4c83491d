//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_cache(config, &mut result);
        Self::validate_embedding(config, &mut result);
        Self::validate_backfill(config, &mut result);

        result
    }

    fn validate_cache(config: &Config, result: &mut ValidationResult) {
        let cache = &config.cache;
        let thresholds = [
            ("cache.high_threshold", cache.high_threshold),
            ("cache.min_vector_similarity", cache.min_vector_similarity),
            ("cache.suggestion_similarity", cache.suggestion_similarity),
        ];
        for (path, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                result.add_error(ValidationError::new(path, "must be within [0, 1]"));
            }
        }

        if cache.min_vector_similarity > cache.high_threshold {
            result.add_error(ValidationError::new(
                "cache.min_vector_similarity",
                "must not exceed cache.high_threshold",
            ));
        }

        if cache.suggestion_similarity > cache.min_vector_similarity {
            result.add_warning(ValidationWarning::new(
                "cache.suggestion_similarity",
                "higher than the vector-stage floor; suggestions will be stricter than lookups",
            ));
        }

        if cache.keyword_candidates == 0 || cache.vector_candidates == 0 {
            result.add_error(ValidationError::new(
                "cache",
                "keyword_candidates and vector_candidates must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, result: &mut ValidationResult) {
        let embedding = &config.embedding;
        if !embedding.enabled {
            return;
        }

        if embedding.api_key.as_deref().map_or(true, str::is_empty) {
            result.add_warning(ValidationWarning::new(
                "embedding.api_key",
                "API key is not set; lookups will run keyword-only",
            ));
        }

        if !embedding.base_url.starts_with("http://") && !embedding.base_url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "embedding.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if embedding.dimension == 0 {
            result.add_error(ValidationError::new(
                "embedding.dimension",
                "dimension must be greater than 0",
            ));
        }
    }

    fn validate_backfill(config: &Config, result: &mut ValidationResult) {
        if config.backfill.batch_size == 0 {
            result.add_error(ValidationError::new(
                "backfill.batch_size",
                "batch_size must be greater than 0",
            ));
        }

        if config.backfill.enabled && config.backfill.interval_secs == 0 {
            result.add_error(ValidationError::new(
                "backfill.interval_secs",
                "interval_secs must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
