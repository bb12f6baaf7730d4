// Domain rules - Sampling, progress and response validation policies

use serde_json::Value;

use crate::domain::errors::*;

/// Deterministic placement of sample timestamps
pub struct SamplingPlan;

impl SamplingPlan {
    /// Interior sample positions for a video of `duration` seconds.
    ///
    /// The open interval `(0, duration)` is split into `count + 1` equal
    /// segments and the `count` interior boundaries are returned, so no
    /// sample lands on the first or last instant of the stream.
    pub fn timestamps(duration: f64, count: usize) -> Result<Vec<f64>, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::invalid_duration(format!(
                "Video duration must be a positive number of seconds, got {}",
                duration
            )));
        }

        let segments = (count + 1) as f64;
        let timestamps: Vec<f64> = (1..=count)
            .map(|i| i as f64 * duration / segments)
            .collect();

        // Tiny durations can collapse neighbouring positions
        let mut previous = 0.0;
        for &t in &timestamps {
            if !(t > previous && t < duration) {
                return Err(DomainError::invalid_duration(format!(
                    "Duration {}s is too short to place {} distinct samples",
                    duration, count
                )));
            }
            previous = t;
        }

        Ok(timestamps)
    }
}

/// Share of the 0-100 progress range credited to each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBudget {
    pub validated: u8,
    pub sampling_start: u8,
    pub sampling_end: u8,
    pub requesting: u8,
    pub assembling: u8,
}

impl Default for ProgressBudget {
    fn default() -> Self {
        Self {
            validated: 5,
            sampling_start: 10,
            sampling_end: 70,
            requesting: 75,
            assembling: 95,
        }
    }
}

impl ProgressBudget {
    pub const COMPLETE: u8 = 100;

    /// Overall progress after `captured` of `total` samples
    pub fn sampling(&self, captured: usize, total: usize) -> u8 {
        if total == 0 {
            return self.sampling_end;
        }
        let span = self.sampling_end.saturating_sub(self.sampling_start) as usize;
        let advanced = span * captured.min(total) / total;
        self.sampling_start + advanced as u8
    }

    /// Stage-local percentage carried by `PipelineState::Sampling`
    pub fn stage_percent(captured: usize, total: usize) -> u8 {
        if total == 0 {
            return 100;
        }
        (captured.min(total) * 100 / total) as u8
    }
}

/// Expected shape of a JSON value
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    String,
    /// Finite, non-negative JSON number
    NonNegative,
    Array(&'static FieldType, Presence),
    Object(&'static [Field]),
}

/// Whether an array must contain elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    MayBeEmpty,
    NonEmpty,
}

/// A required member of an object
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> Field {
    Field { name, ty }
}

const STRING_LIST: FieldType = FieldType::Array(&FieldType::String, Presence::MayBeEmpty);

const SHOT_FIELDS: &[Field] = &[
    field("id", FieldType::NonNegative),
    field("startTime", FieldType::NonNegative),
    field("endTime", FieldType::NonNegative),
    field("duration", FieldType::NonNegative),
    field("description", FieldType::String),
    field("colors", STRING_LIST),
    field("cameraMovement", FieldType::String),
    field("composition", FieldType::String),
];

const AUDIO_FIELDS: &[Field] = &[
    field("mood", FieldType::String),
    field("musicDescription", FieldType::String),
    field("dynamicRange", FieldType::String),
    field("keyEvents", STRING_LIST),
];

const SHOT: FieldType = FieldType::Object(SHOT_FIELDS);

const ANALYSIS_FIELDS: &[Field] = &[
    field("title", FieldType::String),
    field("asl", FieldType::NonNegative),
    field("totalShots", FieldType::NonNegative),
    field("dominantColors", STRING_LIST),
    field("shots", FieldType::Array(&SHOT, Presence::NonEmpty)),
    field("audio", FieldType::Object(AUDIO_FIELDS)),
    field("visualSummary", FieldType::String),
];

/// Explicit schema for the analysis service payload
pub struct ResponseSchema {
    root: &'static [Field],
}

impl ResponseSchema {
    /// Schema of the film analysis payload
    pub fn film_analysis() -> Self {
        Self {
            root: ANALYSIS_FIELDS,
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.root
    }

    /// Parse raw service output and check it against the schema
    pub fn parse(&self, raw: &str) -> Result<Value, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::malformed_response(
                "Empty response from analysis service",
            ));
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            DomainError::malformed_response(format!("Response is not valid JSON: {}", e))
        })?;

        self.validate(&value)?;
        Ok(value)
    }

    /// Check an already parsed payload against the schema
    pub fn validate(&self, value: &Value) -> Result<(), DomainError> {
        check_object(value, self.root, "$")
    }
}

fn check_object(value: &Value, fields: &[Field], path: &str) -> Result<(), DomainError> {
    let object = value.as_object().ok_or_else(|| {
        DomainError::malformed_response(format!("{} must be an object", path))
    })?;

    for field in fields {
        let member_path = format!("{}.{}", path, field.name);
        let member = object.get(field.name).filter(|v| !v.is_null()).ok_or_else(|| {
            DomainError::malformed_response(format!("missing required field {}", member_path))
        })?;
        check_value(member, &field.ty, &member_path)?;
    }

    Ok(())
}

fn check_value(value: &Value, ty: &FieldType, path: &str) -> Result<(), DomainError> {
    match ty {
        FieldType::String => {
            if !value.is_string() {
                return Err(DomainError::malformed_response(format!(
                    "{} must be a string",
                    path
                )));
            }
        }
        FieldType::NonNegative => {
            let number = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| {
                    DomainError::malformed_response(format!("{} must be a finite number", path))
                })?;
            if number < 0.0 {
                return Err(DomainError::malformed_response(format!(
                    "{} must not be negative",
                    path
                )));
            }
        }
        FieldType::Array(item, presence) => {
            let items = value.as_array().ok_or_else(|| {
                DomainError::malformed_response(format!("{} must be an array", path))
            })?;
            if *presence == Presence::NonEmpty && items.is_empty() {
                return Err(DomainError::malformed_response(format!(
                    "{} must not be empty",
                    path
                )));
            }
            for (index, element) in items.iter().enumerate() {
                check_value(element, item, &format!("{}[{}]", path, index))?;
            }
        }
        FieldType::Object(fields) => check_object(value, fields, path)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
