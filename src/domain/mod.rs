// Domain layer - Sampling rules, run model and failure classification

pub mod errors;
pub mod model;
pub mod rules;
pub mod usecases;
