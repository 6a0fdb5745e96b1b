// Domain layer - Core types, error taxonomy and compatibility rules

pub mod errors;
pub mod model;
pub mod rules;
