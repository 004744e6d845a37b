//! Cross-module scenarios run against the headless backend

mod context_lifecycle;
mod pipeline_sharing;
