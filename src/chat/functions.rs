//! The fixed menu of structured chat functions.
//!
//! Each function's argument shape is a schemars-derived struct so the wire
//! schema and the parsed result stay in sync. An unknown function name
//! resolves to a uniformly random pick from the menu, never an error.

use rand::seq::IndexedRandom;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;

use crate::completion::FunctionSpec;

/// Arguments of `discuss_emotions`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DiscussEmotionsArgs {
    /// Discussion of the emotional currents running through the matched dreams.
    pub emotions: String,
}

/// Arguments of `predict_future`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PredictFutureArgs {
    /// Speculative but grounded projection of likely future dreams.
    pub future_dreams: String,
}

/// Arguments of `discuss_lucidity_techniques`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LucidityTechniquesArgs {
    /// Techniques for achieving lucidity, beginner through advanced.
    pub lucidity_techniques: String,
}

/// Arguments of `create_lucidity_plan`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LucidityPlanArgs {
    /// A step-by-step personalized plan toward lucid dreaming.
    pub lucidity_plan: String,
}

/// Arguments of `analyze_dream_signs`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DreamSignsArgs {
    /// Recurring themes and characters usable as reality-check triggers.
    pub dream_signs: String,
}

/// Arguments of `track_lucidity_progress`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LucidityProgressArgs {
    /// Progress assessment across frequency, duration, and control.
    pub lucidity_progress: String,
}

fn spec<T: JsonSchema>(name: &'static str, description: &'static str) -> FunctionSpec {
    FunctionSpec {
        name,
        description,
        parameters: serde_json::to_value(schema_for!(T)).expect("schema serializes"),
    }
}

/// The six available functions, in menu order.
pub fn available_functions() -> Vec<FunctionSpec> {
    vec![
        spec::<DiscussEmotionsArgs>(
            "discuss_emotions",
            "Decode the emotional matrix of the dreams in the search results, \
             drawing on psychodynamic theory, neuroscience, and sentiment \
             analysis. Keep the discussion under 300 words.",
        ),
        spec::<PredictFutureArgs>(
            "predict_future",
            "Map the dreamer's probable future dreamscapes from their \
             historical dream data. Speculative yet scientifically grounded, \
             capped at 250 words.",
        ),
        spec::<LucidityTechniquesArgs>(
            "discuss_lucidity_techniques",
            "Offer techniques for achieving lucidity during dreams, \
             personalized and spanning beginner to advanced levels. \
             Actionable and below 300 words.",
        ),
        spec::<LucidityPlanArgs>(
            "create_lucidity_plan",
            "Design a bespoke step-by-step plan that guides the dreamer \
             toward lucidity, achievable within 30 days and described in \
             under 350 words.",
        ),
        spec::<DreamSignsArgs>(
            "analyze_dream_signs",
            "Analyze recurring themes, characters, and situations across the \
             dreamer's dreams and offer them as reality-check triggers. \
             Thorough but under 300 words.",
        ),
        spec::<LucidityProgressArgs>(
            "track_lucidity_progress",
            "Assess the dreamer's progress toward lucidity across frequency, \
             duration, and control. Under 250 words, rich in actionable \
             insight.",
        ),
    ]
}

/// Resolve a requested function by name; unknown names pick one at random.
pub fn resolve_function(name: &str) -> FunctionSpec {
    let functions = available_functions();
    match functions.iter().find(|f| f.name == name) {
        Some(f) => f.clone(),
        None => {
            tracing::info!(requested = name, "unknown chat function, picking at random");
            functions
                .choose(&mut rand::rng())
                .expect("function menu is never empty")
                .clone()
        }
    }
}
