use serde::{Deserialize, Serialize};

/// Default text shown in the custom prompt box when the user hasn't typed
/// anything of their own.
pub const DEFAULT_CUSTOM_PROMPT: &str =
    "Analyze the image and tell me about the nutritional value of the food.";

const CALORIE_COUNT_PROMPT: &str = "Analyze the image and provide a calorie count for each food item. Format your response as a bulleted list.";

const MACRONUTRIENT_PROMPT: &str = "Analyze the image and provide a breakdown of macronutrients (protein, carbs, fats) for each food item. Format your response as a bulleted list.";

const ALLERGEN_PROMPT: &str = "Analyze the image and identify any potential allergens in the food items. Format your response as a bulleted list.";

/// The four analysis types offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    CalorieCount,
    MacronutrientBreakdown,
    AllergenDetection,
    Custom,
}

impl AnalysisKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisKind::CalorieCount => "Calorie Count",
            AnalysisKind::MacronutrientBreakdown => "Macronutrient Breakdown",
            AnalysisKind::AllergenDetection => "Allergen Detection",
            AnalysisKind::Custom => "Custom Prompt",
        }
    }

    /// The instruction string sent to the model for this analysis type.
    ///
    /// `custom` is only consulted for [`AnalysisKind::Custom`]; an empty or
    /// missing custom prompt falls back to [`DEFAULT_CUSTOM_PROMPT`]. The
    /// text is passed through as-is, unescaped.
    pub fn instruction(&self, custom: Option<&str>) -> String {
        match self {
            AnalysisKind::CalorieCount => CALORIE_COUNT_PROMPT.to_string(),
            AnalysisKind::MacronutrientBreakdown => MACRONUTRIENT_PROMPT.to_string(),
            AnalysisKind::AllergenDetection => ALLERGEN_PROMPT.to_string(),
            AnalysisKind::Custom => custom
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_CUSTOM_PROMPT)
                .to_string(),
        }
    }
}

/// Wraps a prior analysis result into the follow-up meal suggestion prompt.
pub fn meal_suggestion_prompt(analysis_results: &str) -> String {
    format!(
        "Based on this nutritional analysis: {}, suggest 3 healthy meal ideas that complement this diet. Format the response as a bulleted list.",
        analysis_results
    )
}
