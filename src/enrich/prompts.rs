//! Prompt composition for analysis and imagery.
//!
//! The analysis prompt walks seven analytical lenses; the character budget
//! scales with the requested intelligence level. Image prompts are a style
//! phrase plus a model-written summary of the entry plus a fixed suffix.

use std::str::FromStr;

/// Fixed tail of every image-generation prompt.
pub const IMAGE_PROMPT_SUFFIX: &str = "high quality, lucid dream themed.";

/// Requested depth of a dream analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelligenceLevel {
    Simplified,
    General,
    Detailed,
    Expert,
    Research,
}

impl IntelligenceLevel {
    /// Character budget for the produced analysis.
    pub fn char_limit(&self) -> usize {
        match self {
            Self::Simplified => 150,
            Self::General => 300,
            Self::Detailed => 400,
            Self::Expert => 500,
            Self::Research => 600,
        }
    }

    /// Audience framing for the prompt.
    fn audience(&self) -> &'static str {
        match self {
            Self::Simplified => {
                "Provide a simplified, jargon-free explanation for someone who \
                 prefers straightforward interpretations. Explain it like they are 10."
            }
            Self::General => {
                "Provide a balanced, comprehensive explanation for someone who \
                 prefers a well-rounded view."
            }
            Self::Detailed => {
                "Provide a detailed, nuanced explanation for someone who \
                 appreciates depth and complexity."
            }
            Self::Expert => {
                "Provide an expert-level, technical explanation for an expert \
                 in the field of dream analysis."
            }
            Self::Research => {
                "Provide an academic-level explanation with citations for an \
                 academic researcher."
            }
        }
    }

    /// Parse a config string; unrecognized values fall back to General.
    pub fn from_config(s: &str) -> Self {
        s.parse().unwrap_or(Self::General)
    }
}

impl FromStr for IntelligenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simplified" => Ok(Self::Simplified),
            "general" => Ok(Self::General),
            "detailed" => Ok(Self::Detailed),
            "expert" => Ok(Self::Expert),
            "research" => Ok(Self::Research),
            _ => Err(format!("unknown intelligence level: {s}")),
        }
    }
}

/// Visual style for generated imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageStyle {
    #[default]
    Renaissance,
    Abstract,
    Modern,
}

impl ImageStyle {
    /// Opening phrase of the image prompt.
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Renaissance => "A renaissance painting of",
            Self::Abstract => "An abstract representation of",
            Self::Modern => "A modern artwork of",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Renaissance => "renaissance",
            Self::Abstract => "abstract",
            Self::Modern => "modern",
        }
    }
}

impl FromStr for ImageStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "renaissance" => Ok(Self::Renaissance),
            "abstract" => Ok(Self::Abstract),
            "modern" => Ok(Self::Modern),
            _ => Err(format!("unknown image style: {s}")),
        }
    }
}

/// Requested image quality, mapped to a pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageQuality {
    #[default]
    Low,
    Medium,
    High,
}

impl ImageQuality {
    pub fn resolution(&self) -> &'static str {
        match self {
            Self::Low => "256x256",
            Self::Medium => "512x512",
            Self::High => "1024x1024",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown image quality: {s}")),
        }
    }
}

/// Compose the seven-lens analysis prompt for a dream entry.
pub fn analysis_prompt(entry: &str, level: IntelligenceLevel) -> String {
    format!(
        "You are a dream analyst with knowledge spanning psychology, philosophy, \
         literature, science, mysticism, and ancient wisdom. {audience} \
         The dream is as follows: {entry} \
         Analyze the dream within this framework: \
         1: Psychological underpinnings — examine the dream through the lens of psychology. \
         2: Philosophical context — evaluate its implications on existential questions. \
         3: Literary narratives — compare it to well-known stories or myths. \
         4: Scientific facts — what do current studies say about such dreams? \
         5: Mystical interpretations — any spiritual aspects to consider? \
         6: Ancient wisdom — how would ancient cultures have read this dream? \
         7: Physiological meanings — what physiological factors might contribute? \
         Your analysis should be up to {limit} characters.",
        audience = level.audience(),
        limit = level.char_limit(),
    )
}

/// Compose the summarization prompt that condenses an entry into a short
/// image-generation seed.
pub fn summary_prompt(entry: &str) -> String {
    format!(
        "Describe the enigmatic tale of this nocturnal journey, where the \
         ethereal dance of {entry} beguiles the senses. Condense the essence \
         of the dream into a succinct image-generation prompt, grounded in \
         research, literature, science, mysticism, and ancient wisdom, all in \
         under 100 characters."
    )
}

/// Compose the final image-generation prompt.
pub fn image_prompt(style: ImageStyle, summary: &str) -> String {
    format!("{} {summary}, {IMAGE_PROMPT_SUFFIX}", style.phrase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_limits_scale_with_level() {
        assert_eq!(IntelligenceLevel::Simplified.char_limit(), 150);
        assert_eq!(IntelligenceLevel::General.char_limit(), 300);
        assert_eq!(IntelligenceLevel::Detailed.char_limit(), 400);
        assert_eq!(IntelligenceLevel::Expert.char_limit(), 500);
        assert_eq!(IntelligenceLevel::Research.char_limit(), 600);
    }

    #[test]
    fn unknown_level_falls_back_to_general() {
        assert_eq!(IntelligenceLevel::from_config("galactic"), IntelligenceLevel::General);
        assert_eq!(IntelligenceLevel::from_config("expert"), IntelligenceLevel::Expert);
    }

    #[test]
    fn style_parse_and_default() {
        assert_eq!("abstract".parse::<ImageStyle>().unwrap(), ImageStyle::Abstract);
        assert!("vaporwave".parse::<ImageStyle>().is_err());
        // Unrecognized styles default at the call site
        assert_eq!(
            "vaporwave".parse::<ImageStyle>().unwrap_or_default(),
            ImageStyle::Renaissance
        );
    }

    #[test]
    fn quality_maps_to_resolution() {
        assert_eq!(ImageQuality::Low.resolution(), "256x256");
        assert_eq!(ImageQuality::Medium.resolution(), "512x512");
        assert_eq!(ImageQuality::High.resolution(), "1024x1024");
        assert_eq!(
            "ultra".parse::<ImageQuality>().unwrap_or_default().resolution(),
            "256x256"
        );
    }

    #[test]
    fn analysis_prompt_names_all_seven_lenses() {
        let prompt = analysis_prompt("I flew over the sea", IntelligenceLevel::General);
        for lens in [
            "Psychological",
            "Philosophical",
            "Literary",
            "Scientific",
            "Mystical",
            "Ancient wisdom",
            "Physiological",
        ] {
            assert!(prompt.contains(lens), "missing lens: {lens}");
        }
        assert!(prompt.contains("up to 300 characters"));
        assert!(prompt.contains("I flew over the sea"));
    }

    #[test]
    fn image_prompt_has_style_and_suffix() {
        let prompt = image_prompt(ImageStyle::Abstract, "a burning library");
        assert_eq!(
            prompt,
            "An abstract representation of a burning library, high quality, lucid dream themed."
        );
    }
}
