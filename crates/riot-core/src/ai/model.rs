#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    Flash,
    ProExp,
}

impl GeminiModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-2.5-flash",
            GeminiModel::ProExp => "gemini-2.5-pro-exp-03-25",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini-2.5-flash" | "flash" => Some(GeminiModel::Flash),
            "gemini-2.5-pro-exp-03-25" | "pro" => Some(GeminiModel::ProExp),
            _ => None,
        }
    }

    pub fn all() -> Vec<GeminiModel> {
        vec![GeminiModel::Flash, GeminiModel::ProExp]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GeminiModel::Flash => "Gemini 2.5 Flash (Rápido)",
            GeminiModel::ProExp => "Gemini 2.5 Pro (Experimental)",
        }
    }
}
