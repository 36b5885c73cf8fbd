//! Instruction text sent to the completion backend.
//!
//! The wording is free to change; callers rely only on the decoded path and
//! the device hint being present.

use anydoor_core::decode_path;

/// Most history entries quoted back to the random-word helper.
pub const MAX_HISTORY_ITEMS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    /// Coarse device class from a user-agent string.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("ipad")
            || ua.contains("tablet")
            || (ua.contains("android") && !ua.contains("mobile"))
        {
            return DeviceClass::Tablet;
        }
        let mobile = [
            "mobile",
            "iphone",
            "ipod",
            "android",
            "blackberry",
            "iemobile",
            "opera mini",
        ];
        if mobile.iter().any(|needle| ua.contains(needle)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    fn layout_hint(self) -> &'static str {
        match self {
            DeviceClass::Mobile => {
                "a mobile phone: single column, large touch targets, no hover-only interactions"
            }
            DeviceClass::Tablet => {
                "a tablet: flexible two-column layout that also works in portrait"
            }
            DeviceClass::Desktop => "a desktop browser: wide responsive layout",
        }
    }
}

/// Instruction for generating the page at `raw_path`.
#[must_use]
pub fn page_prompt(raw_path: &str, user_agent: &str) -> String {
    let decoded = decode_path(raw_path);
    let path = decoded.trim_matches('/');
    let device = DeviceClass::from_user_agent(user_agent).layout_hint();

    let subject = if path.is_empty() {
        "a welcoming home page that invites the visitor to type any path into the address bar"
            .to_owned()
    } else {
        format!("the page a visitor expects to find at the path \"/{path}\"")
    };

    format!(
        "Create a complete, self-contained HTML document for {subject}.\n\
         The visitor is using {device}.\n\
         Requirements:\n\
         - Start with <!DOCTYPE html> and include <html>, <head> and <body>.\n\
         - Inline all CSS and JavaScript; do not reference external files.\n\
         - Links to related topics must be relative paths on this site.\n\
         - Reply with the HTML only, without Markdown fences or commentary."
    )
}

/// Instruction asking for one random word to explore next, avoiding recent
/// history.
#[must_use]
pub fn light_me_prompt(history: &[String]) -> String {
    let recent: Vec<&str> = history
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .take(MAX_HISTORY_ITEMS)
        .collect();

    let avoid = if recent.is_empty() {
        String::new()
    } else {
        format!(
            " The visitor has recently explored: {}. Suggest something different.",
            recent.join(", ")
        )
    };

    format!(
        "Suggest one surprising but real topic worth exploring, as a single word or \
         short phrase usable as a URL path.{avoid} Reply with the word only."
    )
}
