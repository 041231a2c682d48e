//! Placeholder rendering for text entries starting with `#` / 占位符替换
//!
//! Game text marks templated strings with a leading `#`. Only the gender pair
//! `{M#..}{F#..}` depends on user settings; other tokens are left for the client.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GenderPreference;
use crate::models::LangCode;

static GENDER_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{M#([^}]*)\}\{F#([^}]*)\}").expect("valid gender pair regex"));

/// Reserved marker for templated text / 模板文本标记
pub const MARKER: char = '#';

/// Render `content` if it carries the marker, otherwise return it unchanged / 渲染占位符
pub fn render(content: &str, gender: GenderPreference, lang: LangCode) -> String {
    let Some(body) = content.strip_prefix(MARKER) else {
        return content.to_string();
    };

    let separator = if lang.is_logographic() { "／" } else { "/" };
    GENDER_PAIR
        .replace_all(body, |caps: &regex::Captures| match gender {
            GenderPreference::Male => caps[1].to_string(),
            GenderPreference::Female => caps[2].to_string(),
            GenderPreference::Both => format!("{}{}{}", &caps[1], separator, &caps[2]),
        })
        .into_owned()
}
