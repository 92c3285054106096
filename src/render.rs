use crate::rarity::RarityLabel;
use crate::token::Token;
use askama::Template;
use serde::Serialize;

/// Inline styling applied to every highlighted word so neighbouring tokens
/// stay legible.
pub const WORD_STYLE: &str = "padding: 3px 6px; margin: 0 1px; border-radius: 4px";

/// One rendered token: its verbatim text plus, for words, the heat styling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayUnit {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub background: String,
    pub frequency: f64,
    pub rarity: String,
    pub tooltip: String,
}

impl DisplayUnit {
    pub fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.highlight.as_ref().map(|h| h.tooltip.as_str())
    }

    pub fn background(&self) -> Option<&str> {
        self.highlight.as_ref().map(|h| h.background.as_str())
    }
}

pub fn tooltip(frequency: f64, rarity: &str) -> String {
    format!("Frequency: {frequency:.2} (per million) - {rarity}")
}

/// Builds the display unit for a normalized token. Only tokens with a color
/// are highlighted; everything else passes through as plain text.
pub fn render_token(token: &Token) -> DisplayUnit {
    let highlight = token.color.as_ref().map(|color| {
        // Normalization rejects colored tokens without a frequency; default
        // defensively for callers that skip it.
        let frequency = token.frequency.unwrap_or_default();
        let rarity = token
            .rarity
            .clone()
            .unwrap_or_else(|| RarityLabel::classify(frequency).to_string());
        Highlight {
            background: color.clone(),
            frequency,
            tooltip: tooltip(frequency, &rarity),
            rarity,
        }
    });
    DisplayUnit {
        text: token.token.clone(),
        highlight,
    }
}

pub fn render_tokens(tokens: &[Token]) -> Vec<DisplayUnit> {
    tokens.iter().map(render_token).collect()
}

#[derive(Template)]
#[template(
    source = r#"{%- for unit in units -%}
{%- match unit.highlight -%}
{%- when Some with (h) -%}
<span class="heat-token" style="background-color: {{ h.background }}; {{ word_style }}" title="{{ h.tooltip }}">{{ unit.text }}</span>
{%- when None -%}
<span>{{ unit.text }}</span>
{%- endmatch -%}
{%- endfor -%}"#,
    ext = "html"
)]
struct HeatmapFragment<'a> {
    units: &'a [DisplayUnit],
    word_style: &'static str,
}

/// Renders display units as a sequence of inline `<span>` elements. Token text
/// and attribute values are HTML-escaped.
pub fn render_html(units: &[DisplayUnit]) -> Result<String, askama::Error> {
    HeatmapFragment {
        units,
        word_style: WORD_STYLE,
    }
    .render()
}

/// Plain text of the rendered output, which is the original input when the
/// tokens partition it.
pub fn plain_text(units: &[DisplayUnit]) -> String {
    units.iter().map(|unit| unit.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn renders_in_position_order_with_tooltips() {
        let body = br##"[{"token":"b","position":5,"frequency":2,"color":"#f00"},{"token":"a","position":0}]"##;
        let normalized = normalize(body).unwrap();
        let units = render_tokens(normalized.tokens());

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "a");
        assert_eq!(units[0].background(), None);
        assert_eq!(units[0].tooltip(), None);
        assert_eq!(units[1].text, "b");
        assert_eq!(units[1].background(), Some("#f00"));
        assert_eq!(
            units[1].tooltip(),
            Some("Frequency: 2.00 (per million) - Uncommon")
        );
    }

    #[test]
    fn tooltip_uses_two_decimals() {
        assert_eq!(
            tooltip(0.056, "Very Rare"),
            "Frequency: 0.06 (per million) - Very Rare"
        );
        assert_eq!(
            tooltip(1234.5, "Very Common"),
            "Frequency: 1234.50 (per million) - Very Common"
        );
    }

    #[test]
    fn text_is_kept_verbatim() {
        let units = render_tokens(&[
            Token::plain("  \n", 0),
            Token::word("it's", 3, 900.0, "green"),
        ]);
        assert_eq!(plain_text(&units), "  \nit's");
    }

    #[test]
    fn html_fragment_styles_words_only() {
        let units = render_tokens(&[
            Token::word("cat", 0, 30.0, "hsl(95.0, 100%, 50%)"),
            Token::plain(" ", 3),
        ]);
        let html = render_html(&units).unwrap();
        assert_eq!(
            html,
            "<span class=\"heat-token\" style=\"background-color: hsl(95.0, 100%, 50%); \
             padding: 3px 6px; margin: 0 1px; border-radius: 4px\" \
             title=\"Frequency: 30.00 (per million) - Common\">cat</span><span> </span>"
        );
    }

    #[test]
    fn html_fragment_escapes_content() {
        let units = render_tokens(&[
            Token::plain("<b>", 0),
            Token::word("x", 3, 1.0, "red\" onmouseover=\"alert(1)"),
        ]);
        let html = render_html(&units).unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("\" onmouseover"));
    }

    #[test]
    fn empty_units_render_nothing() {
        assert_eq!(render_html(&[]).unwrap(), "");
    }
}
