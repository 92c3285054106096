//! Just enough CSS color parsing to paint heatmap tokens on a terminal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness in `0.0..=1.0`.
    pub fn luminance(&self) -> f64 {
        (0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b))
            / 255.0
    }

    /// Black on light backgrounds, white on dark ones.
    pub fn contrasting_text(&self) -> Rgb {
        if self.luminance() > 0.5 {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }
}

/// Parses `#rgb`, `#rrggbb` (alpha digits ignored), `rgb()`/`rgba()`,
/// `hsl()`/`hsla()`, and a handful of named colors. `transparent` and anything
/// unrecognised yield `None`.
pub fn parse_css_color(input: &str) -> Option<Rgb> {
    let value = input.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some((name, args)) = split_function(&value) {
        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() < 3 {
            return None;
        }
        return match name {
            "rgb" | "rgba" => Some(Rgb::new(
                parse_channel(parts[0])?,
                parse_channel(parts[1])?,
                parse_channel(parts[2])?,
            )),
            "hsl" | "hsla" => hsl_to_rgb(
                parse_hue(parts[0])?,
                parse_percent(parts[1])?,
                parse_percent(parts[2])?,
            ),
            _ => None,
        };
    }
    named(&value)
}

fn split_function(value: &str) -> Option<(&str, &str)> {
    let open = value.find('(')?;
    let args = value[open + 1..].strip_suffix(')')?;
    Some((value[..open].trim(), args))
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 | 4 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Rgb::new(digit(0)?, digit(1)?, digit(2)?))
        }
        6 | 8 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb::new(pair(0)?, pair(2)?, pair(4)?))
        }
        _ => None,
    }
}

fn parse_channel(part: &str) -> Option<u8> {
    let value = match part.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().ok()? * 2.55,
        None => part.parse::<f64>().ok()?,
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_hue(part: &str) -> Option<f64> {
    let degrees = part.strip_suffix("deg").unwrap_or(part);
    degrees.parse::<f64>().ok().filter(|h| h.is_finite())
}

fn parse_percent(part: &str) -> Option<f64> {
    let value = part.strip_suffix('%')?.parse::<f64>().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Option<Rgb> {
    let h = hue.rem_euclid(360.0) / 60.0;
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let scale = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(Rgb::new(scale(r), scale(g), scale(b)))
}

fn named(value: &str) -> Option<Rgb> {
    let rgb = match value {
        "black" => Rgb::BLACK,
        "white" => Rgb::WHITE,
        "red" => Rgb::new(255, 0, 0),
        "green" => Rgb::new(0, 128, 0),
        "lime" => Rgb::new(0, 255, 0),
        "blue" => Rgb::new(0, 0, 255),
        "yellow" => Rgb::new(255, 255, 0),
        "orange" => Rgb::new(255, 165, 0),
        "gray" | "grey" => Rgb::new(128, 128, 128),
        _ => return None,
    };
    Some(rgb)
}
