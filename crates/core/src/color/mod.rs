use std::{cell::Cell, collections::BTreeMap, fmt, rc::Rc, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    state::{Subscription, ThemeState},
    GlitchError,
};

/// Opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
    /// Dimmed text used for cards that are not under the pointer.
    pub const DIMMED: Rgb = Rgb(0x55, 0x55, 0x55);

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(GlitchError::InvalidInput("color contains non-hex digits"));
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(GlitchError::InvalidInput("colors must be #RGB or #RRGGBB")),
        };
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .map_err(|_| GlitchError::InvalidInput("color contains non-hex digits"))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Last-resort text color when the palette has no entry.
    pub fn fallback(self) -> Rgb {
        match self {
            Theme::Light => Rgb::BLACK,
            Theme::Dark => Rgb::WHITE,
        }
    }
}

impl FromStr for Theme {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(GlitchError::InvalidInput("theme must be `light` or `dark`")),
        }
    }
}

/// Accent colors a hovered card can push as the global highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Yellow,
    Pink,
    Blue,
    Cyan,
    Coral,
    Purple,
    Orange,
    Lime,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 8] = [
        HighlightColor::Yellow,
        HighlightColor::Pink,
        HighlightColor::Blue,
        HighlightColor::Cyan,
        HighlightColor::Coral,
        HighlightColor::Purple,
        HighlightColor::Orange,
        HighlightColor::Lime,
    ];

    pub fn rgb(self) -> Rgb {
        match self {
            HighlightColor::Yellow => Rgb(0xFB, 0xC9, 0x2B),
            HighlightColor::Pink => Rgb(0xFF, 0x14, 0x93),
            HighlightColor::Blue => Rgb(0x42, 0x85, 0xF4),
            HighlightColor::Cyan => Rgb(0x00, 0xCE, 0xD1),
            HighlightColor::Coral => Rgb(0xFF, 0x6B, 0x6B),
            HighlightColor::Purple => Rgb(0x9B, 0x59, 0xB6),
            HighlightColor::Orange => Rgb(0xFF, 0x8C, 0x00),
            HighlightColor::Lime => Rgb(0x32, 0xCD, 0x32),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Pink => "pink",
            HighlightColor::Blue => "blue",
            HighlightColor::Cyan => "cyan",
            HighlightColor::Coral => "coral",
            HighlightColor::Purple => "purple",
            HighlightColor::Orange => "orange",
            HighlightColor::Lime => "lime",
        }
    }
}

impl FromStr for HighlightColor {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        HighlightColor::ALL
            .into_iter()
            .find(|color| color.name() == lower)
            .ok_or(GlitchError::InvalidInput("unknown highlight color"))
    }
}

/// Themed color variables a request may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSlot {
    TextPrimary,
    TextSecondary,
    BgPrimary,
    BgSecondary,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRequest {
    Literal(Rgb),
    Slot(ColorSlot),
}

impl Default for ColorRequest {
    fn default() -> Self {
        ColorRequest::Slot(ColorSlot::TextPrimary)
    }
}

impl From<Rgb> for ColorRequest {
    fn from(value: Rgb) -> Self {
        ColorRequest::Literal(value)
    }
}

impl From<ColorSlot> for ColorRequest {
    fn from(value: ColorSlot) -> Self {
        ColorRequest::Slot(value)
    }
}

/// Theme-scoped slot values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub light: BTreeMap<ColorSlot, Rgb>,
    pub dark: BTreeMap<ColorSlot, Rgb>,
}

impl Palette {
    pub fn empty() -> Self {
        Self {
            light: BTreeMap::new(),
            dark: BTreeMap::new(),
        }
    }

    pub fn get(&self, theme: Theme, slot: ColorSlot) -> Option<Rgb> {
        match theme {
            Theme::Light => self.light.get(&slot).copied(),
            Theme::Dark => self.dark.get(&slot).copied(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        let light = BTreeMap::from([
            (ColorSlot::TextPrimary, Rgb(0x0A, 0x0A, 0x0A)),
            (ColorSlot::TextSecondary, Rgb(0x66, 0x66, 0x66)),
            (ColorSlot::BgPrimary, Rgb(0xF5, 0xF5, 0xF0)),
            (ColorSlot::BgSecondary, Rgb(0xE8, 0xE8, 0xE3)),
            (ColorSlot::Border, Rgb(0x0A, 0x0A, 0x0A)),
        ]);
        let dark = BTreeMap::from([
            (ColorSlot::TextPrimary, Rgb(0xF5, 0xF5, 0xF5)),
            (ColorSlot::TextSecondary, Rgb(0x88, 0x88, 0x88)),
            (ColorSlot::BgPrimary, Rgb(0x0A, 0x0A, 0x0A)),
            (ColorSlot::BgSecondary, Rgb(0x1A, 0x1A, 0x1A)),
            (ColorSlot::Border, Rgb(0x33, 0x33, 0x33)),
        ]);
        Self { light, dark }
    }
}

/// Resolves [`ColorRequest`]s against the shared [`ThemeState`].
///
/// Precedence: literal, then the active highlight (only for
/// [`ColorSlot::TextPrimary`]), then the palette entry for the current theme,
/// then [`Theme::fallback`].
#[derive(Debug, Clone)]
pub struct ColorResolver {
    state: ThemeState,
    palette: Rc<Palette>,
}

impl ColorResolver {
    pub fn new(state: ThemeState, palette: Palette) -> Self {
        Self {
            state,
            palette: Rc::new(palette),
        }
    }

    pub fn state(&self) -> &ThemeState {
        &self.state
    }

    pub fn resolve(&self, request: ColorRequest) -> Rgb {
        let slot = match request {
            ColorRequest::Literal(rgb) => return rgb,
            ColorRequest::Slot(slot) => slot,
        };

        if slot == ColorSlot::TextPrimary {
            if let Some(highlight) = self.state.highlight.get() {
                return highlight.rgb();
            }
        }

        let theme = self.state.theme.get();
        self.palette
            .get(theme, slot)
            .unwrap_or_else(|| theme.fallback())
    }

    /// Calls `on_change` whenever either external attribute changes.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> ColorSubscription {
        let on_change: Rc<dyn Fn()> = Rc::new(on_change);
        let theme_cb = Rc::clone(&on_change);
        let theme = self.state.theme.subscribe(move |_| theme_cb());
        let highlight = self.state.highlight.subscribe(move |_| on_change());
        ColorSubscription {
            _theme: theme,
            _highlight: highlight,
        }
    }

    /// Convenience subscription that raises a dirty flag.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn watch(&self) -> (Rc<Cell<bool>>, ColorSubscription) {
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        let subscription = self.subscribe(move || flag.set(true));
        (dirty, subscription)
    }
}

/// Keeps both attribute subscriptions alive.
#[derive(Debug)]
pub struct ColorSubscription {
    _theme: Subscription,
    _highlight: Subscription,
}
