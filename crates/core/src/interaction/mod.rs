use std::collections::BTreeMap;

use crate::{
    audio::SynthesisGraph, ColorRequest, ColorSlot, EndPolicy, GlitchSurface, HighlightColor,
    Rgb, ScrambleAnimator, ScrambleOptions, SoundEvent, SoundEventEngine, ThemeState, Transform,
};

/// Anything that can play a UI cue.
pub trait CueSink {
    fn cue(&mut self, event: SoundEvent);
}

impl<G: SynthesisGraph> CueSink for SoundEventEngine<G> {
    fn cue(&mut self, event: SoundEvent) {
        self.trigger(event);
    }
}

/// Records cues instead of playing them.
impl CueSink for Vec<SoundEvent> {
    fn cue(&mut self, event: SoundEvent) {
        self.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CardField {
    Id,
    Subtitle,
    Title,
    Date,
    Tag(usize),
}

impl CardField {
    /// Reveal stagger: id, subtitle, title, date, then tags 50 ms apart.
    pub fn delay_ms(self) -> u64 {
        match self {
            CardField::Id => 0,
            CardField::Subtitle => 50,
            CardField::Title => 100,
            CardField::Date => 200,
            CardField::Tag(index) => 300 + 50 * index as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub id: u32,
    pub title: String,
    pub subtitle: Option<String>,
    pub date: String,
    pub tags: Vec<String>,
    pub accent: HighlightColor,
}

impl CardContent {
    /// The id as binary, zero-padded to eight digits.
    pub fn binary_id(&self) -> String {
        format!("{:08b}", self.id)
    }

    fn source(&self, field: CardField) -> Option<String> {
        match field {
            CardField::Id => Some(self.binary_id()),
            CardField::Subtitle => self.subtitle.clone(),
            CardField::Title => Some(self.title.clone()),
            CardField::Date => Some(self.date.clone()),
            CardField::Tag(index) => self.tags.get(index).cloned(),
        }
    }

    fn fields(&self) -> impl Iterator<Item = CardField> + '_ {
        [CardField::Id, CardField::Subtitle, CardField::Title, CardField::Date]
            .into_iter()
            .chain((0..self.tags.len()).map(CardField::Tag))
            .filter(|field| self.source(*field).is_some())
    }
}

/// One content card.
#[derive(Debug)]
pub struct CardController {
    content: CardContent,
    theme: ThemeState,
    scrambles: ScrambleAnimator<CardField>,
    glitch: GlitchSurface,
    display: BTreeMap<CardField, String>,
    hovered: bool,
    seed: Option<u64>,
}

impl CardController {
    pub fn new(content: CardContent, theme: ThemeState) -> Self {
        let mut card = Self {
            content,
            theme,
            scrambles: ScrambleAnimator::new(),
            glitch: GlitchSurface::new(),
            display: BTreeMap::new(),
            hovered: false,
            seed: None,
        };
        card.reset_display();
        card
    }

    /// Deterministic scrambles and glitch jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.glitch = GlitchSurface::with_seed(seed);
        self
    }

    pub fn content(&self) -> &CardContent {
        &self.content
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn display(&self, field: CardField) -> Option<&str> {
        self.display.get(&field).map(String::as_str)
    }

    pub fn transform(&self) -> Transform {
        self.glitch.transform()
    }

    pub fn active_scrambles(&self) -> usize {
        self.scrambles.active_count()
    }

    /// Text color for this card; `dimmed` when a sibling card is hovered.
    pub fn text_color(&self, dimmed: bool) -> ColorRequest {
        if self.hovered {
            ColorRequest::Literal(self.content.accent.rgb())
        } else if dimmed {
            ColorRequest::Literal(Rgb::DIMMED)
        } else {
            ColorRequest::Slot(ColorSlot::TextPrimary)
        }
    }

    pub fn pointer_enter(&mut self, now_ms: u64, sound: &mut impl CueSink) {
        self.hovered = true;
        self.theme.highlight.set(Some(self.content.accent));
        sound.cue(SoundEvent::CardHover);
        sound.cue(SoundEvent::Scramble);

        let fields: Vec<CardField> = self.content.fields().collect();
        for field in fields {
            let Some(text) = self.content.source(field) else {
                continue;
            };
            let mut options = ScrambleOptions::card_field(field.delay_ms());
            if let Some(seed) = self.seed {
                options = options.with_seed(seed.wrapping_add(field.delay_ms()));
            }
            let initial = self.scrambles.start(field, &text, options, now_ms);
            self.display.insert(field, initial);
        }
        self.glitch.enter(now_ms);
        tracing::debug!(card = self.content.id, "card hovered");
    }

    pub fn pointer_leave(&mut self, now_ms: u64, sound: &mut impl CueSink) {
        self.hovered = false;
        self.theme.highlight.set(None);
        sound.cue(SoundEvent::CardLeave);

        self.scrambles.cancel_all(EndPolicy::ResetToSource);
        self.reset_display();
        self.glitch.leave(now_ms);
    }

    pub fn click(&mut self, sound: &mut impl CueSink) {
        sound.cue(SoundEvent::Click);
    }

    /// Stops every timer, leaving the current text and transform in place.
    pub fn hide(&mut self) {
        for (field, text) in self.scrambles.cancel_all(EndPolicy::FreezeAtLast) {
            self.display.insert(field, text);
        }
        self.glitch.hide();
    }

    /// Applies due frames; returns how many were applied.
    pub fn advance(&mut self, now_ms: u64) -> usize {
        let frames = self.scrambles.advance(now_ms);
        let applied = frames.len();
        for (field, timed) in frames {
            self.display.insert(field, timed.frame.text);
        }
        applied + self.glitch.advance(now_ms)
    }

    fn reset_display(&mut self) {
        self.display = self
            .content
            .fields()
            .filter_map(|field| self.content.source(field).map(|text| (field, text)))
            .collect();
    }
}

/// A single scrambling label: nav item, back button, logo or call to action.
#[derive(Debug)]
pub struct LabelController {
    text: String,
    options: ScrambleOptions,
    enter_cues: Vec<SoundEvent>,
    click_cues: Vec<SoundEvent>,
    scramble: ScrambleAnimator<()>,
    display: String,
}

impl LabelController {
    pub fn new(text: impl Into<String>, options: ScrambleOptions) -> Self {
        let text = text.into();
        Self {
            display: text.clone(),
            text,
            options,
            enter_cues: vec![SoundEvent::Hover, SoundEvent::Scramble],
            click_cues: vec![SoundEvent::Click],
            scramble: ScrambleAnimator::new(),
        }
    }

    pub fn nav(text: impl Into<String>) -> Self {
        Self::new(text, ScrambleOptions::nav_label()).on_click(&[SoundEvent::NavClick])
    }

    pub fn back() -> Self {
        Self::new("BACK", ScrambleOptions::back_button())
            .on_click(&[SoundEvent::Back, SoundEvent::PageTransition])
    }

    pub fn logo(text: impl Into<String>) -> Self {
        let text = text.into();
        let options = ScrambleOptions::logo(text.chars().count());
        Self::new(text, options).on_enter(&[SoundEvent::Scramble])
    }

    pub fn call_to_action(text: impl Into<String>) -> Self {
        Self::new(text, ScrambleOptions::nav_label())
    }

    pub fn on_enter(mut self, cues: &[SoundEvent]) -> Self {
        self.enter_cues = cues.to_vec();
        self
    }

    pub fn on_click(mut self, cues: &[SoundEvent]) -> Self {
        self.click_cues = cues.to_vec();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options = self.options.with_seed(seed);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_scrambling(&self) -> bool {
        self.scramble.is_running(&())
    }

    /// Starts the scramble, restarting it if one is already running.
    pub fn pointer_enter(&mut self, now_ms: u64, sound: &mut impl CueSink) {
        for cue in &self.enter_cues {
            sound.cue(*cue);
        }
        self.display = self.scramble.start((), &self.text, self.options, now_ms);
    }

    pub fn pointer_leave(&mut self) {
        self.scramble.cancel(&(), EndPolicy::ResetToSource);
        self.display.clone_from(&self.text);
    }

    pub fn click(&mut self, sound: &mut impl CueSink) {
        for cue in &self.click_cues {
            sound.cue(*cue);
        }
    }

    pub fn hide(&mut self) {
        if let Some(text) = self.scramble.cancel(&(), EndPolicy::FreezeAtLast) {
            self.display = text;
        }
    }

    pub fn advance(&mut self, now_ms: u64) -> usize {
        let frames = self.scramble.advance(now_ms);
        let applied = frames.len();
        if let Some((_, last)) = frames.into_iter().last() {
            self.display = last.frame.text;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{glitch::GlitchProfile, Theme};

    fn card() -> CardController {
        let content = CardContent {
            id: 5,
            title: "SIGNAL".into(),
            subtitle: Some("LOG".into()),
            date: "2024.01".into(),
            tags: vec!["AI".into(), "DEFI".into()],
            accent: HighlightColor::Pink,
        };
        CardController::new(content, ThemeState::new(Theme::Dark)).with_seed(3)
    }

    #[test]
    fn binary_id_is_padded_to_eight_digits() {
        assert_eq!(card().content().binary_id(), "00000101");
    }

    #[test]
    fn enter_highlights_blanks_fields_and_plays_cues() {
        let mut card = card();
        let theme = card.theme.clone();
        let mut cues: Vec<SoundEvent> = Vec::new();

        card.pointer_enter(0, &mut cues);
        assert_eq!(cues, vec![SoundEvent::CardHover, SoundEvent::Scramble]);
        assert_eq!(theme.highlight.get(), Some(HighlightColor::Pink));
        assert_eq!(card.display(CardField::Title), Some(""));
        assert_eq!(card.active_scrambles(), 6);
        assert_eq!(card.text_color(false), ColorRequest::Literal(HighlightColor::Pink.rgb()));
    }

    #[test]
    fn fields_reveal_in_stagger_order() {
        let mut card = card();
        card.pointer_enter(0, &mut Vec::<SoundEvent>::new());

        card.advance(90);
        assert_ne!(card.display(CardField::Subtitle), Some(""));
        assert_eq!(card.display(CardField::Title), Some(""));
        assert_eq!(card.display(CardField::Date), Some(""));

        card.advance(10_000);
        assert_eq!(card.display(CardField::Id), Some("00000101"));
        assert_eq!(card.display(CardField::Title), Some("SIGNAL"));
        assert_eq!(card.display(CardField::Tag(1)), Some("DEFI"));
        assert_eq!(card.active_scrambles(), 0);
        assert_eq!(card.transform(), Transform::REST);
    }

    #[test]
    fn leave_resets_text_and_overrides_glitch() {
        let mut card = card();
        let theme = card.theme.clone();
        let mut cues: Vec<SoundEvent> = Vec::new();
        card.pointer_enter(0, &mut cues);
        card.advance(120);

        card.pointer_leave(130, &mut cues);
        assert_eq!(cues.last(), Some(&SoundEvent::CardLeave));
        assert_eq!(theme.highlight.get(), None);
        assert_eq!(card.display(CardField::Title), Some("SIGNAL"));
        assert_eq!(card.active_scrambles(), 0);
        assert_eq!(card.glitch.active_profile(), Some(GlitchProfile::Out));

        card.advance(10_000);
        assert_eq!(card.display(CardField::Title), Some("SIGNAL"));
        assert_eq!(card.transform(), Transform::HIDDEN);
    }

    #[test]
    fn hide_freezes_mid_scramble() {
        let mut card = card();
        card.pointer_enter(0, &mut Vec::<SoundEvent>::new());
        card.advance(80);
        let frozen = card.display(CardField::Id).map(str::to_owned);

        card.hide();
        assert_eq!(card.advance(10_000), 0);
        assert_eq!(card.display(CardField::Id).map(str::to_owned), frozen);
    }

    #[test]
    fn dimmed_cards_use_the_dimmed_literal() {
        let card = card();
        assert_eq!(card.text_color(true), ColorRequest::Literal(Rgb::DIMMED));
        assert_eq!(card.text_color(false), ColorRequest::Slot(ColorSlot::TextPrimary));
    }

    #[test]
    fn back_label_scrambles_and_plays_navigation_cues() {
        let mut label = LabelController::back().with_seed(1);
        let mut cues: Vec<SoundEvent> = Vec::new();

        label.pointer_enter(0, &mut cues);
        assert!(label.is_scrambling());
        label.advance(15 * 40);
        assert_eq!(label.display(), "BACK");
        assert!(!label.is_scrambling());

        label.click(&mut cues);
        assert_eq!(
            cues,
            vec![
                SoundEvent::Hover,
                SoundEvent::Scramble,
                SoundEvent::Back,
                SoundEvent::PageTransition
            ]
        );
    }

    #[test]
    fn label_leave_resets_and_reenter_restarts() {
        let mut label = LabelController::nav("TOKENS").with_seed(2);
        label.pointer_enter(0, &mut Vec::<SoundEvent>::new());
        label.advance(100);
        label.pointer_leave();
        assert_eq!(label.display(), "TOKENS");
        assert!(!label.is_scrambling());
        assert_eq!(label.advance(10_000), 0);

        label.pointer_enter(20_000, &mut Vec::<SoundEvent>::new());
        assert_eq!(label.advance(20_000 + 10 * 50), 10);
        assert_eq!(label.display(), "TOKENS");
    }

    #[test]
    fn logo_enter_plays_only_the_scramble_cue() {
        let mut logo = LabelController::logo("A.S.S.");
        let mut cues: Vec<SoundEvent> = Vec::new();
        logo.pointer_enter(0, &mut cues);
        assert_eq!(cues, vec![SoundEvent::Scramble]);
        assert_eq!(logo.advance(18 * 30), 18);
        assert_eq!(logo.display(), "A.S.S.");
    }
}
