//! Process-local clipboard with separate byte, wide and locale slots.

use substedit_core::ClipboardService;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: Option<String>,
    unicode: Option<String>,
    locale: Option<(String, u32)>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clipboard holding `text` in the byte and wide formats.
    pub fn with_text(text: &str) -> Self {
        let mut clipboard = Self::default();
        clipboard.set_text(text);
        clipboard
    }

    /// Place text in the wide format only.
    pub fn set_unicode_only(&mut self, text: &str) {
        self.text = None;
        self.unicode = Some(text.to_owned());
    }

    /// Text and locale of the locale slot.
    pub fn locale_text(&self) -> Option<(&str, u32)> {
        self.locale
            .as_ref()
            .map(|(text, locale)| (text.as_str(), *locale))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl ClipboardService for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> bool {
        self.text = Some(text.to_owned());
        self.unicode = Some(text.to_owned());
        true
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn unicode_text(&self) -> Option<String> {
        self.unicode.clone()
    }

    fn set_locale_text(&mut self, text: &str, locale: u32) -> bool {
        self.locale = Some((text.to_owned(), locale));
        true
    }

    fn text_len(&self) -> Option<usize> {
        self.text.as_ref().map(|text| text.chars().count())
    }
}
