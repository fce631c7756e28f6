use tracing::debug;

use crate::{
    error::Result,
    mask::Mask,
    types::{Category, Selection},
};

/// Padded category masks after overlap resolution, plus their union
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Text pixels that survived suppression by sound
    pub text: Mask,
    /// Padded sound mask (empty when sound is deselected)
    pub sound: Mask,
    /// Union of `text` and `sound`
    pub combined: Mask,
}

impl Composition {
    /// Category owning a pixel of the combined mask
    pub fn category_at(&self, x: u32, y: u32) -> Option<Category> {
        if self.sound.is_active(x, y) {
            Some(Category::Sound)
        } else if self.text.is_active(x, y) {
            Some(Category::Text)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}

/// Merge the padded category masks enabled in `selection`.
///
/// Sound takes precedence: text is cleared wherever sound is active
/// before the two are unioned.
pub fn composite(selection: Selection, text_padded: &Mask, sound_padded: &Mask) -> Result<Composition> {
    text_padded.ensure_same_dimensions(sound_padded)?;
    let (width, height) = text_padded.dimensions();

    let sound = if selection.contains(Category::Sound) {
        sound_padded.clone()
    } else {
        Mask::empty(width, height)
    };

    let text = if selection.contains(Category::Text) {
        text_padded.difference(&sound)?
    } else {
        Mask::empty(width, height)
    };

    let combined = text.union(&sound)?;
    debug!(
        text = text.active_count(),
        sound = sound.active_count(),
        combined = combined.active_count(),
        "composited masks"
    );

    Ok(Composition { text, sound, combined })
}
