//! Text auto-fit.

/// Smallest size auto-fit will pick.
pub const MIN_FONT_SIZE: u16 = 12;

/// Average glyph advance relative to the font size.
const GLYPH_WIDTH: f32 = 0.6;
const LINE_HEIGHT: f32 = 1.2;

/// Largest font size `<= max` at which `text` wraps into a `width` by
/// `height` box. Falls back to [`MIN_FONT_SIZE`] when nothing fits.
pub fn auto_fit_font_size(text: &str, width: u32, height: u32, max: u16) -> u16 {
    let max = max.max(MIN_FONT_SIZE);
    if text.trim().is_empty() || width == 0 || height == 0 {
        return max;
    }
    (MIN_FONT_SIZE..=max)
        .rev()
        .find(|size| fits(text, *size, width, height))
        .unwrap_or(MIN_FONT_SIZE)
}

fn fits(text: &str, size: u16, width: u32, height: u32) -> bool {
    let size = f32::from(size);
    let per_line = ((width as f32) / (size * GLYPH_WIDTH)).floor().max(1.0) as usize;
    let lines: usize = text
        .lines()
        .map(|line| line.chars().count().div_ceil(per_line).max(1))
        .sum();
    lines as f32 * size * LINE_HEIGHT <= height as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_gets_max_size() {
        assert_eq!(auto_fit_font_size("Hi", 1920, 1080, 96), 96);
    }

    #[test]
    fn longer_text_shrinks() {
        let short = auto_fit_font_size("Welcome", 800, 600, 120);
        let long = auto_fit_font_size(&"Welcome everyone ".repeat(30), 800, 600, 120);
        assert!(long < short);
        assert!(long >= MIN_FONT_SIZE);
    }

    #[test]
    fn impossible_fit_floors_at_minimum() {
        let text = "x".repeat(100_000);
        assert_eq!(auto_fit_font_size(&text, 100, 100, 72), MIN_FONT_SIZE);
    }

    #[test]
    fn empty_text_or_surface_keeps_max() {
        assert_eq!(auto_fit_font_size("  ", 800, 600, 40), 40);
        assert_eq!(auto_fit_font_size("text", 0, 0, 40), 40);
    }
}
