use ab_glyph::FontRef;
use log::{ info, warn };
use once_cell::sync::OnceCell;
use plotters::style::{ register_font, FontStyle };
use std::fs;

pub const LEGEND_FONT_FAMILY: &str = "legend";

const SYSTEM_FONT_PATHS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static LEGEND_FONT: OnceCell<bool> = OnceCell::new();

/// Registers the legend font on first use. Returns whether text can be drawn.
pub fn legend_font_available(configured: Option<&str>) -> bool {
    *LEGEND_FONT.get_or_init(|| {
        let candidates = configured.into_iter().chain(SYSTEM_FONT_PATHS.iter().copied());
        for path in candidates {
            let Some(bytes) = read_font(path) else {
                continue;
            };
            // plotters keeps a 'static reference to registered font data
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match register_font(LEGEND_FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => {
                    info!("Graph legend font loaded from '{}'", path);
                    return true;
                }
                Err(_) => warn!("Font '{}' could not be registered", path),
            }
        }
        warn!("No legend font found; graphs will be drawn without a legend.");
        false
    })
}

/// Reads `path` and keeps it only if it parses as a font.
fn read_font(path: &str) -> Option<Vec<u8>> {
    let bytes = fs::read(path).ok()?;
    if FontRef::try_from_slice(&bytes).is_err() {
        warn!("'{}' is not a usable TrueType font", path);
        return None;
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_files_are_skipped() {
        let path = std::env::temp_dir().join(format!("math-tutor-not-a-font-{}.ttf", std::process::id()));
        fs::write(&path, b"definitely not a font").unwrap();
        assert!(read_font(path.to_str().unwrap()).is_none());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_font_files_are_skipped() {
        assert!(read_font("/nonexistent/math-tutor/font.ttf").is_none());
    }
}
