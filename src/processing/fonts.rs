use std::fs;

use ab_glyph::FontArc;
use anyhow::{Context, Result, anyhow};
use fontdb::{Database, Family, Query, Source, Weight};
use tracing::debug;

/// Find a sans-serif system font for placeholder titles.
pub fn load_title_font() -> Result<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();

    let preferred_families = [
        Family::Name("Helvetica Neue"),
        Family::Name("Helvetica"),
        Family::Name("Inter"),
        Family::Name("Noto Sans"),
        Family::Name("DejaVu Sans"),
        Family::SansSerif,
    ];

    for family in preferred_families {
        if let Some(id) = db.query(&Query {
            families: &[family],
            weight: Weight::BOLD,
            ..Default::default()
        }) && let Some(font) = load_face(&db, id)?
        {
            return Ok(font);
        }
    }

    for face in db.faces() {
        if let Some(font) = load_face(&db, face.id)? {
            return Ok(font);
        }
    }

    Err(anyhow!("no usable system font for placeholder titles"))
}

fn load_face(db: &Database, id: fontdb::ID) -> Result<Option<FontArc>> {
    let face = db.face(id).context("missing font face in database")?;
    Ok(font_from_source(&face.source))
}

// Unreadable files, collections (.ttc) and exotic formats are skipped rather
// than failing the search.
fn font_from_source(source: &Source) -> Option<FontArc> {
    let data = match source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), "skipping unreadable font: {err}");
                return None;
            }
        },
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    FontArc::try_from_vec(data).ok()
}
