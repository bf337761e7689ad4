use crate::fontdb::{Database, Family, ID, Query, Stretch, Style, Weight};
use base64::Engine as _;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use svgquirk_core::{Element, FontResolver, Result};

/// Font resolver backed by a `fontdb` database.
///
/// `resolve` looks up every `font-family` list in the tree and caches the matching face; it
/// never rewrites attribute values. `embed` inlines the matched faces as base64 `@font-face`
/// rules in a `<defs><style>` block at the top of a copy of the tree.
pub struct FontdbResolver {
    fontdb: Arc<Database>,
    cache: Mutex<FxHashMap<String, Option<ID>>>,
}

impl FontdbResolver {
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self {
            fontdb,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Face matched for a CSS `font-family` list, if any family in it is available.
    pub fn lookup(&self, font_family: &str) -> Option<ID> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(font_family) {
            return *hit;
        }
        let names = parse_font_family_list(font_family);
        let families: Vec<Family<'_>> = names.iter().map(FamilyName::as_fontdb).collect();
        let id = if families.is_empty() {
            None
        } else {
            self.fontdb.query(&Query {
                families: &families,
                weight: Weight::NORMAL,
                stretch: Stretch::Normal,
                style: Style::Normal,
            })
        };
        cache.insert(font_family.to_string(), id);
        id
    }

    /// Face used for families that are not installed: the sans-serif mapping, else any face.
    ///
    /// These are the last resorts [`text_font_resolver`] uses when rendering, so embedding this
    /// face under the requested name keeps the output looking the way it was measured.
    pub fn fallback_face(&self) -> Option<ID> {
        self.fontdb
            .query(&Query {
                families: &[Family::SansSerif],
                weight: Weight::NORMAL,
                stretch: Stretch::Normal,
                style: Style::Normal,
            })
            .or_else(|| self.fontdb.faces().next().map(|face| face.id))
    }

    fn face_rule(&self, family: &str, id: ID) -> Option<String> {
        let data = self.fontdb.with_face_data(id, |data, _index| data.to_vec())?;
        let (mime, format) = sniff_font_format(&data);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        Some(format!(
            r#"@font-face{{font-family:"{}";src:url(data:{mime};base64,{encoded}) format("{format}");}}"#,
            family.replace('"', "\\\"")
        ))
    }
}

impl FontResolver for FontdbResolver {
    fn resolve(&self, root: &mut Element) -> Result<()> {
        let mut unresolved = 0usize;
        for el in root.descendants() {
            let Some(value) = el.attr("font-family") else {
                continue;
            };
            if self.lookup(value).is_none() {
                unresolved += 1;
                tracing::warn!(
                    font_family = value,
                    "no available font matches font-family, falling back"
                );
            }
        }
        tracing::debug!(unresolved, "resolved font references");
        Ok(())
    }

    fn embed(&self, root: &Element) -> Result<Element> {
        let mut rules: Vec<(String, String)> = Vec::new();
        for el in root.descendants() {
            let Some(value) = el.attr("font-family") else {
                continue;
            };
            // `@font-face` cannot declare a generic family, so the rule is keyed on the first
            // named family the document asks for.
            let Some(name) = parse_font_family_list(value)
                .into_iter()
                .find(|f| f.generic().is_none())
            else {
                continue;
            };
            if rules.iter().any(|(family, _)| *family == name.name) {
                continue;
            }
            let Some(id) = self.lookup(value).or_else(|| self.fallback_face()) else {
                continue;
            };
            if let Some(rule) = self.face_rule(&name.name, id) {
                rules.push((name.name, rule));
            }
        }

        let mut out = root.clone();
        if rules.is_empty() {
            return Ok(out);
        }
        let css: String = rules.into_iter().map(|(_, rule)| rule).collect();
        let mut style = Element::new("style");
        style.set_attr("type", "text/css");
        style.set_text(css)?;
        let mut defs = Element::new("defs");
        defs.append_child(style)?;
        out.insert_child(0, defs)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyName {
    pub name: String,
    pub quoted: bool,
}

impl FamilyName {
    fn generic(&self) -> Option<Family<'static>> {
        if self.quoted {
            return None;
        }
        match self.name.to_ascii_lowercase().as_str() {
            "serif" => Some(Family::Serif),
            "sans-serif" => Some(Family::SansSerif),
            "monospace" => Some(Family::Monospace),
            "cursive" => Some(Family::Cursive),
            "fantasy" => Some(Family::Fantasy),
            _ => None,
        }
    }

    fn as_fontdb(&self) -> Family<'_> {
        self.generic().unwrap_or(Family::Name(&self.name))
    }
}

/// Splits a CSS `font-family` value on top-level commas, unquoting quoted names.
pub fn parse_font_family_list(font_family: &str) -> Vec<FamilyName> {
    let s = font_family.trim().trim_end_matches(';').trim();
    let mut parts: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in s.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                cur.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                cur.push(ch);
            }
            ',' if !in_single && !in_double => {
                parts.push(std::mem::take(&mut cur));
            }
            _ => cur.push(ch),
        }
    }
    parts.push(cur);

    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let unquoted = p
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| p.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
            match unquoted {
                Some(name) => FamilyName {
                    name: name.to_string(),
                    quoted: true,
                },
                None => FamilyName {
                    name: p.split_whitespace().collect::<Vec<_>>().join(" "),
                    quoted: false,
                },
            }
        })
        .filter(|f| !f.name.is_empty())
        .collect()
}

/// Families tried, in order, when the database's default for a generic family is not installed.
const SERIF_CANDIDATES: &[&str] = &[
    "Times New Roman",
    "Times",
    "Liberation Serif",
    "DejaVu Serif",
    "Noto Serif",
    "FreeSerif",
];
const SANS_SERIF_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "FreeSans",
];
const MONOSPACE_CANDIDATES: &[&str] = &[
    "Courier New",
    "Liberation Mono",
    "DejaVu Sans Mono",
    "Noto Sans Mono",
    "FreeMono",
];

fn has_family(db: &Database, name: &str) -> bool {
    db.faces().any(|face| {
        face.families
            .iter()
            .any(|(family, _)| family.eq_ignore_ascii_case(name))
    })
}

fn installed_family(db: &Database, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|name| has_family(db, name))
        .map(|name| name.to_string())
        .or_else(|| {
            db.faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

/// Points each generic family of `db` at an installed face when its current mapping (fontdb
/// defaults to "Times New Roman", "Arial", ...) names a family that is not in the database.
pub fn install_generic_fallbacks(db: &mut Database) {
    let generics = [
        (Family::Serif, SERIF_CANDIDATES),
        (Family::SansSerif, SANS_SERIF_CANDIDATES),
        (Family::Monospace, MONOSPACE_CANDIDATES),
        (Family::Cursive, SANS_SERIF_CANDIDATES),
        (Family::Fantasy, SANS_SERIF_CANDIDATES),
    ];
    for (generic, candidates) in generics {
        if has_family(db, db.family_name(&generic)) {
            continue;
        }
        let Some(family) = installed_family(db, candidates) else {
            return;
        };
        tracing::debug!(generic = ?generic, %family, "remapped generic font family");
        match generic {
            Family::Serif => db.set_serif_family(family),
            Family::SansSerif => db.set_sans_serif_family(family),
            Family::Monospace => db.set_monospace_family(family),
            Family::Cursive => db.set_cursive_family(family),
            Family::Fantasy => db.set_fantasy_family(family),
            Family::Name(_) => {}
        }
    }
}

/// `usvg` font selection for text rendering.
///
/// Tries the element's own families, then `fallback_family`, then sans-serif, then any face in
/// the database, so text is never dropped from the render tree while a single face is
/// installed.
pub fn text_font_resolver(fallback_family: &str) -> usvg::FontResolver<'static> {
    let fallback_family = fallback_family.to_string();
    usvg::FontResolver {
        select_font: Box::new(move |font, db| {
            let mut families: Vec<Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => Family::Serif,
                    usvg::FontFamily::SansSerif => Family::SansSerif,
                    usvg::FontFamily::Cursive => Family::Cursive,
                    usvg::FontFamily::Fantasy => Family::Fantasy,
                    usvg::FontFamily::Monospace => Family::Monospace,
                    usvg::FontFamily::Named(name) => Family::Name(name),
                })
                .collect();
            families.push(Family::Name(&fallback_family));
            families.push(Family::SansSerif);

            let style = match font.style() {
                usvg::FontStyle::Normal => Style::Normal,
                usvg::FontStyle::Italic => Style::Italic,
                usvg::FontStyle::Oblique => Style::Oblique,
            };
            let stretch = match font.stretch() {
                usvg::FontStretch::UltraCondensed => Stretch::UltraCondensed,
                usvg::FontStretch::ExtraCondensed => Stretch::ExtraCondensed,
                usvg::FontStretch::Condensed => Stretch::Condensed,
                usvg::FontStretch::SemiCondensed => Stretch::SemiCondensed,
                usvg::FontStretch::Normal => Stretch::Normal,
                usvg::FontStretch::SemiExpanded => Stretch::SemiExpanded,
                usvg::FontStretch::Expanded => Stretch::Expanded,
                usvg::FontStretch::ExtraExpanded => Stretch::ExtraExpanded,
                usvg::FontStretch::UltraExpanded => Stretch::UltraExpanded,
            };

            db.query(&Query {
                families: &families,
                weight: Weight(font.weight()),
                stretch,
                style,
            })
            .or_else(|| db.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

fn sniff_font_format(data: &[u8]) -> (&'static str, &'static str) {
    match data.get(..4) {
        Some(b"OTTO") => ("font/otf", "opentype"),
        Some(b"wOFF") => ("font/woff", "woff"),
        Some(b"wOF2") => ("font/woff2", "woff2"),
        Some(b"ttcf") => ("font/collection", "collection"),
        _ => ("font/ttf", "truetype"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgquirk_core::Document;

    fn names(v: &str) -> Vec<(String, bool)> {
        parse_font_family_list(v)
            .into_iter()
            .map(|f| (f.name, f.quoted))
            .collect()
    }

    #[test]
    fn family_lists_split_on_top_level_commas() {
        assert_eq!(
            names(r#""trebuchet ms", verdana,  'A, B' ,sans-serif;"#),
            vec![
                ("trebuchet ms".to_string(), true),
                ("verdana".to_string(), false),
                ("A, B".to_string(), true),
                ("sans-serif".to_string(), false),
            ]
        );
        assert!(names("  ").is_empty());
    }

    #[test]
    fn quoted_generic_is_a_name() {
        let list = parse_font_family_list(r#""serif", serif"#);
        assert!(list[0].generic().is_none());
        assert!(list[1].generic().is_some());
    }

    #[test]
    fn font_formats_are_sniffed_from_the_header() {
        assert_eq!(sniff_font_format(b"OTTO...."), ("font/otf", "opentype"));
        assert_eq!(sniff_font_format(b"wOF2...."), ("font/woff2", "woff2"));
        assert_eq!(sniff_font_format(&[0, 1, 0, 0]), ("font/ttf", "truetype"));
        assert_eq!(sniff_font_format(b""), ("font/ttf", "truetype"));
    }

    #[test]
    fn unresolvable_fonts_leave_tree_untouched() {
        let resolver = FontdbResolver::new(Arc::new(Database::new()));
        let mut doc =
            Document::parse(r#"<svg><text font-family="Nope, serif">a</text></svg>"#).unwrap();
        let before = doc.clone();
        resolver.resolve(doc.root_mut()).unwrap();
        assert_eq!(doc, before);
        assert_eq!(resolver.embed(doc.root()).unwrap(), *before.root());
        assert_eq!(resolver.lookup("Nope, serif"), None);
    }

    #[test]
    fn available_fonts_are_embedded_as_base64() {
        let mut db = Database::new();
        db.load_system_fonts();
        let Some(family) = db
            .faces()
            .find_map(|f| f.families.first().map(|(name, _)| name.clone()))
        else {
            // No fonts installed on this machine.
            return;
        };
        let resolver = FontdbResolver::new(Arc::new(db));
        let src = format!(r#"<svg><text font-family="'{family}'">a</text></svg>"#);
        let doc = Document::parse(&src).unwrap();

        let embedded = resolver.embed(doc.root()).unwrap();
        let defs = embedded.child_elements().next().unwrap();
        assert_eq!(defs.name(), "defs");
        let style = defs.child_elements().next().unwrap();
        let css = style.text().unwrap().unwrap();
        assert!(css.starts_with("@font-face{"));
        assert!(css.contains(";base64,"));
        assert!(doc.root().child_elements().all(|e| e.name() != "defs"));
    }

    fn system_db() -> Option<Database> {
        let mut db = Database::new();
        db.load_system_fonts();
        (!db.is_empty()).then_some(db)
    }

    #[test]
    fn missing_generic_families_are_remapped() {
        let Some(mut db) = system_db() else {
            return;
        };
        db.set_serif_family("No Such Serif Family");
        db.set_sans_serif_family("No Such Sans Family");
        install_generic_fallbacks(&mut db);

        for generic in [Family::Serif, Family::SansSerif, Family::Monospace] {
            let name = db.family_name(&generic).to_string();
            assert!(has_family(&db, &name), "{generic:?} -> {name}");
        }
        let query = |family: Family<'_>| {
            db.query(&Query {
                families: &[family],
                weight: Weight::NORMAL,
                stretch: Stretch::Normal,
                style: Style::Normal,
            })
        };
        assert!(query(Family::Serif).is_some());
        assert!(query(Family::SansSerif).is_some());
    }

    #[test]
    fn installed_generic_families_are_kept() {
        let Some(mut db) = system_db() else {
            return;
        };
        let Some(installed) = db
            .faces()
            .find_map(|f| f.families.first().map(|(name, _)| name.clone()))
        else {
            return;
        };
        db.set_monospace_family(installed.clone());
        install_generic_fallbacks(&mut db);
        assert_eq!(db.family_name(&Family::Monospace), installed);
    }

    #[test]
    fn missing_families_embed_the_fallback_face() {
        let Some(db) = system_db() else {
            return;
        };
        let resolver = FontdbResolver::new(Arc::new(db));
        assert_eq!(resolver.lookup("No Such Font"), None);
        assert!(resolver.fallback_face().is_some());

        let doc =
            Document::parse(r#"<svg><text font-family="No Such Font">a</text></svg>"#).unwrap();
        let embedded = resolver.embed(doc.root()).unwrap();
        let defs = embedded.child_elements().next().unwrap();
        assert_eq!(defs.name(), "defs");
        let css = defs.child_elements().next().unwrap().text().unwrap().unwrap();
        assert!(css.starts_with(r#"@font-face{font-family:"No Such Font";"#));
    }
}
