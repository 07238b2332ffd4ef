//! Deduplicating pools and the write-side style collector

use std::collections::HashMap;

use super::hash::StyleComponent;
use super::number_format::FIRST_CUSTOM_ID;
use super::{Border, CellFormat, Color, DEFAULT_STYLE_NAME, Fill, Font, NumberFormat, Style};
use crate::error::{Result, XlsxError};

#[derive(Debug, Clone)]
struct PoolEntry<T> {
    value: T,
    seq: u64,
}

/// Append-only set of components keyed by structural hash.
///
/// After every insertion the entries are stably sorted by their current
/// index (unassigned last, ties in insertion order) and renumbered `0..n`.
/// Entries seeded with a low index therefore keep it, and everything else
/// follows in the order it was first seen.
#[derive(Debug, Clone)]
pub struct CanonicalPool<T> {
    entries: Vec<PoolEntry<T>>,
    by_hash: HashMap<u64, usize>,
    next_seq: u64,
}

impl<T> Default for CanonicalPool<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_hash: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: StyleComponent> CanonicalPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` unless an equal record exists; returns its hash
    pub fn insert(&mut self, value: T) -> u64 {
        let hash = value.structural_hash();
        if self.by_hash.contains_key(&hash) {
            return hash;
        }
        self.entries.push(PoolEntry {
            value,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.reorganize();
        hash
    }

    fn reorganize(&mut self) {
        self.entries
            .sort_by_key(|e| (e.value.index().unwrap_or(u32::MAX), e.seq));
        self.by_hash.clear();
        for (pos, entry) in self.entries.iter_mut().enumerate() {
            entry.value.set_index(Some(pos as u32));
            self.by_hash.insert(entry.value.structural_hash(), pos);
        }
    }

    pub fn get(&self, hash: u64) -> Option<&T> {
        self.by_hash.get(&hash).map(|&pos| &self.entries[pos].value)
    }

    /// The canonical entry equal to `value`
    pub fn find(&self, value: &T) -> Option<&T> {
        self.get(value.structural_hash())
    }

    pub fn index_of(&self, hash: u64) -> Option<u32> {
        self.by_hash.get(&hash).map(|&pos| pos as u32)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value)
    }
}

/// Handle returned by [`StyleCollector::add`]; resolve it against the
/// finished [`ManagedStyles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleKey(u64);

/// Gathers every style used by a workbook during one write
#[derive(Debug)]
pub struct StyleCollector {
    borders: CanonicalPool<Border>,
    fills: CanonicalPool<Fill>,
    fonts: CanonicalPool<Font>,
    number_formats: CanonicalPool<NumberFormat>,
    cell_formats: CanonicalPool<CellFormat>,
    styles: CanonicalPool<Style>,
    mru_colors: Vec<Color>,
}

impl Default for StyleCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleCollector {
    /// A collector seeded with the reserved entries: the default style at
    /// index 0, and the `none`/`gray125` fills at 0 and 1.
    pub fn new() -> Self {
        let mut collector = Self {
            borders: CanonicalPool::new(),
            fills: CanonicalPool::new(),
            fonts: CanonicalPool::new(),
            number_formats: CanonicalPool::new(),
            cell_formats: CanonicalPool::new(),
            styles: CanonicalPool::new(),
            mru_colors: Vec::new(),
        };

        let mut default = Style::named(DEFAULT_STYLE_NAME);
        default.system = true;
        default.border.index = Some(0);
        default.fill.index = Some(0);
        default.font.index = Some(0);
        default.number_format.index = Some(0);
        default.cell_format.index = Some(0);
        default.index = Some(0);
        collector.insert_components(default);

        let mut gray = Fill::gray125();
        gray.index = Some(1);
        collector.fills.insert(gray);
        collector
    }

    /// Register a style used by some cell
    pub fn add(&mut self, style: &Style) -> StyleKey {
        let mut requested = style.clone();
        // caller-side indices must not outrank the reserved entries
        requested.index = None;
        requested.system = false;
        requested.border.index = None;
        requested.fill.index = None;
        requested.font.index = None;
        requested.number_format.index = None;
        requested.cell_format.index = None;
        self.insert_components(requested)
    }

    fn insert_components(&mut self, mut style: Style) -> StyleKey {
        // rebuild the composite from the canonical instances
        let border = self.borders.insert(style.border.clone());
        let fill = self.fills.insert(style.fill.clone());
        let font = self.fonts.insert(style.font.clone());
        let number_format = self.number_formats.insert(style.number_format.clone());
        let cell_format = self.cell_formats.insert(style.cell_format.clone());
        if let Some(b) = self.borders.get(border) {
            style.border = b.clone();
        }
        if let Some(f) = self.fills.get(fill) {
            style.fill = f.clone();
        }
        if let Some(f) = self.fonts.get(font) {
            style.font = f.clone();
        }
        if let Some(n) = self.number_formats.get(number_format) {
            style.number_format = n.clone();
        }
        if let Some(c) = self.cell_formats.get(cell_format) {
            style.cell_format = c.clone();
        }
        StyleKey(self.styles.insert(style))
    }

    /// Remember a recently used color for the `mruColors` list
    pub fn add_mru_color(&mut self, color: Color) {
        if !self.mru_colors.contains(&color) {
            self.mru_colors.push(color);
        }
    }

    /// Freeze the pools. The result cannot be mutated.
    pub fn finish(self) -> ManagedStyles {
        log::debug!(
            "style pools: {} styles, {} fonts, {} fills, {} borders, {} number formats",
            self.styles.len(),
            self.fonts.len(),
            self.fills.len(),
            self.borders.len(),
            self.number_formats.len()
        );
        // component indices were renumbered while later entries arrived
        let styles = self
            .styles
            .iter()
            .cloned()
            .map(|mut style| {
                style.border.index = self.borders.find(&style.border).and_then(|b| b.index);
                style.fill.index = self.fills.find(&style.fill).and_then(|f| f.index);
                style.font.index = self.fonts.find(&style.font).and_then(|f| f.index);
                style.number_format.index = self
                    .number_formats
                    .find(&style.number_format)
                    .and_then(|n| n.index);
                style.cell_format.index = self
                    .cell_formats
                    .find(&style.cell_format)
                    .and_then(|c| c.index);
                style
            })
            .collect();
        let by_hash = self
            .styles
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.structural_hash(), pos as u32))
            .collect();

        let mut next_custom = FIRST_CUSTOM_ID;
        let number_format_ids = self
            .number_formats
            .iter()
            .map(|fmt| match fmt.builtin_id() {
                Some(id) => id,
                None => {
                    let id = next_custom;
                    next_custom += 1;
                    id
                }
            })
            .collect();

        ManagedStyles {
            styles,
            by_hash,
            borders: self.borders.iter().cloned().collect(),
            fills: self.fills.iter().cloned().collect(),
            fonts: self.fonts.iter().cloned().collect(),
            number_formats: self.number_formats.iter().cloned().collect(),
            number_format_ids,
            mru_colors: self.mru_colors,
        }
    }
}

/// Finalized style pools, ready to be written as `styles.xml`
#[derive(Debug, Clone)]
pub struct ManagedStyles {
    styles: Vec<Style>,
    by_hash: HashMap<u64, u32>,
    borders: Vec<Border>,
    fills: Vec<Fill>,
    fonts: Vec<Font>,
    number_formats: Vec<NumberFormat>,
    /// `numFmtId` of each entry of `number_formats`
    number_format_ids: Vec<u32>,
    mru_colors: Vec<Color>,
}

impl ManagedStyles {
    /// Final `cellXfs` index of a collected style
    pub fn index_of(&self, key: StyleKey) -> Result<u32> {
        self.by_hash
            .get(&key.0)
            .copied()
            .ok_or_else(|| XlsxError::lookup("style", key.0 as i64))
    }

    /// Index of any style equal to `style`
    pub fn find(&self, style: &Style) -> Option<u32> {
        self.by_hash.get(&style.structural_hash()).copied()
    }

    /// Styles in `cellXfs` order with component indices filled in
    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn number_formats(&self) -> &[NumberFormat] {
        &self.number_formats
    }

    pub fn mru_colors(&self) -> &[Color] {
        &self.mru_colors
    }

    /// `numFmtId` written for the number format at pool index `index`
    pub fn number_format_id(&self, index: u32) -> Result<u32> {
        self.number_format_ids
            .get(index as usize)
            .copied()
            .ok_or_else(|| XlsxError::lookup("number format", index))
    }

    /// Custom formats with their ids, in id order
    pub fn custom_number_formats(&self) -> impl Iterator<Item = (u32, &NumberFormat)> {
        self.number_formats
            .iter()
            .zip(&self.number_format_ids)
            .filter(|(fmt, _)| fmt.is_custom())
            .map(|(fmt, id)| (*id, fmt))
    }
}

/// Canonicalize a list of requested styles in one go, returning the
/// finished pools and, per request, the key to look its index up with.
pub fn canonicalize(requested: &[Style]) -> (ManagedStyles, Vec<StyleKey>) {
    let mut collector = StyleCollector::new();
    let keys = requested.iter().map(|s| collector.add(s)).collect();
    (collector.finish(), keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BorderStyle;

    fn assert_dense<T: StyleComponent>(pool: &CanonicalPool<T>) {
        let indices: Vec<u32> = pool.iter().filter_map(|e| e.index()).collect();
        let expected: Vec<u32> = (0..pool.len() as u32).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn test_pool_dedups_by_structure() {
        let mut pool = CanonicalPool::new();
        let a = pool.insert(Font::bold());
        let mut other_bold = Font::default();
        other_bold.bold = true;
        other_bold.index = Some(9);
        let b = pool.insert(other_bold);
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        assert_dense(&pool);
    }

    #[test]
    fn test_pool_pins_seeded_indices() {
        let mut pool = CanonicalPool::new();
        let mut none = Fill::default();
        none.index = Some(0);
        pool.insert(none);
        let mut gray = Fill::gray125();
        gray.index = Some(1);
        pool.insert(gray);
        pool.insert(Fill::solid(Color::Auto));
        assert_dense(&pool);
        assert_eq!(pool.index_of(Fill::default().structural_hash()), Some(0));
        assert_eq!(pool.index_of(Fill::gray125().structural_hash()), Some(1));
        assert_eq!(
            pool.index_of(Fill::solid(Color::Auto).structural_hash()),
            Some(2)
        );
    }

    #[test]
    fn test_pool_ties_keep_insertion_order() {
        let mut pool = CanonicalPool::new();
        pool.insert(Font::default());
        pool.insert(Font::bold());
        // claims index 0, but the existing index 0 was there first
        let mut italic = Font::default();
        italic.italic = true;
        italic.index = Some(0);
        pool.insert(italic.clone());
        assert_dense(&pool);
        assert_eq!(pool.index_of(Font::default().structural_hash()), Some(0));
        assert_eq!(pool.index_of(italic.structural_hash()), Some(1));
        assert_eq!(pool.index_of(Font::bold().structural_hash()), Some(2));
    }

    #[test]
    fn test_default_style_collapses_to_reserved_entry() {
        let (managed, keys) = canonicalize(&[Style::default(), Style::named("plain")]);
        assert_eq!(managed.index_of(keys[0]).unwrap(), 0);
        assert_eq!(managed.index_of(keys[1]).unwrap(), 0);
        assert_eq!(managed.styles().len(), 1);
        assert_eq!(managed.styles()[0].name, DEFAULT_STYLE_NAME);
        assert_eq!(managed.fills().len(), 2);
    }

    #[test]
    fn test_identical_styles_share_one_entry() {
        let bold_a = Style::default().appended(Font::bold());
        let mut bold_b = Style::default();
        bold_b.font.bold = true;
        let requests = vec![bold_a.clone(), bold_b, bold_a];
        let (managed, keys) = canonicalize(&requests);
        let first = managed.index_of(keys[0]).unwrap();
        assert_eq!(first, 1);
        assert!(keys.iter().all(|k| managed.index_of(*k).unwrap() == first));
        assert_eq!(managed.styles().len(), 2);
        assert_eq!(managed.fonts().len(), 2);
    }

    #[test]
    fn test_canonicalize_is_deterministic() {
        let requests = vec![
            Style::with_number_format("0.000"),
            Style::default().appended(Border::outline(BorderStyle::Thin)),
            Style::default().appended(Font::bold()),
            Style::with_number_format("0.000"),
        ];
        let (first, keys_a) = canonicalize(&requests);
        let (second, keys_b) = canonicalize(&requests);
        let a: Vec<u32> = keys_a.iter().map(|k| first.index_of(*k).unwrap()).collect();
        let b: Vec<u32> = keys_b.iter().map(|k| second.index_of(*k).unwrap()).collect();
        assert_eq!(a, b);
        assert_eq!(a, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_component_indices_are_dense_and_consistent() {
        let requests = vec![
            Style::default().appended(Fill::solid(Color::Indexed(5))),
            Style::default()
                .appended(Fill::solid(Color::Indexed(6)))
                .appended(Font::bold()),
        ];
        let (managed, _) = canonicalize(&requests);
        for (pos, fill) in managed.fills().iter().enumerate() {
            assert_eq!(fill.index, Some(pos as u32));
        }
        let last = &managed.styles()[2];
        assert_eq!(last.fill.index, Some(3));
        assert_eq!(last.font.index, Some(1));
        assert_eq!(last.border.index, Some(0));
    }

    #[test]
    fn test_custom_number_format_ids() {
        let requests = vec![
            Style::with_number_format("0.000"),
            Style::with_number_format("0.00%"),
            Style::with_number_format("yyyy-mm-dd"),
        ];
        let (managed, _) = canonicalize(&requests);
        let customs: Vec<(u32, &str)> = managed
            .custom_number_formats()
            .map(|(id, f)| (id, f.code.as_str()))
            .collect();
        assert_eq!(customs, vec![(164, "0.000"), (165, "yyyy-mm-dd")]);
        assert_eq!(managed.number_format_id(2).unwrap(), 10);
        assert!(managed.number_format_id(99).is_err());
    }
}
