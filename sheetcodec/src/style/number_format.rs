//! Number formats: the built-in id table and classification of format codes

use regex::Regex;

use super::hash::{StableHasher, StyleComponent};

/// First id available to custom formats
pub const FIRST_CUSTOM_ID: u32 = 164;

/// Built-in formats with a fixed code, keyed by id
const BUILTIN_FORMATS: [(u32, &str); 28] = [
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// What a number format does to the value it displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatKind {
    #[default]
    General,
    Number,
    Date,
    Time,
    Text,
}

impl FormatKind {
    pub fn is_temporal(&self) -> bool {
        matches!(self, FormatKind::Date | FormatKind::Time)
    }
}

pub fn builtin_code(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS
        .iter()
        .find(|(builtin, _)| *builtin == id)
        .map(|(_, code)| *code)
}

pub fn builtin_id(code: &str) -> Option<u32> {
    BUILTIN_FORMATS
        .iter()
        .find(|(_, builtin)| *builtin == code)
        .map(|(id, _)| *id)
}

fn builtin_kind(id: u32) -> FormatKind {
    match id {
        0 => FormatKind::General,
        14..=17 | 22 => FormatKind::Date,
        18..=21 | 45..=47 => FormatKind::Time,
        49 => FormatKind::Text,
        _ => FormatKind::Number,
    }
}

/// Classify a custom format code by the tokens left once literals are removed
pub fn classify_code(code: &str) -> FormatKind {
    thread_local! {
        static LITERALS: Regex = Regex::new(r#""[^"]*"|\\.|_.|\*.|\[[^\]]*\]"#).unwrap();
    }
    // only the first section decides; the others are for negatives and zero
    let section = first_section(code);
    let stripped = LITERALS.with(|re| {
        re.replace_all(section, |caps: &regex::Captures| {
            let token = &caps[0];
            let inner = token
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_ascii_lowercase();
            // elapsed-time brackets such as [h] or [mm] are real tokens
            let elapsed = !inner.is_empty() && inner.chars().all(|c| matches!(c, 'h' | 'm' | 's'));
            if token.starts_with('[') && elapsed {
                inner
            } else {
                String::new()
            }
        })
        .to_ascii_lowercase()
    });

    if stripped.eq_ignore_ascii_case("general") || stripped.is_empty() {
        return FormatKind::General;
    }
    let stripped = stripped.replace("am/pm", "h").replace("a/p", "h");
    let has = |c: char| stripped.contains(c);
    if has('y') || has('d') || (has('e') && !has('0') && !has('#')) {
        FormatKind::Date
    } else if has('h') || has('s') {
        FormatKind::Time
    } else if has('m') {
        // month without a day or year
        FormatKind::Date
    } else if has('@') {
        FormatKind::Text
    } else {
        FormatKind::Number
    }
}

fn first_section(code: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in code.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &code[..i],
            _ => {}
        }
    }
    code
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    pub code: String,
    pub index: Option<u32>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::new("General")
    }
}

impl NumberFormat {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            index: None,
        }
    }

    pub fn builtin(id: u32) -> Option<Self> {
        builtin_code(id).map(Self::new)
    }

    /// Built-in id when the code matches one
    pub fn builtin_id(&self) -> Option<u32> {
        builtin_id(&self.code)
    }

    pub fn is_custom(&self) -> bool {
        self.builtin_id().is_none()
    }

    pub fn is_general(&self) -> bool {
        self.builtin_id() == Some(0)
    }

    pub fn kind(&self) -> FormatKind {
        match self.builtin_id() {
            Some(id) => builtin_kind(id),
            None => classify_code(&self.code),
        }
    }

    pub fn append_altered(&mut self, other: &NumberFormat) {
        if !other.is_general() {
            self.code.clone_from(&other.code);
        }
    }
}

impl StyleComponent for NumberFormat {
    const KIND: &'static str = "number format";

    fn hash_fields(&self, hasher: &mut StableHasher) {
        hasher.write_str(&self.code);
    }

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        assert_eq!(builtin_code(14), Some("mm-dd-yy"));
        assert_eq!(builtin_code(5), None);
        assert_eq!(builtin_id("0.00%"), Some(10));
        assert_eq!(NumberFormat::builtin(49).unwrap().kind(), FormatKind::Text);
        assert_eq!(NumberFormat::builtin(22).unwrap().kind(), FormatKind::Date);
        assert_eq!(NumberFormat::builtin(46).unwrap().kind(), FormatKind::Time);
        assert_eq!(NumberFormat::builtin(4).unwrap().kind(), FormatKind::Number);
        assert!(NumberFormat::default().is_general());
    }

    #[test]
    fn test_classify_custom_codes() {
        assert_eq!(classify_code("yyyy-mm-dd"), FormatKind::Date);
        assert_eq!(classify_code("dd/mm/yyyy hh:mm"), FormatKind::Date);
        assert_eq!(classify_code("hh:mm:ss.000"), FormatKind::Time);
        assert_eq!(classify_code("[h]:mm"), FormatKind::Time);
        assert_eq!(classify_code("mmmm"), FormatKind::Date);
        assert_eq!(classify_code("[$-409]h:mm AM/PM;@"), FormatKind::Time);
        assert_eq!(classify_code("#,##0.00 \"days\""), FormatKind::Number);
        assert_eq!(classify_code("[Red]0.0;[Blue]-0.0"), FormatKind::Number);
        assert_eq!(classify_code("0.0\\d"), FormatKind::Number);
        assert_eq!(classify_code("0.00E+00"), FormatKind::Number);
        assert_eq!(classify_code("@\" units\""), FormatKind::Text);
        assert_eq!(classify_code("General"), FormatKind::General);
    }

    #[test]
    fn test_append_ignores_general() {
        let mut fmt = NumberFormat::new("0.000");
        fmt.append_altered(&NumberFormat::default());
        assert_eq!(fmt.code, "0.000");
        fmt.append_altered(&NumberFormat::new("yyyy"));
        assert_eq!(fmt.code, "yyyy");
    }
}
