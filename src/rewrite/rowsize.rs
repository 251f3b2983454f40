// Worst-case row size accounting for converted table definitions, and
// the varchar demotion cascade that shrinks rows the engine would
// reject. Estimates assume utf8mb4, four bytes per declared character.

use crate::error::{ConvertError, Result};
use crate::logger;
use regex::Regex;

pub const CHAR_BYTES: u64 = 4;
pub const VARCHAR_BYTES: u64 = 4;

// Stays a little under the engine's 65535 hard limit, which is shared
// with null bitmaps and other per-row bookkeeping.
pub const DEFAULT_MAX_ROW_SIZE: u64 = 65_500;

// Fixed-width type families and their byte costs. A column line is
// `name` TYPE followed by "(", whitespace or "," so that DATE never
// matches DATETIME, TIME never matches TIMESTAMP, and INT never matches
// TINYINT or BIGINT. Large object types (TEXT, BLOB and friends) are
// stored off row and deliberately absent.
const FIXED_FAMILIES: &[(&str, u64)] = &[
    (r"(?i)`\S+`[ \t]*(?:TINYINT|YEAR)[\s(,]", 1),
    (r"(?i)`\S+`[ \t]*SMALLINT[\s(,]", 2),
    (r"(?i)`\S+`[ \t]*(?:MEDIUMINT|DATE|TIME)[\s(,]", 3),
    (r"(?i)`\S+`[ \t]*(?:INT|INTEGER|FLOAT|TIMESTAMP)[\s(,]", 4),
    (r"(?i)`\S+`[ \t]*(?:BIGINT|DOUBLE|DATETIME|DECIMAL)[\s(,]", 8),
];

// CHAR/VARCHAR declarations with their declared character length.
const VARLEN_PATTERN: &str = r"(?i)`\S+`[ \t]*(CHAR|VARCHAR)[ \t]*\(\s*(\d+)\s*\)";

// Varchar length classes by digit count, widest first. Single digit
// lengths are never demoted. The leading \s* folds the separator into
// the match so the replacement supplies its own.
const DEMOTION_CLASSES: &[(&str, &str)] = &[
    ("5-or-more-digit", r"(?i)\s*VARCHAR\s*\(\s*\d{5,}\s*\)"),
    ("4-digit", r"(?i)\s*VARCHAR\s*\(\s*\d{4}\s*\)"),
    ("3-digit", r"(?i)\s*VARCHAR\s*\(\s*\d{3}\s*\)"),
    ("2-digit", r"(?i)\s*VARCHAR\s*\(\s*\d{2}\s*\)"),
];

const DEMOTED_TYPE: &str = " TEXT";

pub struct ColumnMatch {
    pub type_name: String,
    pub declared_len: u64,
}

pub struct RowSizeEstimator {
    fixed: Vec<(Regex, u64)>,
    varlen: Regex,
}

impl RowSizeEstimator {
    pub fn new() -> Self {
        let fixed = FIXED_FAMILIES
            .iter()
            .map(|&(pattern, bytes)| {
                (Regex::new(pattern).expect("valid fixed width pattern"), bytes)
            })
            .collect();
        let varlen = Regex::new(VARLEN_PATTERN).expect("valid varlen pattern");
        Self { fixed, varlen }
    }

    // Worst-case byte estimate for one table definition.
    pub fn estimate(&self, schema: &str) -> Result<u64> {
        let mut size: u64 = 0;
        for (pattern, bytes) in &self.fixed {
            size += pattern.find_iter(schema).count() as u64 * bytes;
        }
        for col in self.varlen_columns(schema)? {
            let per_char = match col.type_name.to_ascii_uppercase().as_str() {
                "CHAR" => CHAR_BYTES,
                "VARCHAR" => VARCHAR_BYTES,
                other => return Err(ConvertError::UnknownVarlenType(other.to_string())),
            };
            size = size.saturating_add(col.declared_len.saturating_mul(per_char));
        }
        Ok(size)
    }

    // Scan CHAR/VARCHAR declarations. Recomputed from the schema text on
    // every call; the text buffer is the only state between demotions.
    pub fn varlen_columns(&self, schema: &str) -> Result<Vec<ColumnMatch>> {
        let mut cols = Vec::new();
        for caps in self.varlen.captures_iter(schema) {
            let declared_len = caps[2]
                .parse::<u64>()
                .map_err(|_| ConvertError::ColumnLength(caps[0].trim().to_string()))?;
            cols.push(ColumnMatch {
                type_name: caps[1].to_string(),
                declared_len,
            });
        }
        Ok(cols)
    }
}

pub struct WidthReducer {
    classes: Vec<(&'static str, Regex)>,
}

impl WidthReducer {
    pub fn new() -> Self {
        let classes = DEMOTION_CLASSES
            .iter()
            .map(|&(label, pattern)| {
                (label, Regex::new(pattern).expect("valid demotion pattern"))
            })
            .collect();
        Self { classes }
    }

    // Demote varchar length classes to TEXT, widest class first, until
    // the estimate drops under the budget. Errors if the cascade runs
    // out of classes without getting there.
    pub fn reduce(
        &self,
        schema: String,
        estimator: &RowSizeEstimator,
        budget: u64,
    ) -> Result<(String, u64)> {
        let mut schema = schema;
        for (label, pattern) in &self.classes {
            let hits = pattern.find_iter(&schema).count();
            if hits > 0 {
                schema = pattern.replace_all(&schema, DEMOTED_TYPE).into_owned();
                logger::debug(&format!(
                    "WidthReducer: demoted {} {} varchar column(s) to TEXT",
                    hits, label
                ));
            }
            let size = estimator.estimate(&schema)?;
            if size < budget {
                return Ok((schema, size));
            }
        }
        let size = estimator.estimate(&schema)?;
        Err(ConvertError::SizeNotConvertible { size, budget })
    }
}
