// Schema rewriting pipeline: vendor clause removal, key removal,
// row size enforcement and the final trailing comma repair.

pub mod rowsize;
pub mod rules;

use crate::error::Result;
use crate::logger;
use regex::Regex;
use self::rowsize::{RowSizeEstimator, WidthReducer};
use self::rules::RuleSet;

// Dangling comma left where key removal dropped the last line of a
// column list. Matched together with the closing ") ... ;" tail and
// replaced by the tail alone.
const TRAILING_COMMA_PATTERN: &str = r",(\s*\)[^;]*;)";

#[derive(Debug)]
pub struct TableConversion {
    pub sql: String,
    pub initial_size: u64,
    pub final_size: u64,
}

pub struct SchemaRewriter {
    rules: RuleSet,
    estimator: RowSizeEstimator,
    reducer: WidthReducer,
    trailing_comma: Regex,
    max_row_size: u64,
}

impl SchemaRewriter {
    pub fn new(max_row_size: u64) -> Self {
        Self {
            rules: RuleSet::new(),
            estimator: RowSizeEstimator::new(),
            reducer: WidthReducer::new(),
            trailing_comma: Regex::new(TRAILING_COMMA_PATTERN)
                .expect("valid trailing comma pattern"),
            max_row_size,
        }
    }

    // Full pipeline for a table schema. Pure text to text, no file IO.
    pub fn convert_table(&self, schema: &str) -> Result<TableConversion> {
        let stripped = self.rules.strip_table_clauses(schema);
        let stripped = self.rules.strip_keys(&stripped);
        let initial_size = self.estimator.estimate(&stripped)?;
        let (reduced, final_size) = if initial_size >= self.max_row_size {
            logger::debug(&format!(
                "SchemaRewriter: row size {} at or over budget {}, demoting varchars",
                initial_size, self.max_row_size
            ));
            self.reducer
                .reduce(stripped, &self.estimator, self.max_row_size)?
        } else {
            (stripped, initial_size)
        };
        let sql = self.repair_trailing_comma(&reduced);
        Ok(TableConversion {
            sql,
            initial_size,
            final_size,
        })
    }

    // Database schemas only carry the clause subset; nothing can fail.
    pub fn convert_database(&self, schema: &str) -> String {
        self.rules.strip_database_clauses(schema)
    }

    fn repair_trailing_comma(&self, schema: &str) -> String {
        self.trailing_comma.replace_all(schema, "$1").into_owned()
    }
}
