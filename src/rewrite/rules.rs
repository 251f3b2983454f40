// Ordered clause and key removal rules. Each table is a list of
// (name, pattern) pairs applied top to bottom with replace_all, so rule
// order is part of the contract: AUTO_INCREMENT with a value must go
// before the bare form, and the specific key rules before the generic
// KEY rule that would otherwise swallow their lines.

use crate::logger;
use regex::Regex;

// Vendor table options with no stock MySQL equivalent. Every pattern
// starts with a literal space so the option separator goes with it.
const TABLE_CLAUSE_RULES: &[(&str, &str)] = &[
    ("ROW_FORMAT", r"(?i) ROW_FORMAT\s*=\s*\w+"),
    ("COMPRESSION", r"(?i) COMPRESSION\s*=\s*'\S+'"),
    ("REPLICA_NUM", r"(?i) REPLICA_NUM\s*=\s*\d+"),
    ("PRIMARY_ZONE", r"(?i) PRIMARY_ZONE\s*=\s*'\S+'"),
    ("BLOCK_SIZE", r"(?i) BLOCK_SIZE\s*=?\s*\d+"),
    ("USE_BLOOM_FILTER", r"(?i) USE_BLOOM_FILTER\s*=?\s*\w+"),
    ("PCTFREE", r"(?i) PCTFREE\s*=?\s*\d+"),
    ("TABLET_SIZE", r"(?i) TABLET_SIZE\s*=\s*\d+"),
    ("AUTO_INCREMENT value", r"(?i) AUTO_INCREMENT\s*=\s*\d+"),
    ("AUTO_INCREMENT", r"(?i) AUTO_INCREMENT"),
];

// Subset that appears on CREATE DATABASE statements.
const DATABASE_CLAUSE_RULES: &[(&str, &str)] = &[
    ("REPLICA_NUM", r"(?i) REPLICA_NUM\s*=\s*\d+"),
    ("PRIMARY_ZONE", r"(?i) PRIMARY_ZONE\s*=\s*'\S+'"),
];

// Whole-line key removal inside the column list. Each pattern eats the
// trailing newline so no blank line is left behind.
const KEY_RULES: &[(&str, &str)] = &[
    ("PRIMARY KEY", r"(?im)^[ \t]*PRIMARY KEY[^\n]*\n?"),
    (
        "FOREIGN KEY",
        r"(?im)^[ \t]*(?:CONSTRAINT\s+\S+\s+)?FOREIGN KEY[^\n]*\n?",
    ),
    ("UNIQUE KEY", r"(?im)^[ \t]*UNIQUE KEY[^\n]*\n?"),
    ("KEY", r"(?im)^[ \t]*KEY\s[^\n]*\n?"),
];

struct Rule {
    name: &'static str,
    pattern: Regex,
}

pub struct RuleSet {
    table_rules: Vec<Rule>,
    database_rules: Vec<Rule>,
    key_rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            table_rules: compile(TABLE_CLAUSE_RULES),
            database_rules: compile(DATABASE_CLAUSE_RULES),
            key_rules: compile(KEY_RULES),
        }
    }

    // Remove vendor table options from a table schema.
    pub fn strip_table_clauses(&self, schema: &str) -> String {
        apply(&self.table_rules, schema)
    }

    // Remove vendor options from a database schema.
    pub fn strip_database_clauses(&self, schema: &str) -> String {
        apply(&self.database_rules, schema)
    }

    // Remove key definition lines from a table schema.
    pub fn strip_keys(&self, schema: &str) -> String {
        apply(&self.key_rules, schema)
    }
}

fn compile(rules: &[(&'static str, &str)]) -> Vec<Rule> {
    rules
        .iter()
        .map(|&(name, pattern)| Rule {
            name,
            pattern: Regex::new(pattern).expect("valid removal rule pattern"),
        })
        .collect()
}

fn apply(rules: &[Rule], schema: &str) -> String {
    let mut out = schema.to_string();
    for rule in rules {
        if logger::is_debug() {
            let hits = rule.pattern.find_iter(&out).count();
            if hits > 0 {
                logger::debug(&format!(
                    "RuleSet: {} removed {} occurrence(s)",
                    rule.name, hits
                ));
            }
        }
        out = rule.pattern.replace_all(&out, "").into_owned();
    }
    out
}
