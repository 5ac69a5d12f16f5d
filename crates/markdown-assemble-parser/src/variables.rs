use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

static VARIABLE_USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z][A-Za-z0-9_-]*)\$").expect("variable pattern is valid"));

/// Replace `$NAME$` with the value of `NAME`. Unknown names stay as written.
pub fn substitute_variables(text: &str, variables: &BTreeMap<String, String>) -> String {
    VARIABLE_USE
        .replace_all(text, |captures: &Captures<'_>| {
            let name = &captures[1];
            match variables.get(name) {
                Some(value) => value.clone(),
                None => {
                    warn!(variable = name, "undefined variable left in place");
                    captures[0].to_string()
                }
            }
        })
        .into_owned()
}
