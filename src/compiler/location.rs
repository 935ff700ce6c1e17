use serde::{Deserialize, Serialize};

/// The position in the input source code that a declaration, statement or
/// expression came from.  Carried through the pipeline so that diagnostics
/// and verbose assembly can point back at the user's code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Location {
        Location { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("L{}:{}", self.line, self.column))
    }
}
