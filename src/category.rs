use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of labels an expense can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Bills,
    Shopping,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Bills,
        Category::Shopping,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Bills => "Bills",
            Category::Shopping => "Shopping",
            Category::Other => "Other",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing for category selectors: the input must name a member of
/// the set, in any letter case.
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let labels: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown category '{}'. Use one of: {}", s, labels.join(", "))
            })
    }
}

/// Maps arbitrary category input onto a canonical label.
///
/// Missing input becomes `Other`. Otherwise the first character is
/// upper-cased and the rest lower-cased; anything that is not then an exact
/// member of [`Category::ALL`] also becomes `Other`. Whitespace is kept, so
/// `" food"` does not match.
pub fn normalize(raw: Option<&str>) -> Category {
    let Some(raw) = raw else {
        return Category::Other;
    };

    Category::from_label(&capitalize(raw)).unwrap_or(Category::Other)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
