//! Static keyboard layout tables.
//!
//! Each supported layout maps the characters it can produce to a physical key
//! and the finger that should strike it. The tables are embedded JSON files
//! loaded once into an immutable [`KeyboardLayoutMap`], which is then shared by
//! the key filter (layout mismatch detection) and the highlight module
//! (finger guidance).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::script::{fold, letter_script, Script};

static LAYOUT_DIR: Dir = include_dir!("src/layouts");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayoutId {
    #[serde(rename = "en-qwerty")]
    EnglishQwerty,
    #[serde(rename = "he-standard")]
    HebrewStandard,
}

impl LayoutId {
    pub const ALL: [LayoutId; 2] = [LayoutId::EnglishQwerty, LayoutId::HebrewStandard];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutId::EnglishQwerty => "en-qwerty",
            LayoutId::HebrewStandard => "he-standard",
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown layout '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Finger {
    LeftPinky,
    LeftRing,
    LeftMiddle,
    LeftIndex,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
    Thumb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPosition {
    pub physical_key: String,
    pub finger: Finger,
}

#[derive(Deserialize)]
struct LayoutFile {
    id: LayoutId,
    name: String,
    script: Script,
    keys: Vec<KeyEntry>,
}

#[derive(Deserialize)]
struct KeyEntry {
    char: char,
    key: String,
    finger: Finger,
}

#[derive(Debug, Clone)]
pub struct LayoutDef {
    pub id: LayoutId,
    pub name: String,
    pub script: Script,
    keys: HashMap<char, KeyPosition>,
}

impl LayoutDef {
    fn from_file(file: LayoutFile) -> Self {
        let keys = file
            .keys
            .into_iter()
            .map(|entry| {
                (
                    entry.char,
                    KeyPosition {
                        physical_key: entry.key,
                        finger: entry.finger,
                    },
                )
            })
            .collect();
        Self {
            id: file.id,
            name: file.name,
            script: file.script,
            keys,
        }
    }

    fn lookup(&self, c: char) -> Option<&KeyPosition> {
        self.keys.get(&c).or_else(|| self.keys.get(&fold(c)))
    }
}

/// Read-only lookup from characters to physical keys and fingers
#[derive(Debug, Clone)]
pub struct KeyboardLayoutMap {
    layouts: Vec<LayoutDef>,
}

impl KeyboardLayoutMap {
    /// Load every layout embedded in the binary
    pub fn builtin() -> Result<Self, LayoutError> {
        let mut layouts = Vec::new();
        for file in LAYOUT_DIR.files() {
            let name = file.path().display().to_string();
            let contents = file
                .contents_utf8()
                .ok_or_else(|| LayoutError::Encoding { file: name.clone() })?;
            let parsed: LayoutFile = serde_json::from_str(contents)
                .map_err(|source| LayoutError::Parse { file: name, source })?;
            layouts.push(LayoutDef::from_file(parsed));
        }
        Self::from_layouts(layouts)
    }

    /// Build a map from already parsed definitions, rejecting duplicate ids
    pub fn from_layouts(mut layouts: Vec<LayoutDef>) -> Result<Self, LayoutError> {
        layouts.sort_by_key(|l| l.id);
        if let Some(dup) = layouts.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(LayoutError::Duplicate(dup[0].id.to_string()));
        }
        for id in LayoutId::ALL {
            if !layouts.iter().any(|l| l.id == id) {
                return Err(LayoutError::Missing(format!("{id}.json")));
            }
        }
        log::debug!("loaded {} keyboard layouts", layouts.len());
        Ok(Self { layouts })
    }

    pub fn layouts(&self) -> impl Iterator<Item = &LayoutDef> {
        self.layouts.iter()
    }

    pub fn get(&self, id: LayoutId) -> Option<&LayoutDef> {
        self.layouts.iter().find(|l| l.id == id)
    }

    pub fn script_of(&self, id: LayoutId) -> Option<Script> {
        self.get(id).map(|l| l.script)
    }

    pub fn position(&self, id: LayoutId, c: char) -> Option<&KeyPosition> {
        self.get(id).and_then(|l| l.lookup(c))
    }

    pub fn finger(&self, id: LayoutId, c: char) -> Option<Finger> {
        self.position(id, c).map(|p| p.finger)
    }

    pub fn is_valid_in(&self, id: LayoutId, c: char) -> bool {
        self.position(id, c).is_some()
    }

    /// Every layout that can produce `c`
    pub fn layouts_for(&self, c: char) -> Vec<LayoutId> {
        self.layouts
            .iter()
            .filter(|l| l.lookup(c).is_some())
            .map(|l| l.id)
            .collect()
    }

    pub fn layout_for_script(&self, script: Script) -> Option<LayoutId> {
        self.layouts.iter().find(|l| l.script == script).map(|l| l.id)
    }

    /// Layout a character most likely came from: its script's layout for
    /// letters, otherwise the first layout that lists it.
    pub fn detect_layout(&self, c: char) -> Option<LayoutId> {
        letter_script(c)
            .and_then(|script| self.layout_for_script(script))
            .or_else(|| self.layouts_for(c).into_iter().next())
    }
}
