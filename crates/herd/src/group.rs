use serde::{Deserialize, Serialize};

use ovino_core::{Entity, GroupId, Record};

/// Herd category ("group").
///
/// Categories are free-form operator data in general; the breeding subsystem
/// materializes exactly two well-known ones on demand (see [`HerdCategory`])
/// and never deletes any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
        }
    }
}

impl Entity for Group {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
}

impl Record for Group {
    type Patch = GroupPatch;

    fn apply_patch(&mut self, patch: Self::Patch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
    }

    /// Group names are unique per farm, compared trimmed and case-insensitive.
    fn unique_key(&self) -> Option<String> {
        Some(normalize(&self.name))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// The two well-known categories the breeding flow moves animals between.
///
/// Historical data spells the awaiting-mating category several ways, so each
/// category carries the full set of accepted spellings in one place instead
/// of scattering string comparisons across call sites.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HerdCategory {
    /// Ewes available for a new mating batch ("VAZIAS").
    AwaitingMating,
    /// Ewes currently enrolled in an open batch ("EM MONTA").
    InMating,
}

impl HerdCategory {
    /// Name used when the category has to be created.
    pub fn canonical_name(self) -> &'static str {
        match self {
            HerdCategory::AwaitingMating => "VAZIAS",
            HerdCategory::InMating => "EM MONTA",
        }
    }

    /// Spellings accepted when matching existing groups.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            HerdCategory::AwaitingMating => &["VAZIAS", "VAZIA", "MATRIZES VAZIAS"],
            HerdCategory::InMating => &["EM MONTA"],
        }
    }

    /// Case-insensitive, whitespace-trimmed alias match.
    pub fn matches(self, name: &str) -> bool {
        let candidate = normalize(name);
        self.aliases().iter().any(|alias| *alias == candidate)
    }
}

impl core::fmt::Display for HerdCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_mating_accepts_all_spellings() {
        for name in ["VAZIAS", "vazia", "  Matrizes Vazias  ", "Vazias"] {
            assert!(
                HerdCategory::AwaitingMating.matches(name),
                "expected {name:?} to match"
            );
        }
    }

    #[test]
    fn in_mating_is_exact_name_only() {
        assert!(HerdCategory::InMating.matches(" em monta "));
        assert!(!HerdCategory::InMating.matches("MONTA"));
        assert!(!HerdCategory::InMating.matches("EM MONTA 2"));
    }

    #[test]
    fn categories_do_not_overlap() {
        assert!(!HerdCategory::AwaitingMating.matches("EM MONTA"));
        assert!(!HerdCategory::InMating.matches("VAZIAS"));
    }

    #[test]
    fn unique_key_normalizes_name() {
        let group = Group::new("  vazias ");
        assert_eq!(group.unique_key().as_deref(), Some("VAZIAS"));
    }
}
