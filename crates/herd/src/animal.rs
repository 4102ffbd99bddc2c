use serde::{Deserialize, Serialize};

use ovino_core::{AnimalId, Entity, GroupId, Record};

/// Animal registry record.
///
/// The breeding subsystem never owns animals; it only reads their
/// categorization and mutates `group_id` / `is_pregnant` as side effects of
/// enrollment, cycle recording and removal. Everything else the registry
/// stores about an animal stays behind other modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub name: String,
    pub group_id: Option<GroupId>,
    pub is_pregnant: bool,
}

impl Animal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AnimalId::new(),
            name: name.into(),
            group_id: None,
            is_pregnant: false,
        }
    }
}

impl Entity for Animal {
    type Id = AnimalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial update: only the fields this subsystem is allowed to mutate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalPatch {
    pub group_id: Option<GroupId>,
    pub is_pregnant: Option<bool>,
}

impl AnimalPatch {
    /// Move the animal into a category.
    pub fn regroup(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            is_pregnant: None,
        }
    }

    /// Move the animal into a category and reset its pregnancy flag.
    pub fn regroup_and_reset(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            is_pregnant: Some(false),
        }
    }

    pub fn pregnant(flag: bool) -> Self {
        Self {
            group_id: None,
            is_pregnant: Some(flag),
        }
    }
}

impl Record for Animal {
    type Patch = AnimalPatch;

    fn apply_patch(&mut self, patch: Self::Patch) {
        if let Some(group_id) = patch.group_id {
            self.group_id = Some(group_id);
        }
        if let Some(flag) = patch.is_pregnant {
            self.is_pregnant = flag;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_named_fields() {
        let mut ewe = Animal::new("E1");
        let group = GroupId::new();

        ewe.apply_patch(AnimalPatch::pregnant(true));
        assert!(ewe.is_pregnant);
        assert_eq!(ewe.group_id, None);

        ewe.apply_patch(AnimalPatch::regroup(group));
        assert_eq!(ewe.group_id, Some(group));
        assert!(ewe.is_pregnant, "regroup must not clear the pregnancy flag");

        ewe.apply_patch(AnimalPatch::regroup_and_reset(group));
        assert!(!ewe.is_pregnant);
    }
}
