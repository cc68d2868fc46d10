//! The view/add/change/delete permission grid for one application module and
//! one group.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct ModelActions: u8 {
        const VIEW =   0b0001;
        const ADD =    0b0010;
        const CHANGE = 0b0100;
        const DELETE = 0b1000;
    }
}

impl ModelActions {
    /// Prefix used in permission codenames, only defined for single flags.
    pub fn codename_prefix(self) -> Option<&'static str> {
        [
            (Self::VIEW, "view"),
            (Self::ADD, "add"),
            (Self::CHANGE, "change"),
            (Self::DELETE, "delete"),
        ]
        .into_iter()
        .find_map(|(flag, prefix)| (flag == self).then_some(prefix))
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "view" => Some(Self::VIEW),
            "add" => Some(Self::ADD),
            "change" => Some(Self::CHANGE),
            "delete" => Some(Self::DELETE),
            _ => None,
        }
    }

    pub fn columns() -> impl Iterator<Item = (Self, &'static str)> {
        Self::all()
            .iter()
            .filter_map(|flag| flag.codename_prefix().map(|prefix| (flag, prefix)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppModels {
    pub app_label: String,
    pub verbose_name: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub codename: String,
}

/// One model's record as the backend stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ModelPermission {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub change: bool,
    #[serde(default)]
    pub delete: bool,
}

impl From<ModelPermission> for ModelActions {
    fn from(value: ModelPermission) -> Self {
        let mut actions = Self::empty();
        actions.set(Self::VIEW, value.view);
        actions.set(Self::ADD, value.add);
        actions.set(Self::CHANGE, value.change);
        actions.set(Self::DELETE, value.delete);
        actions
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionMap(HashMap<String, i64>);

impl PermissionMap {
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        permissions
            .into_iter()
            .map(|Permission { id, codename }| (codename, id))
            .collect()
    }

    pub fn get(&self, codename: &str) -> Option<i64> {
        self.0.get(codename).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, i64)> for PermissionMap {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRow {
    pub model: String,
    pub label: String,
    pub actions: ModelActions,
}

/// Rows follow the app's model order; keys are lowercased model names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    rows: Vec<ToggleRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub ids: Vec<i64>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignPermissions<'a> {
    pub app: &'a str,
    pub permissions: &'a [i64],
}

impl ToggleState {
    pub fn initialise(app: &AppModels, existing: &HashMap<String, ModelPermission>) -> Self {
        let existing: HashMap<String, ModelActions> = existing
            .iter()
            .map(|(model, record)| (model.to_lowercase(), ModelActions::from(*record)))
            .collect();

        let rows = app
            .models
            .iter()
            .map(|label| {
                let model = label.to_lowercase();
                let actions = existing.get(&model).copied().unwrap_or_default();
                ToggleRow {
                    model,
                    label: label.clone(),
                    actions,
                }
            })
            .collect();

        Self { rows }
    }

    /// Rebuilds the grid from submitted checkbox names of the form `model.action`.
    pub fn from_submission<'a>(
        app: &AppModels,
        checked: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut state = Self::initialise(app, &HashMap::new());
        for name in checked {
            let Some((model, prefix)) = name.rsplit_once('.') else {
                continue;
            };
            let Some(action) = ModelActions::from_prefix(prefix) else {
                continue;
            };
            state.toggle(model, action);
        }
        state
    }

    pub fn rows(&self) -> &[ToggleRow] {
        &self.rows
    }

    /// Flips one flag on one model. Returns whether anything changed.
    pub fn toggle(&mut self, model: &str, action: ModelActions) -> bool {
        if action.codename_prefix().is_none() {
            return false;
        }

        let model = model.to_lowercase();
        match self.rows.iter_mut().find(|row| row.model == model) {
            Some(row) => {
                row.actions.toggle(action);
                true
            }
            None => false,
        }
    }

    pub fn selected_codenames(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|row| {
                ModelActions::columns()
                    .filter(|(flag, _)| row.actions.contains(*flag))
                    .map(|(_, prefix)| format!("{prefix}_{}", row.model))
            })
            .collect()
    }

    /// Codenames missing from `map` are skipped rather than sent.
    pub fn resolve(&self, map: &PermissionMap) -> Resolution {
        let mut resolution = Resolution::default();
        for codename in self.selected_codenames() {
            match map.get(&codename) {
                Some(id) => resolution.ids.push(id),
                None => resolution.skipped.push(codename),
            }
        }
        resolution
    }
}
