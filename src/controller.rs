//! Controllers: named groups of actions under a shared route prefix.

use crate::action::Action;
use std::ops::Index;

/// Immutable once built; each action's route already carries the prefix.
#[derive(Clone, Debug)]
pub struct Controller {
    route: String,
    actions: Vec<(String, Action)>,
}

impl Controller {
    /// Prefixes every action's route with `route` by literal concatenation
    /// (`/users` + `/` is `/users/`). The passed actions are left untouched.
    pub fn new<N, I>(route: impl Into<String>, actions: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Action)>,
    {
        let route = route.into();
        let actions = actions
            .into_iter()
            .map(|(name, action)| (name.into(), action.prefixed(&route)))
            .collect();
        Controller { route, actions }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, action)| action)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Index<&str> for Controller {
    type Output = Action;

    fn index(&self, name: &str) -> &Action {
        match self.action(name) {
            Some(action) => action,
            None => panic!("controller {} has no action named {}", self.route, name),
        }
    }
}
