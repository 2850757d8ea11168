use std::collections::HashMap;
use std::fmt::{self, Display};
use std::slice::Iter;

use crate::inputs::key::Key;

/// We define all available action
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    Quit,
    Back,
    Open,
    Next,
    Previous,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Search,
    SortFirst,
    SortSecond,
    SortThird,
    RefreshNode,
    CycleInterval,
    CyclePageSize,
    Reload,
}

impl Action {
    /// All available actions
    pub fn iterator() -> Iter<'static, Action> {
        static ACTIONS: [Action; 17] = [
            Action::Quit,
            Action::Back,
            Action::Open,
            Action::Next,
            Action::Previous,
            Action::NextPage,
            Action::PrevPage,
            Action::FirstPage,
            Action::LastPage,
            Action::Search,
            Action::SortFirst,
            Action::SortSecond,
            Action::SortThird,
            Action::RefreshNode,
            Action::CycleInterval,
            Action::CyclePageSize,
            Action::Reload,
        ];
        ACTIONS.iter()
    }

    /// List of key associated to action
    pub fn keys(&self) -> &[Key] {
        match self {
            Action::Quit => &[Key::Char('q'), Key::Ctrl('c')],
            Action::Back => &[Key::Esc],
            Action::Open => &[Key::Enter],
            Action::Next => &[Key::Down, Key::Char('j')],
            Action::Previous => &[Key::Up, Key::Char('k')],
            Action::NextPage => &[Key::Right, Key::PageDown],
            Action::PrevPage => &[Key::Left, Key::PageUp],
            Action::FirstPage => &[Key::Home],
            Action::LastPage => &[Key::End],
            Action::Search => &[Key::Char('/')],
            Action::SortFirst => &[Key::Char('1')],
            Action::SortSecond => &[Key::Char('2')],
            Action::SortThird => &[Key::Char('3')],
            Action::RefreshNode => &[Key::Char('r')],
            Action::CycleInterval => &[Key::Char('i')],
            Action::CyclePageSize => &[Key::Char('z')],
            Action::Reload => &[Key::Ctrl('r')],
        }
    }
}

/// Could display a user friendly short description of action
impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Action::Quit => "Quit",
            Action::Back => "Back",
            Action::Open => "Open",
            Action::Next => "Next",
            Action::Previous => "Previous",
            Action::NextPage => "Next Page",
            Action::PrevPage => "Prev Page",
            Action::FirstPage => "First Page",
            Action::LastPage => "Last Page",
            Action::Search => "Search",
            Action::SortFirst => "Sort Col 1",
            Action::SortSecond => "Sort Col 2",
            Action::SortThird => "Sort Col 3",
            Action::RefreshNode => "Refresh Counts",
            Action::CycleInterval => "Interval",
            Action::CyclePageSize => "Page Size",
            Action::Reload => "Reload",
        };
        match self.keys().first() {
            Some(key) => write!(f, "{} {}", key, str),
            None => write!(f, "{}", str),
        }
    }
}

/// The application should have some contextual actions.
#[derive(Default, Debug, Clone)]
pub struct Actions(Vec<Action>);

impl Actions {
    /// Given a key, find the corresponding action
    pub fn find(&self, key: Key) -> Option<&Action> {
        Action::iterator()
            .filter(|action| self.0.contains(action))
            .find(|action| action.keys().contains(&key))
    }

    /// Get contextual actions.
    /// (just for building a help view)
    pub fn actions(&self) -> &[Action] {
        self.0.as_slice()
    }
}

impl From<Vec<Action>> for Actions {
    /// Build contextual action
    ///
    /// # Panics
    ///
    /// If two actions have same key
    fn from(actions: Vec<Action>) -> Self {
        // Check key unicity
        let mut map: HashMap<Key, Vec<Action>> = HashMap::new();
        for action in actions.iter() {
            for key in action.keys().iter() {
                map.entry(*key).or_default().push(*action);
            }
        }
        let errors = map
            .iter()
            .filter(|(_, actions)| actions.len() > 1) // at least two actions share same shortcut
            .map(|(key, actions)| {
                let actions = actions
                    .iter()
                    .map(Action::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Conflict key {} with actions {}", key, actions)
            })
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            panic!("{}", errors.join("; "))
        }

        // Ok, we can create contextual actions
        Self(actions)
    }
}

impl Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions = self
            .0
            .iter()
            .map(Action::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "{}", actions)
    }
}
