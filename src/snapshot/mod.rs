//! One observation of the open tabs.
//!
//! A `Snapshot` maps each url to the tab seen at that url during one pass
//! over the browser windows. The same url open in two windows collapses to
//! a single entry, the later window winning.

pub mod diff;

use std::collections::hash_map::{HashMap, Values};

use chrono::{Datelike, Local, Timelike};

use crate::source::Window;
use crate::store::Value;

/// Privacy mode of the window a tab was seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Incognito,
}

impl Mode {
    /// Anything other than "incognito" (in any case) is a normal window.
    pub fn from_window_mode(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("incognito") {
            Mode::Incognito
        } else {
            Mode::Normal
        }
    }

    /// Stored form: 0 normal, 1 incognito.
    pub fn as_flag(self) -> i64 {
        match self {
            Mode::Normal => 0,
            Mode::Incognito => 1,
        }
    }
}

/// Wall clock time and date of one pass, "H:M" and "D-M-YYYY" without
/// zero padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub time: String,
    pub date: String,
}

impl Stamp {
    pub fn now() -> Self {
        Stamp::at(&Local::now())
    }

    pub fn at<T: Datelike + Timelike>(moment: &T) -> Self {
        Stamp {
            time: format!("{}:{}", moment.hour(), moment.minute()),
            date: format!("{}-{}-{}", moment.day(), moment.month(), moment.year()),
        }
    }
}

/// One observed tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub url: String,
    pub title: String,
    pub mode: Mode,
    pub time: String,
    pub date: String,
}

impl Item {
    /// Values in `data` column order.
    pub fn row(&self) -> [Value; 5] {
        [
            Value::Text(self.url.clone()),
            Value::Text(self.title.clone()),
            Value::Integer(self.mode.as_flag()),
            Value::Text(self.time.clone()),
            Value::Text(self.date.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    items: HashMap<String, Item>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Build a snapshot from one enumeration pass. Every item shares `stamp`.
    pub fn from_windows(windows: &[Window], stamp: &Stamp) -> Self {
        let mut snapshot = Snapshot::new();
        for window in windows {
            let mode = Mode::from_window_mode(&window.mode);
            for tab in &window.tabs {
                snapshot.insert(Item {
                    url: tab.url.clone(),
                    title: tab.title.clone(),
                    mode,
                    time: stamp.time.clone(),
                    date: stamp.date.clone(),
                });
            }
        }
        snapshot
    }

    /// Insert an item, replacing any earlier item at the same url.
    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.url.clone(), item);
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.items.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&Item> {
        self.items.get(url)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> Values<'_, String, Item> {
        self.items.values()
    }
}

impl FromIterator<Item> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for item in iter {
            snapshot.insert(item);
        }
        snapshot
    }
}
