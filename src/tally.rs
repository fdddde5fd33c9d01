use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownItem {
    pub name: String,
    pub count: usize,
}

/// Frequency counter that remembers first-seen order, so equal counts come
/// out in encounter order after the descending sort.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    pub fn add(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), 1));
            }
        }
    }

    /// Items by count, highest first.
    pub fn into_breakdown(self) -> Vec<BreakdownItem> {
        let mut items: Vec<BreakdownItem> =
            self.entries.into_iter().map(|(name, count)| BreakdownItem { name, count }).collect();
        items.sort_by(|a, b| b.count.cmp(&a.count));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_by_count_with_ties_in_encounter_order() {
        let mut t = Tally::default();
        for n in ["b", "a", "c", "a", "c", "d"] { t.add(n); }
        let items = t.into_breakdown();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b", "d"]);
        assert_eq!(items[0].count, 2);
        assert_eq!(items.iter().map(|i| i.count).sum::<usize>(), 6);
    }
}
